use serde::{Deserialize, Serialize};

/// A task-type tag used for capability matching. `Any` is the unset value:
/// routing treats it as "no type constraint".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Text,
    Code,
    Vision,
    Summarize,
    Embed,
    Any,
}

impl Default for TaskType {
    fn default() -> Self {
        TaskType::Any
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskType::Text => "text",
            TaskType::Code => "code",
            TaskType::Vision => "vision",
            TaskType::Summarize => "summarize",
            TaskType::Embed => "embed",
            TaskType::Any => "any",
        };
        f.write_str(s)
    }
}

/// Inbound request for a single unary or streaming task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    #[serde(default)]
    pub task_id: Option<String>,
    pub prompt: String,
    #[serde(rename = "type", default)]
    pub r#type: Option<TaskType>,
    #[serde(default)]
    pub model_hint: Option<String>,
}

impl TaskRequest {
    /// The effective task type, defaulting to `Any` when omitted.
    pub fn task_type(&self) -> TaskType {
        self.r#type.unwrap_or(TaskType::Any)
    }

    pub fn is_valid(&self) -> bool {
        !self.prompt.trim().is_empty()
    }
}

/// Result of a completed (or failed) unary task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub content: String,
    pub routed_to: String,
    pub model_used: String,
    pub task_type: TaskType,
    pub latency_ms: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A single chunk of a streamed task response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskChunk {
    pub task_id: String,
    pub token: String,
    pub done: bool,
    pub routed_to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_type_is_any_by_default() {
        let req: TaskRequest = serde_json::from_str(r#"{"prompt":"hi"}"#).unwrap();
        assert_eq!(req.task_type(), TaskType::Any);
    }

    #[test]
    fn task_type_round_trips_snake_case() {
        let req: TaskRequest =
            serde_json::from_str(r#"{"prompt":"hi","type":"summarize"}"#).unwrap();
        assert_eq!(req.task_type(), TaskType::Summarize);
        let back = serde_json::to_string(&req.task_type()).unwrap();
        assert_eq!(back, "\"summarize\"");
    }

    #[test]
    fn empty_prompt_is_invalid() {
        let req = TaskRequest {
            task_id: None,
            prompt: "   ".into(),
            r#type: None,
            model_hint: None,
        };
        assert!(!req.is_valid());
    }
}
