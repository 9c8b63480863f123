use serde::{Deserialize, Serialize};

use crate::task::TaskType;

/// One step of a multi-step pipeline. `prompt_template` may reference
/// `{{prev_output}}`, `{{initial_input}}`, and `{{step_index}}`; an empty
/// or absent template means "use `prev_output` verbatim".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStep {
    #[serde(rename = "type", default)]
    pub r#type: Option<TaskType>,
    #[serde(default)]
    pub model_hint: Option<String>,
    #[serde(default)]
    pub prompt_template: Option<String>,
}

impl PipelineStep {
    pub fn task_type(&self) -> TaskType {
        self.r#type.unwrap_or(TaskType::Any)
    }
}

/// Inbound request to run a multi-step pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRequest {
    #[serde(default)]
    pub pipeline_id: Option<String>,
    pub steps: Vec<PipelineStep>,
    pub initial_input: String,
}

impl PipelineRequest {
    pub fn is_valid(&self) -> bool {
        !self.steps.is_empty() && !self.initial_input.trim().is_empty()
    }
}

/// Outcome of one pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStepResult {
    pub step_index: usize,
    pub task_id: String,
    pub task_type: TaskType,
    pub routed_to: String,
    pub model_used: String,
    pub content: String,
    pub latency_ms: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a full pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub pipeline_id: String,
    pub steps: Vec<PipelineStepResult>,
    pub final_output: String,
    pub total_steps: usize,
    pub latency_ms: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
