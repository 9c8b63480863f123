use serde::{Deserialize, Serialize};

/// Tag identifying a `MeshEvent`'s payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshEventType {
    TaskRouted,
    TaskDone,
    NodeRegistered,
    NodeStatus,
    PipelineStarted,
    PipelineDone,
    Stats,
}

/// A single event broadcast over the Event Hub to dashboard subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshEvent {
    #[serde(rename = "type")]
    pub r#type: MeshEventType,
    pub timestamp_ms: u64,
    pub data: serde_json::Value,
}

impl MeshEvent {
    pub fn new(r#type: MeshEventType, timestamp_ms: u64, data: serde_json::Value) -> Self {
        MeshEvent {
            r#type,
            timestamp_ms,
            data,
        }
    }
}
