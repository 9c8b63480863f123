//! Sequential multi-step pipeline execution: template expansion from prior
//! outputs, one unary dispatch per step, first-failure-terminates semantics.

use std::time::Instant;

use mesh_types::{
    MeshEvent, MeshEventType, PipelineRequest, PipelineResult, PipelineStep, PipelineStepResult,
    TaskRequest,
};
use serde_json::json;
use uuid::Uuid;

use crate::error::MeshError;
use crate::forwarder::Forwarder;
use crate::hub::EventHub;
use crate::registry::Registry;
use crate::router;
use crate::stats::Stats;
use crate::time::now_ms;

/// Literal substring substitution over a fixed set of placeholders. No
/// escaping, no recursive expansion, no expression language — deliberately,
/// per design: a templating crate would be solving a problem this system
/// doesn't have.
pub fn expand_template(
    template: &str,
    prev_output: &str,
    initial_input: &str,
    step_index: usize,
) -> String {
    template
        .replace("{{prev_output}}", prev_output)
        .replace("{{initial_input}}", initial_input)
        .replace("{{step_index}}", &step_index.to_string())
}

fn build_prompt(step: &PipelineStep, prev_output: &str, initial_input: &str, step_index: usize) -> String {
    match &step.prompt_template {
        Some(template) if !template.is_empty() => {
            expand_template(template, prev_output, initial_input, step_index)
        }
        _ => prev_output.to_string(),
    }
}

pub struct PipelineExecutor<'a> {
    registry: &'a Registry,
    forwarder: &'a Forwarder,
    hub: &'a EventHub,
    stats: &'a Stats,
}

impl<'a> PipelineExecutor<'a> {
    pub fn new(registry: &'a Registry, forwarder: &'a Forwarder, hub: &'a EventHub, stats: &'a Stats) -> Self {
        PipelineExecutor {
            registry,
            forwarder,
            hub,
            stats,
        }
    }

    pub async fn run(&self, req: PipelineRequest) -> Result<PipelineResult, MeshError> {
        if !req.is_valid() {
            return Err(MeshError::BadRequest(
                "pipeline requires at least one step and a non-empty initial_input".to_string(),
            ));
        }

        let pipeline_id = req.pipeline_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        let total_steps = req.steps.len();
        let start = Instant::now();

        self.hub.broadcast(MeshEvent::new(
            MeshEventType::PipelineStarted,
            now_ms(),
            json!({"pipeline_id": pipeline_id, "total_steps": total_steps}),
        ));

        let mut step_results = Vec::with_capacity(total_steps);
        let mut prev_output = req.initial_input.clone();
        let mut failure: Option<String> = None;

        for (index, step) in req.steps.iter().enumerate() {
            let prompt = build_prompt(step, &prev_output, &req.initial_input, index);
            let task_id = format!("{pipeline_id}_step_{index}");
            let task_req = TaskRequest {
                task_id: Some(task_id.clone()),
                prompt,
                r#type: Some(step.task_type()),
                model_hint: step.model_hint.clone(),
            };

            match router::dispatch_unary(self.registry, self.forwarder, task_id.clone(), &task_req).await {
                Ok(result) => {
                    prev_output = result.content.clone();
                    step_results.push(PipelineStepResult {
                        step_index: index,
                        task_id,
                        task_type: result.task_type,
                        routed_to: result.routed_to,
                        model_used: result.model_used,
                        content: result.content,
                        latency_ms: result.latency_ms,
                        success: true,
                        error: None,
                    });
                }
                Err(err) => {
                    step_results.push(PipelineStepResult {
                        step_index: index,
                        task_id,
                        task_type: step.task_type(),
                        routed_to: String::new(),
                        model_used: String::new(),
                        content: String::new(),
                        latency_ms: 0,
                        success: false,
                        error: Some(err.to_string()),
                    });
                    failure = Some(format!("step {} failed: {}", index + 1, err));
                    break;
                }
            }
        }

        let latency_ms = start.elapsed().as_millis() as u64;
        let success = failure.is_none();
        let final_output = if success { prev_output } else { String::new() };

        self.stats.record_pipeline(latency_ms);
        self.hub.broadcast(MeshEvent::new(
            MeshEventType::PipelineDone,
            now_ms(),
            json!({"pipeline_id": pipeline_id, "success": success, "latency_ms": latency_ms}),
        ));

        Ok(PipelineResult {
            pipeline_id,
            steps: step_results,
            final_output,
            total_steps,
            latency_ms,
            success,
            error: failure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_expands_all_placeholders() {
        let out = expand_template(
            "step {{step_index}}: {{prev_output}} (from {{initial_input}})",
            "prev",
            "init",
            2,
        );
        assert_eq!(out, "step 2: prev (from init)");
    }

    #[test]
    fn empty_template_uses_prev_output_verbatim() {
        let step = PipelineStep {
            r#type: None,
            model_hint: None,
            prompt_template: None,
        };
        assert_eq!(build_prompt(&step, "hello", "hello", 0), "hello");
    }

    #[test]
    fn template_expansion_is_idempotent_without_reintroduced_placeholders() {
        let once = expand_template("{{prev_output}}", "no-placeholders-here", "init", 0);
        let twice = expand_template(&once, "no-placeholders-here", "init", 0);
        assert_eq!(once, twice);
    }
}
