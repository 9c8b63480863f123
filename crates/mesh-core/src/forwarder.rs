//! Boundary I/O to a worker. Distinguishes transport errors (retryable via
//! failover) from decode errors (fatal for this attempt, still retryable)
//! and worker-reported failures, per spec.

use std::time::Duration;

use futures::StreamExt;
use mesh_types::{TaskChunk, TaskRequest, TaskResult, Worker};
use tokio_util::codec::{FramedRead, LinesCodec};

use crate::error::MeshError;

pub struct Forwarder {
    client: reqwest::Client,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(timeout: Duration) -> Self {
        Forwarder {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    fn base_url(worker: &Worker) -> String {
        format!("http://{}:{}", worker.host, worker.agent_port)
    }

    /// `POST /execute`. A connect/read/write/timeout failure is a
    /// `Transport` error; a response body that doesn't decode as a
    /// `TaskResult` is a `Decode` error; `TaskResult{success:false}` is a
    /// `WorkerFailure`. All three are retryable by the router's failover
    /// loop.
    pub async fn forward_unary(
        &self,
        worker: &Worker,
        req: &TaskRequest,
    ) -> Result<TaskResult, MeshError> {
        let url = format!("{}/execute", Self::base_url(worker));
        let response = self
            .client
            .post(&url)
            .json(req)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| MeshError::Transport {
                worker_id: worker.worker_id.clone(),
                message: e.to_string(),
            })?;

        let result: TaskResult = response.json().await.map_err(|e| MeshError::Decode {
            worker_id: worker.worker_id.clone(),
            message: e.to_string(),
        })?;

        if !result.success {
            return Err(MeshError::WorkerFailure {
                worker_id: worker.worker_id.clone(),
                message: result.error.clone().unwrap_or_else(|| "unknown error".into()),
            });
        }

        Ok(result)
    }

    /// `POST /execute/stream`, consuming a newline-delimited JSON stream of
    /// `TaskChunk`s. Invokes `on_chunk` per decoded chunk, in worker-emission
    /// order, stopping at `done = true` or stream end. Selection happens
    /// once before this call; the caller (router) does not retry mid-stream.
    pub async fn forward_stream<F>(
        &self,
        worker: &Worker,
        req: &TaskRequest,
        mut on_chunk: F,
    ) -> Result<(), MeshError>
    where
        F: FnMut(TaskChunk),
    {
        let url = format!("{}/execute/stream", Self::base_url(worker));
        let response = self
            .client
            .post(&url)
            .json(req)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| MeshError::Transport {
                worker_id: worker.worker_id.clone(),
                message: e.to_string(),
            })?;

        let body = response
            .bytes_stream()
            .map(|r| r.map_err(std::io::Error::other));
        let reader = tokio_util::io::StreamReader::new(body);
        let mut lines = FramedRead::new(reader, LinesCodec::new());

        while let Some(line) = lines.next().await {
            let line = line.map_err(|e| MeshError::Transport {
                worker_id: worker.worker_id.clone(),
                message: e.to_string(),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let chunk: TaskChunk = serde_json::from_str(&line).map_err(|e| MeshError::Decode {
                worker_id: worker.worker_id.clone(),
                message: e.to_string(),
            })?;
            let done = chunk.done;
            on_chunk(chunk);
            if done {
                break;
            }
        }

        Ok(())
    }
}
