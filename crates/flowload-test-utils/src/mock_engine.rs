use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use futures::future::BoxFuture;

use flowload_core::error::{FlowloadError, Result};
use flowload_core::traits::{ProcessEngine, Variables};

/// A call received by `MockEngine`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Deploy {
        name: String,
    },
    Start {
        definition_id: String,
        variables: Variables,
    },
    Claim {
        process_id: String,
        task_name: String,
        variables: Variables,
    },
}

/// In-memory engine that records calls and hands out sequential ids.
#[derive(Default)]
pub struct MockEngine {
    calls: Mutex<Vec<EngineCall>>,
    counter: AtomicUsize,
    reject_task: Option<String>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer claims for `task_name` with HTTP 409.
    pub fn rejecting(task_name: impl Into<String>) -> Self {
        Self {
            reject_task: Some(task_name.into()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Task names claimed so far, in order.
    pub fn claimed_tasks(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::Claim { task_name, .. } => Some(task_name),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: EngineCall, prefix: &str) -> String {
        self.calls.lock().unwrap().push(call);
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", prefix, n)
    }
}

impl ProcessEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    fn deploy_definition(&self, name: String, _content: String) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move { Ok(self.record(EngineCall::Deploy { name }, "def")) })
    }

    fn start_process(
        &self,
        definition_id: String,
        variables: Variables,
    ) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            Ok(self.record(
                EngineCall::Start {
                    definition_id,
                    variables,
                },
                "proc",
            ))
        })
    }

    fn claim_task(
        &self,
        process_id: String,
        task_name: String,
        variables: Variables,
    ) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            if self.reject_task.as_deref() == Some(task_name.as_str()) {
                return Err(FlowloadError::EngineStatus {
                    status: 409,
                    body: format!("task {} already claimed", task_name),
                });
            }
            Ok(self.record(
                EngineCall::Claim {
                    process_id,
                    task_name,
                    variables,
                },
                "task",
            ))
        })
    }
}
