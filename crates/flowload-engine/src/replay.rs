use tracing::info;

use flowload_core::error::Result;
use flowload_core::traits::ProcessEngine;
use flowload_trace::TraceNode;

/// Outcome of replaying one trace against an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    pub process_id: String,
    /// Task ids returned by the engine, in claim order.
    pub claimed: Vec<String>,
}

/// Claim every task of a trace tree on a running instance.
///
/// Tasks are claimed depth-first in child order. Each claim carries the
/// bindings that route the flow out of that task.
pub async fn execute_trace(
    engine: &dyn ProcessEngine,
    process_id: &str,
    root: &TraceNode,
) -> Result<Vec<String>> {
    let mut claimed = Vec::new();
    for node in root.iter() {
        let Some(task) = &node.task else {
            continue;
        };
        let task_id = engine
            .claim_task(
                process_id.to_string(),
                task.name.clone(),
                node.outbound_variables(),
            )
            .await?;
        claimed.push(task_id);
    }
    Ok(claimed)
}

/// Start an instance of `definition_id` and drive it along `root`.
///
/// The instance starts with the bindings that route out of the start event.
pub async fn replay_trace(
    engine: &dyn ProcessEngine,
    definition_id: &str,
    root: &TraceNode,
) -> Result<ReplayReport> {
    let process_id = engine
        .start_process(definition_id.to_string(), root.outbound_variables())
        .await?;
    let claimed = execute_trace(engine, &process_id, root).await?;

    info!(
        engine = engine.name(),
        process_id = %process_id,
        tasks = claimed.len(),
        "Trace replayed"
    );
    Ok(ReplayReport {
        process_id,
        claimed,
    })
}
