use std::collections::BTreeMap;

use futures::future::BoxFuture;

use crate::error::Result;

/// Process variables sent to the engine, keyed by variable name.
pub type Variables = BTreeMap<String, String>;

/// Workflow engine: the operations a load run drives remotely.
///
/// Implementations are thin request/response wrappers: no retries and no
/// protocol state between calls.
pub trait ProcessEngine: Send + Sync + 'static {
    /// Engine name for logs (e.g., "rest").
    fn name(&self) -> &str;

    /// Deploy a process definition document. Returns the definition id.
    fn deploy_definition(&self, name: String, content: String) -> BoxFuture<'_, Result<String>>;

    /// Start an instance of a deployed definition. Returns the process id.
    fn start_process(
        &self,
        definition_id: String,
        variables: Variables,
    ) -> BoxFuture<'_, Result<String>>;

    /// Claim and complete the named task of a running instance, supplying
    /// the variables that route the flow leaving it. Returns the task id.
    fn claim_task(
        &self,
        process_id: String,
        task_name: String,
        variables: Variables,
    ) -> BoxFuture<'_, Result<String>>;
}
