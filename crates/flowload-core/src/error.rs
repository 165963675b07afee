use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowloadError {
    // Reconciliation errors
    #[error("Malformed condition expression: {0}")]
    MalformedExpression(String),

    #[error("Unsupported node type '{kind}' for node {node}")]
    UnsupportedNodeType { node: String, kind: String },

    #[error("Unsupported topology at node {node}: {message}")]
    UnsupportedTopology { node: String, message: String },

    #[error("No available log entry for task: {0}")]
    TraceNotFound(String),

    #[error("No log entry matches any branch of gateway {gateway}")]
    NoViableBranch { gateway: String },

    #[error("Process definition has no start event")]
    MissingStartEvent,

    #[error("Process definition has {0} start events, expected exactly one")]
    AmbiguousStartEvent(usize),

    #[error("Node has no outgoing flow: {0}")]
    EmptyOutgoingFlow(String),

    // Graph construction errors
    #[error("Flow references unknown node: {0}")]
    UnknownNode(String),

    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("Definition parse error: {0}")]
    Definition(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Engine errors
    #[error("Engine request failed: {0}")]
    EngineRequest(String),

    #[error("Engine returned HTTP {status}: {body}")]
    EngineStatus { status: u16, body: String },

    #[error("Engine response parse error: {0}")]
    EngineResponse(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlowloadError {
    /// Whether this error means the task log could not be reconciled with
    /// the definition, as opposed to a broken definition or environment.
    pub fn is_reconciliation_failure(&self) -> bool {
        matches!(
            self,
            FlowloadError::TraceNotFound(_) | FlowloadError::NoViableBranch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FlowloadError>;
