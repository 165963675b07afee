//! Trace reconstruction: reconciling a static process definition with the
//! dynamic record of which tasks a simulated run completed.
//!
//! The `TraceBuilder` walks the `ProcessGraph` from its start event, consuming
//! matching entries of the `TaskLog` at each task and choosing the
//! log-consistent branch at each gateway. The result is a `TraceNode` tree
//! annotated with the variable bindings implied by the branch conditions
//! that were taken.

pub mod builder;
pub mod condition;
pub mod definition;
pub mod graph;
pub mod resolver;
pub mod trace;

pub use builder::{build_trace, TraceBuilder};
pub use condition::{parse_condition, Bindings};
pub use definition::{load_definition, ProcessDefinition};
pub use graph::{FlowNode, NodeId, NodeKind, ProcessGraph, ProcessGraphBuilder, SequenceFlow, TaskType};
pub use resolver::{GatewayPath, GatewayResolver};
pub use trace::{TraceNode, TracedTask};
