use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of a node inside its `ProcessGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a task is carried out by the engine. Both are traced the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    User,
    Service,
}

/// The closed set of node kinds a process definition may contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Start,
    End,
    Task { name: String, task_type: TaskType },
    ExclusiveGateway,
    ParallelGateway,
}

/// A node in the process definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowNode {
    /// Element id from the definition document.
    pub id: String,
    pub kind: NodeKind,
}

impl FlowNode {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn start(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Start)
    }

    pub fn end(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::End)
    }

    pub fn user_task(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(
            id,
            NodeKind::Task {
                name: name.into(),
                task_type: TaskType::User,
            },
        )
    }

    pub fn service_task(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(
            id,
            NodeKind::Task {
                name: name.into(),
                task_type: TaskType::Service,
            },
        )
    }

    pub fn exclusive_gateway(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::ExclusiveGateway)
    }

    pub fn parallel_gateway(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::ParallelGateway)
    }

    /// Task name, if this node is a task.
    pub fn task_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Task { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(self.kind, NodeKind::Start)
    }

    /// Short kind label used in logs and errors.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            NodeKind::Start => "start",
            NodeKind::End => "end",
            NodeKind::Task {
                task_type: TaskType::User,
                ..
            } => "user_task",
            NodeKind::Task {
                task_type: TaskType::Service,
                ..
            } => "service_task",
            NodeKind::ExclusiveGateway => "exclusive_gateway",
            NodeKind::ParallelGateway => "parallel_gateway",
        }
    }
}
