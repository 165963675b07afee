use serde::{Deserialize, Serialize};

use crate::condition::{merge_missing, Bindings};

/// The task-log entry a trace node stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracedTask {
    /// Position of the consumed entry in the task log.
    pub index: usize,
    pub name: String,
}

/// One node of a reconstructed execution path.
///
/// The root stands for the start event and carries no task. A node has
/// several children only below a parallel fork.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<TracedTask>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TraceNode>,
    /// Bindings implied by the condition(s) on the path into this node.
    #[serde(default, skip_serializing_if = "Bindings::is_empty")]
    pub variables: Bindings,
}

impl TraceNode {
    pub(crate) fn root() -> Self {
        Self::default()
    }

    pub(crate) fn for_task(index: usize, name: impl Into<String>) -> Self {
        Self {
            task: Some(TracedTask {
                index,
                name: name.into(),
            }),
            ..Default::default()
        }
    }

    pub fn task_name(&self) -> Option<&str> {
        self.task.as_ref().map(|t| t.name.as_str())
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Depth-first, pre-order walk over this node and its descendants.
    pub fn iter(&self) -> TraceIter<'_> {
        TraceIter { stack: vec![self] }
    }

    /// Task names in pre-order.
    pub fn task_names(&self) -> Vec<&str> {
        self.iter().filter_map(|n| n.task_name()).collect()
    }

    /// Log indices referenced by the tree, in pre-order.
    pub fn task_indices(&self) -> Vec<usize> {
        self.iter()
            .filter_map(|n| n.task.as_ref().map(|t| t.index))
            .collect()
    }

    /// Bindings the engine needs to route out of this node: the union of
    /// the children's inbound bindings, earlier children first.
    pub fn outbound_variables(&self) -> Bindings {
        let mut merged = Bindings::new();
        for child in &self.children {
            merge_missing(&mut merged, child.variables.clone());
        }
        merged
    }
}

pub struct TraceIter<'a> {
    stack: Vec<&'a TraceNode>,
}

impl<'a> Iterator for TraceIter<'a> {
    type Item = &'a TraceNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
