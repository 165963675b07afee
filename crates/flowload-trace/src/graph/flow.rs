use serde::{Deserialize, Serialize};

use super::node::NodeId;

/// A directed edge between two nodes of a `ProcessGraph`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceFlow {
    /// Flow id from the definition document.
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
    /// Raw condition expression; only set on flows leaving an exclusive gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl SequenceFlow {
    /// The condition expression, treating a blank string as no condition.
    pub fn condition(&self) -> Option<&str> {
        self.condition
            .as_deref()
            .filter(|c| !c.trim().is_empty())
    }

    pub fn is_conditioned(&self) -> bool {
        self.condition().is_some()
    }
}
