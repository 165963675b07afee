//! Process definition documents.
//!
//! A definition is a flat list of BPMN-style elements and the sequence flows
//! between them, stored as JSON or TOML. Loading validates node kinds and
//! flow endpoints and yields an immutable `ProcessGraph`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use flowload_core::error::{FlowloadError, Result};

use crate::graph::{FlowNode, NodeKind, ProcessGraph, TaskType};

/// Serialized process definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDefinition {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub nodes: Vec<NodeDocument>,
    #[serde(default)]
    pub flows: Vec<FlowDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDocument {
    pub id: String,
    /// BPMN element name, e.g. `userTask` or `exclusiveGateway`.
    pub kind: String,
    /// Task name as recorded in task logs. Defaults to the id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl NodeDocument {
    fn to_flow_node(&self) -> Result<FlowNode> {
        let task = |task_type| NodeKind::Task {
            name: self.name.clone().unwrap_or_else(|| self.id.clone()),
            task_type,
        };
        let kind = match self.kind.as_str() {
            "startEvent" => NodeKind::Start,
            "endEvent" => NodeKind::End,
            "userTask" => task(TaskType::User),
            "serviceTask" => task(TaskType::Service),
            "exclusiveGateway" => NodeKind::ExclusiveGateway,
            "parallelGateway" => NodeKind::ParallelGateway,
            other => {
                return Err(FlowloadError::UnsupportedNodeType {
                    node: self.id.clone(),
                    kind: other.to_string(),
                })
            }
        };
        Ok(FlowNode::new(self.id.clone(), kind))
    }
}

impl ProcessDefinition {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| FlowloadError::Definition(e.to_string()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| FlowloadError::Definition(e.to_string()))
    }

    /// Read a definition file; `.toml` files are TOML, anything else JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_json(&content),
        }
    }

    /// Convert into a `ProcessGraph`, rejecting unknown node kinds.
    pub fn to_graph(&self) -> Result<ProcessGraph> {
        let mut builder = ProcessGraph::builder(self.id.clone());
        for node in &self.nodes {
            builder = builder.node(node.to_flow_node()?);
        }
        for flow in &self.flows {
            builder = builder.sequence_flow(
                flow.id.clone(),
                flow.source.clone(),
                flow.target.clone(),
                flow.condition.clone(),
            );
        }
        builder.build()
    }
}

/// Load a definition file straight into a `ProcessGraph`.
pub fn load_definition(path: &Path) -> Result<ProcessGraph> {
    let definition = ProcessDefinition::load(path)?;
    let graph = definition.to_graph()?;
    info!(
        path = %path.display(),
        definition = %graph.id(),
        nodes = graph.node_count(),
        flows = graph.flows().len(),
        "Loaded process definition"
    );
    Ok(graph)
}
