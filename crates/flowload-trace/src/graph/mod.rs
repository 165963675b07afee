//! Process definition graph: typed nodes connected by directed sequence flows.
//!
//! A `ProcessGraph` is immutable once built and holds, besides the node and
//! flow sets, the ordered outgoing flows of every node (declaration order is
//! preserved, which drives branch selection order during tracing).

pub mod flow;
pub mod node;

use std::collections::HashMap;

use flowload_core::error::{FlowloadError, Result};

pub use flow::SequenceFlow;
pub use node::{FlowNode, NodeId, NodeKind, TaskType};

/// Immutable process definition graph.
#[derive(Debug, Clone)]
pub struct ProcessGraph {
    id: String,
    nodes: Vec<FlowNode>,
    flows: Vec<SequenceFlow>,
    /// Flow indices leaving each node, in declaration order.
    outgoing: Vec<Vec<usize>>,
    by_id: HashMap<String, NodeId>,
}

impl ProcessGraph {
    pub fn builder(id: impl Into<String>) -> ProcessGraphBuilder {
        ProcessGraphBuilder::new(id)
    }

    /// Definition id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Look up a node by position.
    ///
    /// `NodeId`s are only handed out by this graph, so an unknown id is a
    /// caller bug and panics like slice indexing.
    pub fn resolve(&self, node: NodeId) -> &FlowNode {
        &self.nodes[node.0]
    }

    /// Find a node by its element id.
    pub fn node_id(&self, id: &str) -> Option<NodeId> {
        self.by_id.get(id).copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &FlowNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn flows(&self) -> &[SequenceFlow] {
        &self.flows
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Outgoing flows of `node`, possibly empty.
    pub fn outgoing(&self, node: NodeId) -> impl Iterator<Item = &SequenceFlow> {
        self.outgoing[node.0].iter().map(|&i| &self.flows[i])
    }

    /// Outgoing flows of a non-terminal node.
    ///
    /// A node that must continue somewhere but has no outgoing flow means
    /// the definition is malformed, which is always fatal.
    pub fn outgoing_flows(&self, node: NodeId) -> Result<Vec<&SequenceFlow>> {
        let flows: Vec<&SequenceFlow> = self.outgoing(node).collect();
        if flows.is_empty() {
            return Err(FlowloadError::EmptyOutgoingFlow(
                self.resolve(node).id.clone(),
            ));
        }
        Ok(flows)
    }

    /// The single start event of the definition.
    pub fn start_node(&self) -> Result<NodeId> {
        let starts: Vec<NodeId> = self
            .nodes()
            .filter(|(_, n)| n.is_start())
            .map(|(id, _)| id)
            .collect();
        match starts.as_slice() {
            [] => Err(FlowloadError::MissingStartEvent),
            [only] => Ok(*only),
            many => Err(FlowloadError::AmbiguousStartEvent(many.len())),
        }
    }
}

/// Collects nodes and flows, then checks references in `build`.
#[derive(Debug, Default)]
pub struct ProcessGraphBuilder {
    id: String,
    nodes: Vec<FlowNode>,
    flows: Vec<PendingFlow>,
}

#[derive(Debug)]
struct PendingFlow {
    id: Option<String>,
    source: String,
    target: String,
    condition: Option<String>,
}

impl ProcessGraphBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Add any node.
    pub fn node(mut self, node: FlowNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn start(self, id: impl Into<String>) -> Self {
        self.node(FlowNode::start(id))
    }

    pub fn end(self, id: impl Into<String>) -> Self {
        self.node(FlowNode::end(id))
    }

    /// Add a user task whose name equals its id.
    pub fn task(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.node(FlowNode::user_task(name.clone(), name))
    }

    pub fn service_task(self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.node(FlowNode::service_task(id, name))
    }

    pub fn exclusive_gateway(self, id: impl Into<String>) -> Self {
        self.node(FlowNode::exclusive_gateway(id))
    }

    pub fn parallel_gateway(self, id: impl Into<String>) -> Self {
        self.node(FlowNode::parallel_gateway(id))
    }

    /// Add an unconditioned flow.
    pub fn flow(self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.sequence_flow(None, source, target, None::<String>)
    }

    /// Add a flow guarded by a condition expression.
    pub fn conditional_flow(
        self,
        source: impl Into<String>,
        target: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        self.sequence_flow(None, source, target, Some(condition))
    }

    /// Add a flow with every attribute explicit. A missing id is generated.
    pub fn sequence_flow(
        mut self,
        id: Option<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        condition: Option<impl Into<String>>,
    ) -> Self {
        self.flows.push(PendingFlow {
            id,
            source: source.into(),
            target: target.into(),
            condition: condition.map(Into::into),
        });
        self
    }

    /// Resolve flow endpoints and derive the outgoing-flow index.
    pub fn build(self) -> Result<ProcessGraph> {
        let mut by_id = HashMap::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            if by_id.insert(node.id.clone(), NodeId(i)).is_some() {
                return Err(FlowloadError::DuplicateNode(node.id.clone()));
            }
        }

        let lookup = |id: &str| {
            by_id
                .get(id)
                .copied()
                .ok_or_else(|| FlowloadError::UnknownNode(id.to_string()))
        };

        let mut flows = Vec::with_capacity(self.flows.len());
        let mut outgoing = vec![Vec::new(); self.nodes.len()];
        for (i, pending) in self.flows.into_iter().enumerate() {
            let source = lookup(&pending.source)?;
            let target = lookup(&pending.target)?;
            outgoing[source.0].push(flows.len());
            flows.push(SequenceFlow {
                id: pending.id.unwrap_or_else(|| format!("flow_{}", i + 1)),
                source,
                target,
                condition: pending.condition,
            });
        }

        tracing::debug!(
            definition = %self.id,
            nodes = self.nodes.len(),
            flows = flows.len(),
            "Process graph built"
        );

        Ok(ProcessGraph {
            id: self.id,
            nodes: self.nodes,
            flows,
            outgoing,
            by_id,
        })
    }
}
