use std::collections::{HashSet, VecDeque};

use tracing::debug;

use flowload_core::error::{FlowloadError, Result};

use crate::graph::{NodeId, NodeKind, ProcessGraph, SequenceFlow};

/// Where a gateway-chain search ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayPath<'g> {
    /// Outgoing flow of the starting gateway that began the winning branch.
    pub origin: &'g SequenceFlow,
    /// Flow arriving at the matched task.
    pub arrival: &'g SequenceFlow,
}

impl<'g> GatewayPath<'g> {
    /// The matched task node.
    pub fn task(&self) -> NodeId {
        self.arrival.target
    }
}

/// Breadth-first search through chained gateways for a task by name.
///
/// Only gateway nodes are traversed; a chain must end in tasks. The nearest
/// match (fewest gateway hops) wins when a name appears on several branches.
pub struct GatewayResolver<'g> {
    graph: &'g ProcessGraph,
    cycle_guard: bool,
}

impl<'g> GatewayResolver<'g> {
    pub fn new(graph: &'g ProcessGraph) -> Self {
        Self {
            graph,
            cycle_guard: true,
        }
    }

    /// With the guard off a cyclic gateway chain is searched forever.
    pub fn with_cycle_guard(mut self, enabled: bool) -> Self {
        self.cycle_guard = enabled;
        self
    }

    /// Find the path from `start_gateway` to the first task named `task_name`.
    ///
    /// Reaching a start or end event while searching is `UnsupportedTopology`.
    pub fn find_task_edge(
        &self,
        start_gateway: NodeId,
        task_name: &str,
    ) -> Result<Option<GatewayPath<'g>>> {
        let graph = self.graph;
        let mut visited: HashSet<NodeId> = HashSet::new();
        visited.insert(start_gateway);

        let mut queue: VecDeque<(&'g SequenceFlow, &'g SequenceFlow)> = graph
            .outgoing_flows(start_gateway)?
            .into_iter()
            .map(|f| (f, f))
            .collect();

        while let Some((origin, flow)) = queue.pop_front() {
            let node = graph.resolve(flow.target);
            match &node.kind {
                NodeKind::Task { name, .. } => {
                    if name == task_name {
                        debug!(
                            gateway = %graph.resolve(start_gateway).id,
                            task = %task_name,
                            via = %origin.id,
                            "Resolved task through gateway chain"
                        );
                        return Ok(Some(GatewayPath {
                            origin,
                            arrival: flow,
                        }));
                    }
                }
                NodeKind::ExclusiveGateway | NodeKind::ParallelGateway => {
                    if self.cycle_guard && !visited.insert(flow.target) {
                        continue;
                    }
                    queue.extend(
                        graph
                            .outgoing_flows(flow.target)?
                            .into_iter()
                            .map(|next| (origin, next)),
                    );
                }
                NodeKind::Start | NodeKind::End => {
                    return Err(FlowloadError::UnsupportedTopology {
                        node: node.id.clone(),
                        message: format!(
                            "gateway chain from {} reaches a {} instead of a task",
                            graph.resolve(start_gateway).id,
                            node.kind_name()
                        ),
                    });
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// g1 → {g2 → {D, E}, F}
    fn nested() -> ProcessGraph {
        ProcessGraph::builder("nested")
            .exclusive_gateway("g1")
            .exclusive_gateway("g2")
            .task("D")
            .task("E")
            .task("F")
            .conditional_flow("g1", "g2", "${route==deep}")
            .conditional_flow("g1", "F", "${route==shallow}")
            .conditional_flow("g2", "D", "${kind==d}")
            .conditional_flow("g2", "E", "${kind==e}")
            .build()
            .unwrap()
    }

    #[test]
    fn test_direct_task_match() {
        let graph = nested();
        let g1 = graph.node_id("g1").unwrap();
        let path = GatewayResolver::new(&graph)
            .find_task_edge(g1, "F")
            .unwrap()
            .unwrap();
        assert_eq!(path.origin, path.arrival);
        assert_eq!(path.task(), graph.node_id("F").unwrap());
    }

    #[test]
    fn test_match_through_nested_gateway_reports_origin() {
        let graph = nested();
        let g1 = graph.node_id("g1").unwrap();
        let path = GatewayResolver::new(&graph)
            .find_task_edge(g1, "E")
            .unwrap()
            .unwrap();
        assert_eq!(path.origin.condition(), Some("${route==deep}"));
        assert_eq!(path.arrival.condition(), Some("${kind==e}"));
        assert_eq!(graph.resolve(path.task()).task_name(), Some("E"));
    }

    #[test]
    fn test_no_match_returns_none() {
        let graph = nested();
        let g1 = graph.node_id("g1").unwrap();
        let found = GatewayResolver::new(&graph).find_task_edge(g1, "Z").unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_nearest_duplicate_wins() {
        // g1 → g2 → X (deep), g1 → X2 named "X" (shallow), deep branch declared first
        let graph = ProcessGraph::builder("dup")
            .exclusive_gateway("g1")
            .exclusive_gateway("g2")
            .service_task("deep", "X")
            .service_task("shallow", "X")
            .conditional_flow("g1", "g2", "${a==1}")
            .conditional_flow("g1", "shallow", "${a==2}")
            .flow("g2", "deep")
            .build()
            .unwrap();
        let g1 = graph.node_id("g1").unwrap();
        let path = GatewayResolver::new(&graph)
            .find_task_edge(g1, "X")
            .unwrap()
            .unwrap();
        assert_eq!(path.task(), graph.node_id("shallow").unwrap());
    }

    #[test]
    fn test_end_event_in_chain_is_unsupported() {
        let graph = ProcessGraph::builder("p")
            .exclusive_gateway("g")
            .end("end")
            .task("A")
            .flow("g", "end")
            .flow("g", "A")
            .build()
            .unwrap();
        let g = graph.node_id("g").unwrap();
        let err = GatewayResolver::new(&graph)
            .find_task_edge(g, "A")
            .unwrap_err();
        assert!(matches!(err, FlowloadError::UnsupportedTopology { node, .. } if node == "end"));
    }

    #[test]
    fn test_cycle_guard_terminates() {
        let graph = ProcessGraph::builder("cycle")
            .exclusive_gateway("g1")
            .exclusive_gateway("g2")
            .flow("g1", "g2")
            .flow("g2", "g1")
            .build()
            .unwrap();
        let g1 = graph.node_id("g1").unwrap();
        let found = GatewayResolver::new(&graph).find_task_edge(g1, "A").unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_dead_end_gateway_is_empty_outgoing_flow() {
        let graph = ProcessGraph::builder("p")
            .exclusive_gateway("g1")
            .exclusive_gateway("g2")
            .flow("g1", "g2")
            .build()
            .unwrap();
        let g1 = graph.node_id("g1").unwrap();
        let err = GatewayResolver::new(&graph)
            .find_task_edge(g1, "A")
            .unwrap_err();
        assert!(matches!(err, FlowloadError::EmptyOutgoingFlow(id) if id == "g2"));
    }
}
