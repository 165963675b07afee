use tracing::{debug, info, warn};

use flowload_core::error::{FlowloadError, Result};
use flowload_core::task_log::TaskLog;

use crate::condition::{merge_missing, parse_condition, Bindings};
use crate::graph::{NodeId, NodeKind, ProcessGraph, SequenceFlow};
use crate::resolver::GatewayResolver;
use crate::trace::TraceNode;

/// Reconstruct the execution path of one simulated run.
///
/// Shorthand for `TraceBuilder::new(graph).build(log)`.
pub fn build_trace(graph: &ProcessGraph, log: &mut TaskLog) -> Result<TraceNode> {
    TraceBuilder::new(graph).build(log)
}

/// Walks a `ProcessGraph` guided by a `TaskLog`, producing a `TraceNode` tree.
///
/// Sequential nodes consume the first available log entry with their name.
/// At an exclusive gateway the earliest available entry that any branch can
/// reach picks the branch; a parallel gateway follows every unconditioned
/// branch. Every error aborts the whole reconstruction.
///
/// Gateways are always treated as splits. An exclusive gateway that only
/// merges branches (one unconditioned flow to an end event) matches no log
/// entry and fails with `NoViableBranch`; a parallel join is walked once per
/// incoming branch.
pub struct TraceBuilder<'g> {
    graph: &'g ProcessGraph,
    resolver: GatewayResolver<'g>,
}

impl<'g> TraceBuilder<'g> {
    pub fn new(graph: &'g ProcessGraph) -> Self {
        Self {
            graph,
            resolver: GatewayResolver::new(graph),
        }
    }

    /// Toggle the visited-node guard of the gateway-chain search.
    pub fn with_cycle_guard(mut self, enabled: bool) -> Self {
        self.resolver = GatewayResolver::new(self.graph).with_cycle_guard(enabled);
        self
    }

    /// Build the trace tree, consuming the log entries it references.
    ///
    /// The log is borrowed exclusively for the call; on error it may be
    /// partially consumed and should be discarded.
    pub fn build(&self, log: &mut TaskLog) -> Result<TraceNode> {
        let start = self.graph.start_node()?;
        let root = self.advance(start, log)?;

        info!(
            definition = %self.graph.id(),
            tasks = root.task_indices().len(),
            unconsumed = log.unconsumed().len(),
            "Trace built"
        );
        Ok(root)
    }

    /// Create the trace node for a start event or task, then follow it.
    fn advance(&self, node: NodeId, log: &mut TaskLog) -> Result<TraceNode> {
        let flow_node = self.graph.resolve(node);
        let mut trace = match &flow_node.kind {
            NodeKind::Start => TraceNode::root(),
            NodeKind::Task { name, .. } => {
                let index = log
                    .find_available(name)
                    .ok_or_else(|| FlowloadError::TraceNotFound(name.clone()))?;
                log.consume(index);
                debug!(task = %name, index, "Consumed log entry");
                TraceNode::for_task(index, name.clone())
            }
            _ => {
                return Err(FlowloadError::UnsupportedNodeType {
                    node: flow_node.id.clone(),
                    kind: flow_node.kind_name().to_string(),
                })
            }
        };

        let next = self.single_successor(node)?;
        self.descend(&mut trace, next, log)?;
        Ok(trace)
    }

    /// Attach whatever `next` contributes below `parent`.
    fn descend(&self, parent: &mut TraceNode, next: NodeId, log: &mut TaskLog) -> Result<()> {
        let node = self.graph.resolve(next);
        match &node.kind {
            NodeKind::End => {
                debug!(node = %node.id, "Reached end event");
            }
            NodeKind::Task { .. } => {
                parent.children.push(self.advance(next, log)?);
            }
            NodeKind::ExclusiveGateway => {
                parent.children.push(self.choose_branch(next, log)?);
            }
            NodeKind::ParallelGateway => {
                self.fork(parent, next, log)?;
            }
            NodeKind::Start => {
                return Err(FlowloadError::UnsupportedNodeType {
                    node: node.id.clone(),
                    kind: node.kind_name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Target of the one flow leaving a start event or task.
    fn single_successor(&self, node: NodeId) -> Result<NodeId> {
        let flows = self.graph.outgoing_flows(node)?;
        if flows.len() > 1 {
            warn!(
                node = %self.graph.resolve(node).id,
                flows = flows.len(),
                "Node has several outgoing flows, following the first"
            );
        }
        Ok(flows[0].target)
    }

    /// Pick the single branch of an exclusive gateway the log is consistent with.
    ///
    /// Entries are scanned in log order and, for each, the flows in declared
    /// order; the first pair that matches is taken without backtracking.
    fn choose_branch(&self, gateway: NodeId, log: &mut TaskLog) -> Result<TraceNode> {
        let flows = self.graph.outgoing_flows(gateway)?;
        let candidates: Vec<usize> = log.available_indices().collect();

        for index in candidates {
            let Some(entry) = log.get(index) else {
                continue;
            };
            let name = entry.name.clone();

            for flow in &flows {
                let target = self.graph.resolve(flow.target);
                match &target.kind {
                    NodeKind::Task { name: task, .. } if *task == name => {
                        let variables = bindings_of(flow)?;
                        debug!(
                            gateway = %self.graph.resolve(gateway).id,
                            task = %name,
                            flow = %flow.id,
                            "Selected branch"
                        );
                        let mut child = self.advance(flow.target, log)?;
                        child.variables = variables;
                        return Ok(child);
                    }
                    NodeKind::ExclusiveGateway | NodeKind::ParallelGateway => {
                        let Some(path) = self.resolver.find_task_edge(flow.target, &name)? else {
                            continue;
                        };
                        // Only the immediate flow and the flow into the task
                        // contribute; conditions on gateways in between are lost.
                        let mut variables = bindings_of(flow)?;
                        if let Some(inner) = parse_condition(path.arrival.condition())? {
                            merge_missing(&mut variables, inner);
                        }
                        debug!(
                            gateway = %self.graph.resolve(gateway).id,
                            task = %name,
                            flow = %flow.id,
                            via = %path.arrival.id,
                            "Selected branch through nested gateway"
                        );
                        let mut child = self.advance(path.task(), log)?;
                        child.variables = variables;
                        return Ok(child);
                    }
                    _ => {}
                }
            }
        }

        Err(FlowloadError::NoViableBranch {
            gateway: self.graph.resolve(gateway).id.clone(),
        })
    }

    /// Follow every unconditioned branch of a parallel gateway.
    ///
    /// Each branch must enter a task directly; an end event or gateway right
    /// after the fork is `UnsupportedNodeType`.
    fn fork(&self, parent: &mut TraceNode, gateway: NodeId, log: &mut TaskLog) -> Result<()> {
        let gateway_id = &self.graph.resolve(gateway).id;
        for flow in self.graph.outgoing_flows(gateway)? {
            if flow.is_conditioned() {
                warn!(
                    gateway = %gateway_id,
                    flow = %flow.id,
                    "Ignoring conditioned flow on parallel gateway"
                );
                continue;
            }
            let target = self.graph.resolve(flow.target);
            if target.task_name().is_none() {
                return Err(FlowloadError::UnsupportedNodeType {
                    node: target.id.clone(),
                    kind: target.kind_name().to_string(),
                });
            }
            parent.children.push(self.advance(flow.target, log)?);
        }
        Ok(())
    }
}

fn bindings_of(flow: &SequenceFlow) -> Result<Bindings> {
    Ok(parse_condition(flow.condition())?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::FlowNode;

    mod fixtures {
        use super::*;

        /// start → t1 … tn → end
        pub fn linear_graph(names: &[&str]) -> ProcessGraph {
            let mut builder = ProcessGraph::builder("linear").start("start").end("end");
            let mut previous = "start".to_string();
            for (i, name) in names.iter().enumerate() {
                let id = format!("t{}", i + 1);
                builder = builder
                    .node(FlowNode::user_task(id.clone(), *name))
                    .flow(previous, id.clone());
                previous = id;
            }
            builder.flow(previous, "end").build().unwrap()
        }

        /// start → A → g{x==1 → B, x==2 → C} → end
        pub fn exclusive_graph() -> ProcessGraph {
            ProcessGraph::builder("exclusive")
                .start("start")
                .task("A")
                .exclusive_gateway("g")
                .task("B")
                .task("C")
                .end("end")
                .flow("start", "A")
                .flow("A", "g")
                .conditional_flow("g", "B", "${x==1}")
                .conditional_flow("g", "C", "${x==2}")
                .flow("B", "end")
                .flow("C", "end")
                .build()
                .unwrap()
        }

        /// start → g1{x==deep → g2{D, E}, x==shallow → F}
        pub fn nested_gateway_graph() -> ProcessGraph {
            ProcessGraph::builder("nested")
                .start("start")
                .exclusive_gateway("g1")
                .exclusive_gateway("g2")
                .task("D")
                .task("E")
                .task("F")
                .end("end")
                .flow("start", "g1")
                .conditional_flow("g1", "g2", "${x==deep}")
                .conditional_flow("g1", "F", "${x==shallow}")
                .conditional_flow("g2", "D", "${x==inner && y==d}")
                .conditional_flow("g2", "E", "${y==e}")
                .flow("D", "end")
                .flow("E", "end")
                .flow("F", "end")
                .build()
                .unwrap()
        }

        /// start → A → fork{P…} → end
        pub fn parallel_graph(branches: &[&str]) -> ProcessGraph {
            let mut builder = ProcessGraph::builder("parallel")
                .start("start")
                .task("A")
                .parallel_gateway("fork")
                .end("end")
                .flow("start", "A")
                .flow("A", "fork");
            for name in branches {
                builder = builder.task(*name).flow("fork", *name).flow(*name, "end");
            }
            builder.build().unwrap()
        }
    }

    fn bindings(pairs: &[(&str, &str)]) -> Bindings {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Follow the first-child chain below the root.
    fn chain(root: &TraceNode) -> Vec<&TraceNode> {
        let mut out = Vec::new();
        let mut current = root;
        while let Some(child) = current.children.first() {
            out.push(child);
            current = child;
        }
        out
    }

    #[test]
    fn test_linear_chain() {
        let graph = fixtures::linear_graph(&["T1", "T2", "T3"]);
        let mut log = TaskLog::from_names(["T1", "T2", "T3"]);
        let root = build_trace(&graph, &mut log).unwrap();

        assert!(root.task.is_none());
        let nodes = chain(&root);
        assert_eq!(nodes.len(), 3);
        let names: Vec<_> = nodes.iter().filter_map(|n| n.task_name()).collect();
        assert_eq!(names, vec!["T1", "T2", "T3"]);
        assert!(nodes.iter().all(|n| n.variables.is_empty()));
        assert!(nodes.iter().all(|n| n.children.len() <= 1));
        assert!(log.unconsumed().is_empty());
    }

    #[test]
    fn test_exclusive_branch_captures_variables() {
        let graph = fixtures::exclusive_graph();
        let mut log = TaskLog::from_names(["A", "B"]);
        let root = build_trace(&graph, &mut log).unwrap();

        let a = &root.children[0];
        assert_eq!(a.task_name(), Some("A"));
        assert!(a.variables.is_empty());
        assert_eq!(a.children.len(), 1);
        let b = &a.children[0];
        assert_eq!(b.task_name(), Some("B"));
        assert_eq!(b.variables, bindings(&[("x", "1")]));
        assert!(b.is_leaf());
    }

    #[test]
    fn test_exclusive_other_branch() {
        let graph = fixtures::exclusive_graph();
        let mut log = TaskLog::from_names(["A", "C"]);
        let root = build_trace(&graph, &mut log).unwrap();
        let c = &root.children[0].children[0];
        assert_eq!(c.task_name(), Some("C"));
        assert_eq!(c.variables, bindings(&[("x", "2")]));
    }

    #[test]
    fn test_nested_gateway_merges_bindings() {
        let graph = fixtures::nested_gateway_graph();
        let mut log = TaskLog::from_names(["D"]);
        let root = build_trace(&graph, &mut log).unwrap();

        assert_eq!(root.children.len(), 1);
        let d = &root.children[0];
        assert_eq!(d.task_name(), Some("D"));
        // Immediate branch sets x=deep; D's own flow adds y and its x loses.
        assert_eq!(d.variables, bindings(&[("x", "deep"), ("y", "d")]));
    }

    #[test]
    fn test_nested_gateway_shallow_branch() {
        let graph = fixtures::nested_gateway_graph();
        let mut log = TaskLog::from_names(["F"]);
        let root = build_trace(&graph, &mut log).unwrap();
        let f = &root.children[0];
        assert_eq!(f.task_name(), Some("F"));
        assert_eq!(f.variables, bindings(&[("x", "shallow")]));
    }

    #[test]
    fn test_unreachable_task_is_no_viable_branch() {
        let graph = fixtures::exclusive_graph();
        let mut log = TaskLog::from_names(["A", "Z"]);
        let err = build_trace(&graph, &mut log).unwrap_err();
        assert!(matches!(err, FlowloadError::NoViableBranch { gateway } if gateway == "g"));
    }

    #[test]
    fn test_missing_task_is_trace_not_found() {
        let graph = fixtures::linear_graph(&["T1", "T2"]);
        let mut log = TaskLog::from_names(["T1"]);
        let err = build_trace(&graph, &mut log).unwrap_err();
        assert!(matches!(err, FlowloadError::TraceNotFound(name) if name == "T2"));
    }

    #[test]
    fn test_earliest_entry_picks_branch() {
        // Log holds C before B: the earliest consumable entry decides.
        let graph = fixtures::exclusive_graph();
        let mut log = TaskLog::from_names(["A", "C", "B"]);
        let root = build_trace(&graph, &mut log).unwrap();
        assert_eq!(root.children[0].children[0].task_name(), Some("C"));
        assert_eq!(log.unconsumed(), vec!["B"]);
    }

    #[test]
    fn test_parallel_fork_children_in_declared_order() {
        let graph = fixtures::parallel_graph(&["P1", "P2", "P3"]);
        let mut log = TaskLog::from_names(["A", "P3", "P1", "P2"]);
        let root = build_trace(&graph, &mut log).unwrap();

        let a = &root.children[0];
        assert_eq!(a.task_name(), Some("A"));
        let names: Vec<_> = a.children.iter().filter_map(|c| c.task_name()).collect();
        assert_eq!(names, vec!["P1", "P2", "P3"]);
        assert!(a.children.iter().all(|c| c.is_leaf()));
    }

    #[test]
    fn test_parallel_skips_conditioned_flow() {
        let graph = ProcessGraph::builder("p")
            .start("s")
            .parallel_gateway("fork")
            .task("P1")
            .task("P2")
            .end("e")
            .flow("s", "fork")
            .flow("fork", "P1")
            .conditional_flow("fork", "P2", "${x==1}")
            .flow("P1", "e")
            .flow("P2", "e")
            .build()
            .unwrap();
        let mut log = TaskLog::from_names(["P1", "P2"]);
        let root = build_trace(&graph, &mut log).unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(log.unconsumed(), vec!["P2"]);
    }

    #[test]
    fn test_parallel_branch_to_gateway_is_unsupported() {
        let graph = ProcessGraph::builder("p")
            .start("s")
            .parallel_gateway("fork")
            .exclusive_gateway("g")
            .task("A")
            .end("e")
            .flow("s", "fork")
            .flow("fork", "g")
            .flow("g", "A")
            .flow("A", "e")
            .build()
            .unwrap();
        let mut log = TaskLog::from_names(["A"]);
        let err = build_trace(&graph, &mut log).unwrap_err();
        assert!(matches!(
            err,
            FlowloadError::UnsupportedNodeType { node, kind } if node == "g" && kind == "exclusive_gateway"
        ));
    }

    #[test]
    fn test_parallel_branch_to_end_is_unsupported() {
        let graph = ProcessGraph::builder("p")
            .start("s")
            .parallel_gateway("fork")
            .task("P1")
            .end("e")
            .flow("s", "fork")
            .flow("fork", "P1")
            .flow("fork", "e")
            .flow("P1", "e")
            .build()
            .unwrap();
        let mut log = TaskLog::from_names(["P1"]);
        let err = build_trace(&graph, &mut log).unwrap_err();
        assert!(matches!(
            err,
            FlowloadError::UnsupportedNodeType { node, kind } if node == "e" && kind == "end"
        ));
    }

    #[test]
    fn test_exclusive_merge_gateway_is_no_viable_branch() {
        // start → A → g{B, C} → join → end: the join is read as a split.
        let graph = ProcessGraph::builder("merge")
            .start("start")
            .task("A")
            .exclusive_gateway("g")
            .task("B")
            .task("C")
            .exclusive_gateway("join")
            .end("end")
            .flow("start", "A")
            .flow("A", "g")
            .conditional_flow("g", "B", "${x==1}")
            .conditional_flow("g", "C", "${x==2}")
            .flow("B", "join")
            .flow("C", "join")
            .flow("join", "end")
            .build()
            .unwrap();
        let mut log = TaskLog::from_names(["A", "B"]);
        let err = build_trace(&graph, &mut log).unwrap_err();
        assert!(matches!(err, FlowloadError::NoViableBranch { gateway } if gateway == "join"));
    }

    #[test]
    fn test_missing_start_event() {
        let graph = ProcessGraph::builder("p").task("A").build().unwrap();
        let mut log = TaskLog::from_names(["A"]);
        assert!(matches!(
            build_trace(&graph, &mut log),
            Err(FlowloadError::MissingStartEvent)
        ));
    }

    #[test]
    fn test_ambiguous_start_event() {
        let graph = ProcessGraph::builder("p")
            .start("s1")
            .start("s2")
            .build()
            .unwrap();
        let mut log = TaskLog::default();
        assert!(matches!(
            build_trace(&graph, &mut log),
            Err(FlowloadError::AmbiguousStartEvent(2))
        ));
    }

    #[test]
    fn test_task_without_outgoing_flow() {
        let graph = ProcessGraph::builder("p")
            .start("s")
            .task("A")
            .flow("s", "A")
            .build()
            .unwrap();
        let mut log = TaskLog::from_names(["A"]);
        let err = build_trace(&graph, &mut log).unwrap_err();
        assert!(matches!(err, FlowloadError::EmptyOutgoingFlow(id) if id == "A"));
    }

    #[test]
    fn test_flow_back_into_start_is_unsupported() {
        let graph = ProcessGraph::builder("p")
            .start("s")
            .task("A")
            .flow("s", "A")
            .flow("A", "s")
            .build()
            .unwrap();
        let mut log = TaskLog::from_names(["A"]);
        let err = build_trace(&graph, &mut log).unwrap_err();
        assert!(matches!(err, FlowloadError::UnsupportedNodeType { node, .. } if node == "s"));
    }

    #[test]
    fn test_malformed_condition_aborts() {
        let graph = ProcessGraph::builder("p")
            .start("s")
            .exclusive_gateway("g")
            .task("A")
            .end("e")
            .flow("s", "g")
            .conditional_flow("g", "A", "${x=1}")
            .flow("A", "e")
            .build()
            .unwrap();
        let mut log = TaskLog::from_names(["A"]);
        let err = build_trace(&graph, &mut log).unwrap_err();
        assert!(matches!(err, FlowloadError::MalformedExpression(_)));
    }

    #[test]
    fn test_repeated_task_consumes_successive_entries() {
        let graph = fixtures::linear_graph(&["A", "A"]);
        let mut log = TaskLog::from_names(["A", "A"]);
        let root = build_trace(&graph, &mut log).unwrap();
        assert_eq!(root.task_indices(), vec![0, 1]);
    }

    #[test]
    fn test_consumption_invariant_and_determinism() {
        let graph = fixtures::nested_gateway_graph();
        let fresh = TaskLog::from_names(["D", "X"]);

        let mut first_log = fresh.clone();
        let first = build_trace(&graph, &mut first_log).unwrap();
        let mut second_log = fresh.clone();
        let second = build_trace(&graph, &mut second_log).unwrap();
        assert_eq!(first, second);

        let indices = first.task_indices();
        let mut unique = indices.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), indices.len());
        for i in indices {
            assert!(!first_log.entries()[i].available);
        }
        assert_eq!(first_log.unconsumed(), vec!["X"]);
    }

    #[test]
    fn test_cycle_guard_toggle_is_equivalent_on_acyclic_graph() {
        let graph = fixtures::nested_gateway_graph();
        let mut guarded = TaskLog::from_names(["E"]);
        let mut unguarded = guarded.clone();
        let a = TraceBuilder::new(&graph).build(&mut guarded).unwrap();
        let b = TraceBuilder::new(&graph)
            .with_cycle_guard(false)
            .build(&mut unguarded)
            .unwrap();
        assert_eq!(a, b);
    }
}
