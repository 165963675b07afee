use flowload_trace::{ProcessDefinition, ProcessGraph};

/// start → A → route{x==1 → B, x==2 → C} → end
pub const EXCLUSIVE_DEFINITION: &str = r#"{
    "id": "exclusive",
    "nodes": [
        { "id": "start", "kind": "startEvent" },
        { "id": "a", "kind": "userTask", "name": "A" },
        { "id": "route", "kind": "exclusiveGateway" },
        { "id": "b", "kind": "userTask", "name": "B" },
        { "id": "c", "kind": "serviceTask", "name": "C" },
        { "id": "end", "kind": "endEvent" }
    ],
    "flows": [
        { "source": "start", "target": "a" },
        { "source": "a", "target": "route" },
        { "id": "to_b", "source": "route", "target": "b", "condition": "${x==1}" },
        { "id": "to_c", "source": "route", "target": "c", "condition": "${x==2}" },
        { "source": "b", "target": "end" },
        { "source": "c", "target": "end" }
    ]
}"#;

/// start → g1{kind==deep → g2{D, E}, kind==shallow → F} → end
pub const NESTED_DEFINITION: &str = r#"{
    "id": "nested",
    "nodes": [
        { "id": "start", "kind": "startEvent" },
        { "id": "g1", "kind": "exclusiveGateway" },
        { "id": "g2", "kind": "exclusiveGateway" },
        { "id": "d", "kind": "userTask", "name": "D" },
        { "id": "e", "kind": "userTask", "name": "E" },
        { "id": "f", "kind": "userTask", "name": "F" },
        { "id": "end", "kind": "endEvent" }
    ],
    "flows": [
        { "source": "start", "target": "g1" },
        { "source": "g1", "target": "g2", "condition": "${kind==deep}" },
        { "source": "g1", "target": "f", "condition": "${kind==shallow}" },
        { "source": "g2", "target": "d", "condition": "${kind==other && level==1}" },
        { "source": "g2", "target": "e", "condition": "${level==2}" },
        { "source": "d", "target": "end" },
        { "source": "e", "target": "end" },
        { "source": "f", "target": "end" }
    ]
}"#;

/// start → A → fork{P1, P2} → end
pub const PARALLEL_DEFINITION: &str = r#"{
    "id": "parallel",
    "nodes": [
        { "id": "start", "kind": "startEvent" },
        { "id": "a", "kind": "userTask", "name": "A" },
        { "id": "fork", "kind": "parallelGateway" },
        { "id": "p1", "kind": "userTask", "name": "P1" },
        { "id": "p2", "kind": "serviceTask", "name": "P2" },
        { "id": "end", "kind": "endEvent" }
    ],
    "flows": [
        { "source": "start", "target": "a" },
        { "source": "a", "target": "fork" },
        { "source": "fork", "target": "p1" },
        { "source": "fork", "target": "p2" },
        { "source": "p1", "target": "end" },
        { "source": "p2", "target": "end" }
    ]
}"#;

fn graph_from(json: &str) -> ProcessGraph {
    ProcessDefinition::from_json(json)
        .and_then(|d| d.to_graph())
        .expect("fixture definition is valid")
}

pub fn exclusive_graph() -> ProcessGraph {
    graph_from(EXCLUSIVE_DEFINITION)
}

pub fn nested_gateway_graph() -> ProcessGraph {
    graph_from(NESTED_DEFINITION)
}

pub fn parallel_graph() -> ProcessGraph {
    graph_from(PARALLEL_DEFINITION)
}

/// start → T1 … Tn → end, tasks named after `names`.
pub fn linear_graph(names: &[&str]) -> ProcessGraph {
    let nodes: Vec<serde_json::Value> = names
        .iter()
        .enumerate()
        .map(|(i, name)| serde_json::json!({ "id": format!("t{}", i + 1), "kind": "userTask", "name": name }))
        .collect();
    let mut ids = vec!["start".to_string()];
    ids.extend((1..=names.len()).map(|i| format!("t{}", i)));
    ids.push("end".to_string());
    let flows: Vec<serde_json::Value> = ids
        .windows(2)
        .map(|w| serde_json::json!({ "source": w[0], "target": w[1] }))
        .collect();

    let mut all_nodes = vec![serde_json::json!({ "id": "start", "kind": "startEvent" })];
    all_nodes.extend(nodes);
    all_nodes.push(serde_json::json!({ "id": "end", "kind": "endEvent" }));

    let doc = serde_json::json!({ "id": "linear", "nodes": all_nodes, "flows": flows });
    graph_from(&doc.to_string())
}
