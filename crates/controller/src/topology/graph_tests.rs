// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::resource::node::{Channel, Neighbor, Node, NodeType};

fn channel(id: &str, channel_type: &str, direction: Direction, neighbor: Option<(&str, &str)>) -> Channel {
    Channel {
        id: id.to_owned(),
        name: id.to_owned(),
        channel_type: channel_type.to_owned(),
        direction,
        neighbor: neighbor.map(|(node, chan)| Neighbor {
            remote_node_logical_id: node.to_owned(),
            remote_channel_id: chan.to_owned(),
            channel_type: channel_type.to_owned(),
        }),
    }
}

fn node(id: &str, node_type: NodeType, channels: Vec<Channel>) -> Node {
    Node {
        id: format!("uuid-{id}"),
        logical_id: id.to_owned(),
        node_type,
        settings: serde_json::Value::Null,
        channels,
        deleted_at: None,
    }
}

#[test]
fn valid_out_in_pair_produces_edge() {
    let a = node(
        "a",
        NodeType::QNode,
        vec![channel("a-out", "quantum", Direction::Out, Some(("b", "b-in")))],
    );
    let b = node("b", NodeType::QNode, vec![channel("b-in", "quantum", Direction::In, None)]);
    let refs = [&a, &b];
    let graph = Graph::build(&refs);

    assert_eq!(graph.out_edges.get("a").map(Vec::len), Some(1));
    assert_eq!(graph.out_edges["a"][0].to, "b");
    assert_eq!(graph.out_edges["a"][0].channel_type, "quantum");
}

#[test]
fn neighbor_pointing_to_missing_node_is_skipped() {
    let a = node(
        "a",
        NodeType::QNode,
        vec![channel("a-out", "quantum", Direction::Out, Some(("ghost", "x")))],
    );
    let refs = [&a];
    let graph = Graph::build(&refs);
    assert!(graph.out_edges.get("a").map(Vec::is_empty).unwrap_or(true));
}

#[test]
fn neighbor_channel_with_wrong_direction_is_skipped() {
    let a = node(
        "a",
        NodeType::QNode,
        vec![channel("a-out", "quantum", Direction::Out, Some(("b", "b-out")))],
    );
    let b = node("b", NodeType::QNode, vec![channel("b-out", "quantum", Direction::Out, None)]);
    let refs = [&a, &b];
    let graph = Graph::build(&refs);
    assert!(graph.out_edges.get("a").map(Vec::is_empty).unwrap_or(true));
}

#[test]
fn quantum_only_drops_classical_edges() {
    let a = node(
        "a",
        NodeType::QNode,
        vec![
            channel("a-q", "quantum", Direction::Out, Some(("b", "b-q"))),
            channel("a-c", "classical", Direction::Out, Some(("b", "b-c"))),
        ],
    );
    let b = node(
        "b",
        NodeType::QNode,
        vec![
            channel("b-q", "quantum", Direction::In, None),
            channel("b-c", "classical", Direction::In, None),
        ],
    );
    let refs = [&a, &b];
    let graph = Graph::build(&refs);
    assert_eq!(graph.num_edges(), 2);

    let quantum = graph.quantum_only();
    assert_eq!(quantum.num_edges(), 1);
    assert_eq!(quantum.out_edges["a"][0].channel_type, "quantum");
}

#[test]
fn undirected_adjacency_is_symmetric() {
    let a = node("a", NodeType::QNode, vec![channel("a-out", "quantum", Direction::Out, Some(("b", "b-in")))]);
    let b = node("b", NodeType::QNode, vec![channel("b-in", "quantum", Direction::In, None)]);
    let refs = [&a, &b];
    let graph = Graph::build(&refs);
    let adj = graph.undirected_adjacency();
    assert!(adj["a"].contains(&"b".to_owned()));
    assert!(adj["b"].contains(&"a".to_owned()));
}
