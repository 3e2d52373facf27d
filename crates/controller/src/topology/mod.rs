// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Topology & routing engine (C4). Builds the directed physical multigraph
//! `G` from Resource Registry nodes, derives the undirected entanglement-link
//! graph `E` from `G`'s quantum-typed subgraph, and answers routing queries
//! over either.

pub mod entanglement;
pub mod graph;
pub mod routing;

use std::collections::HashMap;

use crate::resource::node::{Node, NodeType};
use entanglement::EntanglementGraph;
use graph::Graph;

/// The full topology view: physical graph, derived entanglement graph, and
/// the node-type lookup both downstream algorithms need for filtering.
pub struct Topology {
    pub graph: Graph,
    pub ent_graph: EntanglementGraph,
    pub node_types: HashMap<String, NodeType>,
}

impl Topology {
    /// Build both graphs from the current, non-deleted node set.
    pub fn build(nodes: &[Node]) -> Self {
        let live: Vec<&Node> = nodes.iter().filter(|n| !n.is_deleted()).collect();
        let graph = Graph::build(&live);
        let node_types: HashMap<String, NodeType> =
            live.iter().map(|n| (n.logical_id.clone(), n.node_type)).collect();
        let quantum = graph.quantum_only();
        let ent_graph = EntanglementGraph::derive(&quantum, &node_types);
        Self { graph, ent_graph, node_types }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
