// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directed multigraph over node logical ids, built from validated
//! `out`→`in` channel pairs.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::resource::node::{Direction, Node};

#[derive(Debug, Clone)]
pub struct Edge {
    pub to: String,
    pub channel_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub vertices: HashSet<String>,
    pub out_edges: HashMap<String, Vec<Edge>>,
}

impl Graph {
    /// Build the graph, validating every `Out` channel's neighbor resolves
    /// to an existing remote node and channel with `direction = In`. An
    /// edge whose neighbor does not resolve is logged and skipped, never
    /// materialized, per the registry's edge-validation invariant.
    pub fn build(nodes: &[&Node]) -> Self {
        let by_id: HashMap<&str, &Node> = nodes.iter().map(|n| (n.logical_id.as_str(), *n)).collect();
        let vertices: HashSet<String> = nodes.iter().map(|n| n.logical_id.clone()).collect();
        let mut out_edges: HashMap<String, Vec<Edge>> = HashMap::new();

        for node in nodes {
            for channel in &node.channels {
                if channel.direction != Direction::Out {
                    continue;
                }
                let Some(neighbor) = &channel.neighbor else { continue };
                let Some(remote_node) = by_id.get(neighbor.remote_node_logical_id.as_str()) else {
                    warn!(
                        node = %node.logical_id,
                        channel = %channel.id,
                        remote = %neighbor.remote_node_logical_id,
                        "out channel neighbor resolves to unknown node, skipping edge"
                    );
                    continue;
                };
                let Some(remote_channel) =
                    remote_node.channels.iter().find(|c| c.id == neighbor.remote_channel_id)
                else {
                    warn!(
                        node = %node.logical_id,
                        channel = %channel.id,
                        remote = %neighbor.remote_node_logical_id,
                        "out channel neighbor channel not found, skipping edge"
                    );
                    continue;
                };
                if remote_channel.direction != Direction::In {
                    warn!(
                        node = %node.logical_id,
                        channel = %channel.id,
                        remote = %neighbor.remote_node_logical_id,
                        "out channel does not pair with an `in` channel on the remote, skipping edge"
                    );
                    continue;
                }

                out_edges.entry(node.logical_id.clone()).or_default().push(Edge {
                    to: neighbor.remote_node_logical_id.clone(),
                    channel_type: channel.channel_type.clone(),
                });
            }
        }

        Self { vertices, out_edges }
    }

    pub fn in_edges<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.out_edges.iter().flat_map(move |(from, edges)| {
            edges.iter().filter(move |e| e.to == id).map(move |_| from.as_str())
        })
    }

    /// Restrict the graph to `quantum`-typed edges only; used to derive the
    /// entanglement-link graph.
    pub fn quantum_only(&self) -> Graph {
        let mut out_edges: HashMap<String, Vec<Edge>> = HashMap::new();
        for (from, edges) in &self.out_edges {
            let quantum: Vec<Edge> = edges.iter().filter(|e| e.channel_type == "quantum").cloned().collect();
            if !quantum.is_empty() {
                out_edges.insert(from.clone(), quantum);
            }
        }
        Graph { vertices: self.vertices.clone(), out_edges }
    }

    /// Undirected adjacency, deduplicated per neighbor pair. Used by
    /// physical-mode routing, which treats `G` as undirected.
    pub fn undirected_adjacency(&self) -> HashMap<String, Vec<String>> {
        let mut adj: HashMap<String, HashSet<String>> = HashMap::new();
        for (from, edges) in &self.out_edges {
            for edge in edges {
                adj.entry(from.clone()).or_default().insert(edge.to.clone());
                adj.entry(edge.to.clone()).or_default().insert(from.clone());
            }
        }
        adj.into_iter().map(|(k, v)| (k, v.into_iter().collect())).collect()
    }

    pub fn num_edges(&self) -> usize {
        self.out_edges.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
