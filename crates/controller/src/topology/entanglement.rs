// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entanglement-link graph derivation: for every BSM node, walk the
//! quantum-typed subgraph backward from the BSM to build a tree rooted at
//! it, then pair off every leaf that is itself entanglement-capable. Each
//! pair becomes an edge annotated with the physical node sequence between
//! them.

use std::collections::{HashMap, HashSet};

use super::graph::Graph;
use crate::resource::node::NodeType;

#[derive(Debug, Clone)]
pub struct EntEdge {
    pub to: String,
    /// Physical node sequence from the edge's originating vertex to `to`,
    /// inclusive of both endpoints and the BSM internals between them.
    pub path: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EntanglementGraph {
    pub vertices: HashSet<String>,
    pub edges: HashMap<String, Vec<EntEdge>>,
}

impl EntanglementGraph {
    pub fn derive(quantum: &Graph, node_types: &HashMap<String, NodeType>) -> Self {
        let mut vertices = HashSet::new();
        let mut edges: HashMap<String, Vec<EntEdge>> = HashMap::new();

        for id in &quantum.vertices {
            let Some(node_type) = node_types.get(id) else { continue };
            if node_type.is_entanglement_capable() {
                vertices.insert(id.clone());
            }
        }

        for id in &quantum.vertices {
            let Some(node_type) = node_types.get(id) else { continue };
            if !node_type.is_bsm() {
                continue;
            }

            for (leaf1, leaf2, path) in generate_ent_links(id, quantum, node_types) {
                vertices.insert(leaf1.clone());
                vertices.insert(leaf2.clone());
                let mut reverse_path = path.clone();
                reverse_path.reverse();
                edges.entry(leaf1.clone()).or_default().push(EntEdge { to: leaf2.clone(), path: path.clone() });
                edges.entry(leaf2).or_default().push(EntEdge { to: leaf1, path: reverse_path });
            }
        }

        Self { vertices, edges }
    }

    pub fn edge_path(&self, from: &str, to: &str) -> Option<&[String]> {
        self.edges.get(from)?.iter().find(|e| e.to == to).map(|e| e.path.as_slice())
    }
}

/// Build the BSM-rooted tree over `quantum`'s in-edges, stopping expansion
/// at entanglement-capable devices (they become leaves) and never crossing
/// into another BSM's subtree. Bounded by `visited`, so depth never exceeds
/// the vertex count even in a cyclic graph.
fn build_bsm_tree(
    bsm: &str,
    quantum: &Graph,
    node_types: &HashMap<String, NodeType>,
) -> HashMap<String, String> {
    let mut parent: HashMap<String, String> = HashMap::new();
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(bsm.to_owned());
    add_children(bsm, quantum, node_types, &mut parent, &mut visited);
    parent
}

fn add_children(
    n: &str,
    quantum: &Graph,
    node_types: &HashMap<String, NodeType>,
    parent: &mut HashMap<String, String>,
    visited: &mut HashSet<String>,
) {
    if node_types.get(n).is_some_and(NodeType::is_entanglement_capable) {
        return;
    }

    let sources: Vec<String> = quantum.in_edges(n).map(str::to_owned).collect();
    for source in sources {
        if node_types.get(&source).is_some_and(NodeType::is_bsm) {
            continue;
        }
        if visited.contains(&source) {
            continue;
        }
        visited.insert(source.clone());
        parent.insert(source.clone(), n.to_owned());
        add_children(&source, quantum, node_types, parent, visited);
    }
}

fn path_to_root(node: &str, parent: &HashMap<String, String>) -> Vec<String> {
    let mut path = vec![node.to_owned()];
    let mut current = node;
    while let Some(next) = parent.get(current) {
        path.push(next.clone());
        current = next;
    }
    path
}

fn generate_ent_links(
    bsm: &str,
    quantum: &Graph,
    node_types: &HashMap<String, NodeType>,
) -> Vec<(String, String, Vec<String>)> {
    let parent = build_bsm_tree(bsm, quantum, node_types);

    let mut tree_vertices: HashSet<String> = parent.keys().cloned().collect();
    tree_vertices.insert(bsm.to_owned());
    let parent_values: HashSet<&String> = parent.values().collect();

    let mut leaves: Vec<String> = tree_vertices
        .iter()
        .filter(|id| {
            node_types.get(id.as_str()).is_some_and(NodeType::is_entanglement_capable)
                && !parent_values.contains(id)
        })
        .map(|s| s.to_string())
        .collect();
    leaves.sort();

    let mut links = Vec::new();
    for i in 0..leaves.len() {
        for j in (i + 1)..leaves.len() {
            let leaf1 = &leaves[i];
            let leaf2 = &leaves[j];
            let path1 = path_to_root(leaf1, &parent);
            let mut path2 = path_to_root(leaf2, &parent);
            path2.reverse();
            let mut full_path = path1;
            full_path.extend(path2.into_iter().skip(1));
            links.push((leaf1.clone(), leaf2.clone(), full_path));
        }
    }
    links
}

#[cfg(test)]
#[path = "entanglement_tests.rs"]
mod tests;
