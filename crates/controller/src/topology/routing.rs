// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routing queries over the physical or entanglement-link graph.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::Topology;
use crate::error::ControllerError;
use crate::resource::node::NodeType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingMode {
    Physical,
    Entanglement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingAlgorithm {
    Shortest,
    AllShortest,
    AllSimplePaths,
}

/// Find routes from `src` to `dst` in `topology` under `mode`/`algorithm`.
/// Returns physical node-id sequences even when `mode` is `Entanglement`:
/// each entanglement hop is expanded back to the physical path that
/// realizes it.
pub fn find_paths(
    topology: &Topology,
    src: &str,
    dst: &str,
    mode: RoutingMode,
    algorithm: RoutingAlgorithm,
) -> Result<Vec<Vec<String>>, ControllerError> {
    if !topology.node_types.contains_key(src) {
        return Err(ControllerError::InvalidArgument(format!("unknown node: {src}")));
    }
    if !topology.node_types.contains_key(dst) {
        return Err(ControllerError::InvalidArgument(format!("unknown node: {dst}")));
    }

    if src == dst {
        return Ok(vec![vec![src.to_owned()]]);
    }

    match mode {
        RoutingMode::Physical => {
            let adjacency = topology.graph.undirected_adjacency();
            let raw = compute_routes(&adjacency, src, dst, algorithm);
            if raw.is_empty() {
                return Err(ControllerError::NoPath(format!("no path from {src} to {dst}")));
            }
            Ok(raw)
        }
        RoutingMode::Entanglement => {
            let adjacency: HashMap<String, Vec<String>> = topology
                .ent_graph
                .edges
                .iter()
                .map(|(from, edges)| (from.clone(), edges.iter().map(|e| e.to.clone()).collect()))
                .collect();
            let raw = compute_routes(&adjacency, src, dst, algorithm);
            let filtered = filter_interior_routers(raw, &topology.node_types);
            if filtered.is_empty() {
                return Err(ControllerError::NoPath(format!("no entanglement path from {src} to {dst}")));
            }
            Ok(filtered.into_iter().map(|hops| expand_physical(&hops, topology)).collect())
        }
    }
}

/// Reject any entanglement-graph route whose interior (non-endpoint) hops
/// include a non-router entanglement-capable device.
fn filter_interior_routers(
    routes: Vec<Vec<String>>,
    node_types: &HashMap<String, NodeType>,
) -> Vec<Vec<String>> {
    routes
        .into_iter()
        .filter(|route| {
            if route.len() <= 2 {
                return true;
            }
            route[1..route.len() - 1].iter().all(|hop| node_types.get(hop).is_some_and(NodeType::is_router))
        })
        .collect()
}

/// Splice each entanglement hop's stored physical path into one continuous
/// physical route.
fn expand_physical(hops: &[String], topology: &Topology) -> Vec<String> {
    let mut physical = vec![hops[0].clone()];
    for pair in hops.windows(2) {
        if let Some(path) = topology.ent_graph.edge_path(&pair[0], &pair[1]) {
            physical.extend(path.iter().skip(1).cloned());
        } else {
            physical.push(pair[1].clone());
        }
    }
    physical
}

fn compute_routes(
    adjacency: &HashMap<String, Vec<String>>,
    src: &str,
    dst: &str,
    algorithm: RoutingAlgorithm,
) -> Vec<Vec<String>> {
    match algorithm {
        RoutingAlgorithm::Shortest => bfs_shortest(adjacency, src, dst).into_iter().collect(),
        RoutingAlgorithm::AllShortest => bfs_all_shortest(adjacency, src, dst),
        RoutingAlgorithm::AllSimplePaths => all_simple_paths(adjacency, src, dst),
    }
}

fn neighbors_of<'a>(adjacency: &'a HashMap<String, Vec<String>>, node: &str) -> &'a [String] {
    adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
}

fn bfs_shortest(adjacency: &HashMap<String, Vec<String>>, src: &str, dst: &str) -> Option<Vec<String>> {
    let mut visited: HashSet<String> = HashSet::from([src.to_owned()]);
    let mut queue: VecDeque<Vec<String>> = VecDeque::from([vec![src.to_owned()]]);

    while let Some(path) = queue.pop_front() {
        let current = path.last().map(String::as_str).unwrap_or(src);
        if current == dst {
            return Some(path);
        }
        for next in neighbors_of(adjacency, current) {
            if visited.insert(next.clone()) {
                let mut next_path = path.clone();
                next_path.push(next.clone());
                queue.push_back(next_path);
            }
        }
    }
    None
}

fn bfs_all_shortest(adjacency: &HashMap<String, Vec<String>>, src: &str, dst: &str) -> Vec<Vec<String>> {
    let mut depth: HashMap<String, usize> = HashMap::from([(src.to_owned(), 0)]);
    let mut queue: VecDeque<String> = VecDeque::from([src.to_owned()]);
    let mut target_depth = None;

    while let Some(node) = queue.pop_front() {
        let d = depth[&node];
        if let Some(td) = target_depth {
            if d >= td {
                continue;
            }
        }
        for next in neighbors_of(adjacency, &node) {
            if !depth.contains_key(next) {
                depth.insert(next.clone(), d + 1);
                if next == dst {
                    target_depth = Some(d + 1);
                }
                queue.push_back(next.clone());
            }
        }
    }

    let Some(td) = target_depth else { return Vec::new() };

    let mut routes = Vec::new();
    let mut stack: Vec<Vec<String>> = vec![vec![src.to_owned()]];
    while let Some(path) = stack.pop() {
        let current = path.last().map(String::as_str).unwrap_or(src);
        let current_depth = path.len() - 1;
        if current == dst && current_depth == td {
            routes.push(path);
            continue;
        }
        if current_depth >= td {
            continue;
        }
        for next in neighbors_of(adjacency, current) {
            if depth.get(next) == Some(&(current_depth + 1)) {
                let mut next_path = path.clone();
                next_path.push(next.clone());
                stack.push(next_path);
            }
        }
    }
    routes
}

/// Enumerate every simple (non-repeating) path from `src` to `dst`. Bounded
/// by the vertex count via the `path` visited-set, never an unbounded walk.
fn all_simple_paths(adjacency: &HashMap<String, Vec<String>>, src: &str, dst: &str) -> Vec<Vec<String>> {
    let mut routes = Vec::new();
    let mut path = vec![src.to_owned()];
    let mut on_path: HashSet<String> = HashSet::from([src.to_owned()]);
    dfs_simple_paths(adjacency, dst, &mut path, &mut on_path, &mut routes);
    routes
}

fn dfs_simple_paths(
    adjacency: &HashMap<String, Vec<String>>,
    dst: &str,
    path: &mut Vec<String>,
    on_path: &mut HashSet<String>,
    routes: &mut Vec<Vec<String>>,
) {
    let current = path.last().map(String::as_str).unwrap_or(dst).to_owned();
    for next in neighbors_of(adjacency, &current) {
        if next == dst {
            path.push(next.clone());
            routes.push(path.clone());
            path.pop();
            continue;
        }
        if on_path.insert(next.clone()) {
            path.push(next.clone());
            dfs_simple_paths(adjacency, dst, path, on_path, routes);
            path.pop();
            on_path.remove(next);
        }
    }
}

#[cfg(test)]
#[path = "routing_tests.rs"]
mod tests;
