// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource registry (C3): owns Node records in the document store and
//! signals the topology engine to rebuild when they change.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::ControllerError;
use crate::store::{DocumentStore, Filter, FindOptions};
use crate::topology::Topology;

use super::node::Node;

const NODE_COLLECTION: &str = "nodes";
const MONITOR_COLLECTION: &str = "monitor";

pub struct TopologySummary {
    pub num_nodes: usize,
    pub num_qubits: usize,
    pub num_channels: usize,
    pub nodes: Vec<Value>,
    pub edges: Vec<Value>,
}

pub struct ResourceRegistry {
    store: Arc<dyn DocumentStore>,
    dirty: AtomicBool,
    cached: RwLock<Option<(bool, Arc<Topology>)>>,
}

impl ResourceRegistry {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store, dirty: AtomicBool::new(true), cached: RwLock::new(None) }
    }

    /// Upsert a node keyed by `logical_id`. `InvalidArgument` on malformed
    /// payloads is the caller's responsibility (validated at the plugin
    /// boundary, per §4.1); this only performs the store write.
    pub async fn register(&self, node: &Node) -> Result<(), ControllerError> {
        let doc = serde_json::to_value(node)
            .map_err(|e| ControllerError::InvalidArgument(format!("invalid node payload: {e}")))?;
        self.store.upsert(NODE_COLLECTION, &node.logical_id, doc).await;
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Soft-delete: sets `deleted_at` rather than removing the document.
    /// Returns whether a node was found.
    pub async fn deregister(&self, logical_id: &str, deleted_at: &str) -> bool {
        let Some(mut doc) = self.store.get(NODE_COLLECTION, logical_id).await else { return false };
        doc["deleted_at"] = Value::String(deleted_at.to_owned());
        self.store.upsert(NODE_COLLECTION, logical_id, doc).await;
        self.dirty.store(true, Ordering::SeqCst);
        true
    }

    pub async fn find_nodes(&self, filter: &Filter) -> Result<Vec<Node>, ControllerError> {
        let docs = self.store.find(NODE_COLLECTION, filter, &FindOptions::default()).await;
        docs.into_iter()
            .map(|doc| {
                serde_json::from_value(doc)
                    .map_err(|e| ControllerError::Internal(format!("corrupt node document: {e}")))
            })
            .collect()
    }

    /// Fails fast with `NotFound` if any requested id is missing.
    pub async fn get_nodes(&self, logical_ids: &[String]) -> Result<Vec<Node>, ControllerError> {
        let mut nodes = Vec::with_capacity(logical_ids.len());
        for id in logical_ids {
            let doc = self
                .store
                .get(NODE_COLLECTION, id)
                .await
                .ok_or_else(|| ControllerError::NotFound(format!("node not found: {id}")))?;
            let node: Node = serde_json::from_value(doc)
                .map_err(|e| ControllerError::Internal(format!("corrupt node document: {e}")))?;
            nodes.push(node);
        }
        Ok(nodes)
    }

    /// Most recent `agentState` monitoring event for `logical_id`, or `None`
    /// if the agent has never reported state.
    pub async fn get_state(&self, logical_id: &str) -> Option<Value> {
        let filter = Filter::new().eq("rid", logical_id).eq("event_type", "agentState");
        let options = FindOptions { limit: Some(1), sort_desc_by: Some("ts".to_owned()) };
        self.store.find(MONITOR_COLLECTION, &filter, &options).await.into_iter().next()
    }

    /// Build/return the cached topology, rebuilding when the dirty flag is
    /// set or `full` differs from what was last built.
    pub async fn topology_engine(&self) -> Result<Arc<Topology>, ControllerError> {
        if !self.dirty.load(Ordering::SeqCst) {
            if let Some((_, topology)) = self.cached.read().await.as_ref() {
                return Ok(Arc::clone(topology));
            }
        }

        let nodes = self.find_nodes(&Filter::new()).await?;
        let live: Vec<Node> = nodes.into_iter().filter(|n| !n.is_deleted()).collect();
        let topology = Arc::new(Topology::build(&live));
        *self.cached.write().await = Some((true, Arc::clone(&topology)));
        self.dirty.store(false, Ordering::SeqCst);
        Ok(topology)
    }

    /// Dense (`full = true`) or summary-only (`full = false`) topology
    /// serialization, unifying the registry's two legacy variants behind a
    /// single flag (see DESIGN.md).
    pub async fn topology(&self, full: bool) -> Result<TopologySummary, ControllerError> {
        let engine = self.topology_engine().await?;
        let nodes = self.find_nodes(&Filter::new()).await?;
        let live: Vec<&Node> = nodes.iter().filter(|n| !n.is_deleted()).collect();

        let mut num_qubits = 0;
        let mut num_channels = 0;
        let mut node_docs = Vec::with_capacity(live.len());
        for node in &live {
            let qubits = node.settings.get("qubits").and_then(Value::as_array).map(Vec::len).unwrap_or(0);
            num_qubits += qubits;
            num_channels += node.channels.len();

            let doc = if full {
                serde_json::json!({
                    "id": node.logical_id,
                    "node_type": node.node_type,
                    "settings": node.settings,
                    "channels": node.channels,
                    "nu_q": qubits,
                    "nu_c": node.channels.len(),
                })
            } else {
                serde_json::json!({
                    "id": node.logical_id,
                    "node_type": node.node_type,
                    "nu_q": qubits,
                    "nu_c": node.channels.len(),
                })
            };
            node_docs.push(doc);
        }

        let mut edges = Vec::with_capacity(engine.graph.num_edges());
        for (from, out) in &engine.graph.out_edges {
            for edge in out {
                edges.push(serde_json::json!({
                    "source": from,
                    "target": edge.to,
                    "channel_type": edge.channel_type,
                }));
            }
        }

        Ok(TopologySummary {
            num_nodes: live.len(),
            num_qubits,
            num_channels,
            nodes: node_docs,
            edges,
        })
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
