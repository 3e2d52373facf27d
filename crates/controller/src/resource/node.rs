// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node, channel, and neighbor types (C3 data model).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum NodeType {
    QNode,
    QRepeater,
    QRouter,
    BsmNode,
    MNode,
    OpticalSwitch,
}

impl NodeType {
    /// These device types can anchor an entanglement link; a `BsmNode` is
    /// the mediator a link is derived through, never a leaf itself, and an
    /// `OpticalSwitch` is a classical patch device that never qualifies.
    pub fn is_entanglement_capable(&self) -> bool {
        matches!(self, Self::QNode | Self::QRepeater | Self::QRouter)
    }

    pub fn is_router(&self) -> bool {
        matches!(self, Self::QRepeater | Self::QRouter)
    }

    pub fn is_bsm(&self) -> bool {
        matches!(self, Self::BsmNode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbor {
    pub remote_node_logical_id: String,
    pub remote_channel_id: String,
    pub channel_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub channel_type: String,
    pub direction: Direction,
    pub neighbor: Option<Neighbor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub logical_id: String,
    pub node_type: NodeType,
    #[serde(default)]
    pub settings: Value,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub deleted_at: Option<String>,
}

impl Node {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
