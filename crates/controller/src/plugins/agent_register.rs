// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `agentRegister` protocol plugin: register/deregister/update/getinfo
//! against the Resource Registry.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::broker::{RpcError, RpcHandler};
use crate::error::Code;
use crate::resource::node::Node;
use crate::resource::registry::ResourceRegistry;
use crate::store::Filter;

use super::{status_error, status_ok, Plugin, PluginKind};

pub struct AgentRegisterPlugin {
    resources: Arc<ResourceRegistry>,
}

impl AgentRegisterPlugin {
    pub fn new(resources: Arc<ResourceRegistry>) -> Self {
        Self { resources }
    }

    async fn handle_register(&self, payload: Value) -> Result<Value, RpcError> {
        let node: Node = serde_json::from_value(payload).map_err(|e| RpcError::Decode(e.to_string()))?;
        info!(logical_id = %node.logical_id, "received register");
        self.resources
            .register(&node)
            .await
            .map_err(|e| RpcError::RemoteError(e.code()))?;
        Ok(status_ok())
    }

    async fn handle_deregister(&self, payload: Value) -> Result<Value, RpcError> {
        let logical_id = payload
            .get("logical_id")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::Decode("missing logical_id".to_owned()))?;
        let deleted_at = payload.get("deleted_at").and_then(Value::as_str).unwrap_or_default();
        info!(logical_id, "received deregister");
        if self.resources.deregister(logical_id, deleted_at).await {
            Ok(status_ok())
        } else {
            Ok(status_error(Code::NotFound, &format!("node not found: {logical_id}")))
        }
    }

    async fn handle_update(&self, payload: Value) -> Result<Value, RpcError> {
        let node: Node = serde_json::from_value(payload).map_err(|e| RpcError::Decode(e.to_string()))?;
        self.resources.register(&node).await.map_err(|e| RpcError::RemoteError(e.code()))?;
        Ok(status_ok())
    }

    async fn handle_getinfo(&self, payload: Value) -> Result<Value, RpcError> {
        match payload.get("type").and_then(Value::as_str) {
            Some("topology") => {
                let full = payload.get("full").and_then(Value::as_bool).unwrap_or(true);
                let summary = self
                    .resources
                    .topology(full)
                    .await
                    .map_err(|e| RpcError::RemoteError(e.code()))?;
                Ok(serde_json::json!({
                    "status": {"code": "OK", "value": "OK"},
                    "value": {
                        "num_nodes": summary.num_nodes,
                        "num_qubits": summary.num_qubits,
                        "num_channels": summary.num_channels,
                        "nodes": summary.nodes,
                        "edges": summary.edges,
                    },
                }))
            }
            Some("node") => {
                let nodes = self
                    .resources
                    .find_nodes(&Filter::new())
                    .await
                    .map_err(|e| RpcError::RemoteError(e.code()))?;
                Ok(serde_json::json!({"status": {"code": "OK", "value": "OK"}, "value": nodes}))
            }
            other => Err(RpcError::Decode(format!("unknown getinfo type: {other:?}"))),
        }
    }
}

#[async_trait]
impl RpcHandler for AgentRegisterPlugin {
    async fn handle(&self, method: &str, payload: Value) -> Result<Value, RpcError> {
        match method {
            "register" => self.handle_register(payload).await,
            "deregister" => self.handle_deregister(payload).await,
            "update" => self.handle_update(payload).await,
            "getinfo" => self.handle_getinfo(payload).await,
            other => Err(RpcError::Decode(format!("unknown method: {other}"))),
        }
    }
}

impl Plugin for AgentRegisterPlugin {
    fn name(&self) -> &'static str {
        "agentRegister"
    }

    fn kind(&self) -> PluginKind {
        PluginKind::Protocol
    }
}

#[cfg(test)]
#[path = "agent_register_tests.rs"]
mod tests;
