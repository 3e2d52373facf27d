// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol plugins (C8): static, compiled-in registration table of RPC
//! handlers. Each plugin declares a capability tag; only one plugin per
//! singleton capability (`Scheduling`/`Routing`/`Monitoring`) is active at a
//! time, selected by name from configuration, while every `Protocol` plugin
//! is loaded (REDESIGN: replaces class-scanning/duck typing, see DESIGN.md).

pub mod agent_experiment;
pub mod agent_register;
pub mod calibration;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::broker::{RpcError, RpcHandler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    Routing,
    Scheduling,
    Monitoring,
    Protocol,
}

/// A plugin is itself an RPC handler; its `handle` dispatches by method
/// name across the commands it declares.
pub trait Plugin: RpcHandler {
    fn name(&self) -> &'static str;
    fn kind(&self) -> PluginKind;
}

pub(crate) fn status_ok() -> serde_json::Value {
    serde_json::json!({"status": {"code": "OK", "value": "OK"}})
}

pub(crate) fn status_error(code: crate::error::Code, message: &str) -> serde_json::Value {
    serde_json::json!({"status": {"code": code.as_str(), "value": code.as_str(), "reason": message}})
}

/// Dispatches one inbound RPC topic across every loaded plugin: the first
/// plugin that doesn't answer `Decode` on a given method owns the call.
/// Replaces the source's single-process-per-plugin layout, which relied on
/// every plugin subscribing its own topic; here all plugins share the
/// controller's one `rpc_server_topic`.
pub struct PluginRouter {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginRouter {
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self { plugins }
    }
}

#[async_trait]
impl RpcHandler for PluginRouter {
    async fn handle(&self, method: &str, payload: Value) -> Result<Value, RpcError> {
        for plugin in &self.plugins {
            match plugin.handle(method, payload.clone()).await {
                Err(RpcError::Decode(_)) => continue,
                other => return other,
            }
        }
        Err(RpcError::Decode(format!("no plugin handles method {method}")))
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
