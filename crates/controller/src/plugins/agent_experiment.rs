// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `agentExperiment` protocol plugin: experiment submission against the
//! Request Registry and Translator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::broker::{RpcError, RpcHandler};
use crate::error::ControllerError;
use crate::request::model::RawOutcome;
use crate::request::registry::RequestExecutor;
use crate::request::{Request, RequestRegistry};
use crate::resource::registry::ResourceRegistry;
use crate::scheduler::DEFAULT_GRACE_PERIOD;
use crate::translator::Translator;

use super::{Plugin, PluginKind};

/// Bridges the Request Registry's kind-agnostic executor hook to the
/// Translator, resolving `payload.path` node ids through the Resource
/// Registry before dispatch.
pub struct TranslatorExecutor {
    translator: Arc<Translator>,
    resources: Arc<ResourceRegistry>,
    grace_period: Duration,
}

impl TranslatorExecutor {
    pub fn new(translator: Arc<Translator>, resources: Arc<ResourceRegistry>) -> Self {
        Self { translator, resources, grace_period: DEFAULT_GRACE_PERIOD }
    }
}

#[async_trait]
impl RequestExecutor for TranslatorExecutor {
    async fn execute(&self, request: &Request, on_result: &(dyn for<'r> Fn(&'r str, Value) + Send + Sync)) -> Result<RawOutcome, ControllerError> {
        let exp_name = request
            .payload
            .get("exp_name")
            .and_then(Value::as_str)
            .ok_or_else(|| ControllerError::InvalidArgument("missing exp_name".to_owned()))?;
        let path_ids: Vec<String> = request
            .payload
            .get("path")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_owned)).collect())
            .unwrap_or_default();

        let nodes = self.resources.get_nodes(&path_ids).await?;
        let now = crate::request::model::unix_timestamp();
        self.translator.start_experiment(exp_name, &nodes, &request.id, now, self.grace_period, on_result).await
    }
}

pub struct AgentExperimentPlugin {
    registry: Arc<RequestRegistry>,
}

impl AgentExperimentPlugin {
    pub fn new(registry: Arc<RequestRegistry>) -> Self {
        Self { registry }
    }

    async fn handle_agent_experiment(&self, payload: Value) -> Result<Value, RpcError> {
        let parameters = payload.get("params").cloned().unwrap_or(Value::Null);
        let request = self.registry.new_request(payload, parameters, None, None).await;
        let id = request.id.clone();
        let code = self.registry.schedule(request, false).await;
        Ok(serde_json::json!({"status": {"code": code.as_str(), "value": code.as_str()}, "id": id}))
    }
}

#[async_trait]
impl RpcHandler for AgentExperimentPlugin {
    async fn handle(&self, method: &str, payload: Value) -> Result<Value, RpcError> {
        match method {
            "agentExperiment" => self.handle_agent_experiment(payload).await,
            other => Err(RpcError::Decode(format!("unknown method: {other}"))),
        }
    }
}

impl Plugin for AgentExperimentPlugin {
    fn name(&self) -> &'static str {
        "agentExperiment"
    }

    fn kind(&self) -> PluginKind {
        PluginKind::Protocol
    }
}

#[cfg(test)]
#[path = "agent_experiment_tests.rs"]
mod tests;
