// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `calibration` protocol plugin: a restricted Experiment submission
//! against a fixed source/destination path, plus status lookup by id.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::broker::{RpcError, RpcHandler};
use crate::request::RequestRegistry;
use crate::store::Filter;

use super::{status_error, Plugin, PluginKind};

pub struct CalibrationPlugin {
    registry: Arc<RequestRegistry>,
}

impl CalibrationPlugin {
    pub fn new(registry: Arc<RequestRegistry>) -> Self {
        Self { registry }
    }

    async fn handle_calibrate(&self, payload: Value) -> Result<Value, RpcError> {
        let parameters = payload.get("parameters").cloned().unwrap_or(Value::Null);
        let src = parameters.get("src").and_then(Value::as_str).ok_or_else(|| RpcError::Decode("missing src".to_owned()))?;
        let dst = parameters.get("dst").and_then(Value::as_str).ok_or_else(|| RpcError::Decode("missing dst".to_owned()))?;

        let request_payload = serde_json::json!({"exp_name": "Calibration", "path": [src, dst]});
        let request = self.registry.new_request(request_payload, parameters.clone(), None, None).await;
        let id = request.id.clone();
        self.registry.schedule(request, false).await;

        Ok(serde_json::json!({
            "status": {"code": "OK", "value": "OK"},
            "message": "agentCalibrationResponse",
            "calibrations": [{
                "phase": "Initializing",
                "type": parameters.get("type"),
                "src": src,
                "dst": dst,
                "power": parameters.get("power"),
                "light": parameters.get("cal_light"),
                "id": id,
            }],
        }))
    }

    async fn handle_get(&self, payload: Value) -> Result<Value, RpcError> {
        let parameters = payload.get("parameters").cloned().unwrap_or(Value::Null);
        let calibrations = if let Some(id) = parameters.get("id").and_then(Value::as_str) {
            match self.registry.get_request(id).await {
                Ok(Some(request)) => vec![request.to_document()],
                Ok(None) => Vec::new(),
                Err(err) => return Ok(status_error(err.code(), err.message())),
            }
        } else {
            match self.registry.find_requests(&Filter::new()).await {
                Ok(requests) => requests.into_iter().map(|r| r.to_document()).collect(),
                Err(err) => return Ok(status_error(err.code(), err.message())),
            }
        };
        Ok(serde_json::json!({"status": {"code": "OK", "value": "OK"}, "calibrations": calibrations}))
    }

    async fn handle_get_last(&self) -> Result<Value, RpcError> {
        let requests = self
            .registry
            .find_requests(&Filter::new())
            .await
            .map_err(|e| RpcError::RemoteError(e.code()))?;
        let last = requests.into_iter().max_by(|a, b| a.created_at.total_cmp(&b.created_at));
        let calibrations = last.map(|r| r.to_document()).into_iter().collect::<Vec<_>>();
        Ok(serde_json::json!({"status": {"code": "OK", "value": "OK"}, "calibrations": calibrations}))
    }
}

#[async_trait]
impl RpcHandler for CalibrationPlugin {
    async fn handle(&self, method: &str, payload: Value) -> Result<Value, RpcError> {
        match method {
            "calibrate" => match payload.get("type").and_then(Value::as_str) {
                Some("calibrate") => self.handle_calibrate(payload).await,
                Some("get") => self.handle_get(payload).await,
                Some("getLast") => self.handle_get_last().await,
                other => Err(RpcError::Decode(format!("unknown calibration type: {other:?}"))),
            },
            other => Err(RpcError::Decode(format!("unknown method: {other}"))),
        }
    }
}

impl Plugin for CalibrationPlugin {
    fn name(&self) -> &'static str {
        "calibration"
    }

    fn kind(&self) -> PluginKind {
        PluginKind::Protocol
    }
}

#[cfg(test)]
#[path = "calibration_tests.rs"]
mod tests;
