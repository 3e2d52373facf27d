// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `async-nats`-backed broker adapter. RPC calls use NATS request/reply;
//! pub/sub topics map directly onto NATS subjects. The wire envelope is
//! `{ id, method, payload, status? }` on the way out and
//! `{ status: { code, value, reason?, message? }, ... }` on the way back,
//! matching what agent firmware and other controllers speak.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{MessageBroker, RpcError, RpcHandler};
use crate::error::Code;

#[derive(Debug, Clone)]
pub struct NatsConfig {
    pub url: String,
    pub token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireRequest<'a> {
    method: &'a str,
    payload: Value,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    status: WireStatus,
}

#[derive(Debug, Deserialize)]
struct WireStatus {
    code: String,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    message: Option<String>,
}

pub struct NatsBroker {
    client: async_nats::Client,
    topics: RwLock<std::collections::HashMap<String, broadcast::Sender<Value>>>,
}

impl NatsBroker {
    pub async fn connect(config: &NatsConfig) -> anyhow::Result<Self> {
        let mut opts = async_nats::ConnectOptions::new();
        if let Some(ref token) = config.token {
            opts = opts.token(token.clone());
        }
        opts = opts.retry_on_initial_connect();

        info!(url = %config.url, "connecting NATS broker");
        let client = opts.connect(&config.url).await?;
        info!("NATS broker connected");

        Ok(Self { client, topics: RwLock::new(std::collections::HashMap::new()) })
    }

    async fn topic_sender(&self, topic: &str) -> broadcast::Sender<Value> {
        if let Some(tx) = self.topics.read().await.get(topic) {
            return tx.clone();
        }
        let mut topics = self.topics.write().await;
        topics.entry(topic.to_owned()).or_insert_with(|| broadcast::channel(256).0).clone()
    }
}

#[async_trait]
impl MessageBroker for NatsBroker {
    async fn call(
        &self,
        topic: &str,
        method: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value, RpcError> {
        let body = serde_json::to_vec(&WireRequest { method, payload })
            .map_err(|e| RpcError::Decode(e.to_string()))?;

        let reply = tokio::time::timeout(timeout, self.client.request(topic.to_owned(), body.into()))
            .await
            .map_err(|_| RpcError::Timeout)?
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let decoded: WireResponse =
            serde_json::from_slice(&reply.payload).map_err(|e| RpcError::Decode(e.to_string()))?;

        match Code::from_name(&decoded.status.code) {
            Some(Code::Ok) | Some(Code::Queued) | Some(Code::Running) => Ok(decoded.status.value),
            Some(code) => Err(RpcError::RemoteError(code)),
            None => Err(RpcError::Decode(format!("unknown status code {}", decoded.status.code))),
        }
    }

    async fn publish(&self, topic: &str, payload: Value) {
        let Ok(body) = serde_json::to_vec(&payload) else { return };
        if let Err(e) = self.client.publish(topic.to_owned(), body.into()).await {
            warn!(topic, "NATS publish failed: {e}");
        }
        let _ = self.topic_sender(topic).await.send(payload);
    }

    async fn subscribe(&self, topic: &str) -> broadcast::Receiver<Value> {
        self.topic_sender(topic).await.subscribe()
    }

    async fn serve(&self, topic: &str, handler: Arc<dyn RpcHandler>, shutdown: CancellationToken) {
        let mut sub = match self.client.subscribe(topic.to_owned()).await {
            Ok(sub) => sub,
            Err(e) => {
                warn!(topic, "NATS subscribe failed: {e}");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                msg = sub.next() => {
                    let Some(msg) = msg else { break };
                    let Some(reply) = msg.reply.clone() else {
                        debug!(topic, "NATS rpc message with no reply subject, ignoring");
                        continue;
                    };

                    let response = match serde_json::from_slice::<WireRequest>(&msg.payload) {
                        Ok(req) => match handler.handle(req.method, req.payload).await {
                            Ok(value) => wire_status(Code::Ok, value, None),
                            Err(RpcError::RemoteError(code)) => wire_status(code, Value::Null, None),
                            Err(e) => wire_status(Code::Failed, Value::Null, Some(e.to_string())),
                        },
                        Err(e) => wire_status(Code::InvalidArgument, Value::Null, Some(e.to_string())),
                    };

                    if let Ok(body) = serde_json::to_vec(&response) {
                        if let Err(e) = self.client.publish(reply, body.into()).await {
                            warn!(topic, "NATS reply publish failed: {e}");
                        }
                    }
                }
            }
        }
    }
}

fn wire_status(code: Code, value: Value, message: Option<String>) -> Value {
    serde_json::json!({
        "status": {
            "code": code.as_str(),
            "value": value,
            "message": message,
        }
    })
}

#[cfg(test)]
#[path = "nats_tests.rs"]
mod tests;
