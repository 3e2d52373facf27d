// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process broker. Simulates the request/reply and pub/sub semantics of
//! the real message queue for tests and single-process deployments: one
//! registered handler per topic, best-effort fan-out pub/sub via
//! `tokio::sync::broadcast`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;

use super::{MessageBroker, RpcError, RpcHandler};

const TOPIC_CHANNEL_CAPACITY: usize = 256;

#[derive(Default)]
pub struct InMemoryBroker {
    handlers: RwLock<HashMap<String, Arc<dyn RpcHandler>>>,
    topics: RwLock<HashMap<String, broadcast::Sender<Value>>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    async fn topic_sender(&self, topic: &str) -> broadcast::Sender<Value> {
        if let Some(tx) = self.topics.read().await.get(topic) {
            return tx.clone();
        }
        let mut topics = self.topics.write().await;
        topics
            .entry(topic.to_owned())
            .or_insert_with(|| broadcast::channel(TOPIC_CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn call(
        &self,
        topic: &str,
        method: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value, RpcError> {
        let handler = self.handlers.read().await.get(topic).cloned();
        let Some(handler) = handler else {
            return Err(RpcError::Transport(format!("no handler registered for topic {topic}")));
        };

        match tokio::time::timeout(timeout, handler.handle(method, payload)).await {
            Ok(result) => result,
            Err(_) => Err(RpcError::Timeout),
        }
    }

    async fn publish(&self, topic: &str, payload: Value) {
        let tx = self.topic_sender(topic).await;
        let _ = tx.send(payload);
    }

    async fn subscribe(&self, topic: &str) -> broadcast::Receiver<Value> {
        self.topic_sender(topic).await.subscribe()
    }

    async fn serve(&self, topic: &str, handler: Arc<dyn RpcHandler>, shutdown: CancellationToken) {
        self.handlers.write().await.insert(topic.to_owned(), handler);
        shutdown.cancelled().await;
        self.handlers.write().await.remove(topic);
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
