// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message broker abstraction (C2).
//!
//! Every agent interaction — `submit`, `getResult`, `cancel`, `getSchedule`,
//! readiness polling — crosses this trait as an RPC call with an explicit
//! per-call timeout. Pub/sub topics (`broadcast`, `keepalive`, `monitoring`,
//! per-request `<kind>-<requestID>`) cross it as publish/subscribe. Plugins
//! (C8) register RPC and message handlers on the same trait so the
//! controller can act as an RPC server as well as a client.

pub mod memory;
pub mod nats;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::Code;

/// Failure modes for a broker RPC call. Distinguishes a call that never got
/// a response (`Timeout`, `Transport`) from one that got a well-formed
/// error response (`RemoteError`) or a malformed one (`Decode`).
#[derive(Debug, Clone, PartialEq)]
pub enum RpcError {
    Timeout,
    Transport(String),
    RemoteError(Code),
    Decode(String),
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "rpc timeout"),
            Self::Transport(m) => write!(f, "rpc transport error: {m}"),
            Self::RemoteError(code) => write!(f, "rpc remote error: {code}"),
            Self::Decode(m) => write!(f, "rpc decode error: {m}"),
        }
    }
}

impl std::error::Error for RpcError {}

/// Handles a single RPC method call on behalf of a registered server topic.
#[async_trait]
pub trait RpcHandler: Send + Sync {
    async fn handle(&self, method: &str, payload: Value) -> Result<Value, RpcError>;
}

/// Pluggable message broker: RPC request/response with correlation, plus
/// pub/sub. Implementations must be safe to share behind an `Arc` across
/// tasks.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Issue an RPC call to `topic` invoking `method` with `payload`,
    /// failing with `RpcError::Timeout` if no response arrives within
    /// `timeout`.
    async fn call(
        &self,
        topic: &str,
        method: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value, RpcError>;

    /// Publish `payload` to `topic`. Best-effort: subscribers that are not
    /// currently listening miss the message, matching broadcast-channel
    /// semantics.
    async fn publish(&self, topic: &str, payload: Value);

    /// Subscribe to `topic`, returning values as they are published.
    async fn subscribe(&self, topic: &str) -> tokio::sync::broadcast::Receiver<Value>;

    /// Register `handler` to serve RPC calls addressed to `topic` until
    /// `shutdown` is cancelled.
    async fn serve(&self, topic: &str, handler: std::sync::Arc<dyn RpcHandler>, shutdown: CancellationToken);
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
