// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller configuration (C10, ambient): a `clap`-derived flat config
//! covering every key the broker, scheduler, translator, and plugin
//! selection need, plus document-store backend validation.

use std::time::Duration;

/// Top-level controller configuration, populated from flags or the
/// matching `QNETD_*` environment variable.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "qnetd", about = "Quantum network control-plane daemon")]
pub struct Config {
    /// Message broker host.
    #[arg(long, default_value = "127.0.0.1", env = "QNETD_MQ_HOST")]
    pub mq_host: String,

    /// Message broker port.
    #[arg(long, default_value_t = 4222, env = "QNETD_MQ_PORT")]
    pub mq_port: u16,

    /// Topic this controller listens on for client RPCs.
    #[arg(long, default_value = "controller.rpc", env = "QNETD_RPC_SERVER_TOPIC")]
    pub rpc_server_topic: String,

    /// Topic prefix for outbound agent RPCs; the agent-specific topic is
    /// `<prefix>/<agentId>`.
    #[arg(long, default_value = "agent", env = "QNETD_RPC_CLIENT_TOPIC")]
    pub rpc_client_topic: String,

    /// Delay, in milliseconds, added to `now` when computing an
    /// allocation's `startTime`.
    #[arg(long, default_value_t = 50, env = "QNETD_GRACE_PERIOD_MS")]
    pub grace_period_ms: u64,

    /// Name of the active scheduling plugin (singleton capability).
    #[arg(long, default_value = "scheduler", env = "QNETD_SCHEDULING_NAME")]
    pub scheduling_name: String,

    /// Name of the active routing plugin (singleton capability).
    #[arg(long, default_value = "routing", env = "QNETD_ROUTING_NAME")]
    pub routing_name: String,

    /// Name of the active monitoring plugin (singleton capability).
    #[arg(long, default_value = "monitoring", env = "QNETD_MONITORING_NAME")]
    pub monitoring_name: String,

    /// Colon-separated plugin discovery roots, beyond the compiled-in set.
    #[arg(long, env = "QNETD_PLUGINS_PATH")]
    pub plugins_path: Option<String>,

    /// Additional schema namespaces to register on startup.
    #[arg(long, env = "QNETD_SCHEMAS_PATH")]
    pub schemas_path: Option<String>,

    /// Path to user-provided experiment definitions, merged over the
    /// built-in catalog.
    #[arg(long, env = "QNETD_EXPERIMENT_DEFINITION_PATH")]
    pub experiment_definition_path: Option<std::path::PathBuf>,

    /// Document-store connection URI. Only the `memory://` scheme is
    /// implemented; anything else fails `validate()`.
    #[arg(long, default_value = "memory://", env = "QNETD_DATABASE_URI")]
    pub database_uri: String,

    /// `tracing-subscriber` output format: `text` or `json`.
    #[arg(long, default_value = "text", env = "QNETD_LOG_FORMAT")]
    pub log_format: String,

    /// `tracing-subscriber` default level when `RUST_LOG` is unset.
    #[arg(long, default_value = "info", env = "QNETD_LOG_LEVEL")]
    pub log_level: String,
}

impl Config {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn nats_url(&self) -> String {
        format!("{}:{}", self.mq_host, self.mq_port)
    }

    /// Rejects unsupported database backends and inconsistent flag
    /// combinations before the controller starts.
    pub fn validate(&self) -> Result<(), String> {
        let scheme = self.database_uri.split("://").next().unwrap_or("");
        if scheme != "memory" {
            return Err(format!("unsupported database backend: {scheme}"));
        }
        if !matches!(self.log_format.as_str(), "text" | "json") {
            return Err(format!("unsupported log format: {}", self.log_format));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
