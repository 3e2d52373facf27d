// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller context and lifecycle (C9): owns the broker, document store,
//! and resource registry for the process lifetime and hands out non-owning
//! `Arc` handles to the plugins, translator, and scheduler built on top of
//! them. REDESIGN: the source's `Context` held a back-reference into every
//! registered plugin so plugins could look up their siblings through it;
//! here plugins only ever see the narrow handles they're constructed with,
//! so there is no controller-wide cycle to break on shutdown (see
//! DESIGN.md).

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::broker::nats::{NatsBroker, NatsConfig};
use crate::broker::MessageBroker;
use crate::config::Config;
use crate::plugins::agent_experiment::{AgentExperimentPlugin, TranslatorExecutor};
use crate::plugins::agent_register::AgentRegisterPlugin;
use crate::plugins::calibration::CalibrationPlugin;
use crate::plugins::{Plugin, PluginRouter};
use crate::request::{RequestKind, RequestRegistry};
use crate::resource::ResourceRegistry;
use crate::scheduler::{BrokerAgentRpc, Scheduler};
use crate::store::memory::InMemoryStore;
use crate::store::DocumentStore;
use crate::translator::{ExperimentCatalog, Translator};

const EXPERIMENT_SCHEMA: &str = "agentExperimentResponse";
const CALIBRATION_SCHEMA: &str = "agentCalibrationResponse";

/// Owns the long-lived controller resources and drives the startup/idle/
/// shutdown sequence. Everything handed to plugins is a shared, non-owning
/// handle rooted here.
pub struct Context {
    store: Arc<dyn DocumentStore>,
    broker: Arc<dyn MessageBroker>,
    resources: Arc<ResourceRegistry>,
    shutdown: CancellationToken,
}

impl Context {
    pub fn new(store: Arc<dyn DocumentStore>, broker: Arc<dyn MessageBroker>) -> Self {
        let resources = Arc::new(ResourceRegistry::new(Arc::clone(&store)));
        Self { store, broker, resources, shutdown: CancellationToken::new() }
    }

    /// Opens the document store and connects the message broker per
    /// `config`. The only store backend implemented is `memory://`, which
    /// `Config::validate` already rejects anything but before this runs.
    pub async fn bootstrap(config: &Config) -> anyhow::Result<Self> {
        config.validate().map_err(|e| anyhow::anyhow!(e))?;

        info!(uri = %config.database_uri, "opening document store");
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());

        info!(url = %config.nats_url(), "connecting message broker");
        let broker: Arc<dyn MessageBroker> = Arc::new(NatsBroker::connect(&NatsConfig { url: format!("nats://{}", config.nats_url()), token: None }).await?);

        Ok(Self::new(store, broker))
    }

    /// A handle that, when cancelled, unwinds [`Context::run`]'s idle loop.
    /// Lets tests and the CLI's own signal handler trigger a clean shutdown.
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Registers every compiled-in plugin behind one RPC server topic and
    /// idles until a termination signal or [`Context::shutdown_handle`] is
    /// cancelled. On return, in-flight requests have either reached a
    /// terminal state or were left `Running` for a future process to pick
    /// back up from the store.
    pub async fn run(self, config: &Config) -> anyhow::Result<()> {
        let experiment_rpc: Arc<dyn crate::scheduler::AgentRpc> = Arc::new(BrokerAgentRpc::new(Arc::clone(&self.broker), config.rpc_client_topic.clone(), "experiment"));
        let experiment_scheduler = Arc::new(Scheduler::new(experiment_rpc));
        let experiment_translator = Arc::new(Translator::new(ExperimentCatalog::default(), experiment_scheduler, Arc::clone(&self.resources)));

        let calibration_rpc: Arc<dyn crate::scheduler::AgentRpc> = Arc::new(BrokerAgentRpc::new(Arc::clone(&self.broker), config.rpc_client_topic.clone(), "calibration"));
        let calibration_scheduler = Arc::new(Scheduler::new(calibration_rpc));
        let calibration_translator = Arc::new(Translator::new(ExperimentCatalog::default(), calibration_scheduler, Arc::clone(&self.resources)));

        let experiment_executor = Arc::new(TranslatorExecutor::new(Arc::clone(&experiment_translator), Arc::clone(&self.resources)));
        let experiment_registry = RequestRegistry::instance(EXPERIMENT_SCHEMA, RequestKind::Experiment, Arc::clone(&self.store), Some(experiment_executor)).await;

        let calibration_executor = Arc::new(TranslatorExecutor::new(Arc::clone(&calibration_translator), Arc::clone(&self.resources)));
        let calibration_registry = RequestRegistry::instance(CALIBRATION_SCHEMA, RequestKind::Calibration, Arc::clone(&self.store), Some(calibration_executor)).await;

        let plugins: Vec<Arc<dyn Plugin>> = vec![
            Arc::new(AgentRegisterPlugin::new(Arc::clone(&self.resources))),
            Arc::new(AgentExperimentPlugin::new(experiment_registry)),
            Arc::new(CalibrationPlugin::new(calibration_registry)),
        ];
        let router = Arc::new(PluginRouter::new(plugins));

        info!(topic = %config.rpc_server_topic, "registering RPC handlers");
        let serve_task = {
            let broker = Arc::clone(&self.broker);
            let topic = config.rpc_server_topic.clone();
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move { broker.serve(&topic, router, shutdown).await })
        };

        info!("controller started, awaiting termination signal");
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    tracing::warn!(error = %err, "failed to install signal handler, shutting down");
                }
                info!("received termination signal");
            }
            _ = self.shutdown.cancelled() => info!("shutdown requested"),
        }

        self.shutdown.cancel();
        if let Err(err) = serve_task.await {
            tracing::warn!(error = %err, "rpc server task did not shut down cleanly");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
