// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request translator (C7): turns a resolved experiment request into
//! per-agent timeslot allocations and drives them through the scheduler.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::error::ControllerError;
use crate::request::model::RawOutcome;
use crate::resource::node::{Node, NodeType};
use crate::resource::registry::ResourceRegistry;
use crate::scheduler::{Scheduler, NUM_SLOTS};

use super::experiment_def::{agent_sequence_slot_width, num_timeslots, Experiment, ExperimentCatalog};

pub const READY_CHECK_INTERVAL: Duration = Duration::from_secs(5);
pub const READY_TIMEOUT: Duration = Duration::from_secs(60);

/// Greedily assign each required `AgentSequence.node_type`, in declared
/// order, to the first unmatched hop of that type. Optical switches are
/// transparent and never match.
pub fn match_agents_to_experiment(exp: &Experiment, path_nodes: &[Node]) -> Result<Vec<String>, ControllerError> {
    let mut pool: Vec<&Node> = path_nodes.iter().filter(|n| n.node_type != NodeType::OpticalSwitch).collect();
    let mut mapping = Vec::with_capacity(exp.agent_sequences.len());
    for agent_sequence in &exp.agent_sequences {
        let position = pool.iter().position(|n| n.node_type == agent_sequence.node_type).ok_or_else(|| {
            ControllerError::InvalidArgument(format!(
                "no {:?} agent available on path for experiment {}",
                agent_sequence.node_type, exp.name
            ))
        })?;
        mapping.push(pool.remove(position).logical_id.clone());
    }
    Ok(mapping)
}

pub struct Translator {
    catalog: ExperimentCatalog,
    scheduler: Arc<Scheduler>,
    resources: Arc<ResourceRegistry>,
    /// Serializes `get_timeslots` + `find_common_slot` across concurrent
    /// experiments of this kind; never held across RPC submission.
    allocation_lock: AsyncMutex<()>,
    ready_check_interval: Duration,
    ready_timeout: Duration,
}

impl Translator {
    pub fn new(catalog: ExperimentCatalog, scheduler: Arc<Scheduler>, resources: Arc<ResourceRegistry>) -> Self {
        Self {
            catalog,
            scheduler,
            resources,
            allocation_lock: AsyncMutex::new(()),
            ready_check_interval: READY_CHECK_INTERVAL,
            ready_timeout: READY_TIMEOUT,
        }
    }

    /// Overrides the readiness poll cadence; used by tests to avoid waiting
    /// out the real 60s timeout.
    pub fn with_ready_timing(mut self, check_interval: Duration, timeout: Duration) -> Self {
        self.ready_check_interval = check_interval;
        self.ready_timeout = timeout;
        self
    }

    async fn is_agent_ready(&self, agent_id: &str) -> bool {
        match self.resources.get_state(agent_id).await {
            Some(state) => state.get("value").and_then(Value::as_str) == Some("IN_SPEC"),
            None => false,
        }
    }

    async fn wait_for_ready(&self, agent_id: &str) -> bool {
        let start = Instant::now();
        loop {
            if self.is_agent_ready(agent_id).await {
                info!(agent_id, "agent is ready");
                return true;
            }
            if start.elapsed() > self.ready_timeout {
                error!(agent_id, "timed out waiting for agent readiness");
                return false;
            }
            tokio::time::sleep(self.ready_check_interval).await;
        }
    }

    /// `on_result` is invoked once per agent (or with key `"error"`) as
    /// results become available, mirroring the caller's `handle_result`.
    pub async fn start_experiment(
        &self,
        exp_name: &str,
        path_nodes: &[Node],
        exp_id: &str,
        now: f64,
        grace_period: Duration,
        on_result: &(dyn for<'r> Fn(&'r str, Value) + Send + Sync),
    ) -> Result<RawOutcome, ControllerError> {
        let exp = self
            .catalog
            .get(exp_name)
            .ok_or_else(|| ControllerError::InvalidArgument(format!("unknown experiment {exp_name}")))?;

        let agents = match_agents_to_experiment(exp, path_nodes)?;

        for agent_id in &agents {
            if !self.wait_for_ready(agent_id).await {
                return Err(ControllerError::AgentNotReady(agent_id.clone()));
            }
        }

        let slot_widths: Vec<usize> = exp.agent_sequences.iter().map(agent_sequence_slot_width).collect();
        let start_time;
        let slots;
        {
            let _guard = self.allocation_lock.lock().await;
            start_time = self.scheduler.start_time(now, grace_period);
            let availabilities = self.scheduler.get_timeslots(&agents, start_time, NUM_SLOTS).await?;
            let (_, computed) = self.scheduler.find_common_slot(&agents, &availabilities, &slot_widths)?;
            slots = computed;
        }

        let mut per_agent_allocations = Vec::with_capacity(agents.len());
        for (agent_id, agent_sequence) in agents.iter().zip(exp.agent_sequences.iter()) {
            let mut remaining = slots.get(agent_id).cloned().unwrap_or_default();
            let mut allocations = Vec::with_capacity(agent_sequence.sequences.len());
            for sequence in &agent_sequence.sequences {
                let width = num_timeslots(sequence).min(remaining.len());
                let taken: Vec<usize> = remaining.drain(0..width).collect();
                allocations.push(serde_json::json!({
                    "expName": sequence.name,
                    "className": sequence.class_name,
                    "timeSlot": taken,
                }));
            }
            per_agent_allocations.push((agent_id.clone(), Value::Array(allocations)));
        }

        match self.scheduler.allocate(exp_id, start_time, &per_agent_allocations).await {
            Ok(results) => {
                for (agent_id, result) in &results {
                    on_result(agent_id, result.clone());
                }
                Ok(RawOutcome::Bool(true))
            }
            Err(err) => {
                warn!(exp_id, error = %err, "experiment allocation failed, cancelling");
                self.scheduler.cancel(exp_id, &agents).await;
                on_result("error", Value::String(err.to_string()));
                Ok(RawOutcome::Bool(false))
            }
        }
    }
}

#[cfg(test)]
#[path = "translator_tests.rs"]
mod tests;
