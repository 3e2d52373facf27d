// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler (C6): timeslot fan-out, common-slot search, and the
//! submit/getResult/cancel fan-outs used to allocate an experiment onto
//! agents.

pub mod slotmask;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::broker::{MessageBroker, RpcError};
use crate::error::{Code, ControllerError};

pub use slotmask::{SlotMask, NUM_SLOTS};

pub const GET_SCHEDULE_TIMEOUT: Duration = Duration::from_secs(5);
pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(5);
pub const GET_RESULT_TIMEOUT: Duration = Duration::from_secs(600);
pub const CANCEL_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(50);
pub const SLOT_SIZE: Duration = Duration::from_millis(100);

/// Agent-facing RPC surface the scheduler drives. Implemented over the
/// broker in production; an in-memory fake drives tests.
#[async_trait::async_trait]
pub trait AgentRpc: Send + Sync {
    async fn get_schedule(&self, agent_id: &str, start_time: f64, num_slots: usize, timeout: Duration) -> Result<SlotMask, ControllerError>;

    async fn submit(&self, agent_id: &str, exp_id: &str, timeslot_base: f64, allocations: Value, timeout: Duration) -> Result<Code, ControllerError>;

    async fn get_result(&self, agent_id: &str, exp_id: &str, timeout: Duration) -> Result<Value, ControllerError>;

    async fn cancel(&self, agent_id: &str, exp_id: &str, timeout: Duration) -> Result<Code, ControllerError>;
}

pub struct Scheduler {
    rpc: Arc<dyn AgentRpc>,
}

impl Scheduler {
    pub fn new(rpc: Arc<dyn AgentRpc>) -> Self {
        Self { rpc }
    }

    pub fn start_time(&self, now: f64, grace_period: Duration) -> f64 {
        now + grace_period.as_secs_f64()
    }

    /// Fan out `scheduler.getSchedule` to every agent concurrently. Any
    /// single RPC failure (error or non-OK status) fails the whole call.
    pub async fn get_timeslots(&self, agent_ids: &[String], start_time: f64, num_slots: usize) -> Result<HashMap<String, SlotMask>, ControllerError> {
        info!(agents = agent_ids.len(), "fetching timeslots from agents");
        let calls = agent_ids.iter().map(|id| {
            let rpc = Arc::clone(&self.rpc);
            let id = id.clone();
            async move {
                let result = rpc.get_schedule(&id, start_time, num_slots, GET_SCHEDULE_TIMEOUT).await;
                (id, result)
            }
        });
        let results = futures_util::future::join_all(calls).await;

        let mut slots = HashMap::with_capacity(results.len());
        for (agent_id, result) in results {
            match result {
                Ok(mask) => {
                    slots.insert(agent_id, mask);
                }
                Err(err) => {
                    error!(agent_id = %agent_id, error = %err, "failed to get timeslot from agent");
                    return Err(ControllerError::Timeout(format!("failed to get timeslot from agent {agent_id}: {err}")));
                }
            }
        }
        Ok(slots)
    }

    /// `slot_widths` is the per-agent-sequence slot count, in the same
    /// order as `agent_ids`. Returns a contiguous slot-index list per agent,
    /// all carved from the same starting index within the AND'd mask.
    pub fn find_common_slot(&self, agent_ids: &[String], availabilities: &HashMap<String, SlotMask>, slot_widths: &[usize]) -> Result<(usize, HashMap<String, Vec<usize>>), ControllerError> {
        let widest = slot_widths.iter().copied().max().unwrap_or(0);

        let mut common = SlotMask::all_available();
        for agent_id in agent_ids {
            let availability = availabilities
                .get(agent_id)
                .ok_or_else(|| ControllerError::Internal(format!("missing availability for agent {agent_id}")))?;
            common = common.and(availability);
        }

        let start = common
            .find_first_fit(widest)
            .ok_or_else(|| ControllerError::ResourceExhausted("no common timeslot across agents".to_owned()))?;

        let mut slots = HashMap::with_capacity(agent_ids.len());
        for (agent_id, width) in agent_ids.iter().zip(slot_widths.iter()) {
            slots.insert(agent_id.clone(), (start..start + width).collect());
        }
        Ok((start, slots))
    }

    /// Submits to every agent in order, aborting with a cancel-cascade on
    /// the first failure; on full success, fetches every agent's result.
    pub async fn allocate(&self, exp_id: &str, start: f64, per_agent_allocations: &[(String, Value)]) -> Result<HashMap<String, Value>, ControllerError> {
        let mut submitted = Vec::with_capacity(per_agent_allocations.len());
        for (agent_id, allocations) in per_agent_allocations {
            match self.rpc.submit(agent_id, exp_id, start, allocations.clone(), SUBMIT_TIMEOUT).await {
                Ok(Code::Ok) => submitted.push(agent_id.clone()),
                Ok(code) => {
                    warn!(agent_id = %agent_id, code = %code, "submit rejected, cancelling already-submitted agents");
                    self.cancel(exp_id, &submitted).await;
                    return Err(ControllerError::Internal(format!("submit rejected by agent {agent_id}: {code}")));
                }
                Err(err) => {
                    warn!(agent_id = %agent_id, error = %err, "submit failed, cancelling already-submitted agents");
                    self.cancel(exp_id, &submitted).await;
                    return Err(ControllerError::Internal(format!("submit failed for agent {agent_id}: {err}")));
                }
            }
        }

        let mut results = HashMap::with_capacity(submitted.len());
        for agent_id in &submitted {
            match self.rpc.get_result(agent_id, exp_id, GET_RESULT_TIMEOUT).await {
                Ok(value) => {
                    results.insert(agent_id.clone(), value);
                }
                Err(err) => {
                    return Err(ControllerError::Internal(format!("getResult failed for agent {agent_id}: {err}")));
                }
            }
        }
        Ok(results)
    }

    /// Best-effort fan-out; failures are logged, never propagated.
    pub async fn cancel(&self, exp_id: &str, agent_ids: &[String]) {
        info!(exp_id, agents = agent_ids.len(), "cancelling experiment");
        let calls = agent_ids.iter().map(|id| {
            let rpc = Arc::clone(&self.rpc);
            let id = id.clone();
            let exp_id = exp_id.to_owned();
            async move { (id.clone(), rpc.cancel(&id, &exp_id, CANCEL_TIMEOUT).await) }
        });
        for (agent_id, result) in futures_util::future::join_all(calls).await {
            match result {
                Ok(Code::Ok) => {}
                Ok(code) => warn!(agent_id = %agent_id, code = %code, "cancel returned non-OK status"),
                Err(err) => warn!(agent_id = %agent_id, error = %err, "cancel failed"),
            }
        }
    }
}

/// Drives agent RPCs over the message broker. `kind` selects the
/// `<kind>.submit`/`<kind>.getResult` method pair (`"experiment"` or
/// `"calibration"`); `cancel` always calls `experiment.cancel` regardless.
pub struct BrokerAgentRpc {
    broker: Arc<dyn MessageBroker>,
    topic_prefix: String,
    kind: &'static str,
}

impl BrokerAgentRpc {
    pub fn new(broker: Arc<dyn MessageBroker>, topic_prefix: impl Into<String>, kind: &'static str) -> Self {
        Self { broker, topic_prefix: topic_prefix.into(), kind }
    }

    fn topic(&self, agent_id: &str) -> String {
        format!("{}/{agent_id}", self.topic_prefix)
    }
}

fn code_from_rpc_result(result: Result<Value, RpcError>) -> Result<Code, ControllerError> {
    match result {
        Ok(_) => Ok(Code::Ok),
        Err(RpcError::RemoteError(code)) => Ok(code),
        Err(RpcError::Timeout) => Err(ControllerError::Timeout("agent rpc timed out".to_owned())),
        Err(other) => Err(ControllerError::Internal(other.to_string())),
    }
}

#[async_trait::async_trait]
impl AgentRpc for BrokerAgentRpc {
    async fn get_schedule(&self, agent_id: &str, start_time: f64, num_slots: usize, timeout: Duration) -> Result<SlotMask, ControllerError> {
        let payload = serde_json::json!({"startTime": start_time, "numSlots": num_slots});
        let value = self
            .broker
            .call(&self.topic(agent_id), "scheduler.getSchedule", payload, timeout)
            .await
            .map_err(|e| ControllerError::Internal(e.to_string()))?;
        let hex = value.as_str().ok_or_else(|| ControllerError::Internal("getSchedule response is not a hex string".to_owned()))?;
        SlotMask::from_hex(hex)
    }

    async fn submit(&self, agent_id: &str, exp_id: &str, timeslot_base: f64, allocations: Value, timeout: Duration) -> Result<Code, ControllerError> {
        let method = format!("{}.submit", self.kind);
        let payload = serde_json::json!({"expId": exp_id, "timeslotBase": timeslot_base, "allocations": allocations});
        code_from_rpc_result(self.broker.call(&self.topic(agent_id), &method, payload, timeout).await)
    }

    async fn get_result(&self, agent_id: &str, exp_id: &str, timeout: Duration) -> Result<Value, ControllerError> {
        let method = format!("{}.getResult", self.kind);
        let payload = serde_json::json!({"expId": exp_id});
        self.broker
            .call(&self.topic(agent_id), &method, payload, timeout)
            .await
            .map_err(|e| ControllerError::Internal(e.to_string()))
    }

    async fn cancel(&self, agent_id: &str, exp_id: &str, timeout: Duration) -> Result<Code, ControllerError> {
        let payload = serde_json::json!({"expId": exp_id});
        code_from_rpc_result(self.broker.call(&self.topic(agent_id), "experiment.cancel", payload, timeout).await)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
