// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end lifecycle scenarios driven through the public crate surface,
//! using the in-memory store/broker so the whole controller runs in one
//! process without a real NATS server or agent.

use std::sync::Arc;
use std::time::Duration;

use qnetd::broker::RpcHandler;
use qnetd::error::{Code, ControllerError};
use qnetd::plugins::agent_experiment::{AgentExperimentPlugin, TranslatorExecutor};
use qnetd::request::{Request, RequestKind, RequestRegistry};
use qnetd::resource::{Channel, Direction, Neighbor, Node, NodeType, ResourceRegistry};
use qnetd::scheduler::{AgentRpc, Scheduler, SlotMask};
use qnetd::store::memory::InMemoryStore;
use qnetd::store::{DocumentStore, Filter};
use qnetd::topology::routing::{find_paths, RoutingAlgorithm, RoutingMode};
use qnetd::topology::Topology;
use qnetd::translator::{ExperimentCatalog, Translator};
use serde_json::{json, Value};

fn channel(id: &str, channel_type: &str, direction: Direction, neighbor: Option<(&str, &str)>) -> Channel {
    Channel {
        id: id.to_owned(),
        name: id.to_owned(),
        channel_type: channel_type.to_owned(),
        direction,
        neighbor: neighbor.map(|(node, chan)| Neighbor {
            remote_node_logical_id: node.to_owned(),
            remote_channel_id: chan.to_owned(),
            channel_type: channel_type.to_owned(),
        }),
    }
}

fn node(id: &str, node_type: NodeType, channels: Vec<Channel>) -> Node {
    Node { id: format!("uuid-{id}"), logical_id: id.to_owned(), node_type, settings: Value::Null, channels, deleted_at: None }
}

/// `LBNL-Q — LBNL-BSM — UCB-Q`: both Q nodes have an `Out` quantum channel
/// into the BSM's paired `In` channel, which is what the entanglement-graph
/// derivation walks backward from the BSM to find its leaves.
fn s1_topology_nodes() -> Vec<Node> {
    vec![
        node(
            "LBNL-Q",
            NodeType::QNode,
            vec![channel("lbnl-q-out", "quantum", Direction::Out, Some(("LBNL-BSM", "bsm-in-1")))],
        ),
        node(
            "LBNL-BSM",
            NodeType::BsmNode,
            vec![
                channel("bsm-in-1", "quantum", Direction::In, None),
                channel("bsm-in-2", "quantum", Direction::In, None),
            ],
        ),
        node(
            "UCB-Q",
            NodeType::QNode,
            vec![channel("ucb-q-out", "quantum", Direction::Out, Some(("LBNL-BSM", "bsm-in-2")))],
        ),
    ]
}

/// Every agent reports full availability and accepts every submit/cancel;
/// `getResult` echoes an `Ok` status keyed by the requesting agent.
struct AlwaysReadyRpc;

#[async_trait::async_trait]
impl AgentRpc for AlwaysReadyRpc {
    async fn get_schedule(&self, _agent_id: &str, _start_time: f64, _num_slots: usize, _timeout: Duration) -> Result<SlotMask, ControllerError> {
        Ok(SlotMask::all_available())
    }

    async fn submit(&self, _agent_id: &str, _exp_id: &str, _timeslot_base: f64, _allocations: Value, _timeout: Duration) -> Result<Code, ControllerError> {
        Ok(Code::Ok)
    }

    async fn get_result(&self, agent_id: &str, _exp_id: &str, _timeout: Duration) -> Result<Value, ControllerError> {
        Ok(json!({"agentId": agent_id, "status": {"code": "OK"}}))
    }

    async fn cancel(&self, _agent_id: &str, _exp_id: &str, _timeout: Duration) -> Result<Code, ControllerError> {
        Ok(Code::Ok)
    }
}

/// No agent has any free slot: `get_schedule` always reports unavailable.
struct NoSlotRpc;

#[async_trait::async_trait]
impl AgentRpc for NoSlotRpc {
    async fn get_schedule(&self, _agent_id: &str, _start_time: f64, _num_slots: usize, _timeout: Duration) -> Result<SlotMask, ControllerError> {
        Ok(SlotMask::all_unavailable())
    }

    async fn submit(&self, _agent_id: &str, _exp_id: &str, _timeslot_base: f64, _allocations: Value, _timeout: Duration) -> Result<Code, ControllerError> {
        Ok(Code::Ok)
    }

    async fn get_result(&self, agent_id: &str, _exp_id: &str, _timeout: Duration) -> Result<Value, ControllerError> {
        Ok(json!({"agentId": agent_id, "status": {"code": "OK"}}))
    }

    async fn cancel(&self, _agent_id: &str, _exp_id: &str, _timeout: Duration) -> Result<Code, ControllerError> {
        Ok(Code::Ok)
    }
}

/// Every agent is ready and has a free slot; submit fails for one named
/// agent so the cancel-cascade path runs.
struct PartialSubmitFailureRpc {
    failing_agent: &'static str,
    cancelled: std::sync::Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl AgentRpc for PartialSubmitFailureRpc {
    async fn get_schedule(&self, _agent_id: &str, _start_time: f64, _num_slots: usize, _timeout: Duration) -> Result<SlotMask, ControllerError> {
        Ok(SlotMask::all_available())
    }

    async fn submit(&self, agent_id: &str, _exp_id: &str, _timeslot_base: f64, _allocations: Value, _timeout: Duration) -> Result<Code, ControllerError> {
        if agent_id == self.failing_agent {
            Ok(Code::InvalidArgument)
        } else {
            Ok(Code::Ok)
        }
    }

    async fn get_result(&self, agent_id: &str, _exp_id: &str, _timeout: Duration) -> Result<Value, ControllerError> {
        Ok(json!({"agentId": agent_id, "status": {"code": "OK"}}))
    }

    async fn cancel(&self, agent_id: &str, _exp_id: &str, _timeout: Duration) -> Result<Code, ControllerError> {
        if let Ok(mut cancelled) = self.cancelled.lock() {
            cancelled.push(agent_id.to_owned());
        }
        Ok(Code::Ok)
    }
}

async fn seed_in_spec_nodes(store: &Arc<dyn DocumentStore>, resources: &ResourceRegistry, nodes: &[Node]) -> anyhow::Result<()> {
    for node in nodes {
        resources.register(node).await.map_err(|e| anyhow::anyhow!("{e:?}"))?;
        store
            .upsert("monitor", &format!("{}-state", node.logical_id), json!({"rid": node.logical_id, "event_type": "agentState", "ts": 1, "value": "IN_SPEC"}))
            .await;
    }
    Ok(())
}

/// Wires a fresh store/resource registry/scheduler/translator behind a
/// dedicated `AgentExperimentPlugin` over the S1 topology, returning the
/// request registry alongside it so tests can poll request state directly.
async fn build_experiment_plugin(rpc: Arc<dyn AgentRpc>, schema: &str) -> anyhow::Result<(AgentExperimentPlugin, Arc<RequestRegistry>)> {
    let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
    let resources = Arc::new(ResourceRegistry::new(Arc::clone(&store)));
    seed_in_spec_nodes(&store, &resources, &s1_topology_nodes()).await?;

    let scheduler = Arc::new(Scheduler::new(rpc));
    let translator = Arc::new(
        Translator::new(ExperimentCatalog::default(), scheduler, Arc::clone(&resources))
            .with_ready_timing(Duration::from_millis(1), Duration::from_millis(50)),
    );
    let executor = Arc::new(TranslatorExecutor::new(translator, Arc::clone(&resources)));
    let registry = RequestRegistry::instance(schema, RequestKind::Experiment, Arc::clone(&store), Some(executor)).await;
    Ok((AgentExperimentPlugin::new(Arc::clone(&registry)), registry))
}

async fn submit_simple_experiment(plugin: &AgentExperimentPlugin) -> anyhow::Result<String> {
    let payload = json!({"exp_name": "Simple Experiment", "path": ["LBNL-Q", "LBNL-BSM", "UCB-Q"]});
    let response = plugin.handle("agentExperiment", payload).await.map_err(|e| anyhow::anyhow!("{e}"))?;
    response["id"].as_str().map(str::to_owned).ok_or_else(|| anyhow::anyhow!("response missing request id"))
}

async fn wait_for_terminal(registry: &RequestRegistry, id: &str) -> anyhow::Result<Request> {
    for _ in 0..200 {
        if let Some(request) = registry.get_request(id).await.map_err(|e| anyhow::anyhow!("{e:?}"))? {
            if request.status.is_terminal() {
                return Ok(request);
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    Err(anyhow::anyhow!("request {id} never reached a terminal state"))
}

#[tokio::test]
async fn s1_happy_path_experiment_completes_with_two_agent_results() -> anyhow::Result<()> {
    let (plugin, registry) = build_experiment_plugin(Arc::new(AlwaysReadyRpc), "s1-experiment").await?;
    let id = submit_simple_experiment(&plugin).await?;

    let request = wait_for_terminal(&registry, &id).await?;
    assert_eq!(request.status.code, Code::Ok);
    let result = request.result.as_object().ok_or_else(|| anyhow::anyhow!("result is not an object"))?;
    assert_eq!(result.len(), 2);
    assert!(result.contains_key("LBNL-Q"));
    assert!(result.contains_key("UCB-Q"));
    Ok(())
}

#[tokio::test]
async fn s2_no_common_slot_fails_the_request() -> anyhow::Result<()> {
    let (plugin, registry) = build_experiment_plugin(Arc::new(NoSlotRpc), "s2-experiment").await?;
    let id = submit_simple_experiment(&plugin).await?;

    let request = wait_for_terminal(&registry, &id).await?;
    assert_eq!(request.status.code, Code::Failed);
    assert!(!request.errors.is_empty());
    Ok(())
}

#[tokio::test]
async fn s4_partial_submit_failure_cancels_the_successful_agent() -> anyhow::Result<()> {
    let rpc = Arc::new(PartialSubmitFailureRpc { failing_agent: "UCB-Q", cancelled: std::sync::Mutex::new(Vec::new()) });
    let (plugin, registry) = build_experiment_plugin(rpc.clone(), "s4-experiment").await?;
    let id = submit_simple_experiment(&plugin).await?;

    let request = wait_for_terminal(&registry, &id).await?;
    assert_eq!(request.status.code, Code::Failed);
    let cancelled = rpc.cancelled.lock().map_err(|_| anyhow::anyhow!("lock poisoned"))?;
    assert_eq!(cancelled.as_slice(), ["LBNL-Q"]);
    Ok(())
}

#[test]
fn s5_entanglement_routing_returns_the_single_bsm_path() -> anyhow::Result<()> {
    let topology = Topology::build(&s1_topology_nodes());
    let routes = find_paths(&topology, "LBNL-Q", "UCB-Q", RoutingMode::Entanglement, RoutingAlgorithm::AllShortest).map_err(|e| anyhow::anyhow!("{e:?}"))?;
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0], vec!["LBNL-Q".to_owned(), "LBNL-BSM".to_owned(), "UCB-Q".to_owned()]);
    Ok(())
}

#[test]
fn routing_rejects_an_unregistered_endpoint() {
    let topology = Topology::build(&s1_topology_nodes());
    let result = find_paths(&topology, "LBNL-Q", "GHOST", RoutingMode::Physical, RoutingAlgorithm::Shortest);
    assert!(matches!(result, Err(ControllerError::InvalidArgument(_))));
}

#[tokio::test]
async fn s6_registry_instance_is_a_singleton_per_schema_and_kind() -> anyhow::Result<()> {
    let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
    let first = RequestRegistry::instance("s6-schema", RequestKind::Protocol, Arc::clone(&store), None).await;
    let second = RequestRegistry::instance("s6-schema", RequestKind::Protocol, Arc::clone(&store), None).await;
    assert!(Arc::ptr_eq(&first, &second));

    let request = first.new_request(json!({}), json!({}), Some("s6-request".to_owned()), None).await;
    let seen_through_second = second.get_request(&request.id).await.map_err(|e| anyhow::anyhow!("{e:?}"))?;
    assert!(seen_through_second.is_some());
    Ok(())
}

#[tokio::test]
async fn find_requests_filters_by_status_code() -> anyhow::Result<()> {
    let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
    let registry = RequestRegistry::instance("find-requests-schema", RequestKind::Protocol, Arc::clone(&store), None).await;
    registry.new_request(json!({}), json!({}), Some("created-1".to_owned()), None).await;

    let filter = Filter::new().eq("status.code", "Ok");
    let matches = registry.find_requests(&filter).await.map_err(|e| anyhow::anyhow!("{e:?}"))?;
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, "created-1");
    Ok(())
}
