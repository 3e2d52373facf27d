// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request registry (C5): lifecycle, active-request cache, and the FIFO
//! scheduling queue that drains one request at a time per (schema, kind).

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::error::{Code, ControllerError};
use crate::store::{DocumentStore, Filter, FindOptions};

use super::model::{unix_timestamp, RawOutcome, Request, RequestKind};

const COLLECTION: &str = "requests";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Executes a request that has reached the front of the queue. `Experiment`
/// and `Calibration` requests dispatch to the translator; `Protocol`
/// requests with a `custom_func` call it directly; anything else is a no-op.
/// `on_result` mirrors the source's `handle_result` callback: the executor
/// reports per-agent (or `"error"`-keyed) results as they arrive rather than
/// mutating the request directly.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, request: &Request, on_result: &(dyn for<'r> Fn(&'r str, serde_json::Value) + Send + Sync)) -> Result<RawOutcome, ControllerError>;
}

type RegistryKey = (String, RequestKind);

static INSTANCES: OnceLock<Mutex<HashMap<RegistryKey, Arc<RequestRegistry>>>> = OnceLock::new();

/// Lifecycle registry for one `(plugin_schema, kind)` pair. Replaces the
/// source's type-reflection-keyed singleton with an explicit lookup table.
pub struct RequestRegistry {
    kind: RequestKind,
    store: Arc<dyn DocumentStore>,
    executor: Option<Arc<dyn RequestExecutor>>,
    active: RwLock<HashMap<String, Request>>,
    queue: Mutex<VecDeque<String>>,
    drain_lock: Mutex<()>,
}

impl RequestRegistry {
    /// Returns the shared instance for `(schema, kind)`, constructing it on
    /// first use. `executor` is only consulted the first time; later calls
    /// ignore it and return the already-constructed instance.
    pub async fn instance(
        schema: &str,
        kind: RequestKind,
        store: Arc<dyn DocumentStore>,
        executor: Option<Arc<dyn RequestExecutor>>,
    ) -> Arc<Self> {
        let map = INSTANCES.get_or_init(|| Mutex::new(HashMap::new()));
        let mut map = map.lock().await;
        let key = (schema.to_owned(), kind);
        if let Some(existing) = map.get(&key) {
            return Arc::clone(existing);
        }
        let created = Arc::new(Self {
            kind,
            store,
            executor,
            active: RwLock::new(HashMap::new()),
            queue: Mutex::new(VecDeque::new()),
            drain_lock: Mutex::new(()),
        });
        map.insert(key, Arc::clone(&created));
        created
    }

    pub async fn new_request(
        &self,
        payload: serde_json::Value,
        parameters: serde_json::Value,
        rid: Option<String>,
        custom_func: Option<Arc<super::model::CustomFn>>,
    ) -> Request {
        let mut request = Request::new(self.kind, payload, parameters, rid, unix_timestamp());
        request.custom_func = custom_func;
        self.active.write().await.insert(request.id.clone(), request.clone());
        self.store.upsert(COLLECTION, &request.id, request.to_document()).await;
        request
    }

    /// Checks the active-request cache first, falling back to the document
    /// store and re-seeding the cache on hit (the `custom_func`, if any, is
    /// lost across that reconstruction since it is never persisted).
    pub async fn get_request(&self, rid: &str) -> Result<Option<Request>, ControllerError> {
        if let Some(request) = self.active.read().await.get(rid) {
            return Ok(Some(request.clone()));
        }
        let Some(doc) = self.store.get(COLLECTION, rid).await else { return Ok(None) };
        let request = Request::from_document(doc)?;
        self.active.write().await.insert(request.id.clone(), request.clone());
        Ok(Some(request))
    }

    pub async fn find_requests(&self, filter: &Filter) -> Result<Vec<Request>, ControllerError> {
        let docs = self.store.find(COLLECTION, filter, &FindOptions::default()).await;
        let active = self.active.read().await;
        let mut out = Vec::with_capacity(docs.len());
        for doc in docs {
            let id = doc.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_owned();
            if let Some(live) = active.get(&id) {
                out.push(live.clone());
            } else {
                out.push(Request::from_document(doc)?);
            }
        }
        Ok(out)
    }

    pub async fn delete_request(&self, rid: &str) -> bool {
        self.active.write().await.remove(rid);
        self.store.delete(COLLECTION, rid).await
    }

    async fn persist(&self, request: &Request) {
        self.active.write().await.insert(request.id.clone(), request.clone());
        self.store.upsert(COLLECTION, &request.id, request.to_document()).await;
    }

    /// Runs the request immediately, awaited if `blocking`, spawned
    /// otherwise. Either way the caller's copy of `request` is stale once
    /// this returns; use `get_request` to observe the final status.
    pub async fn exec_immediate(self: &Arc<Self>, mut request: Request, blocking: bool) -> Code {
        request.update_status(Code::Ok, None, unix_timestamp());
        self.persist(&request).await;

        if blocking {
            self.run_one(request).await
        } else {
            let registry = Arc::clone(self);
            tokio::spawn(async move { registry.run_one(request).await });
            Code::Queued
        }
    }

    /// Enqueues the request and spawns a drain task; `blocking` callers wait
    /// for this specific request to reach a terminal status, `non-blocking`
    /// callers get `Queued` back immediately.
    pub async fn schedule(self: &Arc<Self>, mut request: Request, blocking: bool) -> Code {
        request.update_status(Code::Queued, None, unix_timestamp());
        self.persist(&request).await;
        self.queue.lock().await.push_back(request.id.clone());

        let registry = Arc::clone(self);
        let drain_handle = tokio::spawn(async move { registry.process_queue().await });

        if blocking {
            let _ = drain_handle.await;
            self.wait_for_terminal(&request.id).await
        } else {
            let registry = Arc::clone(self);
            let id = request.id.clone();
            tokio::spawn(async move { registry.wait_for_terminal(&id).await });
            Code::Queued
        }
    }

    /// Drains the FIFO queue to empty, one request at a time. Serialized via
    /// `drain_lock` so concurrent `schedule` calls cooperate rather than race.
    pub async fn process_queue(&self) -> Code {
        let _guard = self.drain_lock.lock().await;
        loop {
            let next = self.queue.lock().await.pop_front();
            let Some(id) = next else { break };
            let Some(request) = self.active.read().await.get(&id).cloned() else { continue };
            self.run_one(request).await;
        }
        Code::Ok
    }

    async fn run_one(&self, mut request: Request) -> Code {
        request.update_status(Code::Running, None, unix_timestamp());
        self.persist(&request).await;

        let collected: std::sync::Mutex<Vec<(String, serde_json::Value)>> = std::sync::Mutex::new(Vec::new());
        let outcome = self.dispatch(&request, &collected).await;
        if let Ok(results) = collected.lock() {
            for (key, value) in results.iter() {
                request.add_result(key, value.clone());
            }
        }

        let now = unix_timestamp();
        match outcome {
            Ok(raw) => {
                let code = raw.normalize();
                if code == Code::Ok {
                    request.update_status(Code::Ok, None, now);
                } else {
                    request.update_status(Code::Failed, Some(&format!("execution failed with code {code}")), now);
                }
            }
            Err(err) => {
                request.update_status(Code::Failed, Some(&err.to_string()), now);
            }
        }
        let final_code = request.status.code;
        self.persist(&request).await;
        final_code
    }

    async fn dispatch(&self, request: &Request, collected: &std::sync::Mutex<Vec<(String, serde_json::Value)>>) -> Result<RawOutcome, ControllerError> {
        let on_result = |key: &str, value: serde_json::Value| {
            if let Ok(mut results) = collected.lock() {
                results.push((key.to_owned(), value));
            }
        };
        match request.kind {
            RequestKind::Experiment | RequestKind::Calibration | RequestKind::Simulation => {
                if let Some(executor) = &self.executor {
                    executor.execute(request, &on_result).await
                } else {
                    warn!(id = %request.id, kind = ?request.kind, "no executor configured, treating as no-op");
                    Ok(RawOutcome::Code(Code::Ok))
                }
            }
            RequestKind::Protocol => {
                if let Some(func) = &request.custom_func {
                    func(request.payload.clone()).await
                } else {
                    Ok(RawOutcome::Code(Code::Ok))
                }
            }
        }
    }

    async fn wait_for_terminal(&self, id: &str) -> Code {
        loop {
            if let Some(request) = self.active.read().await.get(id) {
                if request.status.is_terminal() {
                    return request.status.code;
                }
            } else {
                return Code::NotFound;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
