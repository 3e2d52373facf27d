// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory document store. Stands in for the external document-store
//! driver in tests and as the reference implementation the real adapter
//! must behave like.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{DocumentStore, Filter, FindOptions};

#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, HashMap<String, Value>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn upsert(&self, collection: &str, id: &str, doc: Value) {
        let mut collections = self.collections.write().await;
        collections.entry(collection.to_owned()).or_default().insert(id.to_owned(), doc);
    }

    async fn get(&self, collection: &str, id: &str) -> Option<Value> {
        let collections = self.collections.read().await;
        collections.get(collection)?.get(id).cloned()
    }

    async fn find(&self, collection: &str, filter: &Filter, options: &FindOptions) -> Vec<Value> {
        let collections = self.collections.read().await;
        let mut matches: Vec<Value> = match collections.get(collection) {
            Some(docs) => {
                docs.values().filter(|doc| filter.is_empty() || filter.matches(doc)).cloned().collect()
            }
            None => Vec::new(),
        };

        if let Some(ref sort_key) = options.sort_desc_by {
            matches.sort_by(|a, b| {
                let av = a.pointer(&format!("/{}", sort_key.replace('.', "/")));
                let bv = b.pointer(&format!("/{}", sort_key.replace('.', "/")));
                let a_num = av.and_then(Value::as_f64).unwrap_or(f64::MIN);
                let b_num = bv.and_then(Value::as_f64).unwrap_or(f64::MIN);
                b_num.partial_cmp(&a_num).unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        if let Some(limit) = options.limit {
            matches.truncate(limit);
        }

        matches
    }

    async fn delete(&self, collection: &str, id: &str) -> bool {
        let mut collections = self.collections.write().await;
        match collections.get_mut(collection) {
            Some(docs) => docs.remove(id).is_some(),
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
