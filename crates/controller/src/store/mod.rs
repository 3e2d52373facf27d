// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Document store abstraction (C1).
//!
//! Keyed document collections with filter/find/upsert/delete. The real
//! deployment path talks to an external document-store driver over the
//! network; that driver is an out-of-scope external collaborator. This
//! module defines the trait it implements plus an in-memory adapter used by
//! every other component and by tests.

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

/// Equality filter over top-level and dotted-path document fields
/// (e.g. `"status.code"`). Every clause must match for a document to be
/// selected; an empty filter matches every document in the collection.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluate the filter against a document using dotted-path lookup.
    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses.iter().all(|(path, expected)| lookup(doc, path) == Some(expected))
    }
}

fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

/// Options controlling a `find` query: a result cap and descending-sort key.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub limit: Option<usize>,
    pub sort_desc_by: Option<String>,
}

/// A keyed document collection store. Implementations must make every write
/// an idempotent upsert keyed by `id` and must be safe to share behind an
/// `Arc` across tasks.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or replace the document identified by `id` within `collection`.
    async fn upsert(&self, collection: &str, id: &str, doc: Value);

    /// Fetch a single document by id, or `None` if absent.
    async fn get(&self, collection: &str, id: &str) -> Option<Value>;

    /// Return every document in `collection` matching `filter`, honoring
    /// `options.limit` and `options.sort_desc_by` (applied after filtering).
    async fn find(&self, collection: &str, filter: &Filter, options: &FindOptions) -> Vec<Value>;

    /// Remove the document identified by `id`. Returns `true` if a document
    /// was actually removed.
    async fn delete(&self, collection: &str, id: &str) -> bool;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
