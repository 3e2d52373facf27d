// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request data model (C5).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Code, ControllerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Experiment,
    Calibration,
    Simulation,
    Protocol,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub code: Code,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Status {
    fn created() -> Self {
        Self {
            code: Code::Ok,
            name: Code::Ok.as_str().to_owned(),
            reason: None,
            message: Some("Request created, not yet started".to_owned()),
        }
    }

    fn from_code(code: Code, error: Option<&str>) -> Self {
        Self {
            code,
            name: code.as_str().to_owned(),
            reason: error.map(str::to_owned),
            message: error.map(str::to_owned),
        }
    }

    /// Terminal states are the only ones an executed request can settle
    /// into; everything else may still transition.
    pub fn is_terminal(&self) -> bool {
        self.code.is_terminal()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub timestamp: f64,
    pub message: String,
}

/// The heterogeneous value a request executor may hand back; normalized to
/// a `Code` verbatim per the rule in §4.3: bool (true→Ok), int (0→Ok),
/// string (case-insensitive Code name; unknown→Failed), or null (→Ok).
#[derive(Debug, Clone)]
pub enum RawOutcome {
    Code(Code),
    Bool(bool),
    Int(i64),
    Str(String),
    Null,
}

impl RawOutcome {
    pub fn normalize(&self) -> Code {
        match self {
            Self::Code(code) => *code,
            Self::Bool(true) => Code::Ok,
            Self::Bool(false) => Code::Failed,
            Self::Int(0) => Code::Ok,
            Self::Int(_) => Code::Failed,
            Self::Str(s) => Code::from_name(s).unwrap_or(Code::Failed),
            Self::Null => Code::Ok,
        }
    }
}

pub type CustomFnFuture = Pin<Box<dyn Future<Output = Result<RawOutcome, ControllerError>> + Send>>;
pub type CustomFn = dyn Fn(Value) -> CustomFnFuture + Send + Sync;

#[derive(Clone)]
pub struct Request {
    pub id: String,
    pub kind: RequestKind,
    pub parameters: Value,
    pub payload: Value,
    pub status: Status,
    pub result: Value,
    pub errors: Vec<ErrorEntry>,
    pub created_at: f64,
    pub updated_at: f64,
    /// Set only for `Protocol` requests; never persisted (mirrors the
    /// source's private, non-serialized callable attribute).
    pub custom_func: Option<Arc<CustomFn>>,
}

impl Request {
    pub fn new(kind: RequestKind, payload: Value, parameters: Value, id: Option<String>, now: f64) -> Self {
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        Self {
            id,
            kind,
            parameters,
            payload,
            status: Status::created(),
            result: Value::Object(serde_json::Map::new()),
            errors: Vec::new(),
            created_at: now,
            updated_at: now,
            custom_func: None,
        }
    }

    /// Advance status; `Failed`/error transitions append to `errors` rather
    /// than overwrite, per the append-only invariant.
    pub fn update_status(&mut self, code: Code, error: Option<&str>, now: f64) {
        self.updated_at = now;
        self.status = Status::from_code(code, error);
        if let Some(message) = error {
            self.errors.push(ErrorEntry { timestamp: now, message: message.to_owned() });
        }
    }

    pub fn add_result(&mut self, key: &str, value: Value) {
        if let Value::Object(map) = &mut self.result {
            map.insert(key.to_owned(), value);
        }
    }

    pub fn to_document(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "type": self.kind,
            "parameters": self.parameters,
            "payload": self.payload,
            "status": self.status,
            "result": self.result,
            "errors": self.errors,
            "created_at": self.created_at,
            "updated_at": self.updated_at,
        })
    }

    pub fn from_document(doc: Value) -> Result<Self, ControllerError> {
        #[derive(Deserialize)]
        struct Doc {
            id: String,
            #[serde(rename = "type")]
            kind: RequestKind,
            #[serde(default)]
            parameters: Value,
            #[serde(default)]
            payload: Value,
            status: Status,
            #[serde(default)]
            result: Value,
            #[serde(default)]
            errors: Vec<ErrorEntry>,
            created_at: f64,
            updated_at: f64,
        }

        let parsed: Doc = serde_json::from_value(doc)
            .map_err(|e| ControllerError::Internal(format!("corrupt request document: {e}")))?;

        Ok(Self {
            id: parsed.id,
            kind: parsed.kind,
            parameters: parsed.parameters,
            payload: parsed.payload,
            status: parsed.status,
            result: parsed.result,
            errors: parsed.errors,
            created_at: parsed.created_at,
            updated_at: parsed.updated_at,
            custom_func: None,
        })
    }
}

pub fn unix_timestamp() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0)
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
