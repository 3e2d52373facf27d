// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status codes and error taxonomy shared across the document store, broker,
//! registries, scheduler, and translator.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Wire-level status code. Mirrors the closed set agents and clients exchange
/// over the message broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Code {
    Ok,
    Queued,
    Running,
    Failed,
    InvalidArgument,
    Unknown,
    NotFound,
    Timeout,
}

impl Code {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Failed => "FAILED",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::Unknown => "UNKNOWN",
            Self::NotFound => "NOT_FOUND",
            Self::Timeout => "TIMEOUT",
        }
    }

    /// Parse a Code from its wire name, case-insensitively. Used by the
    /// return-code normalization rule in the request registry.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "OK" => Some(Self::Ok),
            "QUEUED" => Some(Self::Queued),
            "RUNNING" => Some(Self::Running),
            "FAILED" => Some(Self::Failed),
            "INVALID_ARGUMENT" => Some(Self::InvalidArgument),
            "UNKNOWN" => Some(Self::Unknown),
            "NOT_FOUND" => Some(Self::NotFound),
            "TIMEOUT" => Some(Self::Timeout),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ok | Self::Failed)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain error taxonomy. Every fallible controller operation returns this
/// type (or wraps it in `anyhow::Error` at the process boundary).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    InvalidArgument(String),
    NotFound(String),
    Timeout(String),
    ResourceExhausted(String),
    AgentNotReady(String),
    Duplicate(String),
    NoPath(String),
    Internal(String),
}

impl ControllerError {
    /// Map this error to the closed wire status-code set. `ResourceExhausted`,
    /// `AgentNotReady`, `Duplicate`, and `NoPath` have no dedicated wire code;
    /// they surface as `Failed` with the reason carried in the status message.
    pub fn code(&self) -> Code {
        match self {
            Self::InvalidArgument(_) => Code::InvalidArgument,
            Self::NotFound(_) => Code::NotFound,
            Self::Timeout(_) => Code::Timeout,
            Self::ResourceExhausted(_)
            | Self::AgentNotReady(_)
            | Self::Duplicate(_)
            | Self::NoPath(_)
            | Self::Internal(_) => Code::Failed,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidArgument(m)
            | Self::NotFound(m)
            | Self::Timeout(m)
            | Self::ResourceExhausted(m)
            | Self::AgentNotReady(m)
            | Self::Duplicate(m)
            | Self::NoPath(m)
            | Self::Internal(m) => m,
        }
    }
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for ControllerError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
