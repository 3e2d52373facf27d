// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request translator (C7): experiment definitions plus the orchestration
//! that turns a resolved path into per-agent scheduler allocations.

pub mod experiment_def;
pub mod translator;

pub use experiment_def::{AgentSequence, Experiment, ExperimentCatalog, Sequence};
pub use translator::{match_agents_to_experiment, Translator};
