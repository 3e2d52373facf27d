// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! qnetd: distributed quantum-network control-plane daemon. Coordinates
//! agent registration, topology, and experiment/calibration scheduling
//! across a document store and message broker.

pub mod broker;
pub mod config;
pub mod context;
pub mod error;
pub mod plugins;
pub mod request;
pub mod resource;
pub mod scheduler;
pub mod store;
pub mod topology;
pub mod translator;

use context::Context;

pub use config::Config;

/// Runs the controller until a termination signal is observed.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let context = Context::bootstrap(&config).await?;
    context.run(&config).await
}
