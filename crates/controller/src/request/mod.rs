// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request lifecycle (C5): the Request/Status data model plus the registry
//! that creates, schedules, and executes requests.

pub mod model;
pub mod registry;

pub use model::{CustomFn, CustomFnFuture, ErrorEntry, RawOutcome, Request, RequestKind, Status};
pub use registry::{RequestExecutor, RequestRegistry};
