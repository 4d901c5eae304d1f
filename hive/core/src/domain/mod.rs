// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Layer (`hive-core`)
//!
//! Pure types and rules of the coordination protocol: presence records and
//! liveness classification, leader selection, the UI lifecycle state
//! machine and inbox envelopes. The store, codec, clock and process
//! capabilities are declared here as traits and implemented in
//! `crate::infrastructure`.

pub mod agent;
pub mod clock;
pub mod codec;
pub mod hive_config;
pub mod inbox;
pub mod leader;
pub mod lifecycle;
pub mod presence;
pub mod process;
pub mod storage;
