// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Hive Core
//!
//! Presence heartbeats, leader election and singleton UI hosting for a group
//! of agents that share nothing but an eventually-consistent object store.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, application services, store adapters and the
//!   HTTP surface of the hosted UI server

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
