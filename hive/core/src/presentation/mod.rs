// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`hive-core`)
//!
//! HTTP surface of the hosted UI server. **No business logic lives here**:
//! handlers delegate to the presence and inbox services in
//! `crate::application`.
//!
//! | Module | Transport | Description |
//! |--------|-----------|-------------|
//! | [`api`] | HTTP (Axum) | Health, presence, leader and inbox submission endpoints |

pub mod api;
