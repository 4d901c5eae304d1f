// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Object Store Infrastructure Module
//!
//! Concrete implementations of the [`ObjectStore`](crate::domain::storage::ObjectStore)
//! trait. Selection by configuration lives in
//! [`store_factory`](crate::application::store_factory).

pub mod github;
pub mod local;
pub mod memory;

pub use github::GitHubContentsStore;
pub use local::LocalObjectStore;
pub use memory::InMemoryObjectStore;
