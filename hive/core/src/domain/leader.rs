// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Leader Selection
//!
//! The leader is the lexicographically smallest normalized agent id in the
//! active set. Every agent computes it independently from its own scan; there
//! is no shared counter, lock or vote. Two agents whose scans differ (store
//! read lag, a record crossing the TTL boundary between reads) can disagree
//! for a while; that window closes once the inputs converge.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Deterministic leader derivation over the active set

use std::collections::BTreeSet;

use crate::domain::agent::AgentSlug;
use crate::domain::presence::ActiveEntry;

/// Select the leader from an active set.
///
/// Pure and order-independent: duplicates collapse and input order is
/// irrelevant. Returns `None` for an empty set.
pub fn select_leader(active: &[ActiveEntry]) -> Option<AgentSlug> {
    select_leader_from_ids(active.iter().map(|entry| entry.agent_id.as_str()))
}

/// Same rule over raw ids.
pub fn select_leader_from_ids<'a, I>(ids: I) -> Option<AgentSlug>
where
    I: IntoIterator<Item = &'a str>,
{
    ids.into_iter()
        .filter(|id| !id.trim().is_empty())
        .map(AgentSlug::normalize)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .next()
}

/// Whether `local_agent_id` is the leader.
pub fn is_leader(leader: Option<&AgentSlug>, local_agent_id: &str) -> bool {
    leader.is_some_and(|leader| *leader == AgentSlug::normalize(local_agent_id))
}
