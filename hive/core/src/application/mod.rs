// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod presence;
pub mod inbox;
pub mod lifecycle;
pub mod store_factory;

// Re-export services for convenience
pub use presence::{PresenceError, PresenceReceipt, PresenceService};
pub use inbox::{InboxError, InboxReceipt, InboxService};
pub use lifecycle::{LifecycleController, LifecycleError, LifecycleReport, LifecycleSettings, LifecycleStatus};
