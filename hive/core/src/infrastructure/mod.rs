// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod codec;
pub mod process;
pub mod state;
pub mod storage;

pub use codec::EnvelopeCodec;
pub use process::OsProcessControl;
pub use state::{FileLifecycleStateStore, InMemoryLifecycleStateStore};
