// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Hive CLI

pub mod config;
pub mod leader;
pub mod presence;
pub mod submit;
pub mod ui;

pub use self::config::ConfigCommand;
pub use self::presence::PresenceCommand;
pub use self::submit::SubmitCommand;
pub use self::ui::UiCommand;
