// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! Library half of the rez-agent CLI: kept separate from `main.rs` so the
//! command implementations can be exercised directly in tests.

pub mod commands;
pub mod config;
pub mod format;
