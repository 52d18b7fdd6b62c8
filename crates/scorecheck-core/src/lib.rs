// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ScoreCheck: Core types, error definitions and configuration shared by the
// imaging pipeline and the command-line shim.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod types;

pub use config::PrepConfig;
pub use error::{ErrorKind, Result, ScorecheckError};
pub use types::*;
