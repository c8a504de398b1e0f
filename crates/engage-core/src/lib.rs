// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engage Bridge — Core types and error definitions shared across all crates.

pub mod color;
pub mod error;
pub mod types;

pub use color::Color;
pub use error::EngageError;
pub use types::*;
