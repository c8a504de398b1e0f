// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the Engage bridge.
//
// None of these ever crosses the command channel: the dispatcher flattens
// every failure into a `false`/`0`/empty-map result before replying.  The
// distinct variants exist so logging and tests can tell failure kinds apart.

use thiserror::Error;

/// Top-level error type for all bridge operations.
#[derive(Debug, Error)]
pub enum EngageError {
    // -- Preconditions --
    #[error("bridge is not initialized")]
    NotInitialized,

    #[error("no presentation surface is available")]
    SurfaceUnavailable,

    #[error("messaging SDK is not instantiated")]
    SdkUnavailable,

    // -- Malformed input --
    #[error("unparsable color value: {0:?}")]
    InvalidColor(String),

    #[error("unparsable device token: {0}")]
    InvalidDeviceToken(String),

    // -- Collaborator failures --
    #[error("SDK call failed: {0}")]
    Sdk(String),

    #[error("surface presentation failed: {0}")]
    Presentation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EngageError>;
