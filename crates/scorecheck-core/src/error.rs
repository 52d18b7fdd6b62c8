// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for ScoreCheck image preparation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::CropRect;

/// Top-level error type for all image preparation operations.
#[derive(Debug, Error)]
pub enum ScorecheckError {
    // -- Input errors --
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("crop rectangle {rect} exceeds image bounds {width}x{height}")]
    OutOfBounds {
        rect: CropRect,
        width: u32,
        height: u32,
    },

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    // -- Output errors --
    #[error("image encoding failed: {0}")]
    Encode(String),

    // -- File I/O --
    #[error("failed to load input image {}: {source}", path.display())]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write output {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -- Configuration --
    #[error("failed to read configuration {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse failure category reported in the result envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DecodeFailure,
    OutOfBounds,
    UnknownOperation,
    IoFailure,
    InvalidParameter,
    EncodeFailure,
}

impl ScorecheckError {
    /// Category of this error for callers that branch on failure type.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode(_) => ErrorKind::DecodeFailure,
            Self::OutOfBounds { .. } => ErrorKind::OutOfBounds,
            Self::UnknownOperation(_) => ErrorKind::UnknownOperation,
            Self::InputRead { .. } | Self::OutputWrite { .. } | Self::ConfigRead { .. } => {
                ErrorKind::IoFailure
            }
            Self::InvalidParameter(_) | Self::Config(_) | Self::Serialization(_) => {
                ErrorKind::InvalidParameter
            }
            Self::Encode(_) => ErrorKind::EncodeFailure,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScorecheckError>;
