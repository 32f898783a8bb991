// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for the STC-S mini-language

use serde::Serialize;
use thiserror::Error;

/// Result type alias for STC-S parsing
pub type StcsResult<T> = Result<T, StcsError>;

/// Errors raised while parsing or restricting STC-S expressions
///
/// Parse errors carry the character offset of the first offending token and
/// a human-readable expectation.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum StcsError {
    /// A character no token can start with
    #[error("Unexpected character {found:?} at character {offset}")]
    UnexpectedCharacter { found: char, offset: usize },

    /// A well-formed token in the wrong place
    #[error("{expected} expected at character {offset}, found {found:?}")]
    UnexpectedToken {
        expected: String,
        found: String,
        offset: usize,
    },

    /// Input ended while more was expected
    #[error("{expected} expected at character {offset}, but the end was reached")]
    UnexpectedEnd { expected: String, offset: usize },

    /// Cartesian flavors require both frame and reference position defaults
    #[error(
        "The flavor at character {offset} requires UNKNOWNFRAME and UNKNOWNREFPOS"
    )]
    IncompatibleFlavor { offset: usize },

    /// An allowed-coordinate-system pattern that cannot be compiled
    #[error("Invalid coordinate system pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl StcsError {
    /// Character offset of the offending token, when there is one
    pub fn offset(&self) -> Option<usize> {
        match self {
            StcsError::UnexpectedCharacter { offset, .. }
            | StcsError::UnexpectedToken { offset, .. }
            | StcsError::UnexpectedEnd { offset, .. }
            | StcsError::IncompatibleFlavor { offset } => Some(*offset),
            StcsError::InvalidPattern { .. } => None,
        }
    }
}
