// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for signature parsing

use serde::Serialize;
use thiserror::Error;

/// Result type alias for signature parsing
pub type SignatureResult<T> = Result<T, SignatureError>;

/// Errors raised while parsing function signatures
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum SignatureError {
    /// The signature does not match `name(p1 T1, p2 T2) -> R`
    #[error("Invalid function signature: {0:?}")]
    InvalidSignature(String),

    /// One parameter declaration is malformed
    #[error("Invalid parameter {parameter:?} in signature {signature:?}")]
    InvalidParameter {
        signature: String,
        parameter: String,
    },

    /// The function name is not a valid ADQL identifier
    #[error("Invalid function name: {0:?}")]
    InvalidName(String),
}
