// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for the schema metadata layer
//!
//! This module defines the error types used when building catalog objects.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur while constructing catalog objects
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum CatalogError {
    /// Identifier whose normalized text is empty
    #[error("Empty or whitespace-only identifier: {0:?}")]
    EmptyIdentifier(String),

    /// Qualified name whose table segment is empty
    #[error("Empty table segment in qualified name: {0:?}")]
    EmptyTableName(String),

    /// Two columns of the same table share an ADQL name
    #[error("Duplicate column '{column}' in table '{table}'")]
    DuplicateColumn { table: String, column: String },
}
