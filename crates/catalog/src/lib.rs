// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # ADQL Check - Schema Metadata Layer
//!
//! This crate provides the schema metadata model the semantic checker binds
//! query ASTs against. It defines:
//!
//! - [`Identifier`]: case-sensitivity-aware, delimited-identifier-aware names
//! - [`DbType`]: the coarse TAP column type model and its category predicates
//! - [`DbTable`] / [`DbColumn`]: published tables with ADQL↔DB name pairs
//! - [`CommonColumn`]: columns unified by NATURAL JOIN / USING
//! - [`SchemaCatalog`]: the trait the checker resolves FROM tables against,
//!   with [`StaticCatalog`] as the in-memory implementation
//!
//! ## Ownership
//!
//! Tables own their columns; a column points back at its table through a
//! non-owning handle. Everything is handed out as `Arc`, so a checked AST
//! decorated with schema back-pointers stays valid for as long as the caller
//! keeps it; the catalog outlives any single check.
//!
//! ## Thread safety
//!
//! Catalog objects are immutable after construction. A single catalog may
//! serve any number of concurrent checks; per-query tables (aliases, derived
//! tables) are created fresh for each invocation.

pub mod error;
pub mod identifier;
pub mod r#static;
pub mod table;
pub mod r#trait;
pub mod types;

// Re-exports
pub use error::{CatalogError, CatalogResult};
pub use identifier::Identifier;
pub use r#static::StaticCatalog;
pub use r#trait::{SchemaCatalog, table_matches};
pub use table::{CommonColumn, DbColumn, DbTable, DbTableBuilder, TableName};
pub use types::{DbType, TypeCategories};
