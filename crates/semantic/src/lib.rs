// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # ADQL Check - Semantic Analysis Layer
//!
//! This crate turns a syntactically valid ADQL query into a *semantically*
//! checked one: table and column references are resolved against a published
//! [`SchemaCatalog`](adql_check_catalog::SchemaCatalog) and bound to their
//! database counterparts, user-defined functions are dispatched against a
//! declared registry, embedded STC-S literals are parsed and validated, and
//! coarse type-category checks run over the whole tree.
//!
//! ## Overview
//!
//! - [`Checker`]: the orchestrator; build it once per service configuration
//!   and share it between checks
//! - [`ErrorReport`] / [`CheckError`]: accumulated diagnostics; a check
//!   walks the whole query and reports every problem at once
//! - [`SearchColumnList`] / [`SearchTableList`]: the symbol tables one query
//!   level resolves names against
//! - [`CheckContext`] / [`ScopeStack`]: per-level scopes and the explicit
//!   stack correlated references walk
//!
//! ## Usage
//!
//! ```rust,ignore
//! use adql_check_semantic::Checker;
//! use std::sync::Arc;
//!
//! let checker = Checker::new(Arc::new(catalog))
//!     .with_allowed_geometries(["POINT", "CIRCLE", "CONTAINS", "INTERSECTS"])
//!     .with_allowed_coord_sys(&["(ICRS|FK5) * *"])?;
//!
//! match checker.check(&mut query) {
//!     Ok(()) => { /* query.select...binding now point at schema objects */ }
//!     Err(report) => {
//!         for error in report.iter() {
//!             eprintln!("{error}");
//!         }
//!     }
//! }
//! ```
//!
//! ## Concurrency
//!
//! A check is strictly synchronous and runs to completion on the calling
//! thread. The checker itself is read-only and `Send + Sync`; the only state
//! a check mutates is the caller's AST, so a single AST must not be shared
//! between concurrent checks.

pub mod checker;
pub mod error;
pub mod scope;
pub mod symbols;

// Re-export commonly used types
pub use checker::Checker;
pub use error::{CheckError, CheckErrorKind, ErrorReport};
pub use scope::{CheckContext, ScopeStack};
pub use symbols::{AliasDictionary, AvailableColumn, SearchColumnList, SearchTableList};
