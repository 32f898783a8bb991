// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # ADQL Check - Function Signature Registry
//!
//! This crate stores the user-defined functions a TAP service declares and
//! answers "which definition does this call bind to?" for the checker.
//!
//! ## Signature dispatch
//!
//! Definitions are parsed from textual signatures
//! (`name(p1 T1, p2 T2) -> R`), ordered by a *compare form* (the lowercased
//! name followed by one numeric/string/geometry bit triplet per parameter)
//! and looked up by binary search with a category-level comparison. Unknown
//! declared types and unresolved call arguments match anything, which is what
//! lets the checker defer calls whose argument types are not known yet and
//! retry them after the primary walk.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use adql_check_function_registry::{CallSignature, FunctionRegistry};
//!
//! let registry = FunctionRegistry::parse(&service.udf_signatures())?;
//! if let Some(def) = registry.lookup(&call) {
//!     // bind the call to `def`
//! }
//! ```

pub mod def;
pub mod error;
pub mod registry;

// Re-exports
pub use def::{CallSignature, FunctionDef, FunctionParam};
pub use error::{SignatureError, SignatureResult};
pub use registry::FunctionRegistry;
