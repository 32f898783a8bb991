// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Error report for semantic checking
//!
//! The checker never aborts on the first failure: every per-node failure
//! becomes one [`CheckError`] appended to the running [`ErrorReport`], and
//! the walk continues. The invocation as a whole fails only at the end, by
//! surfacing the non-empty report.

use adql_check_ir::Position;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a semantic failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckErrorKind {
    /// FROM reference matching no published table or CTE
    UnknownTable,
    /// Table reference matching several tables
    AmbiguousTable,
    /// Column reference matching no visible column
    UnknownColumn,
    /// Unqualified column reference matching several columns
    AmbiguousColumn,
    /// Function call matching no registry entry, or disallowed geometry
    UnresolvedFunction,
    /// Coordinate system outside the allowed set
    CoordSysNotAllowed,
    /// Malformed STC-S coordinate system or region literal
    RegionSyntaxError,
    /// NATURAL JOIN / USING columns that cannot be unified
    JoinUnresolvable,
    /// Expression whose resolved type contradicts its context
    TypeMismatch,
    /// GROUP BY / ORDER BY ordinal outside the select list
    IndexOutOfBounds,
}

impl fmt::Display for CheckErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckErrorKind::UnknownTable => "unknown table",
            CheckErrorKind::AmbiguousTable => "ambiguous table",
            CheckErrorKind::UnknownColumn => "unknown column",
            CheckErrorKind::AmbiguousColumn => "ambiguous column",
            CheckErrorKind::UnresolvedFunction => "unresolved function",
            CheckErrorKind::CoordSysNotAllowed => "coordinate system not allowed",
            CheckErrorKind::RegionSyntaxError => "region syntax error",
            CheckErrorKind::JoinUnresolvable => "unresolvable join",
            CheckErrorKind::TypeMismatch => "type mismatch",
            CheckErrorKind::IndexOutOfBounds => "index out of bounds",
        };
        f.write_str(name)
    }
}

/// One diagnostic entry of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckError {
    pub kind: CheckErrorKind,
    pub message: String,
    /// Position of the offending AST node, when the parser recorded one
    pub position: Option<Position>,
}

impl CheckError {
    pub fn new(kind: CheckErrorKind, message: impl Into<String>, position: Option<Position>) -> Self {
        Self {
            kind,
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(position) => write!(f, "[{position}] {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Accumulated semantic diagnostics of one check invocation
///
/// Entries appear in AST-walk order within a phase and in phase order
/// across phases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    errors: Vec<CheckError>,
}

impl ErrorReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: CheckError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[CheckError] {
        &self.errors
    }

    pub fn iter(&self) -> impl Iterator<Item = &CheckError> {
        self.errors.iter()
    }

    /// `Ok` when empty, otherwise the report itself as the error
    pub fn into_result(self) -> Result<(), ErrorReport> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} error(s) found while checking the query:",
            self.errors.len()
        )?;
        for error in &self.errors {
            writeln!(f, "  - ({}) {error}", error.kind)?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorReport {}
