// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Source positions
//!
//! Positions point back at the query text the parser consumed. They are
//! carried through checking so diagnostics can reference the offending node.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Line/column position in the original ADQL text, both 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
