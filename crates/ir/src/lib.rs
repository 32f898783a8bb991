// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # ADQL Check - Query AST
//!
//! This crate provides the AST the checker consumes: parsed ADQL queries as
//! tagged unions, with source positions and writable back-pointer slots.
//!
//! The AST is designed to:
//! - Flatten the parser's class hierarchy into exhaustive pattern matching
//! - Carry `(line, column)` positions for diagnostics
//! - Accept schema back-pointers (`Arc<DbColumn>` / `Arc<DbTable>` /
//!   `Arc<FunctionDef>`) written during checking, which the downstream SQL
//!   translator reads DB names from
//!
//! Producing the AST (lexing and grammar) is the parser's job and out of
//! scope here; the fixture builders in the test-utils crate construct ASTs
//! directly for the checker tests.

pub mod expr;
pub mod position;
pub mod query;

// Re-export commonly used types
pub use expr::{
    AggregateCall, AggregateFunction, BinaryOp, ColumnName, ColumnRef, Expr, GeometryCall,
    GeometryFunction, InSet, Literal, LiteralExpr, MathCall, MathFunction, UdfCall,
};
pub use position::Position;
pub use query::{
    CommonTableExpr, FromClause, ItemRef, JoinClause, JoinSpec, OrderBy, Query, SelectClause,
    SelectItem, SubQueryTable, TableReference, TableWildcard,
};
