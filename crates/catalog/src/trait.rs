// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SchemaCatalog trait
//!
//! This module defines the trait the checker resolves FROM tables against.
//! Implementations hold the published schema of a TAP service; the checker
//! only reads them, so a single catalog may be shared by concurrent checks.

use crate::identifier::Identifier;
use crate::table::{DbTable, TableName};
use std::sync::Arc;

/// Whether `table` is denoted by `name`
///
/// The table part must match; schema and catalog parts are checked only
/// when the reference carries them. Alias and derived tables have no
/// qualification, so a qualified reference never matches them.
pub fn table_matches(table: &DbTable, name: &TableName) -> bool {
    if !name.table.matches(table.adql_name()) {
        return false;
    }
    if let Some(schema) = &name.schema {
        match table.adql_schema() {
            Some(table_schema) if schema.matches(table_schema) => {}
            _ => return false,
        }
    }
    if let Some(catalog) = &name.catalog {
        match table.adql_catalog() {
            Some(table_catalog) if catalog.matches(table_catalog) => {}
            _ => return false,
        }
    }
    true
}

/// Read-only catalog of published tables
///
/// A `SchemaCatalog` is immutable during a check and may be shared by
/// multiple concurrent checks on different threads.
///
/// # Examples
///
/// ```rust,ignore
/// use adql_check_catalog::{SchemaCatalog, TableName};
///
/// fn count_matches(catalog: &dyn SchemaCatalog, name: &TableName) -> usize {
///     catalog.search(name).len()
/// }
/// ```
pub trait SchemaCatalog: Send + Sync {
    /// All published tables, in publication order
    fn tables(&self) -> Vec<Arc<DbTable>>;

    /// Tables matching the (possibly qualified) reference
    ///
    /// More than one match is possible when the same table name exists in
    /// several schemas and the reference is unqualified; the checker turns
    /// that into an ambiguity error.
    fn search(&self, name: &TableName) -> Vec<Arc<DbTable>> {
        self.tables()
            .into_iter()
            .filter(|table| table_matches(table, name))
            .collect()
    }

    /// Lookup of a table by its exact ADQL name, ignoring qualification
    fn table_by_name(&self, name: &Identifier) -> Option<Arc<DbTable>> {
        self.tables()
            .into_iter()
            .find(|table| table.adql_name().matches(name))
    }
}
