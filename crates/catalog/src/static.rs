// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Static catalog
//!
//! This module provides an in-memory [`SchemaCatalog`] built from predefined
//! tables. Hosts that load TAP_SCHEMA metadata themselves assemble one of
//! these; it is also what the test fixtures use.

use crate::r#trait::SchemaCatalog;
use crate::table::DbTable;
use std::sync::Arc;
use tracing::debug;

/// In-memory catalog over a fixed list of tables
///
/// # Examples
///
/// ```
/// use adql_check_catalog::{DbTable, DbType, StaticCatalog, SchemaCatalog, TableName};
///
/// let stars = DbTable::builder("public.stars")
///     .column("ra", DbType::Double)
///     .column("dec", DbType::Double)
///     .build()
///     .unwrap();
/// let catalog = StaticCatalog::new().with_table(stars);
///
/// let name = TableName::split("stars").unwrap();
/// assert_eq!(catalog.search(&name).len(), 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct StaticCatalog {
    tables: Vec<Arc<DbTable>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self { tables: Vec::new() }
    }

    /// Publish a table
    pub fn with_table(mut self, table: Arc<DbTable>) -> Self {
        debug!(table = %table, "publishing table");
        self.tables.push(table);
        self
    }

    /// Publish several tables at once
    pub fn with_tables(mut self, tables: impl IntoIterator<Item = Arc<DbTable>>) -> Self {
        for table in tables {
            self = self.with_table(table);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl SchemaCatalog for StaticCatalog {
    fn tables(&self) -> Vec<Arc<DbTable>> {
        self.tables.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Identifier;
    use crate::table::TableName;
    use crate::types::DbType;

    fn catalog() -> StaticCatalog {
        let stars = DbTable::builder("tap.public.stars")
            .column("oid", DbType::BigInt)
            .column("ra", DbType::Double)
            .build()
            .unwrap();
        let archive_stars = DbTable::builder("tap.archive.stars")
            .column("oid", DbType::BigInt)
            .build()
            .unwrap();
        StaticCatalog::new().with_tables([stars, archive_stars])
    }

    #[test]
    fn test_search_unqualified_finds_both() {
        let catalog = catalog();
        let name = TableName::split("stars").unwrap();
        assert_eq!(catalog.search(&name).len(), 2);
    }

    #[test]
    fn test_search_qualified_narrows() {
        let catalog = catalog();
        let name = TableName::split("archive.stars").unwrap();
        let found = catalog.search(&name);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].adql_schema().unwrap().text(), "archive");
    }

    #[test]
    fn test_search_unknown_schema() {
        let catalog = catalog();
        let name = TableName::split("nowhere.stars").unwrap();
        assert!(catalog.search(&name).is_empty());
    }

    #[test]
    fn test_table_by_name() {
        let catalog = catalog();
        let name = Identifier::new("STARS").unwrap();
        assert!(catalog.table_by_name(&name).is_some());
    }
}
