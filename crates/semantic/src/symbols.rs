// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Symbol tables for name resolution
//!
//! This module defines the ordered, searchable lists the checker resolves
//! identifiers against: [`SearchColumnList`] for the columns visible at one
//! query level and [`SearchTableList`] for tables (CTEs, FROM tables).
//!
//! Both return *every* match; ties are not an error here, the checker
//! decides between "unknown", "bind it" and "ambiguous" depending on how the
//! reference was qualified.

use adql_check_catalog::{CommonColumn, DbColumn, DbTable, Identifier, TableName, table_matches};
use adql_check_ir::ColumnName;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Alias-name matching: a delimited reference must spell the alias exactly,
/// anything else folds
fn alias_name_matches(alias: &Identifier, reference: &Identifier) -> bool {
    if reference.is_case_sensitive() {
        alias.text() == reference.text()
    } else {
        alias.text().eq_ignore_ascii_case(reference.text())
    }
}

/// One column visible in a scope: a plain table column or a join-merged one
#[derive(Debug, Clone)]
pub enum AvailableColumn {
    Single(Arc<DbColumn>),
    Common(CommonColumn),
}

impl AvailableColumn {
    pub fn adql_name(&self) -> &Identifier {
        self.db_column().adql_name()
    }

    /// The column to bind AST references to
    pub fn db_column(&self) -> &Arc<DbColumn> {
        match self {
            AvailableColumn::Single(column) => column,
            AvailableColumn::Common(common) => common.column(),
        }
    }

    pub fn is_common(&self) -> bool {
        matches!(self, AvailableColumn::Common(_))
    }

    /// Tables this column can be addressed through
    pub fn covered_tables(&self) -> Vec<Arc<DbTable>> {
        match self {
            AvailableColumn::Single(column) => column.table().into_iter().collect(),
            AvailableColumn::Common(common) => common.covered().to_vec(),
        }
    }
}

/// Table-alias dictionaries of one scope
///
/// Aliases are tracked twice: exactly (for delimited references) and
/// ASCII-folded (for regular references, where several distinct aliases may
/// collide and all are returned).
#[derive(Debug, Clone, Default)]
pub struct AliasDictionary {
    /// alias text, exactly as declared → canonical (wrapped) table name
    exact: HashMap<String, String>,
    /// folded alias → the original alias texts colliding on it
    folded: HashMap<String, HashSet<String>>,
}

impl AliasDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alias: &Identifier, canonical: &Identifier) {
        self.exact
            .insert(alias.text().to_string(), canonical.text().to_string());
        self.folded
            .entry(alias.folded())
            .or_default()
            .insert(alias.text().to_string());
    }

    /// Alias texts a table reference may denote
    ///
    /// A delimited reference resolves through the exact dictionary to at
    /// most one alias; a regular reference resolves through the folded
    /// dictionary to every alias colliding on its folded text.
    pub fn resolve(&self, reference: &Identifier) -> Vec<String> {
        if reference.is_case_sensitive() {
            if self.exact.contains_key(reference.text()) {
                vec![reference.text().to_string()]
            } else {
                Vec::new()
            }
        } else {
            match self.folded.get(&reference.folded()) {
                Some(aliases) => {
                    let mut aliases: Vec<String> = aliases.iter().cloned().collect();
                    aliases.sort();
                    aliases
                }
                None => Vec::new(),
            }
        }
    }

    /// Canonical table name behind an alias
    pub fn canonical(&self, alias: &str) -> Option<&str> {
        self.exact.get(alias).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

/// Ordered list of the columns visible at one query level
#[derive(Debug, Clone, Default)]
pub struct SearchColumnList {
    columns: Vec<AvailableColumn>,
    aliases: AliasDictionary,
}

impl SearchColumnList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, column: AvailableColumn) {
        self.columns.push(column);
    }

    pub fn extend(&mut self, columns: impl IntoIterator<Item = AvailableColumn>) {
        self.columns.extend(columns);
    }

    /// Record a table alias so qualified references resolve through it
    pub fn register_alias(&mut self, alias: &Identifier, canonical: &Identifier) {
        self.aliases.insert(alias, canonical);
    }

    pub fn columns(&self) -> &[AvailableColumn] {
        &self.columns
    }

    pub fn aliases(&self) -> &AliasDictionary {
        &self.aliases
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// All columns matching a (possibly qualified) reference
    ///
    /// Candidates are first narrowed by column name. A qualified reference
    /// then keeps only candidates addressable through a matching covered
    /// table, resolving the qualifier as an alias first and then as a plain
    /// table name with optional schema and catalog parts.
    ///
    /// An unqualified reference that caught common columns goes through
    /// *flattening*: each common column is replaced by the per-table columns
    /// it unified. If that leaves a single candidate it wins; otherwise the
    /// original candidate set is returned and the caller decides.
    pub fn search(&self, name: &ColumnName) -> Vec<AvailableColumn> {
        let candidates: Vec<&AvailableColumn> = self
            .columns
            .iter()
            .filter(|column| column.adql_name().matches(&name.column))
            .collect();

        match &name.qualifier {
            Some(qualifier) => {
                let alias_hits = if qualifier.schema.is_none() {
                    self.aliases.resolve(&qualifier.table)
                } else {
                    Vec::new()
                };
                candidates
                    .into_iter()
                    .filter(|column| {
                        column.covered_tables().iter().any(|table| {
                            if table.is_alias() {
                                qualifier.schema.is_none()
                                    && alias_hits.iter().any(|a| a == table.adql_name().text())
                            } else {
                                table_matches(table, qualifier)
                            }
                        })
                    })
                    .cloned()
                    .collect()
            }
            None => {
                if candidates.iter().any(|column| column.is_common()) {
                    let mut flattened: Vec<AvailableColumn> = Vec::new();
                    for candidate in &candidates {
                        match candidate {
                            AvailableColumn::Common(common) => {
                                for table in common.covered() {
                                    if let Some(column) =
                                        table.column_by_adql_name(common.column().adql_name())
                                    {
                                        push_unique(
                                            &mut flattened,
                                            AvailableColumn::Single(column.clone()),
                                        );
                                    }
                                }
                            }
                            AvailableColumn::Single(column) => {
                                push_unique(
                                    &mut flattened,
                                    AvailableColumn::Single(column.clone()),
                                );
                            }
                        }
                    }
                    if flattened.len() == 1 {
                        return flattened;
                    }
                }
                candidates.into_iter().cloned().collect()
            }
        }
    }
}

fn push_unique(columns: &mut Vec<AvailableColumn>, column: AvailableColumn) {
    let duplicate = columns
        .iter()
        .any(|existing| Arc::ptr_eq(existing.db_column(), column.db_column()));
    if !duplicate {
        columns.push(column);
    }
}

/// Ordered list of tables (CTEs of a scope, or the FROM tables of a level)
#[derive(Debug, Clone, Default)]
pub struct SearchTableList {
    tables: Vec<Arc<DbTable>>,
}

impl SearchTableList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, table: Arc<DbTable>) {
        self.tables.push(table);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<DbTable>> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// All tables matching a (possibly qualified) reference
    ///
    /// Alias tables match by alias-name rules and never carry qualification;
    /// plain tables match with their schema and catalog parts.
    pub fn search(&self, name: &TableName) -> Vec<Arc<DbTable>> {
        self.tables
            .iter()
            .filter(|table| {
                if table.is_alias() {
                    name.schema.is_none() && alias_name_matches(table.adql_name(), &name.table)
                } else {
                    table_matches(table, name)
                }
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adql_check_catalog::DbType;

    fn stars() -> Arc<DbTable> {
        DbTable::builder("public.stars")
            .column("oid", DbType::BigInt)
            .column("ra", DbType::Double)
            .build()
            .unwrap()
    }

    fn galaxies() -> Arc<DbTable> {
        DbTable::builder("public.galaxies")
            .column("oid", DbType::BigInt)
            .column("z", DbType::Real)
            .build()
            .unwrap()
    }

    fn columns_of(table: &Arc<DbTable>) -> Vec<AvailableColumn> {
        table
            .columns()
            .map(|column| AvailableColumn::Single(column.clone()))
            .collect()
    }

    fn list(tables: &[&Arc<DbTable>]) -> SearchColumnList {
        let mut list = SearchColumnList::new();
        for table in tables {
            if let Some(origin) = table.origin() {
                list.register_alias(table.adql_name(), origin.adql_name());
            }
            list.extend(columns_of(table));
        }
        list
    }

    fn column(name: &str) -> ColumnName {
        ColumnName::split(name).unwrap()
    }

    #[test]
    fn test_unqualified_search() {
        let stars = stars();
        let list = list(&[&stars]);
        assert_eq!(list.search(&column("ra")).len(), 1);
        assert_eq!(list.search(&column("RA")).len(), 1);
        assert!(list.search(&column("nope")).is_empty());
    }

    #[test]
    fn test_unqualified_ambiguity_is_returned_not_decided() {
        let stars = stars();
        let galaxies = galaxies();
        let list = list(&[&stars, &galaxies]);
        assert_eq!(list.search(&column("oid")).len(), 2);
    }

    #[test]
    fn test_qualified_search() {
        let stars = stars();
        let galaxies = galaxies();
        let list = list(&[&stars, &galaxies]);
        let matches = list.search(&column("stars.oid"));
        assert_eq!(matches.len(), 1);
        let table = matches[0].covered_tables().pop().unwrap();
        assert_eq!(table.adql_name().text(), "stars");
    }

    #[test]
    fn test_qualified_by_schema() {
        let stars = stars();
        let list = list(&[&stars]);
        assert_eq!(list.search(&column("public.stars.ra")).len(), 1);
        assert!(list.search(&column("archive.stars.ra")).is_empty());
    }

    #[test]
    fn test_alias_hides_table_name() {
        let stars = stars();
        let aliased = stars.alias(Identifier::new("s").unwrap());
        let list = list(&[&aliased]);

        assert_eq!(list.search(&column("s.ra")).len(), 1);
        // The original name is no longer addressable
        assert!(list.search(&column("stars.ra")).is_empty());
        // Aliases carry no schema
        assert!(list.search(&column("public.s.ra")).is_empty());
    }

    #[test]
    fn test_delimited_alias_reference_is_exact() {
        let stars = stars();
        let aliased = stars.alias(Identifier::new("\"Stars\"").unwrap());
        let list = list(&[&aliased]);

        assert_eq!(list.search(&column("\"Stars\".ra")).len(), 1);
        assert!(list.search(&column("\"stars\".ra")).is_empty());
        // An undelimited reference folds
        assert_eq!(list.search(&column("STARS.ra")).len(), 1);
    }

    #[test]
    fn test_common_column_is_single_candidate() {
        let stars = stars();
        let galaxies = galaxies();
        let oid = Identifier::new("oid").unwrap();
        let general = stars.column_by_adql_name(&oid).unwrap();
        let common = CommonColumn::new(general, vec![stars.clone(), galaxies.clone()]);

        let mut list = SearchColumnList::new();
        list.add(AvailableColumn::Common(common));
        list.extend(
            columns_of(&stars)
                .into_iter()
                .filter(|c| c.adql_name().text() != "oid"),
        );

        // Unqualified: the common column is one unambiguous candidate
        assert_eq!(list.search(&column("oid")).len(), 1);
        // Qualified by either covered table: still found
        assert_eq!(list.search(&column("stars.oid")).len(), 1);
        assert_eq!(list.search(&column("galaxies.oid")).len(), 1);
    }

    #[test]
    fn test_table_list_search() {
        let mut tables = SearchTableList::new();
        tables.add(stars());
        tables.add(galaxies());

        assert_eq!(tables.search(&TableName::split("stars").unwrap()).len(), 1);
        assert_eq!(
            tables
                .search(&TableName::split("public.galaxies").unwrap())
                .len(),
            1
        );
        assert!(tables.search(&TableName::split("nope").unwrap()).is_empty());
    }

    #[test]
    fn test_alias_dictionary_collisions() {
        let mut dict = AliasDictionary::new();
        dict.insert(
            &Identifier::new("\"Abc\"").unwrap(),
            &Identifier::new("stars").unwrap(),
        );
        dict.insert(
            &Identifier::new("\"ABC\"").unwrap(),
            &Identifier::new("galaxies").unwrap(),
        );

        // A folded reference sees both aliases
        let plain = Identifier::new("abc").unwrap();
        assert_eq!(dict.resolve(&plain).len(), 2);

        // A delimited reference sees exactly one
        let exact = Identifier::new("\"Abc\"").unwrap();
        assert_eq!(dict.resolve(&exact), vec!["Abc".to_string()]);
        assert_eq!(dict.canonical("Abc"), Some("stars"));
    }
}
