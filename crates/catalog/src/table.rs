// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Tables, columns and qualified names
//!
//! This module defines the schema objects the checker binds AST nodes to:
//! [`DbTable`], [`DbColumn`] and [`CommonColumn`], plus [`TableName`], the
//! up-to-three-part qualified name of a table.
//!
//! ## Ownership
//!
//! A table owns its columns; each column carries a non-owning [`Weak`]
//! back-reference to its parent table. Tables are always handed out as
//! `Arc<DbTable>` so a decorated AST keeps its resolved schema objects alive
//! after the check returns. Catalog tables are built once by the host;
//! aliased and derived tables are synthesized per query and owned by the
//! scope (and the AST bindings) that produced them.

use crate::error::{CatalogError, CatalogResult};
use crate::identifier::Identifier;
use crate::types::DbType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};

/// Qualified table name: `catalog.schema.table`, with optional parts
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName {
    pub catalog: Option<Identifier>,
    pub schema: Option<Identifier>,
    pub table: Identifier,
}

impl TableName {
    /// Unqualified table name
    pub fn new(table: Identifier) -> Self {
        Self {
            catalog: None,
            schema: None,
            table,
        }
    }

    pub fn with_schema(mut self, schema: Identifier) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_catalog(mut self, catalog: Identifier) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Split a dotted name into its parts
    ///
    /// The last segment is the table, the one before it the schema, and any
    /// remaining prefix is joined back together as the catalog.
    ///
    /// # Examples
    ///
    /// ```
    /// use adql_check_catalog::TableName;
    ///
    /// let name = TableName::split("tap.public.stars").unwrap();
    /// assert_eq!(name.table.text(), "stars");
    /// assert_eq!(name.schema.unwrap().text(), "public");
    /// assert_eq!(name.catalog.unwrap().text(), "tap");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::EmptyTableName`] when the table segment is
    /// empty, and propagates empty-identifier errors for blank parts.
    pub fn split(qualified: &str) -> CatalogResult<Self> {
        let segments: Vec<&str> = qualified.split('.').map(str::trim).collect();
        let (last, rest) = match segments.split_last() {
            Some(parts) => parts,
            None => return Err(CatalogError::EmptyTableName(qualified.to_string())),
        };
        if last.is_empty() {
            return Err(CatalogError::EmptyTableName(qualified.to_string()));
        }
        let table = Identifier::new(last)?;
        let (schema, catalog) = match rest.split_last() {
            None => (None, None),
            Some((schema, prefix)) => {
                let schema = Some(Identifier::new(schema)?);
                let catalog = if prefix.is_empty() {
                    None
                } else {
                    Some(Identifier::new(&prefix.join("."))?)
                };
                (schema, catalog)
            }
        };
        Ok(Self {
            catalog,
            schema,
            table,
        })
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(catalog) = &self.catalog {
            write!(f, "{catalog}.")?;
        }
        if let Some(schema) = &self.schema {
            write!(f, "{schema}.")?;
        }
        write!(f, "{}", self.table)
    }
}

/// A column of a published table
///
/// The `table` back-reference is non-owning; it dangles only for the
/// detached general column inside a [`CommonColumn`].
#[derive(Debug, Clone)]
pub struct DbColumn {
    adql_name: Identifier,
    db_name: Identifier,
    ty: DbType,
    table: Weak<DbTable>,
}

impl DbColumn {
    /// ADQL-side name of the column
    pub fn adql_name(&self) -> &Identifier {
        &self.adql_name
    }

    /// Database-side name of the column
    pub fn db_name(&self) -> &Identifier {
        &self.db_name
    }

    pub fn db_type(&self) -> &DbType {
        &self.ty
    }

    /// Parent table; `None` for the general column of a merged join column
    pub fn table(&self) -> Option<Arc<DbTable>> {
        self.table.upgrade()
    }

    /// Independent copy with new names and a new parent
    ///
    /// Used when wrapping a table in an alias or building a derived table:
    /// the copy shares nothing with the original but its type.
    pub fn copy(
        &self,
        adql_name: Identifier,
        db_name: Identifier,
        table: Weak<DbTable>,
    ) -> DbColumn {
        DbColumn {
            adql_name,
            db_name,
            ty: self.ty.clone(),
            table,
        }
    }

    /// Copy detached from any table, keeping both names
    pub(crate) fn detached(&self) -> DbColumn {
        DbColumn {
            adql_name: self.adql_name.clone(),
            db_name: self.db_name.clone(),
            ty: self.ty.clone(),
            table: Weak::new(),
        }
    }
}

/// A published table, an alias wrapper, or a derived (sub-query) table
///
/// Columns are stored in an insertion-ordered map keyed by the ASCII-folded
/// ADQL name, giving O(1) lookup by ADQL name while preserving declaration
/// order for wildcard expansion.
#[derive(Debug)]
pub struct DbTable {
    adql_name: Identifier,
    adql_schema: Option<Identifier>,
    adql_catalog: Option<Identifier>,
    db_name: Identifier,
    db_schema: Option<Identifier>,
    db_catalog: Option<Identifier>,
    columns: IndexMap<String, Arc<DbColumn>>,
    origin: Option<Arc<DbTable>>,
}

impl DbTable {
    /// Start building a table; `name` may be qualified (`cat.schema.table`)
    pub fn builder(name: &str) -> DbTableBuilder {
        DbTableBuilder {
            name: name.to_string(),
            db_name: None,
            columns: Vec::new(),
        }
    }

    /// Synthesize the table produced by an aliased sub-query
    ///
    /// The derived table's ADQL and DB names are both the sub-query alias.
    pub fn derived(name: Identifier, columns: Vec<(Identifier, DbType)>) -> Arc<DbTable> {
        Arc::new_cyclic(|weak: &Weak<DbTable>| {
            let mut map = IndexMap::with_capacity(columns.len());
            for (col_name, ty) in columns {
                let column = Arc::new(DbColumn {
                    db_name: col_name.clone(),
                    adql_name: col_name.clone(),
                    ty,
                    table: weak.clone(),
                });
                map.insert(col_name.folded(), column);
            }
            DbTable {
                adql_name: name.clone(),
                adql_schema: None,
                adql_catalog: None,
                db_name: name,
                db_schema: None,
                db_catalog: None,
                columns: map,
                origin: None,
            }
        })
    }

    /// Wrap this table under an alias
    ///
    /// The wrapper takes the alias as both its ADQL and DB name, drops any
    /// schema qualification, copies the column values re-parented onto
    /// itself, and retains the wrapped table as its origin.
    pub fn alias(self: &Arc<Self>, alias: Identifier) -> Arc<DbTable> {
        Arc::new_cyclic(|weak: &Weak<DbTable>| {
            let columns = self
                .columns
                .iter()
                .map(|(key, col)| {
                    let copy = col.copy(
                        col.adql_name.clone(),
                        col.db_name.clone(),
                        weak.clone(),
                    );
                    (key.clone(), Arc::new(copy))
                })
                .collect();
            DbTable {
                adql_name: alias.clone(),
                adql_schema: None,
                adql_catalog: None,
                db_name: alias,
                db_schema: None,
                db_catalog: None,
                columns,
                origin: Some(Arc::clone(self)),
            }
        })
    }

    pub fn adql_name(&self) -> &Identifier {
        &self.adql_name
    }

    pub fn adql_schema(&self) -> Option<&Identifier> {
        self.adql_schema.as_ref()
    }

    pub fn adql_catalog(&self) -> Option<&Identifier> {
        self.adql_catalog.as_ref()
    }

    pub fn db_name(&self) -> &Identifier {
        &self.db_name
    }

    pub fn db_schema(&self) -> Option<&Identifier> {
        self.db_schema.as_ref()
    }

    pub fn db_catalog(&self) -> Option<&Identifier> {
        self.db_catalog.as_ref()
    }

    /// The wrapped table when this is an alias
    pub fn origin(&self) -> Option<&Arc<DbTable>> {
        self.origin.as_ref()
    }

    pub fn is_alias(&self) -> bool {
        self.origin.is_some()
    }

    /// Columns in declaration order
    pub fn columns(&self) -> impl Iterator<Item = &Arc<DbColumn>> {
        self.columns.values()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// O(1) lookup by ADQL name
    pub fn column_by_adql_name(&self, name: &Identifier) -> Option<&Arc<DbColumn>> {
        self.columns
            .get(&name.folded())
            .filter(|col| col.adql_name.matches(name))
    }

    /// O(n) scan by DB name
    pub fn column_by_db_name(&self, name: &Identifier) -> Option<&Arc<DbColumn>> {
        self.columns
            .values()
            .find(|col| col.db_name.matches(name))
    }
}

impl fmt::Display for DbTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(catalog) = &self.adql_catalog {
            write!(f, "{catalog}.")?;
        }
        if let Some(schema) = &self.adql_schema {
            write!(f, "{schema}.")?;
        }
        write!(f, "{}", self.adql_name)
    }
}

/// Builder for catalog tables
///
/// Validation (name splitting, duplicate columns) is deferred to
/// [`DbTableBuilder::build`] so the chained calls stay infallible.
#[derive(Debug, Clone)]
pub struct DbTableBuilder {
    name: String,
    db_name: Option<String>,
    columns: Vec<(String, Option<String>, DbType)>,
}

impl DbTableBuilder {
    /// Database-side qualified name, when it differs from the ADQL name
    pub fn db_name(mut self, name: &str) -> Self {
        self.db_name = Some(name.to_string());
        self
    }

    /// Add a column whose DB name equals its ADQL name
    pub fn column(mut self, name: &str, ty: DbType) -> Self {
        self.columns.push((name.to_string(), None, ty));
        self
    }

    /// Add a column with a distinct DB-side name
    pub fn column_with_db_name(mut self, name: &str, db_name: &str, ty: DbType) -> Self {
        self.columns
            .push((name.to_string(), Some(db_name.to_string()), ty));
        self
    }

    /// Validate and build the table
    pub fn build(self) -> CatalogResult<Arc<DbTable>> {
        let adql = TableName::split(&self.name)?;
        let db = match &self.db_name {
            Some(name) => TableName::split(name)?,
            None => adql.clone(),
        };

        let mut specs: Vec<(Identifier, Identifier, DbType)> =
            Vec::with_capacity(self.columns.len());
        for (name, db_name, ty) in &self.columns {
            let adql_name = Identifier::new(name)?;
            let db_name = match db_name {
                Some(db) => Identifier::new(db)?,
                None => adql_name.clone(),
            };
            // Columns are stored under their folded name, so anything that
            // collides on the folded key is a duplicate, delimited or not.
            if specs.iter().any(|(existing, _, _)| existing.folded() == adql_name.folded()) {
                return Err(CatalogError::DuplicateColumn {
                    table: adql.to_string(),
                    column: adql_name.text().to_string(),
                });
            }
            specs.push((adql_name, db_name, ty.clone()));
        }

        Ok(Arc::new_cyclic(|weak: &Weak<DbTable>| {
            let mut columns = IndexMap::with_capacity(specs.len());
            for (adql_name, db_name, ty) in specs {
                let key = adql_name.folded();
                let column = Arc::new(DbColumn {
                    adql_name,
                    db_name,
                    ty,
                    table: weak.clone(),
                });
                columns.insert(key, column);
            }
            DbTable {
                adql_name: adql.table,
                adql_schema: adql.schema,
                adql_catalog: adql.catalog,
                db_name: db.table,
                db_schema: db.schema,
                db_catalog: db.catalog,
                columns,
                origin: None,
            }
        }))
    }
}

/// A column unified across the two sides of a NATURAL JOIN or USING clause
///
/// The general column is detached (its table back-reference is dangling);
/// the covered set lists every source table contributing to the merge.
/// Merging a common column with another column unions their cover sets, so
/// common columns stay flat and always cover at least two tables.
#[derive(Debug, Clone)]
pub struct CommonColumn {
    column: Arc<DbColumn>,
    covered: Vec<Arc<DbTable>>,
}

impl CommonColumn {
    /// Build a common column generalizing `general` over its covers
    pub fn new(general: &DbColumn, covered: Vec<Arc<DbTable>>) -> Self {
        debug_assert!(covered.len() >= 2, "a common column covers at least two tables");
        Self {
            column: Arc::new(general.detached()),
            covered,
        }
    }

    /// The merged, table-less column
    pub fn column(&self) -> &Arc<DbColumn> {
        &self.column
    }

    /// Tables whose columns were unified into this one
    pub fn covered(&self) -> &[Arc<DbTable>] {
        &self.covered
    }

    pub fn covers(&self, table: &Arc<DbTable>) -> bool {
        self.covered.iter().any(|t| Arc::ptr_eq(t, table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stars() -> Arc<DbTable> {
        DbTable::builder("tap.public.stars")
            .column("oid", DbType::BigInt)
            .column("ra", DbType::Double)
            .column("dec", DbType::Double)
            .column_with_db_name("mag", "phot_g_mean_mag", DbType::Real)
            .build()
            .unwrap()
    }

    #[test]
    fn test_split_three_parts() {
        let name = TableName::split("tap.public.stars").unwrap();
        assert_eq!(name.catalog.as_ref().unwrap().text(), "tap");
        assert_eq!(name.schema.as_ref().unwrap().text(), "public");
        assert_eq!(name.table.text(), "stars");
    }

    #[test]
    fn test_split_excess_joined_as_catalog() {
        let name = TableName::split("a.b.c.stars").unwrap();
        assert_eq!(name.catalog.as_ref().unwrap().text(), "a.b");
        assert_eq!(name.schema.as_ref().unwrap().text(), "c");
        assert_eq!(name.table.text(), "stars");
    }

    #[test]
    fn test_split_empty_table_rejected() {
        assert!(matches!(
            TableName::split("public."),
            Err(CatalogError::EmptyTableName(_))
        ));
    }

    #[test]
    fn test_column_lookup_by_adql_name() {
        let table = stars();
        let ra = Identifier::new("RA").unwrap();
        let col = table.column_by_adql_name(&ra).unwrap();
        assert_eq!(col.adql_name().text(), "ra");
        assert_eq!(col.db_type(), &DbType::Double);
    }

    #[test]
    fn test_column_lookup_by_db_name() {
        let table = stars();
        let db = Identifier::new("phot_g_mean_mag").unwrap();
        let col = table.column_by_db_name(&db).unwrap();
        assert_eq!(col.adql_name().text(), "mag");
    }

    #[test]
    fn test_column_back_reference() {
        let table = stars();
        let ra = Identifier::new("ra").unwrap();
        let col = table.column_by_adql_name(&ra).unwrap();
        let parent = col.table().unwrap();
        assert!(Arc::ptr_eq(&parent, &table));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let result = DbTable::builder("t")
            .column("a", DbType::Integer)
            .column("A", DbType::Double)
            .build();
        assert!(matches!(result, Err(CatalogError::DuplicateColumn { .. })));
    }

    #[test]
    fn test_delimited_columns_colliding_on_folded_name_rejected() {
        // Distinct as delimited identifiers, but they would land on the
        // same folded map key and one would be silently lost
        let result = DbTable::builder("t")
            .column("\"RA\"", DbType::Double)
            .column("\"Ra\"", DbType::Double)
            .build();
        assert!(matches!(result, Err(CatalogError::DuplicateColumn { .. })));
    }

    #[test]
    fn test_alias_reparents_columns() {
        let table = stars();
        let alias = table.alias(Identifier::new("s").unwrap());

        assert!(alias.is_alias());
        assert_eq!(alias.adql_name().text(), "s");
        // The alias becomes both the ADQL and the DB name of the wrapper
        assert_eq!(alias.db_name().text(), "s");
        assert!(alias.adql_schema().is_none());
        assert!(Arc::ptr_eq(alias.origin().unwrap(), &table));

        let ra = Identifier::new("ra").unwrap();
        let col = alias.column_by_adql_name(&ra).unwrap();
        assert!(Arc::ptr_eq(&col.table().unwrap(), &alias));
        // Column values are copies, not the origin's columns
        let origin_col = table.column_by_adql_name(&ra).unwrap();
        assert!(!Arc::ptr_eq(col, origin_col));
    }

    #[test]
    fn test_derived_table() {
        let m = Identifier::new("m").unwrap();
        let table = DbTable::derived(
            Identifier::new("s").unwrap(),
            vec![(m.clone(), DbType::Unknown(None))],
        );
        assert_eq!(table.column_count(), 1);
        let col = table.column_by_adql_name(&m).unwrap();
        assert!(Arc::ptr_eq(&col.table().unwrap(), &table));
    }

    #[test]
    fn test_delimited_column_lookup() {
        let table = DbTable::builder("t")
            .column("\"RA\"", DbType::Double)
            .build()
            .unwrap();
        // A case-insensitive reference folds onto the delimited name
        let plain = Identifier::new("ra").unwrap();
        assert!(table.column_by_adql_name(&plain).is_some());
        // A delimited reference with different case does not
        let quoted = Identifier::new("\"ra\"").unwrap();
        assert!(table.column_by_adql_name(&quoted).is_none());
    }

    #[test]
    fn test_common_column_cover() {
        let t1 = stars();
        let t2 = DbTable::builder("galaxies")
            .column("oid", DbType::BigInt)
            .build()
            .unwrap();
        let oid = Identifier::new("oid").unwrap();
        let general = t1.column_by_adql_name(&oid).unwrap();
        let common = CommonColumn::new(general, vec![t1.clone(), t2.clone()]);

        assert!(common.covers(&t1));
        assert!(common.covers(&t2));
        assert!(common.column().table().is_none());
    }
}
