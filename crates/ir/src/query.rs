// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # ADQL query representation
//!
//! This module represents parsed ADQL SELECT queries.
//!
//! ## Design
//!
//! A [`Query`] is one SELECT level: its WITH clause, select list, FROM tree,
//! WHERE/GROUP BY/HAVING and ORDER BY. Sub-queries appear in three places
//! (inside the FROM tree as [`FromClause::SubQuery`], inside `IN`/`EXISTS`
//! predicates, and as CTE bodies), and each is a full `Query` of its own,
//! which is what the checker recurses over with its scope stack.
//!
//! The FROM tree is a tagged union over base tables, sub-queries and joins;
//! joins carry their specification (`NATURAL`, `USING (...)`, `ON ...`,
//! plain or cross).
//!
//! ## Bindings
//!
//! FROM nodes, qualified wildcards and CTEs carry an optional `Arc<DbTable>`
//! binding written by the checker: the published table (wrapped in an alias
//! table when aliased) or the derived table synthesized from a sub-query.
//! GROUP BY / ORDER BY ordinal references carry an optional column binding
//! pointing at the select item they refer to, when that item is a direct
//! column reference.

use crate::expr::{ColumnRef, Expr};
use crate::position::Position;
use adql_check_catalog::{DbColumn, DbTable, Identifier, TableName};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One ADQL SELECT level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    /// WITH clause, in declaration order
    pub ctes: Vec<CommonTableExpr>,

    /// SELECT clause
    pub select: SelectClause,

    /// FROM tree
    pub from: FromClause,

    /// WHERE condition
    pub where_clause: Option<Expr>,

    /// GROUP BY references
    pub group_by: Vec<ItemRef>,

    /// HAVING condition
    pub having: Option<Expr>,

    /// ORDER BY items
    pub order_by: Vec<OrderBy>,

    pub position: Option<Position>,
}

impl Query {
    pub fn new(select: SelectClause, from: FromClause) -> Self {
        Self {
            ctes: Vec::new(),
            select,
            from,
            where_clause: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            position: None,
        }
    }

    pub fn with_ctes(mut self, ctes: impl IntoIterator<Item = CommonTableExpr>) -> Self {
        self.ctes = ctes.into_iter().collect();
        self
    }

    pub fn with_where(mut self, condition: Expr) -> Self {
        self.where_clause = Some(condition);
        self
    }

    pub fn with_group_by(mut self, items: impl IntoIterator<Item = ItemRef>) -> Self {
        self.group_by = items.into_iter().collect();
        self
    }

    pub fn with_having(mut self, condition: Expr) -> Self {
        self.having = Some(condition);
        self
    }

    pub fn with_order_by(mut self, items: impl IntoIterator<Item = OrderBy>) -> Self {
        self.order_by = items.into_iter().collect();
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}

/// SELECT clause: modifiers plus the projected items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectClause {
    pub distinct: bool,

    /// `SELECT TOP n`
    pub top: Option<u64>,

    pub items: Vec<SelectItem>,
}

impl SelectClause {
    pub fn new(items: impl IntoIterator<Item = SelectItem>) -> Self {
        Self {
            distinct: false,
            top: None,
            items: items.into_iter().collect(),
        }
    }

    pub fn with_distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn with_top(mut self, top: u64) -> Self {
        self.top = Some(top);
        self
    }
}

/// Item in the SELECT projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SelectItem {
    /// Expression, optionally aliased (`expr AS alias`)
    Expr {
        expr: Expr,
        alias: Option<Identifier>,
        position: Option<Position>,
    },

    /// Unqualified wildcard (`*`)
    Wildcard { position: Option<Position> },

    /// Table-qualified wildcard (`table.*`)
    TableWildcard(TableWildcard),
}

impl SelectItem {
    pub fn expr(expr: Expr) -> Self {
        SelectItem::Expr {
            expr,
            alias: None,
            position: None,
        }
    }

    pub fn aliased(expr: Expr, alias: Identifier) -> Self {
        SelectItem::Expr {
            expr,
            alias: Some(alias),
            position: None,
        }
    }

    /// Name under which this item appears in the result set
    ///
    /// The alias wins; a direct column reference contributes its column
    /// name; function calls contribute the function name; anything else is
    /// named positionally (`col_N`, 1-based). Wildcards have no single name.
    pub fn result_name(&self, index: usize) -> Option<Identifier> {
        let SelectItem::Expr { expr, alias, .. } = self else {
            return None;
        };
        if let Some(alias) = alias {
            return Some(alias.clone());
        }
        let name = match expr {
            Expr::Column(c) => return Some(c.name.column.clone()),
            Expr::Udf(u) => return Some(u.name.clone()),
            Expr::Aggregate(a) => a.function.to_string(),
            Expr::Math(m) => m.function.to_string(),
            Expr::Geometry(g) => g.function.to_string(),
            _ => format!("col_{}", index + 1),
        };
        Identifier::exact(&name, false).ok()
    }
}

/// Table-qualified wildcard (`table.*`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableWildcard {
    pub qualifier: TableName,
    pub position: Option<Position>,

    /// Table reached through the FROM clause, written by the checker
    #[serde(skip)]
    pub binding: Option<Arc<DbTable>>,
}

/// FROM tree: base tables, sub-queries and joins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FromClause {
    Table(TableReference),
    SubQuery(SubQueryTable),
    Join(Box<JoinClause>),
}

impl FromClause {
    pub fn join(left: FromClause, right: FromClause, spec: JoinSpec) -> FromClause {
        FromClause::Join(Box::new(JoinClause {
            left,
            right,
            spec,
            position: None,
        }))
    }
}

/// Reference to a published table (or CTE) in the FROM clause
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReference {
    pub name: TableName,
    pub alias: Option<Identifier>,
    pub position: Option<Position>,

    /// Resolved table; an alias wrapper when the reference is aliased
    #[serde(skip)]
    pub binding: Option<Arc<DbTable>>,
}

impl TableReference {
    pub fn new(name: TableName) -> Self {
        Self {
            name,
            alias: None,
            position: None,
            binding: None,
        }
    }

    pub fn with_alias(mut self, alias: Identifier) -> Self {
        self.alias = Some(alias);
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}

/// Sub-query in the FROM clause; the alias names the derived table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubQueryTable {
    pub query: Box<Query>,
    pub alias: Option<Identifier>,
    pub position: Option<Position>,

    /// Derived table synthesized from the sub-query's result columns
    #[serde(skip)]
    pub binding: Option<Arc<DbTable>>,
}

/// A join of two FROM trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinClause {
    pub left: FromClause,
    pub right: FromClause,
    pub spec: JoinSpec,
    pub position: Option<Position>,
}

/// Join specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JoinSpec {
    /// Plain inner join, condition elsewhere or absent
    Inner,
    /// Explicit cross product
    Cross,
    /// NATURAL JOIN: merge all same-named columns
    Natural,
    /// JOIN ... USING (columns)
    Using(Vec<Identifier>),
    /// JOIN ... ON condition
    On(Box<Expr>),
}

/// GROUP BY / ORDER BY reference: ordinal index or (qualified) name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ItemRef {
    /// 1-based index into the select list
    Index {
        value: u32,
        position: Option<Position>,

        /// Column of the referenced select item, when it is a direct
        /// column reference
        #[serde(skip)]
        binding: Option<Arc<DbColumn>>,
    },

    /// Select-item alias or column name
    Name(ColumnRef),
}

impl ItemRef {
    pub fn index(value: u32) -> Self {
        ItemRef::Index {
            value,
            position: None,
            binding: None,
        }
    }
}

/// ORDER BY item with direction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBy {
    pub item: ItemRef,
    pub descending: bool,
}

impl OrderBy {
    pub fn new(item: ItemRef) -> Self {
        Self {
            item,
            descending: false,
        }
    }

    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }
}

/// Common Table Expression (`WITH name AS (query)`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonTableExpr {
    pub name: Identifier,
    pub query: Box<Query>,
    pub position: Option<Position>,

    /// Derived table synthesized from the CTE's result columns
    #[serde(skip)]
    pub binding: Option<Arc<DbTable>>,
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.ctes.is_empty() {
            f.write_str("WITH ")?;
            for (i, cte) in self.ctes.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{} AS ({})", cte.name, cte.query)?;
            }
            f.write_str(" ")?;
        }
        f.write_str("SELECT ")?;
        if self.select.distinct {
            f.write_str("DISTINCT ")?;
        }
        if let Some(top) = self.select.top {
            write!(f, "TOP {top} ")?;
        }
        for (i, item) in self.select.items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match item {
                SelectItem::Expr { expr, alias, .. } => {
                    write!(f, "{expr}")?;
                    if let Some(alias) = alias {
                        write!(f, " AS {alias}")?;
                    }
                }
                SelectItem::Wildcard { .. } => f.write_str("*")?,
                SelectItem::TableWildcard(w) => write!(f, "{}.*", w.qualifier)?,
            }
        }
        write!(f, " FROM {}", self.from)?;
        if let Some(condition) = &self.where_clause {
            write!(f, " WHERE {condition}")?;
        }
        if !self.group_by.is_empty() {
            f.write_str(" GROUP BY ")?;
            for (i, item) in self.group_by.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
        }
        if let Some(condition) = &self.having {
            write!(f, " HAVING {condition}")?;
        }
        if !self.order_by.is_empty() {
            f.write_str(" ORDER BY ")?;
            for (i, order) in self.order_by.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", order.item)?;
                if order.descending {
                    f.write_str(" DESC")?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for FromClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FromClause::Table(t) => {
                write!(f, "{}", t.name)?;
                if let Some(alias) = &t.alias {
                    write!(f, " AS {alias}")?;
                }
                Ok(())
            }
            FromClause::SubQuery(s) => {
                write!(f, "({})", s.query)?;
                if let Some(alias) = &s.alias {
                    write!(f, " AS {alias}")?;
                }
                Ok(())
            }
            FromClause::Join(join) => {
                write!(f, "{}", join.left)?;
                match &join.spec {
                    JoinSpec::Inner => write!(f, " JOIN {}", join.right),
                    JoinSpec::Cross => write!(f, " CROSS JOIN {}", join.right),
                    JoinSpec::Natural => write!(f, " NATURAL JOIN {}", join.right),
                    JoinSpec::Using(columns) => {
                        write!(f, " JOIN {} USING (", join.right)?;
                        for (i, column) in columns.iter().enumerate() {
                            if i > 0 {
                                f.write_str(", ")?;
                            }
                            write!(f, "{column}")?;
                        }
                        f.write_str(")")
                    }
                    JoinSpec::On(condition) => {
                        write!(f, " JOIN {} ON {condition}", join.right)
                    }
                }
            }
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRef::Index { value, .. } => write!(f, "{value}"),
            ItemRef::Name(column) => write!(f, "{}", column.name),
        }
    }
}
