// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # The semantic checker
//!
//! [`Checker::check`] drives five phases per query level, all feeding one
//! [`ErrorReport`]:
//!
//! - **A. DB items**: resolve FROM tables (CTEs first, then the catalog),
//!   build the level's column list with JOIN merging, resolve every column
//!   reference and wildcard, and bind GROUP BY / ORDER BY back-references.
//! - **B. UDFs**: look calls up in the declared registry; calls whose
//!   argument types are still unresolved are deferred and retried once after
//!   the primary walk.
//! - **C. Geometries**: whitelist geometry functions, and parse + validate
//!   STC-S coordinate systems and regions appearing as string literals.
//! - **D. Types**: coarse category checks (numeric/string/geometry) on
//!   operands whose context fixes an expected category.
//! - **E. Sub-queries**: recurse into sub-queries outside FROM with the
//!   current scope pushed onto the stack.
//!
//! The walk never aborts on a domain error: each failure is appended and
//! checking continues with the next node, so one pass surfaces as many
//! problems as possible.

use crate::error::{CheckError, CheckErrorKind, ErrorReport};
use crate::scope::{CheckContext, ScopeStack};
use crate::symbols::{AvailableColumn, SearchColumnList, SearchTableList};
use adql_check_catalog::{
    CommonColumn, DbTable, DbType, Identifier, SchemaCatalog, TypeCategories,
};
use adql_check_function_registry::{CallSignature, FunctionRegistry};
use adql_check_ir::{
    AggregateFunction, BinaryOp, ColumnRef, Expr, FromClause, GeometryCall, GeometryFunction,
    InSet, ItemRef, JoinSpec, Literal, Position, Query, SelectClause, SelectItem, TableReference,
    TableWildcard, UdfCall,
};
use adql_check_stcs::{CoordSys, CoordSysRestriction, Region, RegionKind, StcsResult};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace};

/// Expected type category of an operand, fixed by its context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expected {
    Numeric,
    String,
    Geometry,
}

impl Expected {
    fn describe(&self) -> &'static str {
        match self {
            Expected::Numeric => "a numeric value",
            Expected::String => "a string value",
            Expected::Geometry => "a geometric value",
        }
    }

    fn accepts(&self, categories: &TypeCategories) -> bool {
        match self {
            Expected::Numeric => categories.numeric,
            Expected::String => categories.string,
            Expected::Geometry => categories.geometry,
        }
    }
}

/// Per-invocation mutable state
struct CheckState {
    report: ErrorReport,
    stack: ScopeStack,
}

/// The semantic checker
///
/// A checker is built once per service configuration and shared by any
/// number of concurrent checks: it only holds the catalog and the three
/// optional whitelists, all read-only.
///
/// # Examples
///
/// ```rust,ignore
/// use adql_check_semantic::Checker;
/// use std::sync::Arc;
///
/// let checker = Checker::new(catalog)
///     .with_allowed_udfs(registry)
///     .with_allowed_geometries(["POINT", "CIRCLE", "CONTAINS"])
///     .with_allowed_coord_sys(&["(ICRS|FK5) * *"])?;
///
/// checker.check(&mut query)?;
/// // every resolved reference now carries its schema back-pointer
/// ```
pub struct Checker {
    catalog: Arc<dyn SchemaCatalog>,

    /// Declared UDFs; `None` accepts any unknown function, an empty
    /// registry rejects them all
    allowed_udfs: Option<FunctionRegistry>,

    /// Allowed geometry function names, uppercased; `None` accepts any
    allowed_geometries: Option<HashSet<String>>,

    /// Allowed coordinate systems; `None` accepts any
    allowed_coord_sys: Option<CoordSysRestriction>,
}

impl Checker {
    pub fn new(catalog: Arc<dyn SchemaCatalog>) -> Self {
        Self {
            catalog,
            allowed_udfs: None,
            allowed_geometries: None,
            allowed_coord_sys: None,
        }
    }

    /// Restrict user-defined functions to the given registry
    pub fn with_allowed_udfs(mut self, registry: FunctionRegistry) -> Self {
        self.allowed_udfs = Some(registry);
        self
    }

    /// Restrict geometry functions to the given names (case-insensitive)
    pub fn with_allowed_geometries<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_geometries = Some(
            names
                .into_iter()
                .map(|name| name.as_ref().to_ascii_uppercase())
                .collect(),
        );
        self
    }

    /// Restrict coordinate systems to the given patterns
    ///
    /// An empty pattern list admits only the default coordinate system.
    pub fn with_allowed_coord_sys<S: AsRef<str>>(mut self, patterns: &[S]) -> StcsResult<Self> {
        self.allowed_coord_sys = Some(CoordSysRestriction::compile(patterns)?);
        Ok(self)
    }

    /// Check a query against the catalog and configured whitelists
    ///
    /// On success every resolved table and column reference in the AST
    /// carries a schema back-pointer, and matched UDF calls carry their
    /// definition. On failure the aggregate report lists every problem
    /// found, in walk order.
    pub fn check(&self, query: &mut Query) -> Result<(), ErrorReport> {
        let mut state = CheckState {
            report: ErrorReport::new(),
            stack: ScopeStack::new(),
        };

        self.check_query(query, &mut state, &SearchTableList::new());

        if self
            .allowed_udfs
            .as_ref()
            .is_some_and(|registry| !registry.is_empty())
        {
            self.retry_deferred_udfs(query, &mut state);
        }

        debug!(errors = state.report.len(), "check finished");
        state.report.into_result()
    }

    /// Check one query level and return its resulting columns
    ///
    /// `outer_ctes` are the CTE tables visible from enclosing levels; the
    /// level's own WITH clause extends them for everything below.
    fn check_query(
        &self,
        query: &mut Query,
        state: &mut CheckState,
        outer_ctes: &SearchTableList,
    ) -> Vec<(Identifier, DbType)> {
        debug!(depth = state.stack.depth(), "checking query level");

        let mut ctx = CheckContext::new();
        ctx.cte_tables = outer_ctes.clone();

        // CTEs are checked first; each becomes a derived table visible to
        // the ones after it and to the whole level below.
        for cte in &mut query.ctes {
            let columns = {
                let visible = ctx.cte_tables.clone();
                self.check_query(&mut cte.query, state, &visible)
            };
            let table = DbTable::derived(cte.name.clone(), columns);
            cte.binding = Some(table.clone());
            ctx.cte_tables.add(table);
        }

        // Phase A1: resolve FROM tables (sub-queries in FROM recurse before
        // this level's scope exists, so they cannot see its columns).
        self.resolve_from(&mut query.from, &mut ctx, state);

        // Phase A2: build the visible columns, merging joined ones.
        let columns = self.from_columns(&query.from, state);
        let mut list = SearchColumnList::new();
        for table in ctx.from_tables.iter() {
            if let Some(origin) = table.origin() {
                list.register_alias(table.adql_name(), origin.adql_name());
            }
        }
        list.extend(columns);
        ctx.available_columns = list;
        trace!(columns = ctx.available_columns.len(), "scope built");

        // Phase A3: resolve column references and wildcards.
        for item in &mut query.select.items {
            match item {
                SelectItem::Expr { expr, .. } => self.resolve_expr_columns(expr, &ctx, state),
                SelectItem::TableWildcard(wildcard) => {
                    self.resolve_table_wildcard(wildcard, &ctx, state)
                }
                SelectItem::Wildcard { .. } => {}
            }
        }
        Self::for_each_on_expr_mut(&mut query.from, &mut |expr| {
            self.resolve_expr_columns(expr, &ctx, state)
        });
        if let Some(condition) = &mut query.where_clause {
            self.resolve_expr_columns(condition, &ctx, state);
        }
        if let Some(condition) = &mut query.having {
            self.resolve_expr_columns(condition, &ctx, state);
        }

        // Phase A4: GROUP BY / ORDER BY back-references.
        {
            let Query {
                select,
                group_by,
                order_by,
                ..
            } = query;
            for item in group_by.iter_mut() {
                self.resolve_item_ref(item, select, &ctx, state);
            }
            for order in order_by.iter_mut() {
                self.resolve_item_ref(&mut order.item, select, &ctx, state);
            }
        }

        // Phase B: user-defined functions.
        Self::for_each_root_expr_mut(query, &mut |expr| self.resolve_expr_udfs(expr, state));

        // Phase C: geometry functions and STC-S literals.
        Self::for_each_root_expr(query, &mut |expr| self.check_expr_geometries(expr, state));

        // Phase D: coarse type checks.
        Self::for_each_root_expr(query, &mut |expr| self.check_expr_types(expr, state));

        // Resulting columns must be computed while the scope is still ours.
        let resulting = self.resulting_columns(&query.select, &ctx);

        // Phase E: sub-queries outside FROM see this level's columns.
        let visible_ctes = ctx.cte_tables.clone();
        state.stack.push(ctx);
        Self::for_each_root_expr_mut(query, &mut |expr| {
            self.check_expr_subqueries(expr, state, &visible_ctes)
        });
        state.stack.pop();

        resulting
    }

    // ------------------------------------------------------------------
    // Phase A: tables and columns
    // ------------------------------------------------------------------

    fn resolve_from(&self, from: &mut FromClause, ctx: &mut CheckContext, state: &mut CheckState) {
        match from {
            FromClause::Table(table_ref) => self.resolve_table_ref(table_ref, ctx, state),
            FromClause::SubQuery(sub) => {
                let columns = {
                    let visible = ctx.cte_tables.clone();
                    self.check_query(&mut sub.query, state, &visible)
                };
                match &sub.alias {
                    Some(alias) => {
                        let table = DbTable::derived(alias.clone(), columns);
                        ctx.from_tables.add(table.clone());
                        sub.binding = Some(table);
                    }
                    None => state.report.push(CheckError::new(
                        CheckErrorKind::UnknownTable,
                        "A sub-query in the FROM clause must have an alias",
                        sub.position,
                    )),
                }
            }
            FromClause::Join(join) => {
                self.resolve_from(&mut join.left, ctx, state);
                self.resolve_from(&mut join.right, ctx, state);
            }
        }
    }

    fn resolve_table_ref(
        &self,
        table_ref: &mut TableReference,
        ctx: &mut CheckContext,
        state: &mut CheckState,
    ) {
        // CTE tables shadow the catalog, but only for unqualified names.
        let mut found = if table_ref.name.schema.is_none() {
            ctx.cte_tables.search(&table_ref.name)
        } else {
            Vec::new()
        };
        if found.is_empty() {
            found = self.catalog.search(&table_ref.name);
        }

        match found.len() {
            0 => state.report.push(CheckError::new(
                CheckErrorKind::UnknownTable,
                format!("Unknown table: {}", table_ref.name),
                table_ref.position,
            )),
            1 => {
                let mut table = found.remove(0);
                if let Some(alias) = &table_ref.alias {
                    table = table.alias(alias.clone());
                }
                trace!(table = %table, "table resolved");
                ctx.from_tables.add(table.clone());
                table_ref.binding = Some(table);
            }
            _ => state.report.push(CheckError::new(
                CheckErrorKind::AmbiguousTable,
                format!(
                    "Ambiguous table name: {} (matches {} and {})",
                    table_ref.name, found[0], found[1]
                ),
                table_ref.position,
            )),
        }
    }

    /// Columns exposed by a FROM tree, with NATURAL / USING merging
    fn from_columns(&self, from: &FromClause, state: &mut CheckState) -> Vec<AvailableColumn> {
        match from {
            FromClause::Table(table_ref) => Self::table_columns(table_ref.binding.as_ref()),
            FromClause::SubQuery(sub) => Self::table_columns(sub.binding.as_ref()),
            FromClause::Join(join) => {
                let left = self.from_columns(&join.left, state);
                let right = self.from_columns(&join.right, state);
                match &join.spec {
                    JoinSpec::Inner | JoinSpec::Cross | JoinSpec::On(_) => {
                        let mut columns = left;
                        columns.extend(right);
                        columns
                    }
                    JoinSpec::Natural => {
                        Self::merge_natural(left, right, join.position, state)
                    }
                    JoinSpec::Using(names) => {
                        Self::merge_using(left, right, names, join.position, state)
                    }
                }
            }
        }
    }

    fn table_columns(table: Option<&Arc<DbTable>>) -> Vec<AvailableColumn> {
        match table {
            Some(table) => table
                .columns()
                .map(|column| AvailableColumn::Single(column.clone()))
                .collect(),
            None => Vec::new(),
        }
    }

    /// NATURAL JOIN: every same-named pair merges into a common column.
    /// Without any common name the join degenerates to a cross product.
    fn merge_natural(
        left: Vec<AvailableColumn>,
        mut right: Vec<AvailableColumn>,
        position: Option<Position>,
        state: &mut CheckState,
    ) -> Vec<AvailableColumn> {
        let mut result = Vec::new();
        for left_column in left {
            let matched = right
                .iter()
                .position(|right_column| right_column.adql_name().matches(left_column.adql_name()));
            match matched {
                Some(index) => {
                    let right_column = right.remove(index);
                    match Self::merge_pair(&left_column, &right_column) {
                        Ok(common) => result.push(AvailableColumn::Common(common)),
                        Err(reason) => {
                            state.report.push(CheckError::new(
                                CheckErrorKind::JoinUnresolvable,
                                format!("Unresolvable NATURAL JOIN: {reason}"),
                                position,
                            ));
                            result.push(left_column);
                            result.push(right_column);
                        }
                    }
                }
                None => result.push(left_column),
            }
        }
        result.extend(right);
        result
    }

    /// USING: the listed columns must exist on both sides and be compatible.
    fn merge_using(
        mut left: Vec<AvailableColumn>,
        mut right: Vec<AvailableColumn>,
        names: &[Identifier],
        position: Option<Position>,
        state: &mut CheckState,
    ) -> Vec<AvailableColumn> {
        let mut result = Vec::new();
        for name in names {
            let left_index = left
                .iter()
                .position(|column| column.adql_name().matches(name));
            let right_index = right
                .iter()
                .position(|column| column.adql_name().matches(name));
            match (left_index, right_index) {
                (Some(left_index), Some(right_index)) => {
                    let left_column = left.remove(left_index);
                    let right_column = right.remove(right_index);
                    match Self::merge_pair(&left_column, &right_column) {
                        Ok(common) => result.push(AvailableColumn::Common(common)),
                        Err(reason) => {
                            state.report.push(CheckError::new(
                                CheckErrorKind::JoinUnresolvable,
                                format!("Unresolvable USING clause: {reason}"),
                                position,
                            ));
                            result.push(left_column);
                            result.push(right_column);
                        }
                    }
                }
                (left_found, _) => {
                    let side = if left_found.is_none() { "left" } else { "right" };
                    state.report.push(CheckError::new(
                        CheckErrorKind::JoinUnresolvable,
                        format!(
                            "Unresolvable USING clause: column {name} is missing on the {side} side"
                        ),
                        position,
                    ));
                }
            }
        }
        result.extend(left);
        result.extend(right);
        result
    }

    /// Merge two visible columns into one common column
    ///
    /// Merging with an existing common column unions the cover sets, so
    /// common columns stay flat.
    fn merge_pair(
        left: &AvailableColumn,
        right: &AvailableColumn,
    ) -> Result<CommonColumn, String> {
        let left_type = left.db_column().db_type();
        let right_type = right.db_column().db_type();
        if !left_type.is_compatible(right_type) {
            return Err(format!(
                "column \"{}\" has incompatible types {} and {}",
                left.adql_name().text(),
                left_type,
                right_type
            ));
        }

        let mut covered = left.covered_tables();
        for table in right.covered_tables() {
            if !covered.iter().any(|existing| Arc::ptr_eq(existing, &table)) {
                covered.push(table);
            }
        }
        Ok(CommonColumn::new(left.db_column(), covered))
    }

    /// Resolve all column references of one expression tree
    ///
    /// Sub-queries are left alone: their references resolve during phase E
    /// with their own scope.
    fn resolve_expr_columns(&self, expr: &mut Expr, ctx: &CheckContext, state: &mut CheckState) {
        match expr {
            Expr::Column(column_ref) => self.resolve_column_ref(column_ref, ctx, state),
            Expr::Literal(_) => {}
            Expr::BinaryOp { left, right, .. } => {
                self.resolve_expr_columns(left, ctx, state);
                self.resolve_expr_columns(right, ctx, state);
            }
            Expr::Negation { operand, .. } | Expr::Not { operand, .. } => {
                self.resolve_expr_columns(operand, ctx, state);
            }
            Expr::IsNull { operand, .. } => self.resolve_expr_columns(operand, ctx, state),
            Expr::Between {
                operand, low, high, ..
            } => {
                self.resolve_expr_columns(operand, ctx, state);
                self.resolve_expr_columns(low, ctx, state);
                self.resolve_expr_columns(high, ctx, state);
            }
            Expr::In { operand, set, .. } => {
                self.resolve_expr_columns(operand, ctx, state);
                if let InSet::List(items) = set {
                    for item in items {
                        self.resolve_expr_columns(item, ctx, state);
                    }
                }
            }
            Expr::Exists { .. } => {}
            Expr::Aggregate(call) => {
                if let Some(argument) = &mut call.argument {
                    self.resolve_expr_columns(argument, ctx, state);
                }
            }
            Expr::Math(call) => {
                for argument in &mut call.args {
                    self.resolve_expr_columns(argument, ctx, state);
                }
            }
            Expr::Geometry(call) => {
                for argument in &mut call.args {
                    self.resolve_expr_columns(argument, ctx, state);
                }
            }
            Expr::Udf(call) => {
                for argument in &mut call.args {
                    self.resolve_expr_columns(argument, ctx, state);
                }
            }
            _ => {}
        }
    }

    fn resolve_column_ref(
        &self,
        column_ref: &mut ColumnRef,
        ctx: &CheckContext,
        state: &mut CheckState,
    ) {
        let matches = ctx.available_columns.search(&column_ref.name);
        match matches.len() {
            1 => {
                trace!(column = %column_ref.name, "column resolved");
                column_ref.binding = Some(matches[0].db_column().clone());
            }
            0 => {
                // Correlated reference: walk parent scopes, innermost first.
                for frame in state.stack.iter_inner_to_outer() {
                    let matches = frame.available_columns.search(&column_ref.name);
                    match matches.len() {
                        0 => continue,
                        1 => {
                            trace!(column = %column_ref.name, "correlated column resolved");
                            column_ref.binding = Some(matches[0].db_column().clone());
                            return;
                        }
                        _ => {
                            state
                                .report
                                .push(Self::ambiguity_error(column_ref, &matches));
                            return;
                        }
                    }
                }
                state.report.push(CheckError::new(
                    CheckErrorKind::UnknownColumn,
                    format!("Unknown column: {}", column_ref.name),
                    column_ref.position,
                ));
            }
            _ => state
                .report
                .push(Self::ambiguity_error(column_ref, &matches)),
        }
    }

    /// An unqualified ambiguous reference is an ambiguous column; a
    /// qualified one means the qualifier itself matched several tables.
    fn ambiguity_error(column_ref: &ColumnRef, matches: &[AvailableColumn]) -> CheckError {
        let describe = |column: &AvailableColumn| {
            column
                .covered_tables()
                .first()
                .map(|table| format!("{}.{}", table, column.adql_name()))
                .unwrap_or_else(|| column.adql_name().to_string())
        };
        let (kind, what) = if column_ref.name.is_qualified() {
            (CheckErrorKind::AmbiguousTable, "table reference")
        } else {
            (CheckErrorKind::AmbiguousColumn, "column name")
        };
        CheckError::new(
            kind,
            format!(
                "Ambiguous {what}: {} (matches {} and {})",
                column_ref.name,
                describe(&matches[0]),
                describe(&matches[1])
            ),
            column_ref.position,
        )
    }

    fn resolve_table_wildcard(
        &self,
        wildcard: &mut TableWildcard,
        ctx: &CheckContext,
        state: &mut CheckState,
    ) {
        let matches = ctx.from_tables.search(&wildcard.qualifier);
        match matches.len() {
            0 => state.report.push(CheckError::new(
                CheckErrorKind::UnknownTable,
                format!("Unknown table: {} (in {}.*)", wildcard.qualifier, wildcard.qualifier),
                wildcard.position,
            )),
            1 => wildcard.binding = matches.into_iter().next(),
            _ => state.report.push(CheckError::new(
                CheckErrorKind::AmbiguousTable,
                format!(
                    "Ambiguous table name: {} (matches {} and {})",
                    wildcard.qualifier, matches[0], matches[1]
                ),
                wildcard.position,
            )),
        }
    }

    /// GROUP BY / ORDER BY references: ordinal index, select-item alias or
    /// column of the current scope. Parent scopes are never consulted here.
    fn resolve_item_ref(
        &self,
        item: &mut ItemRef,
        select: &SelectClause,
        ctx: &CheckContext,
        state: &mut CheckState,
    ) {
        match item {
            ItemRef::Index {
                value,
                position,
                binding,
            } => {
                let count = select.items.len();
                if *value < 1 || *value as usize > count {
                    state.report.push(CheckError::new(
                        CheckErrorKind::IndexOutOfBounds,
                        format!(
                            "Column index {value} out of bounds (must be between 1 and {count})"
                        ),
                        *position,
                    ));
                    return;
                }
                // Only a direct column reference yields a binding; a complex
                // expression is a valid target without one.
                if let SelectItem::Expr {
                    expr: Expr::Column(column_ref),
                    ..
                } = &select.items[*value as usize - 1]
                {
                    *binding = column_ref.binding.clone();
                }
            }
            ItemRef::Name(column_ref) => {
                if !column_ref.name.is_qualified() {
                    let aliased: Vec<&SelectItem> = select
                        .items
                        .iter()
                        .filter(|item| match item {
                            SelectItem::Expr {
                                alias: Some(alias), ..
                            } => alias.matches(&column_ref.name.column),
                            _ => false,
                        })
                        .collect();
                    match aliased.len() {
                        0 => {}
                        1 => {
                            if let SelectItem::Expr {
                                expr: Expr::Column(selected),
                                ..
                            } = aliased[0]
                            {
                                column_ref.binding = selected.binding.clone();
                            }
                            return;
                        }
                        _ => {
                            state.report.push(CheckError::new(
                                CheckErrorKind::AmbiguousColumn,
                                format!(
                                    "Ambiguous column name: {} (matches several select aliases)",
                                    column_ref.name
                                ),
                                column_ref.position,
                            ));
                            return;
                        }
                    }
                }

                let matches = ctx.available_columns.search(&column_ref.name);
                match matches.len() {
                    0 => state.report.push(CheckError::new(
                        CheckErrorKind::UnknownColumn,
                        format!("Unknown column: {}", column_ref.name),
                        column_ref.position,
                    )),
                    1 => column_ref.binding = Some(matches[0].db_column().clone()),
                    _ => state
                        .report
                        .push(Self::ambiguity_error(column_ref, &matches)),
                }
            }
        }
    }

    /// Names and types of the columns this level produces
    fn resulting_columns(
        &self,
        select: &SelectClause,
        ctx: &CheckContext,
    ) -> Vec<(Identifier, DbType)> {
        let mut columns = Vec::new();
        for (index, item) in select.items.iter().enumerate() {
            match item {
                SelectItem::Wildcard { .. } => {
                    for column in ctx.available_columns.columns() {
                        columns.push((
                            column.adql_name().clone(),
                            column.db_column().db_type().clone(),
                        ));
                    }
                }
                SelectItem::TableWildcard(wildcard) => {
                    if let Some(table) = &wildcard.binding {
                        for column in table.columns() {
                            columns.push((column.adql_name().clone(), column.db_type().clone()));
                        }
                    }
                }
                SelectItem::Expr { expr, .. } => {
                    let Some(name) = item.result_name(index) else {
                        continue;
                    };
                    let db_type = match expr {
                        Expr::Column(column_ref) => column_ref
                            .binding
                            .as_ref()
                            .map(|column| column.db_type().clone())
                            .unwrap_or(DbType::Unknown(None)),
                        _ => DbType::Unknown(None),
                    };
                    columns.push((name, db_type));
                }
            }
        }
        columns
    }

    // ------------------------------------------------------------------
    // Phase B: user-defined functions
    // ------------------------------------------------------------------

    fn resolve_expr_udfs(&self, expr: &mut Expr, state: &mut CheckState) {
        // Arguments first: a nested call must carry its binding before the
        // enclosing call builds its signature, otherwise the enclosing call
        // would dispatch on a wildcard argument and could pick an arbitrary
        // overload instead of being deferred.
        Self::for_each_child_expr_mut(expr, &mut |child| self.resolve_expr_udfs(child, state));
        if let Expr::Udf(call) = expr {
            self.resolve_udf_call(call, state);
        }
    }

    fn resolve_udf_call(&self, call: &mut UdfCall, state: &mut CheckState) {
        let Some(registry) = &self.allowed_udfs else {
            // No whitelist: any unknown function is accepted as-is.
            return;
        };
        if registry.is_empty() {
            state.report.push(CheckError::new(
                CheckErrorKind::UnresolvedFunction,
                format!(
                    "Unresolved function: {} (no user-defined function is allowed)",
                    Self::call_signature(call)
                ),
                call.position,
            ));
            return;
        }

        let signature = Self::call_signature(call);
        match registry.lookup(&signature) {
            Some(definition) => {
                trace!(%signature, "function resolved");
                call.binding = Some(definition.clone());
                call.deferred = false;
            }
            None if signature.is_resolved() => state.report.push(CheckError::new(
                CheckErrorKind::UnresolvedFunction,
                format!("Unresolved function: {signature}"),
                call.position,
            )),
            None => {
                trace!(%signature, "function deferred");
                call.deferred = true;
            }
        }
    }

    fn call_signature(call: &UdfCall) -> CallSignature {
        CallSignature::new(
            call.name.text(),
            call.args.iter().map(Expr::type_categories).collect(),
        )
    }

    /// Retry every deferred call once, now that the whole tree is bound
    fn retry_deferred_udfs(&self, query: &mut Query, state: &mut CheckState) {
        for cte in &mut query.ctes {
            self.retry_deferred_udfs(&mut cte.query, state);
        }
        self.retry_deferred_in_from(&mut query.from, state);
        for item in &mut query.select.items {
            if let SelectItem::Expr { expr, .. } = item {
                self.retry_deferred_in_expr(expr, state);
            }
        }
        if let Some(condition) = &mut query.where_clause {
            self.retry_deferred_in_expr(condition, state);
        }
        if let Some(condition) = &mut query.having {
            self.retry_deferred_in_expr(condition, state);
        }
    }

    fn retry_deferred_in_from(&self, from: &mut FromClause, state: &mut CheckState) {
        match from {
            FromClause::Table(_) => {}
            FromClause::SubQuery(sub) => self.retry_deferred_udfs(&mut sub.query, state),
            FromClause::Join(join) => {
                self.retry_deferred_in_from(&mut join.left, state);
                self.retry_deferred_in_from(&mut join.right, state);
                if let JoinSpec::On(condition) = &mut join.spec {
                    self.retry_deferred_in_expr(condition, state);
                }
            }
        }
    }

    fn retry_deferred_in_expr(&self, expr: &mut Expr, state: &mut CheckState) {
        match expr {
            Expr::Udf(call) if call.deferred && call.binding.is_none() => {
                call.deferred = false;
                if let Some(registry) = &self.allowed_udfs {
                    let signature = Self::call_signature(call);
                    match registry.lookup(&signature) {
                        Some(definition) => {
                            debug!(%signature, "deferred function resolved");
                            call.binding = Some(definition.clone());
                        }
                        None => state.report.push(CheckError::new(
                            CheckErrorKind::UnresolvedFunction,
                            format!("Unresolved function: {signature}"),
                            call.position,
                        )),
                    }
                }
            }
            Expr::Exists { query, .. } => {
                self.retry_deferred_udfs(query, state);
                return;
            }
            Expr::In { operand, set, .. } => {
                self.retry_deferred_in_expr(operand, state);
                match set {
                    InSet::List(items) => {
                        for item in items {
                            self.retry_deferred_in_expr(item, state);
                        }
                    }
                    InSet::Query(query) => self.retry_deferred_udfs(query, state),
                }
                return;
            }
            _ => {}
        }
        Self::for_each_child_expr_mut(expr, &mut |child| {
            self.retry_deferred_in_expr(child, state)
        });
    }

    // ------------------------------------------------------------------
    // Phase C: geometries and STC-S literals
    // ------------------------------------------------------------------

    fn check_expr_geometries(&self, expr: &Expr, state: &mut CheckState) {
        if let Expr::Geometry(call) = expr {
            self.check_geometry_call(call, state);
        }
        Self::for_each_child_expr(expr, &mut |child| self.check_expr_geometries(child, state));
    }

    fn check_geometry_call(&self, call: &GeometryCall, state: &mut CheckState) {
        if let Some(allowed) = &self.allowed_geometries {
            if !allowed.contains(&call.function.to_string()) {
                state.report.push(CheckError::new(
                    CheckErrorKind::UnresolvedFunction,
                    format!(
                        "Unresolved function: the geometry function {} is not available in this service",
                        call.function
                    ),
                    call.position,
                ));
            }
        }

        match call.function {
            GeometryFunction::Point
            | GeometryFunction::Circle
            | GeometryFunction::Box
            | GeometryFunction::Polygon => {
                if let Some(Expr::Literal(literal)) = call.args.first() {
                    if let Literal::String(text) = &literal.value {
                        self.check_coord_sys_literal(text, literal.position, state);
                    }
                }
            }
            GeometryFunction::Region => {
                // Only a literal region can be validated statically; any
                // other operand is checked at execution time.
                if let [Expr::Literal(literal)] = call.args.as_slice() {
                    if let Literal::String(text) = &literal.value {
                        self.check_region_literal(text, literal.position, state);
                    }
                }
            }
            _ => {}
        }
    }

    fn check_coord_sys_literal(
        &self,
        text: &str,
        position: Option<Position>,
        state: &mut CheckState,
    ) {
        match text.parse::<CoordSys>() {
            Ok(coord_sys) => self.check_coord_sys(text, &coord_sys, position, state),
            Err(error) => state.report.push(CheckError::new(
                CheckErrorKind::RegionSyntaxError,
                format!("Invalid coordinate system {text:?}: {error}"),
                position,
            )),
        }
    }

    fn check_coord_sys(
        &self,
        literal: &str,
        coord_sys: &CoordSys,
        position: Option<Position>,
        state: &mut CheckState,
    ) {
        if let Some(restriction) = &self.allowed_coord_sys {
            if !restriction.allows(coord_sys) {
                state.report.push(CheckError::new(
                    CheckErrorKind::CoordSysNotAllowed,
                    format!(
                        "Coordinate system {:?} (= \"{}\") not allowed in this service",
                        literal,
                        coord_sys.to_full_stcs()
                    ),
                    position,
                ));
            }
        }
    }

    fn check_region_literal(
        &self,
        text: &str,
        position: Option<Position>,
        state: &mut CheckState,
    ) {
        match text.parse::<Region>() {
            Ok(region) => self.check_region(&region, position, state),
            Err(error) => state.report.push(CheckError::new(
                CheckErrorKind::RegionSyntaxError,
                format!("Invalid STC-S region: {error}"),
                position,
            )),
        }
    }

    /// Validate a parsed region: its coordinate system, its kind against the
    /// geometry whitelist, and every nested region
    fn check_region(&self, region: &Region, position: Option<Position>, state: &mut CheckState) {
        if let Some(coord_sys) = region.coord_sys() {
            self.check_coord_sys(&coord_sys.to_stcs(), coord_sys, position, state);
        }

        if let Some(allowed) = &self.allowed_geometries {
            // POSITION maps onto the POINT function; the combinators have no
            // function equivalent and only their contents are restricted.
            let function_name = match region.kind() {
                RegionKind::Position => Some("POINT"),
                RegionKind::Circle => Some("CIRCLE"),
                RegionKind::Box => Some("BOX"),
                RegionKind::Polygon => Some("POLYGON"),
                RegionKind::Union | RegionKind::Intersection | RegionKind::Not => None,
            };
            if let Some(name) = function_name {
                if !allowed.contains(name) {
                    state.report.push(CheckError::new(
                        CheckErrorKind::UnresolvedFunction,
                        format!(
                            "Unresolved function: the region type {} is not available in this service",
                            region.kind()
                        ),
                        position,
                    ));
                }
            }
        }

        for inner in region.inner_regions() {
            self.check_region(inner, position, state);
        }
    }

    // ------------------------------------------------------------------
    // Phase D: coarse type checks
    // ------------------------------------------------------------------

    fn check_expr_types(&self, expr: &Expr, state: &mut CheckState) {
        match expr {
            Expr::BinaryOp {
                op, left, right, position,
            } => {
                if op.is_arithmetic() {
                    self.expect_category(left, Expected::Numeric, *position, state);
                    self.expect_category(right, Expected::Numeric, *position, state);
                } else if *op == BinaryOp::Concat || op.is_string_predicate() {
                    self.expect_category(left, Expected::String, *position, state);
                    self.expect_category(right, Expected::String, *position, state);
                } else if op.is_comparison() {
                    self.expect_comparable(left, right, *position, state);
                }
            }
            Expr::Negation { operand, position } => {
                self.expect_category(operand, Expected::Numeric, *position, state);
            }
            Expr::Between {
                operand,
                low,
                high,
                position,
                ..
            } => {
                self.expect_comparable(operand, low, *position, state);
                self.expect_comparable(operand, high, *position, state);
            }
            Expr::In {
                operand,
                set: InSet::List(items),
                position,
                ..
            } => {
                for item in items {
                    self.expect_comparable(operand, item, *position, state);
                }
            }
            Expr::Aggregate(call) => {
                if matches!(
                    call.function,
                    AggregateFunction::Sum | AggregateFunction::Avg
                ) {
                    if let Some(argument) = &call.argument {
                        self.expect_category(argument, Expected::Numeric, call.position, state);
                    }
                }
            }
            Expr::Math(call) => {
                for argument in &call.args {
                    self.expect_category(argument, Expected::Numeric, call.position, state);
                }
            }
            Expr::Geometry(call) => self.check_geometry_arg_types(call, state),
            _ => {}
        }
        Self::for_each_child_expr(expr, &mut |child| self.check_expr_types(child, state));
    }

    fn check_geometry_arg_types(&self, call: &GeometryCall, state: &mut CheckState) {
        let expectations: &[Expected] = match call.function {
            GeometryFunction::Point => &[Expected::String, Expected::Numeric, Expected::Numeric],
            GeometryFunction::Circle => &[
                Expected::String,
                Expected::Numeric,
                Expected::Numeric,
                Expected::Numeric,
            ],
            GeometryFunction::Box => &[
                Expected::String,
                Expected::Numeric,
                Expected::Numeric,
                Expected::Numeric,
                Expected::Numeric,
            ],
            GeometryFunction::Polygon | GeometryFunction::Region => &[Expected::String],
            GeometryFunction::Area
            | GeometryFunction::Centroid
            | GeometryFunction::CoordSys
            | GeometryFunction::Coord1
            | GeometryFunction::Coord2 => &[Expected::Geometry],
            GeometryFunction::Distance
            | GeometryFunction::Contains
            | GeometryFunction::Intersects => &[Expected::Geometry, Expected::Geometry],
        };

        for (argument, expected) in call.args.iter().zip(expectations.iter()) {
            self.expect_category(argument, *expected, call.position, state);
        }
        // A polygon's coordinates after the coordinate system are numeric.
        if call.function == GeometryFunction::Polygon {
            for argument in call.args.iter().skip(1) {
                self.expect_category(argument, Expected::Numeric, call.position, state);
            }
        }
    }

    fn expect_category(
        &self,
        expr: &Expr,
        expected: Expected,
        fallback: Option<Position>,
        state: &mut CheckState,
    ) {
        let categories = expr.type_categories();
        // A fully unresolved operand already produced an error upstream.
        if categories.is_unresolved() {
            return;
        }
        if !expected.accepts(&categories) {
            state.report.push(CheckError::new(
                CheckErrorKind::TypeMismatch,
                format!(
                    "Type mismatch: {} was expected instead of \"{expr}\" ({categories})",
                    expected.describe()
                ),
                expr.position().or(fallback),
            ));
        }
    }

    fn expect_comparable(
        &self,
        left: &Expr,
        right: &Expr,
        fallback: Option<Position>,
        state: &mut CheckState,
    ) {
        let left_categories = left.type_categories();
        let right_categories = right.type_categories();
        if left_categories.is_unresolved()
            || right_categories.is_unresolved()
            || left_categories == TypeCategories::NONE
            || right_categories == TypeCategories::NONE
        {
            return;
        }
        if !left_categories.overlaps(&right_categories) {
            state.report.push(CheckError::new(
                CheckErrorKind::TypeMismatch,
                format!(
                    "Type mismatch: cannot compare \"{left}\" ({left_categories}) with \"{right}\" ({right_categories})"
                ),
                right.position().or_else(|| left.position()).or(fallback),
            ));
        }
    }

    // ------------------------------------------------------------------
    // Phase E: sub-queries outside FROM
    // ------------------------------------------------------------------

    fn check_expr_subqueries(
        &self,
        expr: &mut Expr,
        state: &mut CheckState,
        visible_ctes: &SearchTableList,
    ) {
        match expr {
            Expr::Exists { query, .. } => {
                self.check_query(query, state, visible_ctes);
                return;
            }
            Expr::In { operand, set, .. } => {
                self.check_expr_subqueries(operand, state, visible_ctes);
                match set {
                    InSet::Query(query) => {
                        self.check_query(query, state, visible_ctes);
                    }
                    InSet::List(items) => {
                        for item in items {
                            self.check_expr_subqueries(item, state, visible_ctes);
                        }
                    }
                }
                return;
            }
            _ => {}
        }
        Self::for_each_child_expr_mut(expr, &mut |child| {
            self.check_expr_subqueries(child, state, visible_ctes)
        });
    }

    // ------------------------------------------------------------------
    // Walk helpers
    // ------------------------------------------------------------------

    /// Apply `f` to every top-level expression of one query level: select
    /// items, join conditions, WHERE and HAVING
    fn for_each_root_expr_mut(query: &mut Query, f: &mut impl FnMut(&mut Expr)) {
        for item in &mut query.select.items {
            if let SelectItem::Expr { expr, .. } = item {
                f(expr);
            }
        }
        Self::for_each_on_expr_mut(&mut query.from, f);
        if let Some(condition) = &mut query.where_clause {
            f(condition);
        }
        if let Some(condition) = &mut query.having {
            f(condition);
        }
    }

    fn for_each_root_expr(query: &Query, f: &mut impl FnMut(&Expr)) {
        for item in &query.select.items {
            if let SelectItem::Expr { expr, .. } = item {
                f(expr);
            }
        }
        Self::for_each_on_expr(&query.from, f);
        if let Some(condition) = &query.where_clause {
            f(condition);
        }
        if let Some(condition) = &query.having {
            f(condition);
        }
    }

    fn for_each_on_expr_mut(from: &mut FromClause, f: &mut impl FnMut(&mut Expr)) {
        if let FromClause::Join(join) = from {
            Self::for_each_on_expr_mut(&mut join.left, f);
            Self::for_each_on_expr_mut(&mut join.right, f);
            if let JoinSpec::On(condition) = &mut join.spec {
                f(condition);
            }
        }
    }

    fn for_each_on_expr(from: &FromClause, f: &mut impl FnMut(&Expr)) {
        if let FromClause::Join(join) = from {
            Self::for_each_on_expr(&join.left, f);
            Self::for_each_on_expr(&join.right, f);
            if let JoinSpec::On(condition) = &join.spec {
                f(condition);
            }
        }
    }

    /// Apply `f` to the direct children of one expression, without crossing
    /// into sub-queries
    fn for_each_child_expr_mut(expr: &mut Expr, f: &mut impl FnMut(&mut Expr)) {
        match expr {
            Expr::Column(_) | Expr::Literal(_) | Expr::Exists { .. } => {}
            Expr::BinaryOp { left, right, .. } => {
                f(left);
                f(right);
            }
            Expr::Negation { operand, .. }
            | Expr::Not { operand, .. }
            | Expr::IsNull { operand, .. } => f(operand),
            Expr::Between {
                operand, low, high, ..
            } => {
                f(operand);
                f(low);
                f(high);
            }
            Expr::In { operand, set, .. } => {
                f(operand);
                if let InSet::List(items) = set {
                    for item in items {
                        f(item);
                    }
                }
            }
            Expr::Aggregate(call) => {
                if let Some(argument) = &mut call.argument {
                    f(argument);
                }
            }
            Expr::Math(call) => {
                for argument in &mut call.args {
                    f(argument);
                }
            }
            Expr::Geometry(call) => {
                for argument in &mut call.args {
                    f(argument);
                }
            }
            Expr::Udf(call) => {
                for argument in &mut call.args {
                    f(argument);
                }
            }
            _ => {}
        }
    }

    fn for_each_child_expr(expr: &Expr, f: &mut impl FnMut(&Expr)) {
        match expr {
            Expr::Column(_) | Expr::Literal(_) | Expr::Exists { .. } => {}
            Expr::BinaryOp { left, right, .. } => {
                f(left);
                f(right);
            }
            Expr::Negation { operand, .. }
            | Expr::Not { operand, .. }
            | Expr::IsNull { operand, .. } => f(operand),
            Expr::Between {
                operand, low, high, ..
            } => {
                f(operand);
                f(low);
                f(high);
            }
            Expr::In { operand, set, .. } => {
                f(operand);
                if let InSet::List(items) = set {
                    for item in items {
                        f(item);
                    }
                }
            }
            Expr::Aggregate(call) => {
                if let Some(argument) = &call.argument {
                    f(argument);
                }
            }
            Expr::Math(call) => {
                for argument in &call.args {
                    f(argument);
                }
            }
            Expr::Geometry(call) => {
                for argument in &call.args {
                    f(argument);
                }
            }
            Expr::Udf(call) => {
                for argument in &call.args {
                    f(argument);
                }
            }
            _ => {}
        }
    }
}
