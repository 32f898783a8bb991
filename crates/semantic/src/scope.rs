// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Scopes and the scope stack
//!
//! Each query level gets a [`CheckContext`]: the CTE tables visible at that
//! level, the FROM tables it introduced, and the columns they expose. The
//! checker carries an explicit [`ScopeStack`] of parent contexts instead of
//! relying on the call stack, so correlated references resolve by walking
//! frames from the innermost parent outwards.
//!
//! CTE tables propagate *downwards* by cloning into each child context;
//! columns do not: a level's `available_columns` holds exactly the columns
//! visible inside that level's SELECT/WHERE/GROUP/ORDER, never those of its
//! FROM sub-queries.

use crate::symbols::{SearchColumnList, SearchTableList};

/// Everything one query level can resolve names against
#[derive(Debug, Clone, Default)]
pub struct CheckContext {
    /// CTEs visible at this level (own WITH clause plus inherited ones)
    pub cte_tables: SearchTableList,

    /// Tables introduced by this level's FROM clause, alias wrappers and
    /// derived tables included
    pub from_tables: SearchTableList,

    /// Columns those tables expose, after JOIN merging
    pub available_columns: SearchColumnList,
}

impl CheckContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Stack of parent contexts, innermost last
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<CheckContext>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, context: CheckContext) {
        self.frames.push(context);
    }

    pub fn pop(&mut self) -> Option<CheckContext> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Parent frames, innermost first (outermost last)
    pub fn iter_inner_to_outer(&self) -> impl Iterator<Item = &CheckContext> {
        self.frames.iter().rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adql_check_catalog::{DbTable, DbType};
    use crate::symbols::AvailableColumn;

    #[test]
    fn test_stack_order() {
        let outer_table = DbTable::builder("outer_t")
            .column("a", DbType::Integer)
            .build()
            .unwrap();
        let inner_table = DbTable::builder("inner_t")
            .column("b", DbType::Integer)
            .build()
            .unwrap();

        let mut outer = CheckContext::new();
        for column in outer_table.columns() {
            outer
                .available_columns
                .add(AvailableColumn::Single(column.clone()));
        }
        let mut inner = CheckContext::new();
        for column in inner_table.columns() {
            inner
                .available_columns
                .add(AvailableColumn::Single(column.clone()));
        }

        let mut stack = ScopeStack::new();
        stack.push(outer);
        stack.push(inner);

        let first = stack.iter_inner_to_outer().next().unwrap();
        assert_eq!(first.available_columns.columns()[0].adql_name().text(), "b");
        assert_eq!(stack.depth(), 2);

        stack.pop();
        assert_eq!(stack.depth(), 1);
    }
}
