// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # AST fixture builders
//!
//! Shorthand constructors for the checker tests, which build ASTs directly
//! instead of going through a parser. All builders panic on malformed input
//! since they only ever see literals written in the tests.

use adql_check_catalog::{Identifier, TableName};
use adql_check_ir::{
    AggregateCall, AggregateFunction, BinaryOp, ColumnName, ColumnRef, Expr, FromClause,
    GeometryCall, GeometryFunction, InSet, ItemRef, JoinSpec, Literal, LiteralExpr, MathCall,
    MathFunction, OrderBy, Query, SelectClause, SelectItem, SubQueryTable, TableReference,
    TableWildcard, UdfCall,
};

/// A (possibly dotted) identifier
pub fn ident(name: &str) -> Identifier {
    Identifier::new(name).expect("fixture identifiers are well-formed")
}

/// A column reference expression, e.g. `col("s.ra")`
pub fn col(name: &str) -> Expr {
    Expr::Column(column_ref(name))
}

/// A bare column reference node
pub fn column_ref(name: &str) -> ColumnRef {
    ColumnRef::new(ColumnName::split(name).expect("fixture column names are well-formed"))
}

/// A numeric literal
pub fn num(value: f64) -> Expr {
    Expr::Literal(LiteralExpr {
        value: Literal::Number(value),
        position: None,
    })
}

/// A string literal
pub fn string(value: &str) -> Expr {
    Expr::Literal(LiteralExpr {
        value: Literal::String(value.to_string()),
        position: None,
    })
}

/// A binary operation
pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
        position: None,
    }
}

/// `left = right`
pub fn eq(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Eq, left, right)
}

/// An aggregate call over one argument
pub fn aggregate(function: AggregateFunction, argument: Expr) -> Expr {
    Expr::Aggregate(AggregateCall {
        function,
        distinct: false,
        argument: Some(Box::new(argument)),
        position: None,
    })
}

/// `COUNT(*)`
pub fn count_star() -> Expr {
    Expr::Aggregate(AggregateCall {
        function: AggregateFunction::Count,
        distinct: false,
        argument: None,
        position: None,
    })
}

/// A math function call
pub fn math(function: MathFunction, args: Vec<Expr>) -> Expr {
    Expr::Math(MathCall {
        function,
        args,
        position: None,
    })
}

/// A geometry function call
pub fn geometry(function: GeometryFunction, args: Vec<Expr>) -> Expr {
    Expr::Geometry(GeometryCall {
        function,
        args,
        position: None,
    })
}

/// A user-defined function call
pub fn udf(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Udf(UdfCall::new(ident(name), args))
}

/// `EXISTS (query)`
pub fn exists(query: Query) -> Expr {
    Expr::Exists {
        query: Box::new(query),
        position: None,
    }
}

/// `operand IN (query)`
pub fn in_query(operand: Expr, query: Query) -> Expr {
    Expr::In {
        operand: Box::new(operand),
        set: InSet::Query(Box::new(query)),
        negated: false,
        position: None,
    }
}

/// A FROM base table, e.g. `table("public.stars")`
pub fn table(name: &str) -> FromClause {
    FromClause::Table(TableReference::new(
        TableName::split(name).expect("fixture table names are well-formed"),
    ))
}

/// A FROM base table with an alias
pub fn table_as(name: &str, alias: &str) -> FromClause {
    FromClause::Table(
        TableReference::new(TableName::split(name).expect("fixture table names are well-formed"))
            .with_alias(ident(alias)),
    )
}

/// A FROM sub-query with an alias
pub fn subquery_as(query: Query, alias: &str) -> FromClause {
    FromClause::SubQuery(SubQueryTable {
        query: Box::new(query),
        alias: Some(ident(alias)),
        position: None,
        binding: None,
    })
}

/// A FROM sub-query without an alias (invalid, for error tests)
pub fn subquery_unaliased(query: Query) -> FromClause {
    FromClause::SubQuery(SubQueryTable {
        query: Box::new(query),
        alias: None,
        position: None,
        binding: None,
    })
}

/// A join of two FROM trees
pub fn join(left: FromClause, right: FromClause, spec: JoinSpec) -> FromClause {
    FromClause::join(left, right, spec)
}

/// `SELECT <exprs> FROM <from>`
pub fn select(items: Vec<Expr>, from: FromClause) -> Query {
    Query::new(
        SelectClause::new(items.into_iter().map(SelectItem::expr).collect::<Vec<_>>()),
        from,
    )
}

/// A full select list with arbitrary items
pub fn select_items(items: Vec<SelectItem>, from: FromClause) -> Query {
    Query::new(SelectClause::new(items), from)
}

/// `expr AS alias` select item
pub fn item_as(expr: Expr, alias: &str) -> SelectItem {
    SelectItem::aliased(expr, ident(alias))
}

/// `qualifier.*` select item
pub fn table_wildcard(qualifier: &str) -> SelectItem {
    SelectItem::TableWildcard(TableWildcard {
        qualifier: TableName::split(qualifier).expect("fixture table names are well-formed"),
        position: None,
        binding: None,
    })
}

/// ORDER BY a 1-based index
pub fn order_by_index(value: u32) -> OrderBy {
    OrderBy::new(ItemRef::index(value))
}

/// ORDER BY a (possibly qualified) name
pub fn order_by_name(name: &str) -> OrderBy {
    OrderBy::new(ItemRef::Name(column_ref(name)))
}

/// GROUP BY a (possibly qualified) name
pub fn group_by_name(name: &str) -> ItemRef {
    ItemRef::Name(column_ref(name))
}
