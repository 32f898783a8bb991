// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Serde round-trips for the AST: bindings are runtime-only and must not
//! leak into (or be expected from) the serialized form.

use adql_check_catalog::TableName;
use adql_check_ir::{
    ColumnName, ColumnRef, Expr, FromClause, JoinSpec, Query, SelectClause, SelectItem,
    TableReference,
};

fn col(name: &str) -> Expr {
    Expr::Column(ColumnRef::new(ColumnName::split(name).unwrap()))
}

fn table(name: &str) -> FromClause {
    FromClause::Table(TableReference::new(TableName::split(name).unwrap()))
}

#[test]
fn test_query_roundtrip() {
    let query = Query::new(
        SelectClause::new([SelectItem::expr(col("s.ra")), SelectItem::expr(col("dec"))]),
        FromClause::join(table("public.stars"), table("galaxies"), JoinSpec::Natural),
    );

    let json = serde_json::to_string(&query).unwrap();
    let back: Query = serde_json::from_str(&json).unwrap();
    assert_eq!(back.to_string(), query.to_string());
}

#[test]
fn test_bindings_not_serialized() {
    let query = Query::new(
        SelectClause::new([SelectItem::expr(col("ra"))]),
        table("stars"),
    );
    let json = serde_json::to_string(&query).unwrap();
    assert!(!json.contains("binding"));
}
