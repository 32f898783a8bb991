// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # ADQL expressions
//!
//! This module represents ADQL value expressions and search conditions as one
//! tagged union. The parser's class hierarchy (operands, constraints,
//! functions) is flattened into [`Expr`]; capability testing is exhaustive
//! pattern matching instead of downcasts.
//!
//! ## Bindings
//!
//! Column references and user-defined function calls carry an optional
//! *binding* written by the checker: the schema column, or the matched
//! function definition. Bindings are runtime-only (skipped by serde) and are
//! what the downstream SQL translator reads DB names from.
//!
//! ## Type categories
//!
//! [`Expr::type_categories`] reduces an expression to the coarse
//! numeric/string/geometry triplet the checker reasons about. Before its
//! column or function bindings are written the triplet is fully set
//! (*unresolved*), which makes every category check pass vacuously; an
//! unresolved node already produced a resolution error upstream.

use crate::position::Position;
use crate::query::Query;
use adql_check_catalog::{CatalogResult, DbColumn, Identifier, TableName, TypeCategories};
use adql_check_function_registry::FunctionDef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Possibly-qualified column name, as written in the query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnName {
    /// Table, alias or schema-qualified table the column was prefixed with
    pub qualifier: Option<TableName>,
    /// The column identifier itself
    pub column: Identifier,
}

impl ColumnName {
    pub fn new(column: Identifier) -> Self {
        Self {
            qualifier: None,
            column,
        }
    }

    pub fn with_qualifier(mut self, qualifier: TableName) -> Self {
        self.qualifier = Some(qualifier);
        self
    }

    /// Split a dotted reference: the last segment is the column, the rest a
    /// table name. Delimited segments are handled by the identifier rules.
    pub fn split(reference: &str) -> CatalogResult<Self> {
        match reference.rsplit_once('.') {
            None => Ok(Self::new(Identifier::new(reference)?)),
            Some((qualifier, column)) => Ok(Self {
                qualifier: Some(TableName::split(qualifier)?),
                column: Identifier::new(column)?,
            }),
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.qualifier.is_some()
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(qualifier) = &self.qualifier {
            write!(f, "{qualifier}.")?;
        }
        write!(f, "{}", self.column)
    }
}

/// A column reference AST node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnRef {
    pub name: ColumnName,
    pub position: Option<Position>,

    /// Resolved schema column, written by the checker
    #[serde(skip)]
    pub binding: Option<Arc<DbColumn>>,
}

impl ColumnRef {
    pub fn new(name: ColumnName) -> Self {
        Self {
            name,
            position: None,
            binding: None,
        }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}

/// Literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Number(f64),
    String(String),
}

/// A literal AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralExpr {
    pub value: Literal,
    pub position: Option<Position>,
}

/// Binary operators, covering arithmetic, comparison and logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,

    // String
    Concat,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    NotLike,

    // Logical
    And,
    Or,
}

impl BinaryOp {
    pub fn is_arithmetic(&self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }

    pub fn is_string_predicate(&self) -> bool {
        matches!(self, BinaryOp::Like | BinaryOp::NotLike)
    }

    fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Concat => "||",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Like => "LIKE",
            BinaryOp::NotLike => "NOT LIKE",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

/// Aggregate functions of the SELECT clause
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

/// An aggregate call; `argument` is `None` for `COUNT(*)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateCall {
    pub function: AggregateFunction,
    pub distinct: bool,
    pub argument: Option<Box<Expr>>,
    pub position: Option<Position>,
}

/// The standard numeric and trigonometric function set
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum MathFunction {
    Abs,
    Ceiling,
    Degrees,
    Exp,
    Floor,
    Log,
    Log10,
    Mod,
    Pi,
    Power,
    Radians,
    Rand,
    Round,
    Sqrt,
    Truncate,
    Acos,
    Asin,
    Atan,
    Atan2,
    Cos,
    Cot,
    Sin,
    Tan,
}

/// A standard math/trig call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MathCall {
    pub function: MathFunction,
    pub args: Vec<Expr>,
    pub position: Option<Position>,
}

/// The ADQL geometry function set
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum GeometryFunction {
    Area,
    Box,
    Centroid,
    Circle,
    Contains,
    Coord1,
    Coord2,
    CoordSys,
    Distance,
    Intersects,
    Point,
    Polygon,
    Region,
}

impl GeometryFunction {
    /// Whether the call produces a geometric value
    pub fn returns_geometry(&self) -> bool {
        matches!(
            self,
            GeometryFunction::Box
                | GeometryFunction::Centroid
                | GeometryFunction::Circle
                | GeometryFunction::Point
                | GeometryFunction::Polygon
                | GeometryFunction::Region
        )
    }

    /// Coarse categories of the value the call produces
    pub fn returns(&self) -> TypeCategories {
        match self {
            GeometryFunction::CoordSys => TypeCategories::STRING,
            GeometryFunction::Area
            | GeometryFunction::Contains
            | GeometryFunction::Coord1
            | GeometryFunction::Coord2
            | GeometryFunction::Distance
            | GeometryFunction::Intersects => TypeCategories::NUMERIC,
            _ => TypeCategories::GEOMETRY,
        }
    }
}

/// A geometry function call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryCall {
    pub function: GeometryFunction,
    pub args: Vec<Expr>,
    pub position: Option<Position>,
}

/// A user-defined function call
///
/// The parser produces a generic stub; the checker attaches the matched
/// registry definition, or marks the call deferred when some argument type
/// is still unresolved during the primary walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdfCall {
    pub name: Identifier,
    pub args: Vec<Expr>,
    pub position: Option<Position>,

    /// Matched function definition, written by the checker
    #[serde(skip)]
    pub binding: Option<Arc<FunctionDef>>,

    /// Set when resolution was postponed to the end-of-walk retry
    #[serde(skip)]
    pub deferred: bool,
}

impl UdfCall {
    pub fn new(name: Identifier, args: Vec<Expr>) -> Self {
        Self {
            name,
            args,
            position: None,
            binding: None,
            deferred: false,
        }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}

/// Membership test set: an explicit list or a sub-query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InSet {
    List(Vec<Expr>),
    Query(Box<Query>),
}

/// An ADQL value expression or search condition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Expr {
    /// Column reference (e.g. `ra` or `s.ra`)
    Column(ColumnRef),

    /// Literal value
    Literal(LiteralExpr),

    /// Binary operation (e.g. `a + b`, `x = 5`, `p AND q`)
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        position: Option<Position>,
    },

    /// Numeric negation (`-x`)
    Negation {
        operand: Box<Expr>,
        position: Option<Position>,
    },

    /// Logical negation (`NOT p`)
    Not {
        operand: Box<Expr>,
        position: Option<Position>,
    },

    /// `x IS [NOT] NULL`
    IsNull {
        operand: Box<Expr>,
        negated: bool,
        position: Option<Position>,
    },

    /// `x [NOT] BETWEEN low AND high`
    Between {
        operand: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
        position: Option<Position>,
    },

    /// `x [NOT] IN (...)`
    In {
        operand: Box<Expr>,
        set: InSet,
        negated: bool,
        position: Option<Position>,
    },

    /// `EXISTS (sub-query)`
    Exists {
        query: Box<Query>,
        position: Option<Position>,
    },

    /// Aggregate call
    Aggregate(AggregateCall),

    /// Standard math/trig call
    Math(MathCall),

    /// Geometry call
    Geometry(GeometryCall),

    /// User-defined function call
    Udf(UdfCall),
}

impl Expr {
    /// Source position of this node, when the parser recorded one
    pub fn position(&self) -> Option<Position> {
        match self {
            Expr::Column(c) => c.position,
            Expr::Literal(l) => l.position,
            Expr::BinaryOp { position, .. }
            | Expr::Negation { position, .. }
            | Expr::Not { position, .. }
            | Expr::IsNull { position, .. }
            | Expr::Between { position, .. }
            | Expr::In { position, .. }
            | Expr::Exists { position, .. } => *position,
            Expr::Aggregate(a) => a.position,
            Expr::Math(m) => m.position,
            Expr::Geometry(g) => g.position,
            Expr::Udf(u) => u.position,
        }
    }

    /// Coarse type categories of the value this expression produces
    ///
    /// Unresolved columns and unmatched UDF calls yield the all-true triplet.
    /// Predicates (comparisons, logic, EXISTS, ...) yield no category.
    pub fn type_categories(&self) -> TypeCategories {
        match self {
            Expr::Column(c) => c
                .binding
                .as_ref()
                .map(|col| TypeCategories::of(col.db_type()))
                .unwrap_or(TypeCategories::UNRESOLVED),
            Expr::Literal(l) => match l.value {
                Literal::Number(_) => TypeCategories::NUMERIC,
                Literal::String(_) => TypeCategories::STRING,
            },
            Expr::BinaryOp { op, .. } => {
                if op.is_arithmetic() {
                    TypeCategories::NUMERIC
                } else if *op == BinaryOp::Concat {
                    TypeCategories::STRING
                } else {
                    TypeCategories::NONE
                }
            }
            Expr::Negation { .. } => TypeCategories::NUMERIC,
            Expr::Not { .. }
            | Expr::IsNull { .. }
            | Expr::Between { .. }
            | Expr::In { .. }
            | Expr::Exists { .. } => TypeCategories::NONE,
            Expr::Aggregate(a) => match a.function {
                AggregateFunction::Count => TypeCategories::NUMERIC,
                AggregateFunction::Sum | AggregateFunction::Avg => TypeCategories::NUMERIC,
                AggregateFunction::Min | AggregateFunction::Max => a
                    .argument
                    .as_ref()
                    .map(|arg| arg.type_categories())
                    .unwrap_or(TypeCategories::UNRESOLVED),
            },
            Expr::Math(_) => TypeCategories::NUMERIC,
            Expr::Geometry(g) => g.function.returns(),
            Expr::Udf(u) => u
                .binding
                .as_ref()
                .map(|def| TypeCategories::of(def.return_type()))
                .unwrap_or(TypeCategories::UNRESOLVED),
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(c) => write!(f, "{}", c.name),
            Expr::Literal(l) => match &l.value {
                Literal::Number(n) => write!(f, "{n}"),
                Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            },
            Expr::BinaryOp {
                op, left, right, ..
            } => write!(f, "{left} {} {right}", op.symbol()),
            Expr::Negation { operand, .. } => write!(f, "-{operand}"),
            Expr::Not { operand, .. } => write!(f, "NOT {operand}"),
            Expr::IsNull {
                operand, negated, ..
            } => write!(
                f,
                "{operand} IS {}NULL",
                if *negated { "NOT " } else { "" }
            ),
            Expr::Between {
                operand,
                low,
                high,
                negated,
                ..
            } => write!(
                f,
                "{operand} {}BETWEEN {low} AND {high}",
                if *negated { "NOT " } else { "" }
            ),
            Expr::In {
                operand,
                set,
                negated,
                ..
            } => {
                write!(f, "{operand} {}IN (", if *negated { "NOT " } else { "" })?;
                match set {
                    InSet::List(items) => write_args(f, items)?,
                    InSet::Query(query) => write!(f, "{query}")?,
                }
                f.write_str(")")
            }
            Expr::Exists { query, .. } => write!(f, "EXISTS({query})"),
            Expr::Aggregate(a) => {
                write!(f, "{}(", a.function)?;
                if a.distinct {
                    f.write_str("DISTINCT ")?;
                }
                match &a.argument {
                    Some(arg) => write!(f, "{arg}")?,
                    None => f.write_str("*")?,
                }
                f.write_str(")")
            }
            Expr::Math(m) => {
                write!(f, "{}(", m.function)?;
                write_args(f, &m.args)?;
                f.write_str(")")
            }
            Expr::Geometry(g) => {
                write!(f, "{}(", g.function)?;
                write_args(f, &g.args)?;
                f.write_str(")")
            }
            Expr::Udf(u) => {
                write!(f, "{}(", u.name)?;
                write_args(f, &u.args)?;
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str) -> Expr {
        Expr::Column(ColumnRef::new(ColumnName::split(name).unwrap()))
    }

    fn num(value: f64) -> Expr {
        Expr::Literal(LiteralExpr {
            value: Literal::Number(value),
            position: None,
        })
    }

    #[test]
    fn test_column_name_split() {
        let name = ColumnName::split("public.stars.ra").unwrap();
        assert_eq!(name.column.text(), "ra");
        let qualifier = name.qualifier.unwrap();
        assert_eq!(qualifier.table.text(), "stars");
        assert_eq!(qualifier.schema.unwrap().text(), "public");
    }

    #[test]
    fn test_unresolved_column_categories() {
        let expr = col("ra");
        assert!(expr.type_categories().is_unresolved());
    }

    #[test]
    fn test_literal_categories() {
        assert_eq!(num(1.0).type_categories(), TypeCategories::NUMERIC);
        let s = Expr::Literal(LiteralExpr {
            value: Literal::String("ICRS".to_string()),
            position: None,
        });
        assert_eq!(s.type_categories(), TypeCategories::STRING);
    }

    #[test]
    fn test_geometry_categories() {
        let point = Expr::Geometry(GeometryCall {
            function: GeometryFunction::Point,
            args: vec![],
            position: None,
        });
        assert_eq!(point.type_categories(), TypeCategories::GEOMETRY);

        let distance = Expr::Geometry(GeometryCall {
            function: GeometryFunction::Distance,
            args: vec![],
            position: None,
        });
        assert_eq!(distance.type_categories(), TypeCategories::NUMERIC);
    }

    #[test]
    fn test_display_arithmetic() {
        let expr = Expr::BinaryOp {
            op: BinaryOp::Add,
            left: Box::new(col("ra")),
            right: Box::new(num(0.5)),
            position: None,
        };
        assert_eq!(expr.to_string(), "ra + 0.5");
    }

    #[test]
    fn test_display_aggregate() {
        let count = Expr::Aggregate(AggregateCall {
            function: AggregateFunction::Count,
            distinct: false,
            argument: None,
            position: None,
        });
        assert_eq!(count.to_string(), "COUNT(*)");
    }

    #[test]
    fn test_display_geometry() {
        let expr = Expr::Geometry(GeometryCall {
            function: GeometryFunction::Point,
            args: vec![
                Expr::Literal(LiteralExpr {
                    value: Literal::String("ICRS".to_string()),
                    position: None,
                }),
                col("ra"),
                col("dec"),
            ],
            position: None,
        });
        assert_eq!(expr.to_string(), "POINT('ICRS', ra, dec)");
    }

    #[test]
    fn test_display_string_escaping() {
        let expr = Expr::Literal(LiteralExpr {
            value: Literal::String("O'Neill".to_string()),
            position: None,
        });
        assert_eq!(expr.to_string(), "'O''Neill'");
    }

    #[test]
    fn test_geometry_function_names() {
        assert_eq!(GeometryFunction::CoordSys.to_string(), "COORDSYS");
        assert_eq!(GeometryFunction::Coord1.to_string(), "COORD1");
        assert_eq!(
            "intersects".parse::<GeometryFunction>().unwrap(),
            GeometryFunction::Intersects
        );
    }
}
