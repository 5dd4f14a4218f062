// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Expression and filter tree compiled into SQL.
//!
//! # Paths
//!
//! Field references are `__`-separated paths: the first segment names a field
//! of the base model, an annotation, or a join alias followed by a field of
//! the joined model; the remaining segments are transforms such as `0`,
//! `1_3`, `len`, `keys`, a map key, a tuple element or a date part. In
//! filters the last segment may be a lookup; `exact` is implied otherwise.
//!
//! ```rust
//! use clickhouse_backend_sql::expr::{Expr, Q};
//!
//! let filter = Q::filter("ip__contains", "1.2") & !Q::filter("port__lt", 1024);
//! let total = Expr::field("bytes") * Expr::literal(8);
//! # let _ = (filter, total);
//! ```

use std::ops::{Add, BitAnd, BitOr, Div, Mul, Not, Sub};

use clickhouse_backend_core::{Value, types::Field};

use crate::query::SelectQuery;

/// SQL text with the values bound to its `%s` placeholders, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    /// SQL text; literal percent signs are doubled.
    pub sql:    String,
    /// Positional parameters.
    pub params: Vec<Value>
}

impl Fragment {
    /// Fragment without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql:    sql.into(),
            params: Vec::new()
        }
    }

    /// Fragment with parameters.
    pub fn with_params(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params
        }
    }

    /// Single `%s` placeholder bound to `value`.
    #[must_use]
    pub fn param(value: Value) -> Self {
        Self::with_params("%s", vec![value])
    }

    /// Rewrite the SQL text, keeping the parameters.
    #[must_use]
    pub fn map(self, f: impl FnOnce(String) -> String) -> Self {
        Self {
            sql:    f(self.sql),
            params: self.params
        }
    }

    /// Join fragments with `sep`, concatenating parameters in order.
    pub fn join(parts: impl IntoIterator<Item = Self>, sep: &str) -> Self {
        let mut sql = Vec::new();
        let mut params = Vec::new();
        for part in parts {
            sql.push(part.sql);
            params.extend(part.params);
        }
        Self {
            sql: sql.join(sep),
            params
        }
    }
}

/// Role of a function call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuncKind {
    /// Row-wise function.
    Scalar,
    /// Aggregate function.
    Aggregate,
    /// Window-only function such as `row_number`.
    Window
}

/// Function call.
#[derive(Debug, Clone, PartialEq)]
pub struct Func {
    /// Function name.
    pub name:     String,
    /// Arguments.
    pub args:     Vec<Expr>,
    /// Parameters of a parametric aggregate, as in `quantile(0.9)(x)`.
    pub params:   Vec<Expr>,
    /// Role.
    pub kind:     FuncKind,
    /// `DISTINCT` argument list.
    pub distinct: bool,
    /// Aggregate filter, compiled to the `-If` combinator.
    pub filter:   Option<Box<Q>>,
    /// Result column type, used by lookups on the result.
    pub output:   Option<Field>
}

impl Func {
    /// Create a call.
    pub fn new(name: impl Into<String>, kind: FuncKind, args: Vec<Expr>) -> Self {
        Self {
            name: name.into(),
            args,
            params: Vec::new(),
            kind,
            distinct: false,
            filter: None,
            output: None
        }
    }

    /// Check if this is an aggregate call.
    #[must_use]
    pub const fn is_aggregate(&self) -> bool {
        matches!(self.kind, FuncKind::Aggregate)
    }
}

/// Frame unit of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameUnits {
    /// `ROWS`.
    Rows,
    /// `RANGE`.
    Range
}

/// Frame boundary of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBound {
    /// `UNBOUNDED PRECEDING`.
    UnboundedPreceding,
    /// `n PRECEDING`.
    Preceding(u64),
    /// `CURRENT ROW`.
    CurrentRow,
    /// `n FOLLOWING`.
    Following(u64),
    /// `UNBOUNDED FOLLOWING`.
    UnboundedFollowing
}

impl FrameBound {
    /// SQL text of the boundary.
    #[must_use]
    pub fn as_sql(&self) -> String {
        match self {
            Self::UnboundedPreceding => "UNBOUNDED PRECEDING".into(),
            Self::Preceding(n) => format!("{n} PRECEDING"),
            Self::CurrentRow => "CURRENT ROW".into(),
            Self::Following(n) => format!("{n} FOLLOWING"),
            Self::UnboundedFollowing => "UNBOUNDED FOLLOWING".into()
        }
    }
}

/// Window frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Unit.
    pub units: FrameUnits,
    /// Start boundary.
    pub start: FrameBound,
    /// End boundary; `CURRENT ROW` when absent.
    pub end:   Option<FrameBound>
}

impl Frame {
    /// `ROWS BETWEEN start AND end`.
    #[must_use]
    pub const fn rows(start: FrameBound, end: FrameBound) -> Self {
        Self {
            units: FrameUnits::Rows,
            start,
            end: Some(end)
        }
    }

    /// `RANGE BETWEEN start AND end`.
    #[must_use]
    pub const fn range(start: FrameBound, end: FrameBound) -> Self {
        Self {
            units: FrameUnits::Range,
            start,
            end: Some(end)
        }
    }

    /// SQL text of the frame.
    #[must_use]
    pub fn as_sql(&self) -> String {
        let units = match self.units {
            FrameUnits::Rows => "ROWS",
            FrameUnits::Range => "RANGE"
        };
        match self.end {
            Some(end) => format!(
                "{units} BETWEEN {} AND {}",
                self.start.as_sql(),
                end.as_sql()
            ),
            None => format!("{units} {}", self.start.as_sql())
        }
    }
}

/// `NULLS FIRST` / `NULLS LAST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    /// `NULLS FIRST`.
    First,
    /// `NULLS LAST`.
    Last
}

/// One `ORDER BY` item.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// Sort key.
    pub expr:       Expr,
    /// `DESC` instead of `ASC`.
    pub descending: bool,
    /// Placement of nulls.
    pub nulls:      Option<NullsOrder>
}

impl OrderBy {
    /// Ascending order.
    #[must_use]
    pub const fn asc(expr: Expr) -> Self {
        Self {
            expr,
            descending: false,
            nulls: None
        }
    }

    /// Descending order.
    #[must_use]
    pub const fn desc(expr: Expr) -> Self {
        Self {
            expr,
            descending: true,
            nulls: None
        }
    }

    /// Place nulls first or last.
    #[must_use]
    pub const fn nulls(mut self, nulls: NullsOrder) -> Self {
        self.nulls = Some(nulls);
        self
    }

    /// Parse `"name"` or `"-name"` into an order on a field path.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        match spec.strip_prefix('-') {
            Some(path) => Self::desc(Expr::field(path)),
            None => Self::asc(Expr::field(spec))
        }
    }
}

/// Window expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// Windowed expression, an aggregate or window function.
    pub expr:         Box<Expr>,
    /// `PARTITION BY` expressions.
    pub partition_by: Vec<Expr>,
    /// `ORDER BY` items.
    pub order_by:     Vec<OrderBy>,
    /// Frame clause.
    pub frame:        Option<Frame>
}

/// Arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`.
    Add,
    /// `-`.
    Sub,
    /// `*`.
    Mul,
    /// `/`.
    Div,
    /// `%`.
    Mod
}

impl BinaryOp {
    /// Operator text; the modulo sign is doubled for substitution.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%%"
        }
    }
}

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Field path, see the module docs.
    Field(String),
    /// Reference to a selected alias, rendered as the quoted alias.
    Ref(String),
    /// Value bound as a parameter.
    Value(Value),
    /// Value inlined as a literal.
    Literal(Value),
    /// Raw SQL with its own parameters.
    Raw(Fragment),
    /// `*`.
    Star,
    /// Function call.
    Func(Func),
    /// Windowed expression.
    Window(Window),
    /// Arithmetic.
    Binary {
        /// Operator.
        op:  BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>
    },
    /// `CAST(expr, 'type')`.
    Cast {
        /// Operand.
        expr:    Box<Expr>,
        /// Target type.
        db_type: String
    },
    /// `CASE WHEN ... THEN ... ELSE ... END`.
    Case {
        /// Conditions and results.
        whens:   Vec<(Q, Expr)>,
        /// `ELSE` result.
        default: Option<Box<Expr>>
    },
    /// Scalar subquery.
    Subquery(Box<SelectQuery>)
}

impl Expr {
    /// Field path reference.
    pub fn field(path: impl Into<String>) -> Self {
        Self::Field(path.into())
    }

    /// Selected alias reference.
    pub fn alias(name: impl Into<String>) -> Self {
        Self::Ref(name.into())
    }

    /// Parameter.
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    /// Inline literal.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Raw SQL without parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(Fragment::new(sql))
    }

    /// Scalar function call.
    pub fn func(name: impl Into<String>, args: Vec<Self>) -> Self {
        Self::Func(Func::new(name, FuncKind::Scalar, args))
    }

    /// Aggregate function call.
    pub fn aggregate(name: impl Into<String>, args: Vec<Self>) -> Self {
        Self::Func(Func::new(name, FuncKind::Aggregate, args))
    }

    /// `CAST(self, 'db_type')`.
    #[must_use]
    pub fn cast(self, db_type: impl Into<String>) -> Self {
        Self::Cast {
            expr:    Box::new(self),
            db_type: db_type.into()
        }
    }

    /// Wrap in `OVER (...)`.
    #[must_use]
    pub fn over(self) -> Window {
        Window {
            expr:         Box::new(self),
            partition_by: Vec::new(),
            order_by:     Vec::new(),
            frame:        None
        }
    }

    /// Mark an aggregate as `DISTINCT`.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        if let Self::Func(func) = &mut self {
            func.distinct = true;
        }
        self
    }

    /// Restrict an aggregate to rows matching `filter`.
    #[must_use]
    pub fn filter(mut self, filter: Q) -> Self {
        if let Self::Func(func) = &mut self {
            func.filter = Some(Box::new(filter));
        }
        self
    }

    /// Declare the result type of a function call.
    #[must_use]
    pub fn output(mut self, field: Field) -> Self {
        if let Self::Func(func) = &mut self {
            func.output = Some(field);
        }
        self
    }

    fn binary(op: BinaryOp, lhs: Self, rhs: Self) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs)
        }
    }

    /// `self % rhs`.
    #[must_use]
    pub fn modulo(self, rhs: Self) -> Self {
        Self::binary(BinaryOp::Mod, self, rhs)
    }
}

impl Window {
    /// Add `PARTITION BY` expressions.
    #[must_use]
    pub fn partition_by(mut self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        self.partition_by.extend(exprs);
        self
    }

    /// Add `ORDER BY` items.
    #[must_use]
    pub fn order_by(mut self, items: impl IntoIterator<Item = OrderBy>) -> Self {
        self.order_by.extend(items);
        self
    }

    /// Set the frame.
    #[must_use]
    pub const fn frame(mut self, frame: Frame) -> Self {
        self.frame = Some(frame);
        self
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Window> for Expr {
    fn from(window: Window) -> Self {
        Self::Window(window)
    }
}

macro_rules! impl_binary_op {
    ($($trait:ident $method:ident $op:ident),* $(,)?) => {
        $(
            impl $trait for Expr {
                type Output = Expr;

                fn $method(self, rhs: Expr) -> Expr {
                    Expr::binary(BinaryOp::$op, self, rhs)
                }
            }
        )*
    };
}

impl_binary_op!(Add add Add, Sub sub Sub, Mul mul Mul, Div div Div);

/// Right-hand side of a lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Rhs {
    /// Value, prepared by the field and bound as a parameter.
    Value(Value),
    /// Expression compiled in place.
    Expr(Expr),
    /// Subquery, for `in`.
    Query(Box<SelectQuery>)
}

impl From<Value> for Rhs {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Expr> for Rhs {
    fn from(expr: Expr) -> Self {
        Self::Expr(expr)
    }
}

/// Filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Q {
    /// `path__lookup` compared with a right-hand side.
    Lookup {
        /// Path ending with an optional lookup name.
        path: String,
        /// Right-hand side.
        rhs:  Rhs
    },
    /// Conjunction; empty is true.
    And(Vec<Q>),
    /// Disjunction; empty is false.
    Or(Vec<Q>),
    /// Negation.
    Not(Box<Q>),
    /// Boolean expression.
    Expr(Expr)
}

impl Q {
    /// Lookup with an arbitrary right-hand side.
    pub fn new(path: impl Into<String>, rhs: Rhs) -> Self {
        Self::Lookup {
            path: path.into(),
            rhs
        }
    }

    /// Lookup against a value.
    pub fn filter(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(path, Rhs::Value(value.into()))
    }

    /// Lookup against another expression.
    pub fn compare(path: impl Into<String>, expr: Expr) -> Self {
        Self::new(path, Rhs::Expr(expr))
    }

    /// Lookup against a subquery.
    pub fn subquery(path: impl Into<String>, query: SelectQuery) -> Self {
        Self::new(path, Rhs::Query(Box::new(query)))
    }
}

impl BitAnd for Q {
    type Output = Q;

    fn bitand(self, rhs: Q) -> Q {
        match self {
            Q::And(mut items) => {
                items.push(rhs);
                Q::And(items)
            }
            lhs => Q::And(vec![lhs, rhs])
        }
    }
}

impl BitOr for Q {
    type Output = Q;

    fn bitor(self, rhs: Q) -> Q {
        match self {
            Q::Or(mut items) => {
                items.push(rhs);
                Q::Or(items)
            }
            lhs => Q::Or(vec![lhs, rhs])
        }
    }
}

impl Not for Q {
    type Output = Q;

    fn not(self) -> Q {
        Q::Not(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_build_trees() {
        let q = Q::filter("a", 1) & Q::filter("b", 2) & Q::filter("c", 3);
        assert!(matches!(&q, Q::And(items) if items.len() == 3));
        let q = Q::filter("a", 1) | !Q::filter("b", 2);
        assert!(matches!(&q, Q::Or(items) if matches!(items[1], Q::Not(_))));
    }

    #[test]
    fn arithmetic() {
        let e = Expr::field("a") + Expr::literal(1);
        assert!(matches!(e, Expr::Binary { op: BinaryOp::Add, .. }));
        assert_eq!(BinaryOp::Mod.as_sql(), "%%");
    }

    #[test]
    fn frames() {
        let f = Frame::rows(FrameBound::Preceding(2), FrameBound::CurrentRow);
        assert_eq!(f.as_sql(), "ROWS BETWEEN 2 PRECEDING AND CURRENT ROW");
        let f = Frame {
            units: FrameUnits::Range,
            start: FrameBound::UnboundedPreceding,
            end:   None
        };
        assert_eq!(f.as_sql(), "RANGE UNBOUNDED PRECEDING");
    }

    #[test]
    fn order_parse() {
        assert_eq!(OrderBy::parse("-ts"), OrderBy::desc(Expr::field("ts")));
        assert!(!OrderBy::parse("ts").descending);
    }

    #[test]
    fn fragments_join_params_in_order() {
        let f = Fragment::join(
            [Fragment::param(Value::Int(1)), Fragment::new("x"), Fragment::param(Value::Int(2))],
            " + "
        );
        assert_eq!(f.sql, "%s + x + %s");
        assert_eq!(f.params, vec![Value::Int(1), Value::Int(2)]);
    }
}
