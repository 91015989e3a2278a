//! Deferred column expressions.
//!
//! An [`Expr`] names columns instead of holding data, so feature definitions can be written
//! before any table exists. [`Expr::bind`] resolves names and checks types against a concrete
//! [`Schema`]; the resulting [`BoundExpr`] is evaluated row by row.

use std::error::Error;
use std::fmt::{self, Write};
use std::ops::{Add, Div, Mul, Sub};

use crate::table::{DataType, Schema, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseArm {
    pub when: Value,
    pub then: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    Literal(Value),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// First arm whose `when` equals the discriminant wins; no match yields null.
    Cases {
        discriminant: Box<Expr>,
        arms: Vec<CaseArm>,
    },
}

pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

impl Expr {
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Use `self` as the discriminant of an ordered case list.
    pub fn cases<V, I>(self, arms: I) -> Expr
    where
        V: Into<Value>,
        I: IntoIterator<Item = (V, Expr)>,
    {
        Expr::Cases {
            discriminant: Box::new(self),
            arms: arms
                .into_iter()
                .map(|(when, then)| CaseArm {
                    when: when.into(),
                    then,
                })
                .collect(),
        }
    }

    /// Column names referenced by this expression, in first-seen order.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Column(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expr::Literal(_) => {}
            Expr::Binary { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::Cases { discriminant, arms } => {
                discriminant.collect_columns(out);
                for arm in arms {
                    arm.then.collect_columns(out);
                }
            }
        }
    }

    pub fn bind(&self, schema: &Schema) -> Result<BoundExpr, ExprError> {
        let (node, data_type) = bind_node(self, schema)?;
        let data_type = data_type.ok_or(ExprError::UntypedNull)?;
        Ok(BoundExpr { node, data_type })
    }

    /// Render as a DuckDB SQL expression.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        self.write_sql(&mut out);
        out
    }

    fn write_sql(&self, out: &mut String) {
        match self {
            Expr::Column(name) => out.push_str(&quote_identifier(name)),
            Expr::Literal(value) => out.push_str(&sql_literal(value)),
            Expr::Binary {
                op: BinaryOp::Div,
                left,
                right,
            } => {
                out.push('(');
                left.write_sql(out);
                out.push_str(" / NULLIF(");
                right.write_sql(out);
                out.push_str(", 0))");
            }
            Expr::Binary { op, left, right } => {
                out.push('(');
                left.write_sql(out);
                let _ = write!(out, " {} ", op.symbol());
                right.write_sql(out);
                out.push(')');
            }
            Expr::Cases { discriminant, arms } => {
                out.push_str("CASE ");
                discriminant.write_sql(out);
                for arm in arms {
                    let _ = write!(out, " WHEN {} THEN ", sql_literal(&arm.when));
                    arm.then.write_sql(out);
                }
                out.push_str(" ELSE NULL END");
            }
        }
    }
}

pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Int(v) => v.to_string(),
        Value::Float(v) if v.is_finite() => format!("{v:?}"),
        Value::Float(_) => "NULL".to_string(),
        Value::Text(v) => format!("'{}'", v.replace('\'', "''")),
    }
}

impl Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Add, self, rhs)
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Sub, self, rhs)
    }
}

impl Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Mul, self, rhs)
    }
}

impl Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Div, self, rhs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprError {
    MissingColumn(String),
    NonNumericOperand {
        op: &'static str,
        data_type: DataType,
    },
    CaseValueMismatch {
        discriminant: DataType,
        value: DataType,
    },
    CaseResultMismatch {
        expected: DataType,
        actual: DataType,
    },
    EmptyCases,
    UntypedNull,
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::MissingColumn(name) => write!(f, "column '{name}' not found"),
            ExprError::NonNumericOperand { op, data_type } => {
                write!(f, "operator '{op}' needs numeric operands, got {data_type}")
            }
            ExprError::CaseValueMismatch {
                discriminant,
                value,
            } => write!(
                f,
                "case value of type {value} cannot match discriminant of type {discriminant}"
            ),
            ExprError::CaseResultMismatch { expected, actual } => {
                write!(f, "case results mix {expected} and {actual}")
            }
            ExprError::EmptyCases => write!(f, "cases needs at least one arm"),
            ExprError::UntypedNull => write!(f, "expression type cannot be inferred from NULL"),
        }
    }
}

impl Error for ExprError {}

#[derive(Debug, Clone)]
enum Node {
    Column(usize),
    Literal(Value),
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Cases {
        discriminant: Box<Node>,
        arms: Vec<(Value, Node)>,
    },
}

fn comparable(a: DataType, b: DataType) -> bool {
    a == b || (a.is_numeric() && b.is_numeric())
}

fn unify(acc: Option<DataType>, next: Option<DataType>) -> Result<Option<DataType>, ExprError> {
    match (acc, next) {
        (None, t) | (t, None) => Ok(t),
        (Some(a), Some(b)) if a == b => Ok(Some(a)),
        (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => Ok(Some(DataType::Float)),
        (Some(a), Some(b)) => Err(ExprError::CaseResultMismatch {
            expected: a,
            actual: b,
        }),
    }
}

fn bind_node(expr: &Expr, schema: &Schema) -> Result<(Node, Option<DataType>), ExprError> {
    match expr {
        Expr::Column(name) => {
            let idx = schema
                .index_of(name)
                .ok_or_else(|| ExprError::MissingColumn(name.clone()))?;
            Ok((Node::Column(idx), Some(schema.fields()[idx].data_type)))
        }
        Expr::Literal(value) => Ok((Node::Literal(value.clone()), value.data_type())),
        Expr::Binary { op, left, right } => {
            let (left_node, left_type) = bind_node(left, schema)?;
            let (right_node, right_type) = bind_node(right, schema)?;

            for t in [left_type, right_type].into_iter().flatten() {
                if !t.is_numeric() {
                    return Err(ExprError::NonNumericOperand {
                        op: op.symbol(),
                        data_type: t,
                    });
                }
            }

            let data_type = match op {
                BinaryOp::Div => DataType::Float,
                _ if left_type == Some(DataType::Int) && right_type == Some(DataType::Int) => {
                    DataType::Int
                }
                _ if left_type.is_none() && right_type.is_none() => return Err(ExprError::UntypedNull),
                _ if left_type == Some(DataType::Float) || right_type == Some(DataType::Float) => {
                    DataType::Float
                }
                _ => DataType::Int,
            };

            Ok((
                Node::Binary {
                    op: *op,
                    left: Box::new(left_node),
                    right: Box::new(right_node),
                },
                Some(data_type),
            ))
        }
        Expr::Cases { discriminant, arms } => {
            if arms.is_empty() {
                return Err(ExprError::EmptyCases);
            }

            let (disc_node, disc_type) = bind_node(discriminant, schema)?;
            let mut bound_arms = Vec::with_capacity(arms.len());
            let mut result_type = None;

            for arm in arms {
                if let (Some(d), Some(v)) = (disc_type, arm.when.data_type())
                    && !comparable(d, v)
                {
                    return Err(ExprError::CaseValueMismatch {
                        discriminant: d,
                        value: v,
                    });
                }

                let (then_node, then_type) = bind_node(&arm.then, schema)?;
                result_type = unify(result_type, then_type)?;
                bound_arms.push((arm.when.clone(), then_node));
            }

            Ok((
                Node::Cases {
                    discriminant: Box::new(disc_node),
                    arms: bound_arms,
                },
                result_type,
            ))
        }
    }
}

/// Per-expression anomaly counters gathered during evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalStats {
    /// Rows where arithmetic was undefined (division by zero, overflow, non-finite result).
    pub undefined: usize,
    /// Rows where no case arm matched the discriminant.
    pub unmatched: usize,
}

/// An expression resolved against a schema; evaluates against that schema's column layout.
#[derive(Debug, Clone)]
pub struct BoundExpr {
    node: Node,
    data_type: DataType,
}

impl BoundExpr {
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// `columns` are the columns of a table with the schema this expression was bound to.
    pub(crate) fn eval(
        &self,
        columns: &[Vec<Value>],
        row: usize,
        stats: &mut EvalStats,
    ) -> Value {
        let value = eval_node(&self.node, columns, row, stats);
        match (value, self.data_type) {
            (Value::Int(v), DataType::Float) => Value::Float(v as f64),
            (value, _) => value,
        }
    }
}

fn eval_node(node: &Node, columns: &[Vec<Value>], row: usize, stats: &mut EvalStats) -> Value {
    match node {
        Node::Column(idx) => columns[*idx][row].clone(),
        Node::Literal(value) => value.clone(),
        Node::Binary { op, left, right } => {
            let l = eval_node(left, columns, row, stats);
            let r = eval_node(right, columns, row, stats);
            apply(*op, &l, &r, stats)
        }
        Node::Cases { discriminant, arms } => {
            let d = eval_node(discriminant, columns, row, stats);
            if d.is_null() {
                stats.unmatched += 1;
                return Value::Null;
            }
            match arms.iter().find(|(when, _)| d.matches(when)) {
                Some((_, then)) => eval_node(then, columns, row, stats),
                None => {
                    stats.unmatched += 1;
                    Value::Null
                }
            }
        }
    }
}

fn apply(op: BinaryOp, l: &Value, r: &Value, stats: &mut EvalStats) -> Value {
    if l.is_null() || r.is_null() {
        return Value::Null;
    }

    let result = match (op, l, r) {
        (BinaryOp::Add, Value::Int(a), Value::Int(b)) => a.checked_add(*b).map(Value::Int),
        (BinaryOp::Sub, Value::Int(a), Value::Int(b)) => a.checked_sub(*b).map(Value::Int),
        (BinaryOp::Mul, Value::Int(a), Value::Int(b)) => a.checked_mul(*b).map(Value::Int),
        _ => match (l.as_f64(), r.as_f64()) {
            (Some(_), Some(b)) if op == BinaryOp::Div && b == 0.0 => None,
            (Some(a), Some(b)) => {
                let v = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                };
                v.is_finite().then_some(Value::Float(v))
            }
            _ => return Value::Null,
        },
    };

    result.unwrap_or_else(|| {
        stats.undefined += 1;
        Value::Null
    })
}
