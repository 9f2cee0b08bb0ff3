//! Evaluation of resolved formulas.
//!
//! Values are numbers or (nested) arrays. Arithmetic broadcasts a scalar
//! over an array and combines two arrays element by element; shapes must
//! agree. Division follows f64 semantics, so `x / 0` is infinite rather than
//! an error.

use crate::builtins;

use super::error::{EngineError, Result};
use super::formula::{BinaryOp, UnaryOp};
use super::resolve::Resolved;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    Array(Vec<Value>),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Array(_) => None,
        }
    }

    /// Append every number in this value, depth first.
    pub fn flatten_into(&self, out: &mut Vec<f64>) {
        match self {
            Value::Number(n) => out.push(*n),
            Value::Array(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
        }
    }
}

pub fn evaluate(expr: &Resolved) -> Result<Value> {
    match expr {
        Resolved::Number(n) => Ok(Value::Number(*n)),
        Resolved::Text(text) => Err(EngineError::NotANumber(text.clone())),
        Resolved::Name(name) => Err(EngineError::UnknownIdentifier(name.clone())),
        Resolved::Array(items) => items
            .iter()
            .map(evaluate)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Resolved::Group(inner) => evaluate(inner),
        Resolved::Unary { op, operand } => {
            let value = evaluate(operand)?;
            Ok(match op {
                UnaryOp::Plus => value,
                UnaryOp::Minus => map_unary(value, |n| -n),
            })
        }
        Resolved::Binary { left, op, right } => {
            let l = evaluate(left)?;
            let r = evaluate(right)?;
            broadcast(l, r, *op)
        }
        Resolved::Call { name, args } => {
            let builtin =
                builtins::lookup(name).ok_or_else(|| EngineError::UnknownFunction(name.clone()))?;
            let values = args.iter().map(evaluate).collect::<Result<Vec<_>>>()?;
            builtins::call_builtin(builtin, &values)
        }
    }
}

fn map_unary(value: Value, f: fn(f64) -> f64) -> Value {
    match value {
        Value::Number(n) => Value::Number(f(n)),
        Value::Array(items) => Value::Array(items.into_iter().map(|v| map_unary(v, f)).collect()),
    }
}

fn apply(op: BinaryOp, a: f64, b: f64) -> f64 {
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Pow => a.powf(b),
    }
}

fn broadcast(left: Value, right: Value, op: BinaryOp) -> Result<Value> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(apply(op, a, b))),
        (Value::Array(items), scalar @ Value::Number(_)) => items
            .into_iter()
            .map(|item| broadcast(item, scalar.clone(), op))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        (scalar @ Value::Number(_), Value::Array(items)) => items
            .into_iter()
            .map(|item| broadcast(scalar.clone(), item, op))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        (Value::Array(ls), Value::Array(rs)) => {
            if ls.len() != rs.len() {
                return Err(EngineError::ShapeMismatch(format!(
                    "'{}' on arrays of length {} and {}",
                    op.symbol(),
                    ls.len(),
                    rs.len()
                )));
            }
            ls.into_iter()
                .zip(rs)
                .map(|(l, r)| broadcast(l, r, op))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
    }
}
