//! Built-in spreadsheet functions and their metadata.
//!
//! Conventions:
//! - Spreadsheet-facing names are ALL CAPS (e.g. `SUM`, `MEAN`) and are
//!   matched case-sensitively.
//! - Each translates 1:1 to a lower-case evaluator name (e.g. `sum`); formulas
//!   may use either spelling.
//! - If you add a new built-in, add it to `BUILTINS` and give it a kernel in
//!   `call_builtin`.

use crate::engine::{EngineError, Value};

/// How a built-in consumes its arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    /// Any mix of scalars and (nested) arrays, all flattened into one series.
    Aggregate,
    /// Exactly two series. A single multi-column range is split into one
    /// argument per column.
    PairedSeries,
}

pub struct Builtin {
    pub sheet_name: &'static str,
    pub eval_name: &'static str,
    pub arity: Arity,
    pub description: &'static str,
}

pub const BUILTINS: &[Builtin] = &[
    Builtin {
        sheet_name: "SUM",
        eval_name: "sum",
        arity: Arity::Aggregate,
        description: "Sum of all values",
    },
    Builtin {
        sheet_name: "MAX",
        eval_name: "max",
        arity: Arity::Aggregate,
        description: "Largest value",
    },
    Builtin {
        sheet_name: "MIN",
        eval_name: "min",
        arity: Arity::Aggregate,
        description: "Smallest value",
    },
    Builtin {
        sheet_name: "MEAN",
        eval_name: "mean",
        arity: Arity::Aggregate,
        description: "Arithmetic mean",
    },
    Builtin {
        sheet_name: "MEDIAN",
        eval_name: "median",
        arity: Arity::Aggregate,
        description: "Middle value (mean of the two middle values for even counts)",
    },
    Builtin {
        sheet_name: "STD",
        eval_name: "std",
        arity: Arity::Aggregate,
        description: "Sample standard deviation",
    },
    Builtin {
        sheet_name: "VARIANCE",
        eval_name: "variance",
        arity: Arity::Aggregate,
        description: "Sample variance",
    },
    Builtin {
        sheet_name: "CORR",
        eval_name: "corr",
        arity: Arity::PairedSeries,
        description: "Pearson correlation of two series",
    },
    Builtin {
        sheet_name: "COV",
        eval_name: "cov",
        arity: Arity::PairedSeries,
        description: "Sample covariance of two series",
    },
];

/// Look up a built-in by its spreadsheet name or its evaluator name.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS
        .iter()
        .find(|b| b.sheet_name == name || b.eval_name == name)
}

/// Spreadsheet name and one-line description of every built-in, in table
/// order.
pub fn function_help() -> impl Iterator<Item = (&'static str, &'static str)> {
    BUILTINS.iter().map(|b| (b.sheet_name, b.description))
}

/// Apply a built-in to already-evaluated arguments.
pub fn call_builtin(builtin: &Builtin, args: &[Value]) -> Result<Value, EngineError> {
    let name = builtin.eval_name;
    let n = match builtin.arity {
        Arity::Aggregate => {
            let values = flatten(args);
            match name {
                "sum" => values.iter().sum::<f64>(),
                "max" => non_empty(name, &values)?
                    .iter()
                    .copied()
                    .fold(f64::NEG_INFINITY, f64::max),
                "min" => non_empty(name, &values)?
                    .iter()
                    .copied()
                    .fold(f64::INFINITY, f64::min),
                "mean" => mean(non_empty(name, &values)?),
                "median" => median(non_empty(name, &values)?),
                "variance" => variance(non_empty(name, &values)?),
                "std" => variance(non_empty(name, &values)?).sqrt(),
                _ => return Err(EngineError::UnknownFunction(name.to_string())),
            }
        }
        Arity::PairedSeries => {
            let (xs, ys) = paired(name, args)?;
            match name {
                "cov" => covariance(&xs, &ys),
                "corr" => covariance(&xs, &ys) / (variance(&xs).sqrt() * variance(&ys).sqrt()),
                _ => return Err(EngineError::UnknownFunction(name.to_string())),
            }
        }
    };
    Ok(Value::Number(n))
}

fn flatten(args: &[Value]) -> Vec<f64> {
    let mut out = Vec::new();
    for arg in args {
        arg.flatten_into(&mut out);
    }
    out
}

fn non_empty<'a>(name: &str, values: &'a [f64]) -> Result<&'a [f64], EngineError> {
    if values.is_empty() {
        return Err(EngineError::invalid_args(name, "needs at least one value"));
    }
    Ok(values)
}

fn paired(name: &str, args: &[Value]) -> Result<(Vec<f64>, Vec<f64>), EngineError> {
    let [x, y] = args else {
        return Err(EngineError::invalid_args(
            name,
            format!("expects two series, got {}", args.len()),
        ));
    };
    let (xs, ys) = (flatten(std::slice::from_ref(x)), flatten(std::slice::from_ref(y)));
    if xs.len() != ys.len() {
        return Err(EngineError::invalid_args(
            name,
            format!("series lengths differ ({} vs {})", xs.len(), ys.len()),
        ));
    }
    if xs.is_empty() {
        return Err(EngineError::invalid_args(name, "series are empty"));
    }
    Ok((xs, ys))
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len().is_multiple_of(2) {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Sample variance (n - 1). A single value yields NaN.
fn variance(values: &[f64]) -> f64 {
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    ss / (values.len() as f64 - 1.0)
}

fn covariance(xs: &[f64], ys: &[f64]) -> f64 {
    let (mx, my) = (mean(xs), mean(ys));
    let s: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    s / (xs.len() as f64 - 1.0)
}
