//! Arithmetic helpers.
//!
//! Integer arithmetic is used when every operand is an integer; otherwise the
//! operands are widened to floats. Numeric strings (as produced by `--set`)
//! are accepted.

use yamltpl_values::Value;

use super::{expect_args, Func, Registry};
use crate::error::FuncError;

pub(super) fn register(registry: &mut Registry) {
    registry.insert("add", Func::Pure(add));
    registry.insert("sub", Func::Pure(sub));
    registry.insert("mul", Func::Pure(mul));
    registry.insert("div", Func::Pure(div));
    registry.insert("mod", Func::Pure(modulo));
    registry.insert("max", Func::Pure(max));
    registry.insert("min", Func::Pure(min));
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

impl From<Num> for Value {
    fn from(n: Num) -> Self {
        match n {
            Num::Int(i) => Value::Int(i),
            Num::Float(f) => Value::Float(f),
        }
    }
}

fn num(name: &str, value: &Value) -> Result<Num, FuncError> {
    match value {
        Value::Int(i) => Ok(Num::Int(*i)),
        Value::Float(f) => Ok(Num::Float(*f)),
        Value::Null => Ok(Num::Int(0)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(Num::Int)
                .or_else(|_| s.parse::<f64>().map(Num::Float))
                .map_err(|_| FuncError::message(format!("{}: cannot use {:?} as a number", name, s)))
        }
        other => Err(FuncError::message(format!(
            "{}: cannot use {} as a number",
            name,
            other.type_name()
        ))),
    }
}

fn overflow(name: &str) -> FuncError {
    FuncError::message(format!("{}: integer overflow", name))
}

/// Applies `int` when both operands are integers and `float` otherwise.
fn binary(
    name: &str,
    a: Num,
    b: Num,
    int: fn(i64, i64) -> Option<i64>,
    float: fn(f64, f64) -> f64,
) -> Result<Num, FuncError> {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => int(x, y).map(Num::Int).ok_or_else(|| overflow(name)),
        _ => Ok(Num::Float(float(a.as_f64(), b.as_f64()))),
    }
}

fn fold(
    name: &str,
    args: &[Value],
    start: Num,
    int: fn(i64, i64) -> Option<i64>,
    float: fn(f64, f64) -> f64,
) -> Result<Value, FuncError> {
    let mut acc = start;
    for arg in args {
        acc = binary(name, acc, num(name, arg)?, int, float)?;
    }
    Ok(acc.into())
}

fn add(args: &[Value]) -> Result<Value, FuncError> {
    fold("add", args, Num::Int(0), i64::checked_add, |x, y| x + y)
}

fn mul(args: &[Value]) -> Result<Value, FuncError> {
    if args.is_empty() {
        return Err(FuncError::arity("mul", "at least 1", 0));
    }
    fold("mul", args, Num::Int(1), i64::checked_mul, |x, y| x * y)
}

fn sub(args: &[Value]) -> Result<Value, FuncError> {
    let [a, b] = expect_args::<2>("sub", "2", args)?;
    Ok(binary("sub", num("sub", a)?, num("sub", b)?, i64::checked_sub, |x, y| x - y)?.into())
}

fn is_zero(n: Num) -> bool {
    n.as_f64() == 0.0
}

fn div(args: &[Value]) -> Result<Value, FuncError> {
    let [a, b] = expect_args::<2>("div", "2", args)?;
    let (a, b) = (num("div", a)?, num("div", b)?);
    if is_zero(b) {
        return Err(FuncError::message("div: division by zero"));
    }
    Ok(binary("div", a, b, i64::checked_div, |x, y| x / y)?.into())
}

fn modulo(args: &[Value]) -> Result<Value, FuncError> {
    let [a, b] = expect_args::<2>("mod", "2", args)?;
    let (a, b) = (num("mod", a)?, num("mod", b)?);
    if is_zero(b) {
        return Err(FuncError::message("mod: division by zero"));
    }
    Ok(binary("mod", a, b, i64::checked_rem, |x, y| x % y)?.into())
}

fn extreme(name: &'static str, args: &[Value], pick_new: fn(f64, f64) -> bool) -> Result<Value, FuncError> {
    let Some((first, rest)) = args.split_first() else {
        return Err(FuncError::arity(name, "at least 1", 0));
    };
    let mut best = num(name, first)?;
    for arg in rest {
        let candidate = num(name, arg)?;
        if pick_new(candidate.as_f64(), best.as_f64()) {
            best = candidate;
        }
    }
    Ok(best.into())
}

fn max(args: &[Value]) -> Result<Value, FuncError> {
    extreme("max", args, |candidate, best| candidate > best)
}

fn min(args: &[Value]) -> Result<Value, FuncError> {
    extreme("min", args, |candidate, best| candidate < best)
}
