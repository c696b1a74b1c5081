//! The function library available inside template actions.
//!
//! Most helpers are pure: they map their evaluated arguments to a value and
//! are stored as plain function pointers. A handful need the executor itself
//! (`and`/`or` evaluate lazily, `include` and `tpl` run other templates,
//! `required` and `fail` look at the render options); those are tagged
//! variants of [`Func`] that the executor dispatches with its own context.
//!
//! Pipeline arguments arrive last, so `{{ .name | default "x" }}` calls
//! `default` with `["x", name]`.

mod builtins;
mod collections;
pub(crate) mod context;
mod conversion;
mod math;
mod strings;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use yamltpl_values::Value;

use crate::error::FuncError;

/// Signature of a pure helper.
pub(crate) type Builtin = fn(&[Value]) -> Result<Value, FuncError>;

/// A registered function.
#[derive(Clone, Copy)]
pub(crate) enum Func {
    Pure(Builtin),
    And,
    Or,
    Include,
    Tpl,
    Required,
    Fail,
}

pub(crate) type Registry = HashMap<&'static str, Func>;

static FUNCS: Lazy<Registry> = Lazy::new(|| {
    let mut registry = Registry::new();
    builtins::register(&mut registry);
    strings::register(&mut registry);
    math::register(&mut registry);
    collections::register(&mut registry);
    conversion::register(&mut registry);
    context::register(&mut registry);
    registry
});

/// Looks a function up by name.
pub(crate) fn lookup(name: &str) -> Option<Func> {
    FUNCS.get(name).copied()
}

/// Names of every function templates may call, sorted.
pub fn function_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = FUNCS.keys().copied().collect();
    names.sort_unstable();
    names
}

/// Fails unless exactly `want` arguments were passed.
fn expect_args<'a, const N: usize>(
    name: &'static str,
    want: &'static str,
    args: &'a [Value],
) -> Result<&'a [Value; N], FuncError> {
    args.try_into()
        .map_err(|_| FuncError::arity(name, want, args.len()))
}

/// Renders an argument as a string parameter. `null` becomes the empty string.
fn str_arg(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reads an integer parameter, accepting floats and numeric strings.
fn int_arg(name: &str, value: &Value) -> Result<i64, FuncError> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Float(f) => Ok(*f as i64),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| FuncError::message(format!("{}: cannot use {:?} as an integer", name, s))),
        other => Err(FuncError::message(format!(
            "{}: cannot use {} as an integer",
            name,
            other.type_name()
        ))),
    }
}
