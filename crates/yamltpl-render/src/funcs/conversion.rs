//! Type conversion and serialization helpers.

use yamltpl_values::{Mapping, Value};

use super::{expect_args, str_arg, Func, Registry};
use crate::error::FuncError;

pub(super) fn register(registry: &mut Registry) {
    registry.insert("toString", Func::Pure(to_string));
    registry.insert("int", Func::Pure(to_int));
    registry.insert("float64", Func::Pure(to_float));
    registry.insert("toYaml", Func::Pure(to_yaml));
    registry.insert("toJson", Func::Pure(to_json));
    registry.insert("fromYaml", Func::Pure(from_yaml));
}

fn to_string(args: &[Value]) -> Result<Value, FuncError> {
    let [value] = expect_args::<1>("toString", "1", args)?;
    Ok(Value::String(str_arg(value)))
}

/// Lenient integer conversion: anything unconvertible becomes 0.
fn to_int(args: &[Value]) -> Result<Value, FuncError> {
    let [value] = expect_args::<1>("int", "1", args)?;
    let int = match value {
        Value::Int(i) => *i,
        Value::Float(f) => *f as i64,
        Value::Bool(b) => i64::from(*b),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .or_else(|_| s.parse::<f64>().map(|f| f as i64))
                .unwrap_or(0)
        }
        _ => 0,
    };
    Ok(Value::Int(int))
}

/// Lenient float conversion: anything unconvertible becomes 0.
fn to_float(args: &[Value]) -> Result<Value, FuncError> {
    let [value] = expect_args::<1>("float64", "1", args)?;
    let float = match value {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(Value::Float(float))
}

fn to_yaml(args: &[Value]) -> Result<Value, FuncError> {
    let [value] = expect_args::<1>("toYaml", "1", args)?;
    let text = serde_yaml::to_string(value).map_err(|e| FuncError::message(format!("toYaml: {}", e)))?;
    Ok(Value::String(text.trim_end_matches('\n').to_string()))
}

fn to_json(args: &[Value]) -> Result<Value, FuncError> {
    let [value] = expect_args::<1>("toJson", "1", args)?;
    let text = serde_json::to_string(value).map_err(|e| FuncError::message(format!("toJson: {}", e)))?;
    Ok(Value::String(text))
}

/// Parses YAML into a value. A parse failure yields `{Error: <message>}`
/// instead of failing the render.
fn from_yaml(args: &[Value]) -> Result<Value, FuncError> {
    let [text] = expect_args::<1>("fromYaml", "1", args)?;
    match serde_yaml::from_str::<Value>(&str_arg(text)) {
        Ok(value) => Ok(value),
        Err(err) => {
            let mut map = Mapping::new();
            map.insert("Error".to_string(), Value::String(err.to_string()));
            Ok(Value::Map(map))
        }
    }
}
