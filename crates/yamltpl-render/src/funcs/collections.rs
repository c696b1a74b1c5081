//! List, dictionary, and defaulting helpers.

use yamltpl_values::{Mapping, Value};

use super::{expect_args, str_arg, Func, Registry};
use crate::error::FuncError;

pub(super) fn register(registry: &mut Registry) {
    registry.insert("default", Func::Pure(default));
    registry.insert("empty", Func::Pure(empty));
    registry.insert("coalesce", Func::Pure(coalesce));
    registry.insert("ternary", Func::Pure(ternary));
    registry.insert("list", Func::Pure(list));
    registry.insert("dict", Func::Pure(dict));
    registry.insert("get", Func::Pure(get));
    registry.insert("hasKey", Func::Pure(has_key));
    registry.insert("keys", Func::Pure(keys));
    registry.insert("first", Func::Pure(first));
    registry.insert("last", Func::Pure(last));
    registry.insert("append", Func::Pure(append));
    registry.insert("has", Func::Pure(has));
}

/// `default FALLBACK [VALUE]`: the value, or the fallback when it is empty.
fn default(args: &[Value]) -> Result<Value, FuncError> {
    match args {
        [fallback] => Ok(fallback.clone()),
        [fallback, value] if !value.is_truthy() => Ok(fallback.clone()),
        [_, value] => Ok(value.clone()),
        _ => Err(FuncError::arity("default", "1 or 2", args.len())),
    }
}

fn empty(args: &[Value]) -> Result<Value, FuncError> {
    let [value] = expect_args::<1>("empty", "1", args)?;
    Ok(Value::Bool(!value.is_truthy()))
}

fn coalesce(args: &[Value]) -> Result<Value, FuncError> {
    Ok(args.iter().find(|v| v.is_truthy()).cloned().unwrap_or_default())
}

fn ternary(args: &[Value]) -> Result<Value, FuncError> {
    let [if_true, if_false, condition] = expect_args::<3>("ternary", "3", args)?;
    Ok(if condition.is_truthy() {
        if_true.clone()
    } else {
        if_false.clone()
    })
}

fn list(args: &[Value]) -> Result<Value, FuncError> {
    Ok(Value::Seq(args.to_vec()))
}

/// `dict K1 V1 K2 V2 ...`. A trailing key without a value maps to `""`.
fn dict(args: &[Value]) -> Result<Value, FuncError> {
    let mut map = Mapping::new();
    for pair in args.chunks(2) {
        let value = pair.get(1).cloned().unwrap_or_else(|| Value::from(""));
        map.insert(str_arg(&pair[0]), value);
    }
    Ok(Value::Map(map))
}

fn expect_map<'a>(name: &str, value: &'a Value) -> Result<&'a Mapping, FuncError> {
    value.as_map().ok_or_else(|| {
        FuncError::message(format!("{}: expected a map, got {}", name, value.type_name()))
    })
}

fn get(args: &[Value]) -> Result<Value, FuncError> {
    let [map, key] = expect_args::<2>("get", "2", args)?;
    let map = expect_map("get", map)?;
    Ok(map.get(&str_arg(key)).cloned().unwrap_or_else(|| Value::from("")))
}

fn has_key(args: &[Value]) -> Result<Value, FuncError> {
    let [map, key] = expect_args::<2>("hasKey", "2", args)?;
    Ok(Value::Bool(expect_map("hasKey", map)?.contains_key(&str_arg(key))))
}

fn keys(args: &[Value]) -> Result<Value, FuncError> {
    let mut out = Vec::new();
    for arg in args {
        out.extend(expect_map("keys", arg)?.keys().cloned().map(Value::String));
    }
    Ok(Value::Seq(out))
}

fn expect_seq<'a>(name: &str, value: &'a Value) -> Result<&'a [Value], FuncError> {
    match value {
        Value::Null => Ok(&[]),
        other => other.as_seq().ok_or_else(|| {
            FuncError::message(format!("{}: cannot use type {} as a list", name, other.type_name()))
        }),
    }
}

fn first(args: &[Value]) -> Result<Value, FuncError> {
    let [list] = expect_args::<1>("first", "1", args)?;
    Ok(expect_seq("first", list)?.first().cloned().unwrap_or_default())
}

fn last(args: &[Value]) -> Result<Value, FuncError> {
    let [list] = expect_args::<1>("last", "1", args)?;
    Ok(expect_seq("last", list)?.last().cloned().unwrap_or_default())
}

fn append(args: &[Value]) -> Result<Value, FuncError> {
    let [list, item] = expect_args::<2>("append", "2", args)?;
    let mut items = expect_seq("append", list)?.to_vec();
    items.push(item.clone());
    Ok(Value::Seq(items))
}

/// `has NEEDLE LIST`
fn has(args: &[Value]) -> Result<Value, FuncError> {
    let [needle, list] = expect_args::<2>("has", "2", args)?;
    Ok(Value::Bool(expect_seq("has", list)?.contains(needle)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::from(v)
    }

    fn sample_dict() -> Value {
        dict(&[s("b"), Value::Int(2), s("a"), Value::Int(1)]).unwrap()
    }

    #[test]
    fn test_default() {
        assert_eq!(default(&[s("x"), Value::Null]).unwrap(), s("x"));
        assert_eq!(default(&[s("x"), s("")]).unwrap(), s("x"));
        assert_eq!(default(&[s("x"), s("y")]).unwrap(), s("y"));
        assert_eq!(default(&[s("x")]).unwrap(), s("x"));
        assert_eq!(default(&[s("x"), Value::Bool(false)]).unwrap(), s("x"));
    }

    #[test]
    fn test_empty_coalesce_ternary() {
        assert_eq!(empty(&[Value::Seq(vec![])]).unwrap(), Value::Bool(true));
        assert_eq!(coalesce(&[Value::Null, s(""), s("z")]).unwrap(), s("z"));
        assert_eq!(coalesce(&[Value::Null]).unwrap(), Value::Null);
        assert_eq!(ternary(&[s("y"), s("n"), Value::Bool(true)]).unwrap(), s("y"));
    }

    #[test]
    fn test_dict_and_lookup() {
        let d = sample_dict();
        assert_eq!(get(&[d.clone(), s("a")]).unwrap(), Value::Int(1));
        assert_eq!(get(&[d.clone(), s("zz")]).unwrap(), s(""));
        assert_eq!(has_key(&[d.clone(), s("b")]).unwrap(), Value::Bool(true));
        assert_eq!(keys(&[d]).unwrap(), Value::Seq(vec![s("a"), s("b")]));
        assert!(get(&[s("nope"), s("a")]).is_err());
    }

    #[test]
    fn test_dict_odd_arguments() {
        let d = dict(&[s("k")]).unwrap();
        assert_eq!(get(&[d, s("k")]).unwrap(), s(""));
    }

    #[test]
    fn test_list_helpers() {
        let l = list(&[s("a"), s("b")]).unwrap();
        assert_eq!(first(&[l.clone()]).unwrap(), s("a"));
        assert_eq!(last(&[l.clone()]).unwrap(), s("b"));
        assert_eq!(first(&[Value::Null]).unwrap(), Value::Null);
        assert_eq!(
            append(&[l.clone(), s("c")]).unwrap(),
            Value::Seq(vec![s("a"), s("b"), s("c")])
        );
        assert_eq!(has(&[s("b"), l.clone()]).unwrap(), Value::Bool(true));
        assert_eq!(has(&[s("z"), l]).unwrap(), Value::Bool(false));
        assert!(first(&[s("str")]).is_err());
    }
}
