//! Core template builtins: logic, comparison, indexing, and printing.

use std::cmp::Ordering;
use std::fmt::Write as _;

use yamltpl_values::Value;

use super::{expect_args, Func, Registry};
use crate::error::FuncError;

pub(super) fn register(registry: &mut Registry) {
    registry.insert("and", Func::And);
    registry.insert("or", Func::Or);
    registry.insert("not", Func::Pure(not));
    registry.insert("len", Func::Pure(len));
    registry.insert("index", Func::Pure(index));
    registry.insert("print", Func::Pure(print));
    registry.insert("println", Func::Pure(println));
    registry.insert("printf", Func::Pure(printf));
    registry.insert("eq", Func::Pure(eq));
    registry.insert("ne", Func::Pure(ne));
    registry.insert("lt", Func::Pure(lt));
    registry.insert("le", Func::Pure(le));
    registry.insert("gt", Func::Pure(gt));
    registry.insert("ge", Func::Pure(ge));
}

fn not(args: &[Value]) -> Result<Value, FuncError> {
    let [value] = expect_args::<1>("not", "1", args)?;
    Ok(Value::Bool(!value.is_truthy()))
}

fn len(args: &[Value]) -> Result<Value, FuncError> {
    let [value] = expect_args::<1>("len", "1", args)?;
    let n = match value {
        Value::String(s) => s.len(),
        Value::Seq(items) => items.len(),
        Value::Map(map) => map.len(),
        Value::Null => return Err(FuncError::message("len of nil pointer")),
        other => return Err(FuncError::message(format!("len of type {}", other.type_name()))),
    };
    Ok(Value::from(n))
}

fn index(args: &[Value]) -> Result<Value, FuncError> {
    let Some((item, keys)) = args.split_first() else {
        return Err(FuncError::arity("index", "at least 1", 0));
    };

    let mut current = item.clone();
    for key in keys {
        current = match (&current, key) {
            (Value::Map(map), Value::String(k)) => map.get(k).cloned().unwrap_or_default(),
            (Value::Map(_), other) => {
                return Err(FuncError::message(format!(
                    "cannot index map with {}",
                    other.type_name()
                )))
            }
            (Value::Seq(items), Value::Int(i)) => usize::try_from(*i)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or_else(|| FuncError::message(format!("index out of range: {}", i)))?,
            (Value::String(s), Value::Int(i)) => usize::try_from(*i)
                .ok()
                .and_then(|i| s.as_bytes().get(i))
                .map(|b| Value::Int(i64::from(*b)))
                .ok_or_else(|| FuncError::message(format!("index out of range: {}", i)))?,
            (Value::Seq(_) | Value::String(_), other) => {
                return Err(FuncError::message(format!(
                    "cannot index slice/array with type {}",
                    other.type_name()
                )))
            }
            (Value::Null, _) => return Err(FuncError::message("index of untyped nil")),
            (other, _) => {
                return Err(FuncError::message(format!(
                    "can't index item of type {}",
                    other.type_name()
                )))
            }
        };
    }
    Ok(current)
}

/// Formats a value the way `print` does: `null` prints as `<nil>`.
pub(crate) fn sprint(value: &Value) -> String {
    match value {
        Value::Null => "<nil>".to_string(),
        other => other.to_string(),
    }
}

fn print(args: &[Value]) -> Result<Value, FuncError> {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        // Operands are spaced only when neither side is a string.
        let spaced = i > 0 && !matches!(arg, Value::String(_)) && !matches!(args[i - 1], Value::String(_));
        if spaced {
            out.push(' ');
        }
        out.push_str(&sprint(arg));
    }
    Ok(Value::String(out))
}

fn println(args: &[Value]) -> Result<Value, FuncError> {
    let mut out = args.iter().map(sprint).collect::<Vec<_>>().join(" ");
    out.push('\n');
    Ok(Value::String(out))
}

fn printf(args: &[Value]) -> Result<Value, FuncError> {
    let Some((format, rest)) = args.split_first() else {
        return Err(FuncError::arity("printf", "at least 1", 0));
    };
    let Value::String(format) = format else {
        return Err(FuncError::message(format!(
            "printf: format must be a string, got {}",
            format.type_name()
        )));
    };
    Ok(Value::String(sprintf(format, rest)))
}

#[derive(Debug, Default)]
struct Spec {
    left: bool,
    plus: bool,
    zero: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

fn read_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }
    digits.parse().ok()
}

/// A `printf` subset: `%v %s %d %f %g %t %q %x %X %%` with flags `-+0`,
/// width and precision.
pub(crate) fn sprintf(format: &str, args: &[Value]) -> String {
    let mut out = String::new();
    let mut chars = format.chars().peekable();
    let mut args = args.iter();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut spec = Spec::default();
        while let Some(flag) = chars.peek().copied() {
            match flag {
                '-' => spec.left = true,
                '+' => spec.plus = true,
                '0' => spec.zero = true,
                ' ' | '#' => {}
                _ => break,
            }
            chars.next();
        }
        spec.width = read_digits(&mut chars);
        if chars.peek() == Some(&'.') {
            chars.next();
            spec.precision = Some(read_digits(&mut chars).unwrap_or(0));
        }

        let Some(verb) = chars.next() else {
            out.push_str("%!(NOVERB)");
            break;
        };
        if verb == '%' {
            out.push('%');
            continue;
        }
        let Some(arg) = args.next() else {
            let _ = write!(out, "%!{}(MISSING)", verb);
            continue;
        };
        let (text, numeric) = format_verb(verb, &spec, arg);
        out.push_str(&pad(text, &spec, numeric));
    }

    let extra: Vec<String> = args
        .map(|arg| format!("{}={}", arg.type_name(), sprint(arg)))
        .collect();
    if !extra.is_empty() {
        let _ = write!(out, "%!(EXTRA {})", extra.join(", "));
    }
    out
}

fn bad_verb(verb: char, arg: &Value) -> String {
    format!("%!{}({}={})", verb, arg.type_name(), sprint(arg))
}

fn format_verb(verb: char, spec: &Spec, arg: &Value) -> (String, bool) {
    match (verb, arg) {
        ('v' | 's', Value::String(s)) => {
            let text = match spec.precision {
                Some(p) => s.chars().take(p).collect(),
                None => s.clone(),
            };
            (text, false)
        }
        ('v', Value::Float(_)) | ('v', Value::Int(_)) => (signed(arg.to_string(), spec), true),
        ('v', other) => (sprint(other), false),
        ('s', other) if !other.is_number() && !matches!(other, Value::Bool(_)) => (sprint(other), false),
        ('d', Value::Int(i)) => (signed(i.to_string(), spec), true),
        ('f' | 'F', _) | ('g', _) if arg.is_number() => {
            let x = arg.as_f64().unwrap_or_default();
            let text = match (verb, spec.precision) {
                ('g', None) => Value::Float(x).to_string(),
                (_, precision) => format!("{:.*}", precision.unwrap_or(6), x),
            };
            (signed(text, spec), true)
        }
        ('t', Value::Bool(b)) => (b.to_string(), false),
        ('q', Value::String(s)) => (format!("{:?}", s), false),
        ('q', Value::Int(i)) => match u32::try_from(*i).ok().and_then(char::from_u32) {
            Some(c) => (format!("{:?}", c), false),
            None => (bad_verb(verb, arg), false),
        },
        ('x', Value::Int(i)) => (signed(hex(*i, false), spec), true),
        ('X', Value::Int(i)) => (signed(hex(*i, true), spec), true),
        ('x', Value::String(s)) => (s.bytes().map(|b| format!("{:02x}", b)).collect(), false),
        ('X', Value::String(s)) => (s.bytes().map(|b| format!("{:02X}", b)).collect(), false),
        _ => (bad_verb(verb, arg), false),
    }
}

/// Hex digits of the magnitude, with a leading `-` for negatives.
fn hex(i: i64, upper: bool) -> String {
    let sign = if i < 0 { "-" } else { "" };
    let magnitude = i.unsigned_abs();
    if upper {
        format!("{}{:X}", sign, magnitude)
    } else {
        format!("{}{:x}", sign, magnitude)
    }
}

fn signed(text: String, spec: &Spec) -> String {
    if spec.plus && !text.starts_with('-') {
        format!("+{}", text)
    } else {
        text
    }
}

fn pad(text: String, spec: &Spec, numeric: bool) -> String {
    let Some(width) = spec.width else {
        return text;
    };
    let len = text.chars().count();
    if len >= width {
        return text;
    }
    let fill = width - len;
    if spec.left {
        format!("{}{}", text, " ".repeat(fill))
    } else if spec.zero && numeric {
        let (sign, digits) = match text.strip_prefix(['-', '+']) {
            Some(rest) => (&text[..1], rest),
            None => ("", text.as_str()),
        };
        format!("{}{}{}", sign, "0".repeat(fill), digits)
    } else {
        format!("{}{}", " ".repeat(fill), text)
    }
}

fn incompatible() -> FuncError {
    FuncError::message("incompatible types for comparison")
}

/// Equality across scalar kinds; integers and floats compare numerically.
fn equal(a: &Value, b: &Value) -> Result<bool, FuncError> {
    match (a, b) {
        (Value::Null, Value::Null) => Ok(true),
        (Value::Null, _) | (_, Value::Null) => Ok(false),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (Value::String(x), Value::String(y)) => Ok(x == y),
        (Value::Int(x), Value::Int(y)) => Ok(x == y),
        (x, y) if x.is_number() && y.is_number() => Ok(x.as_f64() == y.as_f64()),
        (Value::Seq(_) | Value::Map(_), _) | (_, Value::Seq(_) | Value::Map(_)) => Err(
            FuncError::message(format!("non-comparable type {}", a.type_name())),
        ),
        _ => Err(incompatible()),
    }
}

fn compare(a: &Value, b: &Value) -> Result<Ordering, FuncError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        (x, y) if x.is_number() && y.is_number() => x
            .as_f64()
            .zip(y.as_f64())
            .and_then(|(x, y)| x.partial_cmp(&y))
            .ok_or_else(incompatible),
        (x, _) if !x.is_number() && !matches!(x, Value::String(_)) => Err(FuncError::message(
            format!("invalid type for comparison: {}", x.type_name()),
        )),
        _ => Err(incompatible()),
    }
}

fn eq(args: &[Value]) -> Result<Value, FuncError> {
    let Some((first, rest)) = args.split_first() else {
        return Err(FuncError::arity("eq", "at least 2", 0));
    };
    if rest.is_empty() {
        return Err(FuncError::message("missing argument for comparison"));
    }
    for other in rest {
        if equal(first, other)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn ne(args: &[Value]) -> Result<Value, FuncError> {
    let [a, b] = expect_args::<2>("ne", "2", args)?;
    Ok(Value::Bool(!equal(a, b)?))
}

fn ordered(name: &'static str, args: &[Value], accept: fn(Ordering) -> bool) -> Result<Value, FuncError> {
    let [a, b] = expect_args::<2>(name, "2", args)?;
    Ok(Value::Bool(accept(compare(a, b)?)))
}

fn lt(args: &[Value]) -> Result<Value, FuncError> {
    ordered("lt", args, |o| o == Ordering::Less)
}

fn le(args: &[Value]) -> Result<Value, FuncError> {
    ordered("le", args, |o| o != Ordering::Greater)
}

fn gt(args: &[Value]) -> Result<Value, FuncError> {
    ordered("gt", args, |o| o == Ordering::Greater)
}

fn ge(args: &[Value]) -> Result<Value, FuncError> {
    ordered("ge", args, |o| o != Ordering::Less)
}

#[cfg(test)]
mod tests {
    use super::*;
    use yamltpl_values::Mapping;

    fn s(v: &str) -> Value {
        Value::from(v)
    }

    #[test]
    fn test_not_and_len() {
        assert_eq!(not(&[Value::Null]).unwrap(), Value::Bool(true));
        assert_eq!(len(&[s("abc")]).unwrap(), Value::Int(3));
        assert_eq!(len(&[Value::Seq(vec![Value::Null])]).unwrap(), Value::Int(1));
        assert!(len(&[Value::Int(3)]).is_err());
    }

    #[test]
    fn test_index() {
        let mut map = Mapping::new();
        map.insert("a".into(), Value::Seq(vec![s("x"), s("y")]));
        let item = Value::Map(map);
        assert_eq!(index(&[item.clone(), s("a"), Value::Int(1)]).unwrap(), s("y"));
        assert_eq!(index(&[item.clone(), s("missing")]).unwrap(), Value::Null);
        let err = index(&[item, s("a"), Value::Int(5)]).unwrap_err();
        assert_eq!(err.to_string(), "index out of range: 5");
    }

    #[test]
    fn test_print_spacing() {
        assert_eq!(print(&[s("a"), s("b")]).unwrap(), s("ab"));
        assert_eq!(print(&[Value::Int(1), Value::Int(2)]).unwrap(), s("1 2"));
        assert_eq!(print(&[s("n="), Value::Int(2)]).unwrap(), s("n=2"));
        assert_eq!(println(&[s("a"), Value::Int(1)]).unwrap(), s("a 1\n"));
    }

    #[test]
    fn test_sprintf_verbs() {
        assert_eq!(sprintf("%s-%d", &[s("a"), Value::Int(3)]), "a-3");
        assert_eq!(sprintf("%v", &[Value::Null]), "<nil>");
        assert_eq!(sprintf("%.2f", &[Value::Float(3.14159)]), "3.14");
        assert_eq!(sprintf("%f", &[Value::Int(2)]), "2.000000");
        assert_eq!(sprintf("%q", &[s("hi")]), "\"hi\"");
        assert_eq!(sprintf("%t", &[Value::Bool(true)]), "true");
        assert_eq!(sprintf("%x", &[Value::Int(255)]), "ff");
        assert_eq!(sprintf("%x", &[Value::Int(-1)]), "-1");
        assert_eq!(sprintf("%X", &[Value::Int(-255)]), "-FF");
        assert_eq!(sprintf("%05x", &[Value::Int(-26)]), "-001a");
        assert_eq!(sprintf("%v %g", &[Value::Float(1e21), Value::Float(1e21)]), "1e+21 1e+21");
        assert_eq!(sprintf("100%%", &[]), "100%");
    }

    #[test]
    fn test_sprintf_padding() {
        assert_eq!(sprintf("[%5s]", &[s("ab")]), "[   ab]");
        assert_eq!(sprintf("[%-5s]", &[s("ab")]), "[ab   ]");
        assert_eq!(sprintf("[%05d]", &[Value::Int(-42)]), "[-0042]");
        assert_eq!(sprintf("%+d", &[Value::Int(5)]), "+5");
    }

    #[test]
    fn test_sprintf_mismatches() {
        assert_eq!(sprintf("%d", &[s("x")]), "%!d(string=x)");
        assert_eq!(sprintf("%s %s", &[s("x")]), "x %!s(MISSING)");
        assert_eq!(sprintf("%s", &[s("x"), Value::Int(1)]), "x%!(EXTRA int=1)");
    }

    #[test]
    fn test_eq_and_ne() {
        assert_eq!(eq(&[s("a"), s("b"), s("a")]).unwrap(), Value::Bool(true));
        assert_eq!(eq(&[Value::Int(1), Value::Float(1.0)]).unwrap(), Value::Bool(true));
        assert_eq!(eq(&[Value::Null, s("a")]).unwrap(), Value::Bool(false));
        assert!(eq(&[s("1"), Value::Int(1)]).is_err());
        assert!(eq(&[s("a")]).is_err());
        assert_eq!(ne(&[Value::Int(1), Value::Int(2)]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_ordering() {
        assert_eq!(lt(&[Value::Int(1), Value::Int(2)]).unwrap(), Value::Bool(true));
        assert_eq!(ge(&[Value::Float(2.5), Value::Int(2)]).unwrap(), Value::Bool(true));
        assert_eq!(le(&[s("a"), s("b")]).unwrap(), Value::Bool(true));
        assert_eq!(gt(&[s("a"), s("b")]).unwrap(), Value::Bool(false));
        assert!(lt(&[Value::Bool(true), Value::Bool(false)]).is_err());
        assert!(lt(&[s("a"), Value::Int(1)]).is_err());
    }
}
