//! String helpers.

use regex::Regex;
use yamltpl_values::Value;

use super::{expect_args, int_arg, str_arg, Func, Registry};
use crate::error::FuncError;

pub(super) fn register(registry: &mut Registry) {
    registry.insert("upper", Func::Pure(upper));
    registry.insert("lower", Func::Pure(lower));
    registry.insert("title", Func::Pure(title));
    registry.insert("trim", Func::Pure(trim));
    registry.insert("trimPrefix", Func::Pure(trim_prefix));
    registry.insert("trimSuffix", Func::Pure(trim_suffix));
    registry.insert("trimAll", Func::Pure(trim_all));
    registry.insert("quote", Func::Pure(quote));
    registry.insert("squote", Func::Pure(squote));
    registry.insert("replace", Func::Pure(replace));
    registry.insert("contains", Func::Pure(contains));
    registry.insert("hasPrefix", Func::Pure(has_prefix));
    registry.insert("hasSuffix", Func::Pure(has_suffix));
    registry.insert("repeat", Func::Pure(repeat));
    registry.insert("indent", Func::Pure(indent));
    registry.insert("nindent", Func::Pure(nindent));
    registry.insert("trunc", Func::Pure(trunc));
    registry.insert("cat", Func::Pure(cat));
    registry.insert("nospace", Func::Pure(nospace));
    registry.insert("splitList", Func::Pure(split_list));
    registry.insert("join", Func::Pure(join));
    registry.insert("regexMatch", Func::Pure(regex_match));
    registry.insert("regexReplaceAll", Func::Pure(regex_replace_all));
}

fn string(s: impl Into<String>) -> Result<Value, FuncError> {
    Ok(Value::String(s.into()))
}

fn upper(args: &[Value]) -> Result<Value, FuncError> {
    let [s] = expect_args::<1>("upper", "1", args)?;
    string(str_arg(s).to_uppercase())
}

fn lower(args: &[Value]) -> Result<Value, FuncError> {
    let [s] = expect_args::<1>("lower", "1", args)?;
    string(str_arg(s).to_lowercase())
}

fn title(args: &[Value]) -> Result<Value, FuncError> {
    let [s] = expect_args::<1>("title", "1", args)?;
    let mut out = String::new();
    let mut at_word_start = true;
    for c in str_arg(s).chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = c.is_whitespace();
    }
    string(out)
}

fn trim(args: &[Value]) -> Result<Value, FuncError> {
    let [s] = expect_args::<1>("trim", "1", args)?;
    string(str_arg(s).trim())
}

fn trim_prefix(args: &[Value]) -> Result<Value, FuncError> {
    let [prefix, s] = expect_args::<2>("trimPrefix", "2", args)?;
    let (prefix, s) = (str_arg(prefix), str_arg(s));
    string(s.strip_prefix(prefix.as_str()).unwrap_or(&s))
}

fn trim_suffix(args: &[Value]) -> Result<Value, FuncError> {
    let [suffix, s] = expect_args::<2>("trimSuffix", "2", args)?;
    let (suffix, s) = (str_arg(suffix), str_arg(s));
    string(s.strip_suffix(suffix.as_str()).unwrap_or(&s))
}

fn trim_all(args: &[Value]) -> Result<Value, FuncError> {
    let [cutset, s] = expect_args::<2>("trimAll", "2", args)?;
    let cutset = str_arg(cutset);
    string(str_arg(s).trim_matches(|c: char| cutset.contains(c)))
}

fn quote(args: &[Value]) -> Result<Value, FuncError> {
    let quoted: Vec<String> = args
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| format!("{:?}", str_arg(v)))
        .collect();
    string(quoted.join(" "))
}

fn squote(args: &[Value]) -> Result<Value, FuncError> {
    let quoted: Vec<String> = args
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| format!("'{}'", str_arg(v)))
        .collect();
    string(quoted.join(" "))
}

fn replace(args: &[Value]) -> Result<Value, FuncError> {
    let [old, new, s] = expect_args::<3>("replace", "3", args)?;
    string(str_arg(s).replace(&str_arg(old), &str_arg(new)))
}

fn contains(args: &[Value]) -> Result<Value, FuncError> {
    let [needle, s] = expect_args::<2>("contains", "2", args)?;
    Ok(Value::Bool(str_arg(s).contains(&str_arg(needle))))
}

fn has_prefix(args: &[Value]) -> Result<Value, FuncError> {
    let [prefix, s] = expect_args::<2>("hasPrefix", "2", args)?;
    Ok(Value::Bool(str_arg(s).starts_with(&str_arg(prefix))))
}

fn has_suffix(args: &[Value]) -> Result<Value, FuncError> {
    let [suffix, s] = expect_args::<2>("hasSuffix", "2", args)?;
    Ok(Value::Bool(str_arg(s).ends_with(&str_arg(suffix))))
}

fn repeat(args: &[Value]) -> Result<Value, FuncError> {
    let [count, s] = expect_args::<2>("repeat", "2", args)?;
    let count = usize::try_from(int_arg("repeat", count)?)
        .map_err(|_| FuncError::message("repeat: negative repeat count"))?;
    string(str_arg(s).repeat(count))
}

fn indent_by(spaces: i64, s: &str) -> String {
    let pad = " ".repeat(usize::try_from(spaces).unwrap_or(0));
    format!("{}{}", pad, s.replace('\n', &format!("\n{}", pad)))
}

fn indent(args: &[Value]) -> Result<Value, FuncError> {
    let [spaces, s] = expect_args::<2>("indent", "2", args)?;
    string(indent_by(int_arg("indent", spaces)?, &str_arg(s)))
}

fn nindent(args: &[Value]) -> Result<Value, FuncError> {
    let [spaces, s] = expect_args::<2>("nindent", "2", args)?;
    string(format!("\n{}", indent_by(int_arg("nindent", spaces)?, &str_arg(s))))
}

fn trunc(args: &[Value]) -> Result<Value, FuncError> {
    let [count, s] = expect_args::<2>("trunc", "2", args)?;
    let count = int_arg("trunc", count)?;
    let chars: Vec<char> = str_arg(s).chars().collect();
    let len = chars.len() as i64;
    let kept = if count < 0 && len + count > 0 {
        &chars[(len + count) as usize..]
    } else if count >= 0 && len > count {
        &chars[..count as usize]
    } else {
        &chars[..]
    };
    string(kept.iter().collect::<String>())
}

fn cat(args: &[Value]) -> Result<Value, FuncError> {
    let parts: Vec<String> = args.iter().filter(|v| !v.is_null()).map(str_arg).collect();
    string(parts.join(" "))
}

fn nospace(args: &[Value]) -> Result<Value, FuncError> {
    let [s] = expect_args::<1>("nospace", "1", args)?;
    string(str_arg(s).chars().filter(|c| !c.is_whitespace()).collect::<String>())
}

fn split_list(args: &[Value]) -> Result<Value, FuncError> {
    let [sep, s] = expect_args::<2>("splitList", "2", args)?;
    let (sep, s) = (str_arg(sep), str_arg(s));
    Ok(Value::Seq(s.split(sep.as_str()).map(Value::from).collect()))
}

fn join(args: &[Value]) -> Result<Value, FuncError> {
    let [sep, list] = expect_args::<2>("join", "2", args)?;
    let parts: Vec<String> = match list {
        Value::Seq(items) => items.iter().filter(|v| !v.is_null()).map(str_arg).collect(),
        Value::Null => Vec::new(),
        other => vec![str_arg(other)],
    };
    string(parts.join(&str_arg(sep)))
}

fn compile(name: &str, pattern: &Value) -> Result<Regex, FuncError> {
    Regex::new(&str_arg(pattern)).map_err(|e| FuncError::message(format!("{}: {}", name, e)))
}

fn regex_match(args: &[Value]) -> Result<Value, FuncError> {
    let [pattern, s] = expect_args::<2>("regexMatch", "2", args)?;
    Ok(Value::Bool(compile("regexMatch", pattern)?.is_match(&str_arg(s))))
}

fn regex_replace_all(args: &[Value]) -> Result<Value, FuncError> {
    let [pattern, s, replacement] = expect_args::<3>("regexReplaceAll", "3", args)?;
    let re = compile("regexReplaceAll", pattern)?;
    string(re.replace_all(&str_arg(s), str_arg(replacement).as_str()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::from(v)
    }

    fn call(f: fn(&[Value]) -> Result<Value, FuncError>, args: &[Value]) -> Value {
        f(args).unwrap()
    }

    #[test]
    fn test_case_helpers() {
        assert_eq!(call(upper, &[s("abc")]), s("ABC"));
        assert_eq!(call(lower, &[s("ABC")]), s("abc"));
        assert_eq!(call(title, &[s("hello big world")]), s("Hello Big World"));
        assert_eq!(call(upper, &[Value::Null]), s(""));
    }

    #[test]
    fn test_trimming() {
        assert_eq!(call(trim, &[s("  x \n")]), s("x"));
        assert_eq!(call(trim_prefix, &[s("v"), s("v1.2")]), s("1.2"));
        assert_eq!(call(trim_suffix, &[s(".yaml"), s("a.yaml")]), s("a"));
        assert_eq!(call(trim_all, &[s("$"), s("$$5$")]), s("5"));
    }

    #[test]
    fn test_quoting() {
        assert_eq!(call(quote, &[s("a\"b")]), s("\"a\\\"b\""));
        assert_eq!(call(quote, &[Value::Int(1), Value::Null, s("x")]), s("\"1\" \"x\""));
        assert_eq!(call(squote, &[s("x")]), s("'x'"));
    }

    #[test]
    fn test_search_and_replace() {
        assert_eq!(call(replace, &[s("-"), s("_"), s("a-b-c")]), s("a_b_c"));
        assert_eq!(call(contains, &[s("b"), s("abc")]), Value::Bool(true));
        assert_eq!(call(has_prefix, &[s("ab"), s("abc")]), Value::Bool(true));
        assert_eq!(call(has_suffix, &[s("x"), s("abc")]), Value::Bool(false));
    }

    #[test]
    fn test_indent() {
        assert_eq!(call(indent, &[Value::Int(2), s("a\nb")]), s("  a\n  b"));
        assert_eq!(call(nindent, &[Value::Int(2), s("a")]), s("\n  a"));
        assert_eq!(call(repeat, &[Value::Int(3), s("ab")]), s("ababab"));
        assert!(repeat(&[Value::Int(-1), s("ab")]).is_err());
    }

    #[test]
    fn test_trunc() {
        assert_eq!(call(trunc, &[Value::Int(3), s("hello")]), s("hel"));
        assert_eq!(call(trunc, &[Value::Int(-3), s("hello")]), s("llo"));
        assert_eq!(call(trunc, &[Value::Int(10), s("hello")]), s("hello"));
        assert_eq!(call(trunc, &[Value::Int(-10), s("hello")]), s("hello"));
    }

    #[test]
    fn test_lists_of_strings() {
        assert_eq!(call(cat, &[s("a"), Value::Null, Value::Int(2)]), s("a 2"));
        assert_eq!(call(nospace, &[s(" a b\tc ")]), s("abc"));
        assert_eq!(
            call(split_list, &[s(","), s("a,b")]),
            Value::Seq(vec![s("a"), s("b")])
        );
        assert_eq!(
            call(join, &[s("-"), Value::Seq(vec![s("a"), Value::Int(1)])]),
            s("a-1")
        );
    }

    #[test]
    fn test_regex() {
        assert_eq!(call(regex_match, &[s("^v[0-9]+$"), s("v12")]), Value::Bool(true));
        assert_eq!(
            call(regex_replace_all, &[s("a(x*)b"), s("-ab-axxb-"), s("${1}W")]),
            s("-W-xxW-")
        );
        assert!(regex_match(&[s("("), s("x")]).is_err());
    }
}
