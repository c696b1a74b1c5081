//! Helpers that need the executing render pass: `include`, `tpl`,
//! `required`, and `fail`.

use tracing::info;
use yamltpl_values::Value;

use super::{expect_args, str_arg, Func, Registry};
use crate::error::{wrap_sentinel, FuncError};
use crate::exec::{self, ExecContext, NO_VALUE};
use crate::renderer::RenderOptions;

pub(super) fn register(registry: &mut Registry) {
    registry.insert("include", Func::Include);
    registry.insert("tpl", Func::Tpl);
    registry.insert("required", Func::Required);
    registry.insert("fail", Func::Fail);
}

/// `include NAME DATA`: renders the named template and returns its output.
pub(crate) fn include(ctx: &mut ExecContext<'_>, args: &[Value]) -> Result<Value, FuncError> {
    let [name, data] = expect_args::<2>("include", "2", args)?;
    let Value::String(name) = name else {
        return Err(FuncError::message(format!(
            "template name must be a string, got {}",
            name.type_name()
        )));
    };

    ctx.depth.enter_include(name)?;
    let mut out = String::new();
    let result = exec::execute(ctx, name, data, &mut out);
    ctx.depth.exit_include(name);
    result?;
    Ok(Value::String(out))
}

/// `tpl TEXT DATA`: renders `TEXT` as a template.
///
/// The text is parsed into a scratch copy of the template set under the
/// current template's name, so definitions it makes are visible to the calls
/// it makes but never leak into the render pass.
pub(crate) fn tpl(ctx: &mut ExecContext<'_>, current: &str, args: &[Value]) -> Result<Value, FuncError> {
    let [text, data] = expect_args::<2>("tpl", "2", args)?;
    let text = str_arg(text);

    let mut scratch = ctx.set.clone();
    let tree = scratch.parse(current, &text).map_err(|err| FuncError::TplParse {
        text: text.clone(),
        source: Box::new(err),
    })?;

    let mut nested = ExecContext {
        set: &scratch,
        depth: &mut *ctx.depth,
        options: ctx.options,
    };
    let mut out = String::new();
    exec::execute_tree(&mut nested, &tree, data, &mut out).map_err(|err| FuncError::TplExec {
        text: text.clone(),
        source: Box::new(err),
    })?;
    Ok(Value::String(out.replace(NO_VALUE, "")))
}

/// `required MESSAGE VALUE`: fails with `MESSAGE` when the value is null or
/// an empty string.
pub(crate) fn required(options: &RenderOptions, args: &[Value]) -> Result<Value, FuncError> {
    let [message, value] = expect_args::<2>("required", "2", args)?;
    let missing = match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    };
    if !missing {
        return Ok(value.clone());
    }

    let message = str_arg(message);
    if options.lint_mode {
        info!("Missing required value: {}", message);
        return Ok(Value::from(""));
    }
    Err(FuncError::Message(wrap_sentinel(&message)))
}

/// `fail MESSAGE`: always fails with `MESSAGE`.
pub(crate) fn fail(options: &RenderOptions, args: &[Value]) -> Result<Value, FuncError> {
    let [message] = expect_args::<1>("fail", "1", args)?;
    let message = str_arg(message);
    if options.lint_mode {
        info!("Fail: {}", message);
        return Ok(Value::from(""));
    }
    Err(FuncError::Message(wrap_sentinel(&message)))
}
