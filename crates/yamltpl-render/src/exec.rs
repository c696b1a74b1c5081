//! Tree-walking executor.
//!
//! Execution is threaded through an [`ExecContext`] that carries the template
//! set, the per-render [`CallDepth`] bookkeeping, and the [`RenderOptions`].
//! Context-aware helpers receive the same context, so nested `include` and
//! `tpl` calls share one depth map without any hidden state.

use std::collections::HashMap;
use std::fmt;

use yamltpl_values::Value;

use crate::ast::{Arg, Branch, Command, Node, Pipeline, Tree};
use crate::error::{FuncError, Location, TemplateError};
use crate::funcs::{self, context, Func};
use crate::lexer::Number;
use crate::renderer::RenderOptions;
use crate::set::TemplateSet;

/// Placeholder printed for a missing value.
pub const NO_VALUE: &str = "<no value>";

/// How many times one template name may be nested through `include`.
pub const MAX_INCLUDE_DEPTH: usize = 1000;

/// How deeply template executions of any kind may nest.
pub(crate) const MAX_TEMPLATE_DEPTH: usize = 10_000;

/// Per-render bookkeeping of how deeply templates are nested.
#[derive(Debug, Default)]
pub struct CallDepth {
    includes: HashMap<String, usize>,
    total: usize,
}

impl CallDepth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current `include` nesting depth of `name`.
    pub fn depth(&self, name: &str) -> usize {
        self.includes.get(name).copied().unwrap_or(0)
    }

    /// Records entry into `include name`. Fails once `name` is already
    /// nested [`MAX_INCLUDE_DEPTH`] levels deep.
    pub(crate) fn enter_include(&mut self, name: &str) -> Result<(), FuncError> {
        let depth = self.includes.entry(name.to_string()).or_insert(0);
        if *depth >= MAX_INCLUDE_DEPTH {
            return Err(FuncError::RecursionLimit {
                name: name.to_string(),
            });
        }
        *depth += 1;
        Ok(())
    }

    pub(crate) fn exit_include(&mut self, name: &str) {
        if let Some(depth) = self.includes.get_mut(name) {
            *depth = depth.saturating_sub(1);
        }
    }
}

/// Everything an execution needs besides the data.
pub(crate) struct ExecContext<'a> {
    pub set: &'a TemplateSet,
    pub depth: &'a mut CallDepth,
    pub options: RenderOptions,
}

/// Executes the template registered as `name` against `data`, appending the
/// output to `out`.
pub(crate) fn execute(
    ctx: &mut ExecContext<'_>,
    name: &str,
    data: &Value,
    out: &mut String,
) -> Result<(), TemplateError> {
    let tree = ctx
        .set
        .get(name)
        .cloned()
        .ok_or_else(|| TemplateError::NotDefined {
            name: name.to_string(),
        })?;
    execute_tree(ctx, &tree, data, out)
}

/// Executes a tree that is not necessarily registered in the set.
pub(crate) fn execute_tree(
    ctx: &mut ExecContext<'_>,
    tree: &Tree,
    data: &Value,
    out: &mut String,
) -> Result<(), TemplateError> {
    if ctx.depth.total >= MAX_TEMPLATE_DEPTH {
        return Err(TemplateError::DepthExceeded {
            limit: MAX_TEMPLATE_DEPTH,
        });
    }
    ctx.depth.total += 1;

    let mut state = State {
        ctx,
        tree,
        root: data,
        vars: Vec::new(),
    };
    let result = state.walk(data, &tree.root, out);
    state.ctx.depth.total -= 1;
    result.map(|_| ())
}

/// Control flow out of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Break,
    Continue,
}

struct State<'s, 'a> {
    ctx: &'s mut ExecContext<'a>,
    tree: &'s Tree,
    /// The data the template was invoked with, bound to `$`.
    root: &'s Value,
    vars: Vec<(String, Value)>,
}

impl<'s, 'a> State<'s, 'a> {
    fn location(&self, pos: usize) -> Location {
        Location::at(&self.tree.parse_name, &self.tree.source, pos)
    }

    fn error(&self, pos: usize, context: &dyn fmt::Display, message: impl Into<String>) -> TemplateError {
        TemplateError::Exec {
            location: self.location(pos),
            template: self.tree.name.clone(),
            context: context.to_string(),
            message: message.into(),
            recursion: None,
        }
    }

    fn call_error(&self, cmd: &Command, name: &str, err: FuncError) -> TemplateError {
        TemplateError::Exec {
            location: self.location(cmd.pos),
            template: self.tree.name.clone(),
            context: cmd.to_string(),
            recursion: err.recursion_limit().map(String::from),
            message: format!("error calling {}: {}", name, err),
        }
    }

    fn strict(&self) -> bool {
        self.ctx.options.strict
    }

    fn walk(&mut self, dot: &Value, list: &[Node], out: &mut String) -> Result<Flow, TemplateError> {
        for node in list {
            let flow = match node {
                Node::Text(text) => {
                    out.push_str(text);
                    Flow::Normal
                }
                Node::Action(pipe) => {
                    let value = self.eval_pipeline(dot, pipe)?;
                    if pipe.decl.is_empty() {
                        out.push_str(&value.to_string());
                    }
                    Flow::Normal
                }
                Node::If(branch) => self.walk_if(dot, branch, false, out)?,
                Node::With(branch) => self.walk_if(dot, branch, true, out)?,
                Node::Range(branch) => self.walk_range(dot, branch, out)?,
                Node::Template { pos, name, pipe } => {
                    self.walk_template(dot, *pos, name, pipe.as_ref(), out)?;
                    Flow::Normal
                }
                Node::Break => Flow::Break,
                Node::Continue => Flow::Continue,
            };
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn walk_if(
        &mut self,
        dot: &Value,
        branch: &Branch,
        with: bool,
        out: &mut String,
    ) -> Result<Flow, TemplateError> {
        let mark = self.vars.len();
        let value = self.eval_pipeline(dot, &branch.pipe)?;
        let result = if value.is_truthy() {
            let dot = if with { &value } else { dot };
            self.walk(dot, &branch.list, out)
        } else if let Some(else_list) = &branch.else_list {
            self.walk(dot, else_list, out)
        } else {
            Ok(Flow::Normal)
        };
        self.vars.truncate(mark);
        result
    }

    fn walk_range(&mut self, dot: &Value, branch: &Branch, out: &mut String) -> Result<Flow, TemplateError> {
        let mark = self.vars.len();
        let value = self.eval_pipeline(dot, &branch.pipe)?;

        let items: Vec<(Value, Value)> = match value {
            Value::Seq(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (Value::from(i), item))
                .collect(),
            Value::Map(map) => map
                .into_iter()
                .map(|(key, item)| (Value::String(key), item))
                .collect(),
            Value::Int(n) => (0..n.max(0)).map(|i| (Value::Int(i), Value::Int(i))).collect(),
            Value::Null => Vec::new(),
            other => {
                return Err(self.error(
                    branch.pos,
                    &branch.pipe,
                    format!("range can't iterate over {}", other),
                ))
            }
        };

        let result = if items.is_empty() {
            match &branch.else_list {
                Some(else_list) => self.walk(dot, else_list, out),
                None => Ok(Flow::Normal),
            }
        } else {
            self.range_items(&branch.pipe.decl, items, &branch.list, out)
        };
        self.vars.truncate(mark);
        result
    }

    fn range_items(
        &mut self,
        decl: &[String],
        items: Vec<(Value, Value)>,
        body: &[Node],
        out: &mut String,
    ) -> Result<Flow, TemplateError> {
        for (key, item) in items {
            match decl {
                [value] => self.set_var(value, item.clone()),
                [index, value] => {
                    self.set_var(index, key);
                    self.set_var(value, item.clone());
                }
                _ => {}
            }
            let mark = self.vars.len();
            let flow = self.walk(&item, body, out);
            self.vars.truncate(mark);
            if flow? == Flow::Break {
                break;
            }
        }
        Ok(Flow::Normal)
    }

    fn walk_template(
        &mut self,
        dot: &Value,
        pos: usize,
        name: &str,
        pipe: Option<&Pipeline>,
        out: &mut String,
    ) -> Result<(), TemplateError> {
        let data = match pipe {
            Some(pipe) => self.eval_pipeline(dot, pipe)?,
            None => Value::Null,
        };
        let context = format!("{{{{template {:?}}}}}", name);
        match execute(self.ctx, name, &data, out) {
            Err(TemplateError::NotDefined { name }) => {
                Err(self.error(pos, &context, format!("template {:?} not defined", name)))
            }
            Err(TemplateError::DepthExceeded { limit }) => Err(self.error(
                pos,
                &context,
                format!("exceeded maximum template depth ({})", limit),
            )),
            other => other,
        }
    }

    fn set_var(&mut self, name: &str, value: Value) {
        if let Some(slot) = self.vars.iter_mut().rev().find(|(n, _)| n == name) {
            slot.1 = value;
        }
    }

    fn lookup_var(&self, name: &str, cmd: &Command) -> Result<&Value, TemplateError> {
        if name == "$" {
            return Ok(self.root);
        }
        self.vars
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
            .ok_or_else(|| self.error(cmd.pos, cmd, format!("undefined variable: {}", name)))
    }

    fn eval_pipeline(&mut self, dot: &Value, pipe: &Pipeline) -> Result<Value, TemplateError> {
        let mut value = None;
        for cmd in &pipe.cmds {
            value = Some(self.eval_command(dot, cmd, value.take())?);
        }
        let value = value.unwrap_or_default();

        for name in &pipe.decl {
            if pipe.is_assign {
                self.set_var(name, value.clone());
            } else {
                self.vars.push((name.clone(), value.clone()));
            }
        }
        Ok(value)
    }

    fn eval_command(&mut self, dot: &Value, cmd: &Command, piped: Option<Value>) -> Result<Value, TemplateError> {
        let Some((first, rest)) = cmd.args.split_first() else {
            return Ok(Value::Null);
        };
        if let Arg::Identifier(name) = first {
            return self.eval_function(dot, cmd, name, rest, piped);
        }
        if !rest.is_empty() || piped.is_some() {
            return Err(self.error(
                cmd.pos,
                cmd,
                format!("can't give argument to non-function {}", first),
            ));
        }
        self.eval_arg(dot, cmd, first)
    }

    fn eval_arg(&mut self, dot: &Value, cmd: &Command, arg: &Arg) -> Result<Value, TemplateError> {
        match arg {
            Arg::Dot => Ok(dot.clone()),
            Arg::Nil => Ok(Value::Null),
            Arg::Bool(b) => Ok(Value::Bool(*b)),
            Arg::Number(Number::Int(i)) => Ok(Value::Int(*i)),
            Arg::Number(Number::Float(f)) => Ok(Value::Float(*f)),
            Arg::String(s) => Ok(Value::String(s.clone())),
            Arg::Field(fields) => self.eval_fields(cmd, dot, fields),
            Arg::Variable(name, fields) => {
                let value = self.lookup_var(name, cmd)?;
                self.eval_fields(cmd, value, fields)
            }
            Arg::Identifier(name) => self.eval_function(dot, cmd, name, &[], None),
            Arg::Pipe(pipe) => self.eval_pipeline(dot, pipe),
            Arg::Chain(base, fields) => {
                let value = self.eval_arg(dot, cmd, base)?;
                self.eval_fields(cmd, &value, fields)
            }
        }
    }

    /// Resolves `.a.b.c` against `receiver`.
    fn eval_fields(&self, cmd: &Command, receiver: &Value, fields: &[String]) -> Result<Value, TemplateError> {
        let mut current = receiver;
        for field in fields {
            current = match current {
                Value::Map(map) => match map.get(field) {
                    Some(value) => value,
                    None if self.strict() => {
                        return Err(self.error(
                            cmd.pos,
                            cmd,
                            format!("map has no entry for key {:?}", field),
                        ))
                    }
                    None => return Ok(Value::Null),
                },
                Value::Null if self.strict() => {
                    return Err(self.error(
                        cmd.pos,
                        cmd,
                        format!("nil pointer evaluating interface {{}}.{}", field),
                    ))
                }
                Value::Null => return Ok(Value::Null),
                other => {
                    return Err(self.error(
                        cmd.pos,
                        cmd,
                        format!("can't evaluate field {} in type {}", field, other.type_name()),
                    ))
                }
            };
        }
        Ok(current.clone())
    }

    fn eval_args(&mut self, dot: &Value, cmd: &Command, args: &[Arg], piped: Option<Value>) -> Result<Vec<Value>, TemplateError> {
        let mut values = Vec::with_capacity(args.len() + 1);
        for arg in args {
            values.push(self.eval_arg(dot, cmd, arg)?);
        }
        values.extend(piped);
        Ok(values)
    }

    fn eval_function(
        &mut self,
        dot: &Value,
        cmd: &Command,
        name: &str,
        args: &[Arg],
        piped: Option<Value>,
    ) -> Result<Value, TemplateError> {
        let Some(func) = funcs::lookup(name) else {
            return Err(self.error(cmd.pos, cmd, format!("{:?} is not a defined function", name)));
        };

        let result = match func {
            Func::And => return self.eval_logic(dot, cmd, name, true, args, piped),
            Func::Or => return self.eval_logic(dot, cmd, name, false, args, piped),
            Func::Pure(f) => {
                let values = self.eval_args(dot, cmd, args, piped)?;
                f(&values)
            }
            Func::Include => {
                let values = self.eval_args(dot, cmd, args, piped)?;
                context::include(self.ctx, &values)
            }
            Func::Tpl => {
                let values = self.eval_args(dot, cmd, args, piped)?;
                context::tpl(self.ctx, &self.tree.name, &values)
            }
            Func::Required => {
                let values = self.eval_args(dot, cmd, args, piped)?;
                context::required(&self.ctx.options, &values)
            }
            Func::Fail => {
                let values = self.eval_args(dot, cmd, args, piped)?;
                context::fail(&self.ctx.options, &values)
            }
        };
        result.map_err(|err| self.call_error(cmd, name, err))
    }

    /// `and` stops at the first falsy operand, `or` at the first truthy one;
    /// either returns the operand it stopped at, or the last one.
    fn eval_logic(
        &mut self,
        dot: &Value,
        cmd: &Command,
        name: &str,
        is_and: bool,
        args: &[Arg],
        piped: Option<Value>,
    ) -> Result<Value, TemplateError> {
        if args.is_empty() && piped.is_none() {
            return Err(self.call_error(cmd, name, FuncError::message("missing argument")));
        }
        let mut last = Value::Null;
        for arg in args {
            last = self.eval_arg(dot, cmd, arg)?;
            if last.is_truthy() != is_and {
                return Ok(last);
            }
        }
        Ok(piped.unwrap_or(last))
    }
}
