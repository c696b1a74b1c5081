//! Parsed template trees.

use std::fmt;
use std::sync::Arc;

use crate::lexer::Number;

/// A parsed template: the top-level body of a source, or one `define`d block.
#[derive(Debug, Clone)]
pub struct Tree {
    pub(crate) name: String,
    /// Name of the source the tree was parsed from. Locations use this name.
    pub(crate) parse_name: String,
    pub(crate) source: Arc<str>,
    pub(crate) root: List,
}

impl Tree {
    /// The name the tree is registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name of the source text the tree came from.
    pub fn parse_name(&self) -> &str {
        &self.parse_name
    }

    /// A tree is empty when it holds nothing but whitespace.
    pub fn is_empty(&self) -> bool {
        self.root.iter().all(|node| match node {
            Node::Text(text) => text.trim().is_empty(),
            _ => false,
        })
    }
}

pub(crate) type List = Vec<Node>;

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Text(String),
    Action(Pipeline),
    If(Branch),
    With(Branch),
    Range(Branch),
    Template {
        pos: usize,
        name: String,
        pipe: Option<Pipeline>,
    },
    Break,
    Continue,
}

/// The shared shape of `if`, `with`, and `range`.
#[derive(Debug, Clone)]
pub(crate) struct Branch {
    pub pos: usize,
    pub pipe: Pipeline,
    pub list: List,
    pub else_list: Option<List>,
}

#[derive(Debug, Clone)]
pub(crate) struct Pipeline {
    pub pos: usize,
    /// Variables declared or assigned by the pipeline.
    pub decl: Vec<String>,
    /// `=` rather than `:=`.
    pub is_assign: bool,
    pub cmds: Vec<Command>,
}

#[derive(Debug, Clone)]
pub(crate) struct Command {
    pub pos: usize,
    pub args: Vec<Arg>,
}

#[derive(Debug, Clone)]
pub(crate) enum Arg {
    Dot,
    Nil,
    Bool(bool),
    Number(Number),
    String(String),
    /// `.a.b`
    Field(Vec<String>),
    /// `$x.a.b`
    Variable(String, Vec<String>),
    /// A function name.
    Identifier(String),
    /// `(pipeline)`
    Pipe(Box<Pipeline>),
    /// A field chain on a function result or parenthesised pipeline.
    Chain(Box<Arg>, Vec<String>),
}

impl Arg {
    pub(crate) fn is_literal(&self) -> bool {
        matches!(
            self,
            Arg::Nil | Arg::Bool(_) | Arg::Number(_) | Arg::String(_) | Arg::Dot
        )
    }
}

fn write_fields(f: &mut fmt::Formatter<'_>, fields: &[String]) -> fmt::Result {
    fields.iter().try_for_each(|field| write!(f, ".{}", field))
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Dot => f.write_str("."),
            Arg::Nil => f.write_str("nil"),
            Arg::Bool(b) => write!(f, "{}", b),
            Arg::Number(Number::Int(i)) => write!(f, "{}", i),
            Arg::Number(Number::Float(x)) => write!(f, "{}", x),
            Arg::String(s) => write!(f, "{:?}", s),
            Arg::Field(fields) => write_fields(f, fields),
            Arg::Variable(name, fields) => {
                f.write_str(name)?;
                write_fields(f, fields)
            }
            Arg::Identifier(name) => f.write_str(name),
            Arg::Pipe(pipe) => write!(f, "({})", pipe),
            Arg::Chain(base, fields) => {
                write!(f, "{}", base)?;
                write_fields(f, fields)
            }
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", arg)?;
        }
        Ok(())
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.decl.is_empty() {
            f.write_str(&self.decl.join(", "))?;
            f.write_str(if self.is_assign { " = " } else { " := " })?;
        }
        for (i, cmd) in self.cmds.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", cmd)?;
        }
        Ok(())
    }
}
