//! Error types for parsing, executing, and rendering templates.
//!
//! Three layers of errors exist:
//!
//! - [`FuncError`]: what a helper function returns when it rejects its input.
//! - [`TemplateError`]: what the template language reports while parsing or
//!   executing a single template. It carries structured [`Location`]s and
//!   prints in the familiar `template: name:line:col: ...` form.
//! - [`RenderError`]: what a render pass surfaces to callers, after the
//!   template error has been translated into a short, user-facing message.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

const SENTINEL_START: &str = "ERR_START";
const SENTINEL_END: &str = "ERR_END";

static SENTINEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ERR_START((?s).*)ERR_END").expect("sentinel pattern is valid"));

/// Wraps a user-facing message so it survives nesting inside other errors.
pub(crate) fn wrap_sentinel(message: &str) -> String {
    format!("{}{}{}", SENTINEL_START, message, SENTINEL_END)
}

/// Extracts a sentinel-wrapped message from arbitrary error text.
pub(crate) fn extract_sentinel(text: &str) -> Option<String> {
    SENTINEL
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// A position inside a template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Name of the template source the position belongs to.
    pub name: String,
    /// 1-based line.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
}

impl Location {
    pub fn new(name: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            name: name.into(),
            line,
            column,
        }
    }

    /// Computes the location of byte offset `pos` in `source`.
    pub(crate) fn at(name: &str, source: &str, pos: usize) -> Self {
        let before = source.get(..pos).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        Self::new(name, line, column)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.name, self.line, self.column)
    }
}

/// Error returned by a helper function.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FuncError {
    #[error("{0}")]
    Message(String),

    #[error("wrong number of args for {name}: want {want} got {got}")]
    Arity {
        name: &'static str,
        want: &'static str,
        got: usize,
    },

    #[error("rendering template has a nested reference name: {name}: unable to execute template")]
    RecursionLimit { name: String },

    #[error(transparent)]
    Template(Box<TemplateError>),

    #[error("cannot parse template {text:?}: {source}")]
    TplParse {
        text: String,
        source: Box<TemplateError>,
    },

    #[error("error during tpl function execution for {text:?}: {source}")]
    TplExec {
        text: String,
        source: Box<TemplateError>,
    },
}

impl FuncError {
    pub fn message(message: impl Into<String>) -> Self {
        FuncError::Message(message.into())
    }

    pub(crate) fn arity(name: &'static str, want: &'static str, got: usize) -> Self {
        FuncError::Arity { name, want, got }
    }

    /// The template name whose include depth ran out, if this error was
    /// caused by the recursion ceiling at any nesting level.
    pub fn recursion_limit(&self) -> Option<&str> {
        match self {
            FuncError::RecursionLimit { name } => Some(name),
            FuncError::Template(inner) | FuncError::TplExec { source: inner, .. } => {
                inner.recursion_limit()
            }
            _ => None,
        }
    }
}

impl From<TemplateError> for FuncError {
    fn from(err: TemplateError) -> Self {
        FuncError::Template(Box::new(err))
    }
}

/// Error raised by the template language.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    /// The source text could not be parsed.
    #[error("template: {location}: {message}")]
    Parse { location: Location, message: String },

    /// Evaluating an action failed.
    #[error("template: {location}: executing {template:?} at <{context}>: {message}")]
    Exec {
        location: Location,
        /// Name of the tree that was executing.
        template: String,
        /// Source form of the command that failed.
        context: String,
        message: String,
        /// Set when the failure was the include recursion ceiling.
        recursion: Option<String>,
    },

    /// No tree with this name exists in the template set.
    #[error("template: no template {name:?} associated with template set")]
    NotDefined { name: String },

    /// Template calls nested deeper than the executor allows.
    #[error("template: exceeded maximum template depth ({limit})")]
    DepthExceeded { limit: usize },
}

impl TemplateError {
    /// See [`FuncError::recursion_limit`].
    pub fn recursion_limit(&self) -> Option<&str> {
        match self {
            TemplateError::Exec { recursion, .. } => recursion.as_deref(),
            _ => None,
        }
    }
}

/// Error returned by a render pass.
///
/// The `Display` form is the message a user sees: a short prefix naming the
/// phase and position, then the cause.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("parse error at ({location}): {message}")]
    Parse { location: Location, message: String },

    #[error("parse error in ({name}): {message}")]
    ParseIn { name: String, message: String },

    #[error("execution error at ({location}): {message}")]
    Execution { location: Location, message: String },

    #[error("execution error in ({name}): {message}")]
    ExecutionIn { name: String, message: String },

    #[error(
        "execution error at ({location}): rendering template has a nested reference name: {name}: unable to execute template"
    )]
    RecursionLimit { location: Location, name: String },

    #[error("rendering templates failed: {0}")]
    Panicked(String),
}

impl RenderError {
    /// Translates an error raised while parsing source `name`.
    pub(crate) fn from_parse(name: &str, err: TemplateError) -> Self {
        match err {
            TemplateError::Parse { location, message } => RenderError::Parse { location, message },
            other => RenderError::ParseIn {
                name: name.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Translates an error raised while executing source `name`.
    ///
    /// Messages raised by `required` and `fail` are unwrapped from whatever
    /// nesting they went through.
    pub(crate) fn from_exec(name: &str, err: TemplateError) -> Self {
        match err {
            TemplateError::Exec {
                location,
                recursion: Some(name),
                ..
            } => RenderError::RecursionLimit { location, name },
            TemplateError::Exec {
                location, message, ..
            } => RenderError::Execution {
                message: extract_sentinel(&message).unwrap_or(message),
                location,
            },
            other => {
                let text = other.to_string();
                RenderError::ExecutionIn {
                    name: name.to_string(),
                    message: extract_sentinel(&text).unwrap_or(text),
                }
            }
        }
    }

    /// The location the error points at, when known.
    pub fn location(&self) -> Option<&Location> {
        match self {
            RenderError::Parse { location, .. }
            | RenderError::Execution { location, .. }
            | RenderError::RecursionLimit { location, .. } => Some(location),
            _ => None,
        }
    }
}
