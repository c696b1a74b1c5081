//! Go-template style rendering for YAML documents.
//!
//! A render pass takes a batch of named templates and a [`Values`] store and
//! produces one output per template. Templates can share definitions, pull in
//! each other's output with `include`, render strings as templates with `tpl`,
//! and insist on values with `required`.
//!
//! ```rust
//! use yamltpl_render::{render, TemplateFile};
//! use yamltpl_values::Values;
//!
//! let values = Values::from_yaml("name: world\nreplicas: 3").unwrap();
//! let output = render(
//!     vec![
//!         TemplateFile::new("greeting.yaml", "message: Hello {{ .Values.name | upper }}"),
//!         TemplateFile::new(
//!             "deploy.yaml",
//!             "{{ if gt .Values.replicas 1 }}mode: ha{{ else }}mode: single{{ end }}",
//!         ),
//!     ],
//!     &values,
//! )
//! .unwrap();
//!
//! assert_eq!(output["greeting.yaml"], "message: Hello WORLD");
//! assert_eq!(output["deploy.yaml"], "mode: ha");
//! ```
//!
//! # Template Data
//!
//! Each template executes against a mapping holding:
//!
//! | Key | Contents |
//! |-----|----------|
//! | every top-level key of the store | the store's entries |
//! | `Values` | the whole store |
//! | `Template.Name` | the template's name |
//! | `Template.BasePath` | the source's base path |
//!
//! # Partials
//!
//! Templates whose base name starts with `_` are parsed, so their definitions
//! and `include`s are available, but they produce no output of their own.
//!
//! # Modes
//!
//! | Mode | Missing value | `required` / `fail` |
//! |------|---------------|---------------------|
//! | lenient (default) | renders as nothing | error |
//! | [`strict`](RenderOptions::strict) | error | error |
//! | [`lint_mode`](RenderOptions::lint_mode) | as above | logged, render continues |
//!
//! # Errors
//!
//! A failed pass returns a [`RenderError`] whose message is short and
//! user-facing:
//!
//! ```text
//! execution error at (deploy.yaml:4:12): image tag is required
//! ```
//!
//! `include` nesting of one template name is capped at
//! [`MAX_INCLUDE_DEPTH`] levels.

mod ast;
mod error;
mod exec;
mod funcs;
mod lexer;
mod parser;
mod renderer;
mod set;

pub use ast::Tree;
pub use error::{FuncError, Location, RenderError, TemplateError};
pub use exec::{CallDepth, MAX_INCLUDE_DEPTH, NO_VALUE};
pub use funcs::function_names;
pub use renderer::{
    is_partial, parse_order, render, RenderOptions, RenderState, Renderer, TemplateFile, TemplateSource,
};
pub use set::TemplateSet;

pub use yamltpl_values::{Value, Values};
