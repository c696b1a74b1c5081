//! The render pass: parse every source into one template set, then execute
//! each non-partial source against its own values.
//!
//! A pass is all-or-nothing. The first parse or execution failure aborts it
//! and no output is returned.
//!
//! # Ordering
//!
//! Sources are parsed and executed in [`parse_order`]: deeper paths first,
//! then names in descending order. Parsing in a fixed order makes the winner
//! of duplicate `define`s deterministic.
//!
//! # Stack
//!
//! Execution is recursive, and `include` may nest a thousand levels deep. The
//! pass therefore runs on a scoped worker thread with a large stack. A panic
//! on that thread is caught at the join and reported as
//! [`RenderError::Panicked`]; it is the only catch-all in the engine.

use std::any::Any;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::thread;

use tracing::debug;
use yamltpl_values::{Mapping, Value, Values};

use crate::error::RenderError;
use crate::exec::{CallDepth, NO_VALUE};
use crate::set::TemplateSet;

const WORKER_STACK_SIZE: usize = 512 * 1024 * 1024;

type Rendered = BTreeMap<String, String>;

/// Engine options.
///
/// ```rust
/// use yamltpl_render::RenderOptions;
///
/// let options = RenderOptions::new().strict(true);
/// assert!(options.strict);
/// assert!(!options.lint_mode);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Fail on references to missing values instead of printing nothing.
    pub strict: bool,
    /// Log `required` and `fail` instead of failing.
    pub lint_mode: bool,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn lint_mode(mut self, lint_mode: bool) -> Self {
        self.lint_mode = lint_mode;
        self
    }
}

/// A named template file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl TemplateFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// A template together with the values it renders against.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    pub name: String,
    pub content: Vec<u8>,
    pub values: Values,
    /// Exposed to the template as `.Template.BasePath`.
    pub base_path: String,
}

impl TemplateSource {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>, values: Values) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            values,
            base_path: String::new(),
        }
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }
}

/// Where a [`Renderer`] is in its current pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderState {
    #[default]
    Idle,
    Parsing,
    Executing,
    Done,
    Failed,
}

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderState::Idle => "idle",
            RenderState::Parsing => "parsing",
            RenderState::Executing => "executing",
            RenderState::Done => "done",
            RenderState::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn transition(state: &mut RenderState, next: RenderState) {
    debug!(from = %state, to = %next, "render state");
    *state = next;
}

/// Renders batches of templates.
///
/// ```rust
/// use yamltpl_render::{Renderer, RenderOptions, TemplateFile};
/// use yamltpl_values::Values;
///
/// let values = Values::from_yaml("name: world").unwrap();
/// let files = vec![
///     TemplateFile::new("hello.yaml", "greeting: {{ include \"_name.yaml\" . }}"),
///     TemplateFile::new("_name.yaml", "Hello {{ .Values.name }}"),
/// ];
///
/// let mut renderer = Renderer::new(RenderOptions::new());
/// let output = renderer.render_files(files, &values).unwrap();
///
/// assert_eq!(output["hello.yaml"], "greeting: Hello world");
/// assert!(!output.contains_key("_name.yaml"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
    state: RenderState,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            state: RenderState::Idle,
        }
    }

    pub fn options(&self) -> RenderOptions {
        self.options
    }

    /// State reached by the last pass.
    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Renders `files`, all against the same `values`.
    pub fn render_files(
        &mut self,
        files: Vec<TemplateFile>,
        values: &Values,
    ) -> Result<BTreeMap<String, String>, RenderError> {
        let sources = files
            .into_iter()
            .map(|file| TemplateSource::new(file.name, file.data, values.clone()))
            .collect();
        self.render(sources)
    }

    /// Renders `sources`, returning the output of every non-partial source
    /// keyed by name.
    ///
    /// When two sources share a name, the later one wins.
    pub fn render(&mut self, sources: Vec<TemplateSource>) -> Result<BTreeMap<String, String>, RenderError> {
        self.state = RenderState::Idle;
        let sources = ordered(sources);
        let options = self.options;
        let state = &mut self.state;

        let joined = thread::scope(|scope| -> Result<Result<Rendered, RenderError>, RenderError> {
            let worker = thread::Builder::new()
                .name("yamltpl-render".into())
                .stack_size(WORKER_STACK_SIZE)
                .spawn_scoped(scope, move || run_pass(options, &sources, state))
                .map_err(|err| RenderError::Panicked(format!("cannot start render worker: {}", err)))?;
            worker.join().map_err(|payload| RenderError::Panicked(panic_message(&*payload)))
        });

        match joined.and_then(|result| result) {
            Ok(rendered) => Ok(rendered),
            Err(err) => {
                if self.state != RenderState::Failed {
                    transition(&mut self.state, RenderState::Failed);
                }
                Err(err)
            }
        }
    }
}

/// Renders `files` against `values` with default options.
pub fn render(files: Vec<TemplateFile>, values: &Values) -> Result<BTreeMap<String, String>, RenderError> {
    Renderer::default().render_files(files, values)
}

/// The order sources are parsed and executed in: more `/`-separated
/// segments first, then names in descending order.
///
/// ```rust
/// use std::cmp::Ordering;
/// use yamltpl_render::parse_order;
///
/// assert_eq!(parse_order("a/b.yaml", "z.yaml"), Ordering::Less);
/// assert_eq!(parse_order("b.yaml", "a.yaml"), Ordering::Less);
/// ```
pub fn parse_order(a: &str, b: &str) -> Ordering {
    let depth = |name: &str| name.matches('/').count();
    depth(b).cmp(&depth(a)).then_with(|| b.cmp(a))
}

/// Whether `name` is a partial: its base name starts with `_`.
pub fn is_partial(name: &str) -> bool {
    let base = name.rsplit('/').next().unwrap_or(name);
    base.starts_with('_')
}

/// Drops earlier duplicates and sorts into [`parse_order`].
fn ordered(sources: Vec<TemplateSource>) -> Vec<TemplateSource> {
    let mut by_name: HashMap<String, TemplateSource> = HashMap::with_capacity(sources.len());
    for source in sources {
        by_name.insert(source.name.clone(), source);
    }
    let mut sources: Vec<TemplateSource> = by_name.into_values().collect();
    sources.sort_by(|a, b| parse_order(&a.name, &b.name));
    sources
}

fn run_pass(
    options: RenderOptions,
    sources: &[TemplateSource],
    state: &mut RenderState,
) -> Result<Rendered, RenderError> {
    transition(state, RenderState::Parsing);
    let mut set = TemplateSet::new();
    for source in sources {
        let text = match std::str::from_utf8(&source.content) {
            Ok(text) => text,
            Err(err) => {
                transition(state, RenderState::Failed);
                return Err(RenderError::ParseIn {
                    name: source.name.clone(),
                    message: format!("template is not valid UTF-8: {}", err),
                });
            }
        };
        if let Err(err) = set.parse(&source.name, text) {
            transition(state, RenderState::Failed);
            return Err(RenderError::from_parse(&source.name, err));
        }
    }

    transition(state, RenderState::Executing);
    let mut depth = CallDepth::new();
    let mut rendered = BTreeMap::new();
    for source in sources.iter().filter(|s| !is_partial(&s.name)) {
        debug!(template = %source.name, "executing");
        let data = template_data(source);
        let output = match set.execute_with(&source.name, &data, options, &mut depth) {
            Ok(output) => output.replace(NO_VALUE, ""),
            Err(err) => {
                transition(state, RenderState::Failed);
                return Err(RenderError::from_exec(&source.name, err));
            }
        };
        rendered.insert(source.name.clone(), output);
    }

    transition(state, RenderState::Done);
    Ok(rendered)
}

/// The data a source executes against: its own values, plus `Values` (the
/// whole store) and `Template` (`Name` and `BasePath`).
fn template_data(source: &TemplateSource) -> Value {
    let mut data: Mapping = source.values.as_mapping().clone();
    data.insert("Values".to_string(), Value::from(source.values.clone()));

    let mut template = Mapping::new();
    template.insert("Name".to_string(), Value::from(source.name.as_str()));
    template.insert("BasePath".to_string(), Value::from(source.base_path.as_str()));
    data.insert("Template".to_string(), Value::Map(template));

    Value::Map(data)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
