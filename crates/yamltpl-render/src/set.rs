//! The template set: every parsed tree of a render pass, addressable by name.

use std::collections::HashMap;
use std::sync::Arc;

use yamltpl_values::Value;

use crate::ast::Tree;
use crate::error::TemplateError;
use crate::exec::{self, CallDepth, ExecContext};
use crate::parser;
use crate::renderer::RenderOptions;

/// Named parsed templates.
///
/// Trees are reference counted, so cloning a set copies only the name map.
/// A clone is independent: templates added to it are invisible to the
/// original.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    trees: HashMap<String, Arc<Tree>>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `text` and registers it as `name`, along with every template it
    /// defines. Returns the top-level tree.
    pub fn parse(&mut self, name: &str, text: &str) -> Result<Arc<Tree>, TemplateError> {
        let parsed = parser::parse(name, text)?;
        let top = Arc::new(parsed.top);
        self.add(Arc::clone(&top));
        for tree in parsed.defined {
            self.add(Arc::new(tree));
        }
        Ok(top)
    }

    /// Registers `tree` under its name. An empty tree never replaces a
    /// non-empty one; returns whether the set changed.
    pub fn add(&mut self, tree: Arc<Tree>) -> bool {
        if let Some(existing) = self.trees.get(tree.name()) {
            if tree.is_empty() && !existing.is_empty() {
                return false;
            }
        }
        self.trees.insert(tree.name().to_string(), tree);
        true
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Arc<Tree>> {
        self.trees.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.trees.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.trees.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Executes template `name` against `data` with a fresh call-depth map.
    ///
    /// The output is returned as produced; the `<no value>` placeholder is not
    /// stripped here.
    pub fn execute(&self, name: &str, data: &Value, options: RenderOptions) -> Result<String, TemplateError> {
        let mut depth = CallDepth::new();
        self.execute_with(name, data, options, &mut depth)
    }

    /// Like [`execute`](Self::execute), sharing `depth` with other executions
    /// of the same render pass.
    pub fn execute_with(
        &self,
        name: &str,
        data: &Value,
        options: RenderOptions,
        depth: &mut CallDepth,
    ) -> Result<String, TemplateError> {
        let mut ctx = ExecContext {
            set: self,
            depth,
            options,
        };
        let mut out = String::new();
        exec::execute(&mut ctx, name, data, &mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yamltpl_values::Mapping;

    fn map(pairs: &[(&str, Value)]) -> Value {
        let mut m = Mapping::new();
        for (k, v) in pairs {
            m.insert(k.to_string(), v.clone());
        }
        Value::Map(m)
    }

    fn run(set: &TemplateSet, name: &str, data: &Value) -> String {
        set.execute(name, data, RenderOptions::new()).unwrap()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    #[test]
    fn test_parse_registers_defines() {
        let mut set = TemplateSet::new();
        set.parse("a.yaml", r#"{{ define "x" }}X{{ end }}body"#).unwrap();
        assert_eq!(set.names(), vec!["a.yaml", "x"]);
        assert_eq!(run(&set, "x", &Value::Null), "X");
        assert_eq!(run(&set, "a.yaml", &Value::Null), "body");
    }

    #[test]
    fn test_empty_define_does_not_replace() {
        let mut set = TemplateSet::new();
        set.parse("a", r#"{{ define "x" }}kept{{ end }}"#).unwrap();
        set.parse("b", r#"{{ define "x" }}  {{/* nothing */}} {{ end }}"#).unwrap();
        assert_eq!(run(&set, "x", &Value::Null), "kept");

        set.parse("c", r#"{{ define "x" }}replaced{{ end }}"#).unwrap();
        assert_eq!(run(&set, "x", &Value::Null), "replaced");
    }

    #[test]
    fn test_clone_is_independent() {
        let mut set = TemplateSet::new();
        set.parse("a", "A").unwrap();
        let mut copy = set.clone();
        copy.parse("b", "B").unwrap();
        assert!(copy.contains("b"));
        assert!(!set.contains("b"));
        assert_eq!(set.len(), 1);
    }

    // =========================================================================
    // Execution
    // =========================================================================

    #[test]
    fn test_execute_missing_template() {
        let set = TemplateSet::new();
        let err = set.execute("nope", &Value::Null, RenderOptions::new()).unwrap_err();
        assert!(matches!(err, TemplateError::NotDefined { .. }));
    }

    #[test]
    fn test_execute_with_fields_and_range() {
        let mut set = TemplateSet::new();
        set.parse("t", "{{ range $i, $v := .items }}{{ $i }}={{ $v }};{{ end }}")
            .unwrap();
        let data = map(&[(
            "items",
            Value::Seq(vec![Value::from("a"), Value::from("b")]),
        )]);
        assert_eq!(run(&set, "t", &data), "0=a;1=b;");
    }

    #[test]
    fn test_lenient_missing_key_prints_placeholder() {
        let mut set = TemplateSet::new();
        set.parse("t", "[{{ .missing.deeper }}]").unwrap();
        assert_eq!(run(&set, "t", &map(&[])), "[<no value>]");
    }

    #[test]
    fn test_strict_missing_key_fails() {
        let mut set = TemplateSet::new();
        set.parse("t", "{{ .missing }}").unwrap();
        let err = set
            .execute("t", &map(&[]), RenderOptions::new().strict(true))
            .unwrap_err();
        assert!(err.to_string().contains("map has no entry for key \"missing\""));
    }
}
