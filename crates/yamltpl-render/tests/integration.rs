//! Integration tests for yamltpl-render.
//!
//! Each test renders a small batch of templates end to end through the public
//! API and checks either the produced documents or the user-facing error.

use yamltpl_render::{
    render, RenderError, RenderOptions, Renderer, TemplateFile, TemplateSource, Values,
    MAX_INCLUDE_DEPTH,
};

fn values(yaml: &str) -> Values {
    Values::from_yaml(yaml).unwrap()
}

fn file(name: &str, text: &str) -> TemplateFile {
    TemplateFile::new(name, text)
}

fn render_with(
    options: RenderOptions,
    files: Vec<TemplateFile>,
    vals: &Values,
) -> Result<Vec<(String, String)>, RenderError> {
    Renderer::new(options)
        .render_files(files, vals)
        .map(|out| out.into_iter().collect())
}

// ============================================================================
// Basic rendering
// ============================================================================

#[test]
fn hello_values() {
    let out = render(vec![file("t.yaml", "Hello {{ .Values.name }}")], &values("name: world")).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out["t.yaml"], "Hello world");
}

#[test]
fn top_level_keys_and_template_metadata() {
    let out = render(
        vec![file("dir/t.yaml", "{{ .name }} from {{ .Template.Name }}")],
        &values("name: world"),
    )
    .unwrap();
    assert_eq!(out["dir/t.yaml"], "world from dir/t.yaml");
}

#[test]
fn base_path_comes_from_source() {
    let source = TemplateSource::new("chart/t.yaml", "{{ .Template.BasePath }}", Values::new())
        .with_base_path("chart/templates");
    let out = Renderer::default().render(vec![source]).unwrap();
    assert_eq!(out["chart/t.yaml"], "chart/templates");
}

#[test]
fn each_source_uses_its_own_values() {
    let out = Renderer::default()
        .render(vec![
            TemplateSource::new("a.yaml", "{{ .Values.who }}", values("who: alice")),
            TemplateSource::new("b.yaml", "{{ .Values.who }}", values("who: bob")),
        ])
        .unwrap();
    assert_eq!(out["a.yaml"], "alice");
    assert_eq!(out["b.yaml"], "bob");
}

#[test]
fn range_with_whitespace_trimming() {
    let text = "items:\n{{- range .Values.items }}\n  - {{ . }}\n{{- end }}";
    let out = render(vec![file("t.yaml", text)], &values("items: [a, b]")).unwrap();
    assert_eq!(out["t.yaml"], "items:\n  - a\n  - b");
}

#[test]
fn to_yaml_nindent() {
    let text = "spec:{{ .Values.labels | toYaml | nindent 2 }}";
    let out = render(vec![file("t.yaml", text)], &values("labels:\n  app: web\n  tier: fe")).unwrap();
    assert_eq!(out["t.yaml"], "spec:\n  app: web\n  tier: fe");
}

#[test]
fn variables_and_conditionals() {
    let text = r#"{{ $n := .Values.replicas }}{{ if gt $n 1 }}ha{{ else if eq $n 1 }}single{{ else }}off{{ end }}"#;
    for (replicas, expected) in [("3", "ha"), ("1", "single"), ("0", "off")] {
        let vals = values(&format!("replicas: {}", replicas));
        let out = render(vec![file("t.yaml", text)], &vals).unwrap();
        assert_eq!(out["t.yaml"], expected);
    }
}

#[test]
fn default_and_quote_pipeline() {
    let text = r#"image: {{ .Values.image.tag | default "latest" | quote }}"#;
    let out = render(vec![file("t.yaml", text)], &values("image: {}")).unwrap();
    assert_eq!(out["t.yaml"], r#"image: "latest""#);
}

// ============================================================================
// Partials and include
// ============================================================================

#[test]
fn include_partial_file() {
    let files = vec![
        file("main.yaml", r#"greeting: {{ include "_partial.yaml" . }}"#),
        file("_partial.yaml", "Hello {{ .Values.name }}"),
    ];
    let out = render(files, &values("name: world")).unwrap();
    assert_eq!(out["main.yaml"], "greeting: Hello world");
    assert!(!out.contains_key("_partial.yaml"));
}

#[test]
fn partials_produce_no_output() {
    let files = vec![
        file("_helpers.yaml", r#"{{ define "name" }}app{{ end }}"#),
        file("nested/_more.yaml", "ignored"),
        file("nested/deploy.yaml", r#"name: {{ include "name" . }}"#),
    ];
    let out = render(files, &Values::new()).unwrap();
    assert_eq!(out.keys().collect::<Vec<_>>(), vec!["nested/deploy.yaml"]);
    assert_eq!(out["nested/deploy.yaml"], "name: app");
}

#[test]
fn later_parsed_define_wins() {
    let files = vec![
        file("main.yaml", r#"{{ include "x" . }}"#),
        file("_a.yaml", r#"{{ define "x" }}from a{{ end }}"#),
        file("_b.yaml", r#"{{ define "x" }}from b{{ end }}"#),
    ];
    for _ in 0..3 {
        let out = render(files.clone(), &Values::new()).unwrap();
        assert_eq!(out["main.yaml"], "from a");
    }
}

#[test]
fn include_missing_template_fails() {
    let err = render(vec![file("t.yaml", r#"{{ include "nope" . }}"#)], &Values::new()).unwrap_err();
    assert!(matches!(err, RenderError::Execution { .. }));
    assert!(err.to_string().starts_with("execution error at (t.yaml:1:"));
    assert!(err.to_string().contains("nope"));
}

// ============================================================================
// Recursion ceiling
// ============================================================================

const COUNTDOWN: &str = r#"{{ define "loop" }}{{ if gt . 0 }}{{ include "loop" (sub . 1) }}{{ end }}{{ end }}"#;

#[test]
fn include_nesting_up_to_ceiling_succeeds() {
    // The first call enters at depth 1, so counting down from N nests N + 1 deep.
    let text = format!(r#"{}done{{{{ include "loop" {} }}}}"#, COUNTDOWN, MAX_INCLUDE_DEPTH - 1);
    let out = render(vec![file("t.yaml", &text)], &Values::new()).unwrap();
    assert_eq!(out["t.yaml"], "done");
}

#[test]
fn include_nesting_past_ceiling_fails() {
    let text = format!(r#"{}{{{{ include "loop" {} }}}}"#, COUNTDOWN, MAX_INCLUDE_DEPTH);
    let err = render(vec![file("t.yaml", &text)], &Values::new()).unwrap_err();
    assert!(matches!(err, RenderError::RecursionLimit { ref name, .. } if name == "loop"));
}

#[test]
fn infinite_include_reports_recursion() {
    let text = r#"{{ define "loop" }}{{ include "loop" . }}{{ end }}{{ include "loop" . }}"#;
    let err = render(vec![file("t.yaml", text)], &Values::new()).unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("execution error at (t.yaml:1:"), "{}", message);
    assert!(message.ends_with(
        "rendering template has a nested reference name: loop: unable to execute template"
    ));
}

#[test]
fn infinite_template_reports_location() {
    let text = r#"{{ define "loop" }}{{ template "loop" . }}{{ end }}{{ template "loop" . }}"#;
    let err = render(vec![file("m.yaml", text)], &Values::new()).unwrap_err();
    assert!(matches!(err, RenderError::Execution { .. }));
    assert_eq!(err.location().map(|l| l.name.as_str()), Some("m.yaml"));
    let message = err.to_string();
    assert!(message.starts_with("execution error at (m.yaml:1:"), "{}", message);
    assert!(message.ends_with("exceeded maximum template depth (10000)"), "{}", message);
}

#[test]
fn depth_is_fresh_per_render() {
    let text = format!(r#"{}{{{{ include "loop" {} }}}}"#, COUNTDOWN, MAX_INCLUDE_DEPTH - 1);
    let mut renderer = Renderer::default();
    for _ in 0..2 {
        renderer
            .render_files(vec![file("t.yaml", &text)], &Values::new())
            .unwrap();
    }
}

// ============================================================================
// Strict, lenient and lint modes
// ============================================================================

#[test]
fn lenient_missing_value_renders_empty() {
    let out = render(vec![file("t.yaml", "a: {{ .Values.missing }}")], &Values::new()).unwrap();
    assert_eq!(out["t.yaml"], "a: ");

    let out = render(vec![file("t.yaml", "a: {{ .Values.missing.deeper }}")], &Values::new()).unwrap();
    assert_eq!(out["t.yaml"], "a: ");
}

#[test]
fn strict_missing_value_fails() {
    let err = render_with(
        RenderOptions::new().strict(true),
        vec![file("t.yaml", "a: {{ .Values.missing }}")],
        &Values::new(),
    )
    .unwrap_err();
    assert!(matches!(err, RenderError::Execution { .. }));
    assert_eq!(err.location().map(|l| l.line), Some(1));
    assert!(err.to_string().contains(r#"map has no entry for key "missing""#));
}

#[test]
fn strict_present_value_renders() {
    let out = render_with(
        RenderOptions::new().strict(true),
        vec![file("t.yaml", "a: {{ .Values.present }}")],
        &values("present: yes-please"),
    )
    .unwrap();
    assert_eq!(out, vec![("t.yaml".to_string(), "a: yes-please".to_string())]);
}

#[test]
fn strict_null_value_renders_empty() {
    let out = render_with(
        RenderOptions::new().strict(true),
        vec![
            file("a.yaml", "a=[{{ .Values.a }}]"),
            file("b.yaml", r#"b=[{{ index .Values "b" }}]"#),
        ],
        &values("a: null"),
    )
    .unwrap();
    assert_eq!(
        out,
        vec![
            ("a.yaml".to_string(), "a=[]".to_string()),
            ("b.yaml".to_string(), "b=[]".to_string()),
        ]
    );
}

#[test]
fn required_message_is_surfaced() {
    let text = "line one\nimage: {{ required \"image tag is required\" .Values.tag }}";
    let err = render(vec![file("deploy.yaml", text)], &Values::new()).unwrap_err();
    let location = err.location().unwrap();
    assert_eq!(location.name, "deploy.yaml");
    assert_eq!(location.line, 2);
    assert!(err.to_string().ends_with("): image tag is required"));
}

#[test]
fn required_message_from_nested_include() {
    let files = vec![
        file("_helpers.yaml", r#"{{ define "tag" }}{{ required "need a tag" .tag }}{{ end }}"#),
        file("main.yaml", r#"tag: {{ include "tag" .Values }}"#),
    ];
    let err = render(files, &Values::new()).unwrap_err();
    assert!(err.to_string().starts_with("execution error at (main.yaml:1:"));
    assert!(err.to_string().ends_with(": need a tag"));
}

#[test]
fn fail_message_is_surfaced() {
    let err = render(vec![file("t.yaml", r#"{{ fail "unsupported mode" }}"#)], &Values::new()).unwrap_err();
    assert!(err.to_string().ends_with(": unsupported mode"));
}

#[test]
fn lint_mode_tolerates_required_and_fail() {
    let files = vec![file(
        "t.yaml",
        r#"a: {{ required "need a" .Values.a }}{{ fail "stop" }}b"#,
    )];
    let out = render_with(RenderOptions::new().lint_mode(true), files, &Values::new()).unwrap();
    assert_eq!(out[0].1, "a: b");
}

// ============================================================================
// tpl
// ============================================================================

#[test]
fn tpl_renders_value_text() {
    let vals = values("name: world\ngreeting: 'Hello {{ .Values.name }}'");
    let out = render(vec![file("t.yaml", "{{ tpl .Values.greeting . }}")], &vals).unwrap();
    assert_eq!(out["t.yaml"], "Hello world");
}

#[test]
fn tpl_strips_placeholder() {
    let vals = values("text: '[{{ .Values.missing }}]'");
    let out = render(vec![file("t.yaml", "{{ tpl .Values.text . }}")], &vals).unwrap();
    assert_eq!(out["t.yaml"], "[]");
}

#[test]
fn tpl_defines_stay_local() {
    let text = r#"{{ tpl "{{ define \"inner\" }}I{{ end }}{{ include \"inner\" . }}" . }}"#;
    let out = render(vec![file("t.yaml", text)], &Values::new()).unwrap();
    assert_eq!(out["t.yaml"], "I");

    let leaked = format!(r#"{}{{{{ include "inner" . }}}}"#, text);
    assert!(render(vec![file("t.yaml", &leaked)], &Values::new()).is_err());
}

#[test]
fn tpl_parse_error_is_reported() {
    let vals = values("text: '{{ if }}'");
    let err = render(vec![file("t.yaml", "{{ tpl .Values.text . }}")], &vals).unwrap_err();
    assert!(err.to_string().contains("cannot parse template"));
}

// ============================================================================
// Parse errors and atomicity
// ============================================================================

#[test]
fn parse_error_names_file_and_line() {
    let err = render(vec![file("bad.yaml", "ok\n{{ if }}x{{ end }}")], &Values::new()).unwrap_err();
    assert!(matches!(err, RenderError::Parse { .. }));
    let message = err.to_string();
    assert!(message.starts_with("parse error at (bad.yaml:2:"), "{}", message);
    assert!(message.contains("missing value for if"));
}

#[test]
fn unknown_function_is_a_parse_error() {
    let err = render(vec![file("t.yaml", "{{ nosuchfn 1 }}")], &Values::new()).unwrap_err();
    assert!(err.to_string().contains(r#"function "nosuchfn" not defined"#));
}

#[test]
fn one_failure_fails_the_whole_pass() {
    let files = vec![
        file("good.yaml", "fine"),
        file("bad.yaml", r#"{{ fail "no" }}"#),
    ];
    assert!(render(files, &Values::new()).is_err());
}
