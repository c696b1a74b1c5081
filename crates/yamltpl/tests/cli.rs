//! End-to-end tests for the yamltpl front end.
//!
//! Invocations are parsed with clap exactly as the binary does, then driven
//! through `run` with in-memory stdin and stdout.

use std::fs;
use std::path::Path;

use clap::Parser;
use tempfile::TempDir;
use yamltpl::{run, Cli};

fn write(root: &Path, name: &str, content: &str) {
    let path = root.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn invoke(args: &[&str], stdin: &str) -> anyhow::Result<String> {
    let cli = Cli::try_parse_from(std::iter::once("yamltpl").chain(args.iter().copied()))?;
    let mut out = Vec::new();
    run(&cli, stdin.as_bytes(), &mut out)?;
    Ok(String::from_utf8(out)?)
}

fn chart() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "templates/_helpers.yaml", r#"{{ define "app" }}{{ .Values.name }}-app{{ end }}"#);
    write(dir.path(), "templates/deploy.yaml", r#"name: {{ include "app" . }}"#);
    write(dir.path(), "templates/nested/svc.yml", "port: {{ .Values.port }}");
    write(dir.path(), "values.yaml", "name: web\nport: 80\n");
    write(dir.path(), "prod.yaml", "port: 443\n");
    dir
}

// ============================================================================
// Rendering a directory
// ============================================================================

#[test]
fn renders_directory_to_stdout() {
    let dir = chart();
    let root = dir.path();
    let out = invoke(
        &[
            "-i",
            root.join("templates").to_str().unwrap(),
            "-v",
            root.join("values.yaml").to_str().unwrap(),
        ],
        "",
    )
    .unwrap();
    assert_eq!(
        out,
        "# Source: deploy.yaml\nname: web-app\n---\n# Source: nested/svc.yml\nport: 80\n---\n"
    );
}

#[test]
fn later_values_and_overrides_win() {
    let dir = chart();
    let root = dir.path();
    let values = format!(
        "{},{}",
        root.join("values.yaml").display(),
        root.join("prod.yaml").display()
    );
    let out = invoke(
        &[
            "-i",
            root.join("templates").to_str().unwrap(),
            "-v",
            &values,
            "--set",
            "name=api",
        ],
        "",
    )
    .unwrap();
    assert!(out.contains("name: api-app\n"));
    assert!(out.contains("port: 443\n"));
}

#[test]
fn writes_output_directory() {
    let dir = chart();
    let root = dir.path();
    let out_dir = root.join("out");
    let out = invoke(
        &[
            "-i",
            root.join("templates").to_str().unwrap(),
            "-v",
            root.join("values.yaml").to_str().unwrap(),
            "-o",
            out_dir.to_str().unwrap(),
        ],
        "",
    )
    .unwrap();
    assert!(out.is_empty());
    assert_eq!(fs::read_to_string(out_dir.join("deploy.yaml")).unwrap(), "name: web-app");
    assert_eq!(fs::read_to_string(out_dir.join("nested/svc.yml")).unwrap(), "port: 80");
    assert!(!out_dir.join("_helpers.yaml").exists());
}

// ============================================================================
// Stdin, subcommands and errors
// ============================================================================

#[test]
fn renders_stdin() {
    let out = invoke(&["-s", "--set", "who=world"], "Hello {{ .Values.who }}").unwrap();
    assert_eq!(out, "# Source: stdin\nHello world\n---\n");
}

#[test]
fn missing_input_dir_is_an_error() {
    let err = invoke(&[], "").unwrap_err();
    assert_eq!(err.to_string(), "input dir is not specified");
}

#[test]
fn strict_flag_fails_on_missing_value() {
    let err = invoke(&["-s", "--strict"], "{{ .Values.nope }}").unwrap_err();
    assert!(err.to_string().starts_with("execution error at (stdin:1:"));
}

#[test]
fn lint_flag_tolerates_required() {
    let out = invoke(&["-s", "--lint"], r#"x: {{ required "x is required" .Values.x }}"#).unwrap();
    assert_eq!(out, "# Source: stdin\nx: \n---\n");
}

#[test]
fn version_subcommand() {
    let out = invoke(&["version"], "").unwrap();
    assert!(out.starts_with(&format!("version: {} build time: ", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn values_subcommand_prints_merged_store() {
    let dir = chart();
    let root = dir.path();
    let values = format!(
        "{},{}",
        root.join("values.yaml").display(),
        root.join("prod.yaml").display()
    );
    let out = invoke(&["values", "-v", &values, "--set", "extra.key=1"], "").unwrap();
    assert_eq!(out, "extra:\n  key: '1'\nname: web\nport: 443\n");
}
