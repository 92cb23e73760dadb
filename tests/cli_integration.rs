// tests/cli_integration.rs
//! Drives the `pi` binary on JSON packages.

use std::io::Write;
use std::process::{Command, Stdio};

const SHAPES: &str = r#"{
  "name": "shapes",
  "private_types": [
    {"name": "Shape", "ty": {"interface": {"methods": [
      {"name": "area", "return_type": {"primitive": "i32"}}
    ]}}},
    {"name": "Square", "ty": {"struct": {"properties": [
      {"mutable": true, "ty": {"primitive": "i32"}, "names": ["side"]}
    ]}}}
  ],
  "private_functions": [
    {
      "name": "area",
      "receiver": {"ty": {"pointer": {"named": "Square"}}, "binder": "s"},
      "return_type": {"primitive": "i32"},
      "body": {"stmts": [{"return": {"int": 4}}]}
    }
  ]
}"#;

const UNKNOWN_VARIABLE: &str = r#"{
  "name": "broken",
  "private_functions": [
    {
      "name": "main",
      "return_type": {"primitive": "i32"},
      "body": {"stmts": [{"return": {"ident": "nope"}}]}
    }
  ]
}"#;

fn pi() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pi"))
}

fn package_file(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn build_writes_ir_file() {
    let package = package_file(SHAPES);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("shapes.ll");

    let output = pi()
        .arg("build")
        .arg(package.path())
        .arg("-o")
        .arg(&out)
        .arg("--target-triple")
        .arg("x86_64-unknown-linux-gnu")
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "build failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let ir = std::fs::read_to_string(&out).unwrap();
    assert!(ir.starts_with("; ModuleID = 'shapes'"));
    assert!(ir.contains("target triple = \"x86_64-unknown-linux-gnu\""));
    assert!(ir.contains("%Shape_VTable = type { ptr }"));
    assert!(ir.contains("@Shape_vtable = private constant %Shape_VTable { ptr @Square_area }"));
    assert!(ir.contains("define i32 @Square_area(ptr %s) {"));
}

#[test]
fn build_reads_stdin_and_writes_stdout() {
    let mut child = pi()
        .args(["build", "-", "--module-name", "geometry"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(SHAPES.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("; ModuleID = 'geometry'\nsource_filename = \"geometry\""));
}

#[test]
fn build_reports_codegen_errors() {
    let package = package_file(UNKNOWN_VARIABLE);
    let output = pi()
        .args(["--color", "never", "build"])
        .arg(package.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("E3004"), "stderr: {stderr}");
    assert!(stderr.contains("nope"), "stderr: {stderr}");
}

#[test]
fn check_lists_implementations() {
    let package = package_file(SHAPES);
    let output = pi().arg("check").arg(package.path()).output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, "Square implements Shape\n  area -> Shape.area\n");
}

#[test]
fn invalid_json_fails() {
    let package = package_file("{");
    let output = pi().arg("check").arg(package.path()).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not a valid package"));
}
