use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

const BIN: &str = env!("CARGO_BIN_EXE_ddl-schema");

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../extract/tests/fixtures")
        .join(name)
}

fn run(args: &[&str]) -> Output {
    Command::new(BIN)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run ddl-schema")
}

fn run_with_stdin(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(BIN)
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn ddl-schema");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("failed to write stdin");
    child.wait_with_output().expect("failed to wait for ddl-schema")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

fn write_config(dir: &Path, yaml: &str) -> PathBuf {
    let path = dir.join("ddl-schema.yaml");
    fs::write(&path, yaml).expect("failed to write config");
    path
}

// ---------------------------------------------------------------------------
// parse-file / parse-stdin
// ---------------------------------------------------------------------------

#[test]
fn parse_file_emits_tables_as_json() {
    let input = fixture("migration_shop.sql");
    let output = run(&["parse-file", "--input", input.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let tables = json(&output);
    let names: Vec<&str> = tables
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["table_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["customers", "orders", "order_lines"]);
    assert_eq!(tables[1]["foreign_keys"][0]["references_table"], "customers");
}

#[test]
fn parse_file_with_report() {
    let input = fixture("pg_dump_blog.sql");
    let output = run(&["parse-file", "--input", input.to_str().unwrap(), "--with-report"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let value = json(&output);
    assert_eq!(value["tables"].as_array().unwrap().len(), 3);
    assert_eq!(value["report"]["strategy"], "regex");
    assert_eq!(value["report"]["success"], true);
    assert_eq!(value["report"]["foreign_keys"], 2);
    assert_eq!(
        value["report"]["warnings"][0],
        "Ignored 1 constraint(s) referencing missing tables or columns"
    );
}

#[test]
fn parse_file_markdown_format() {
    let input = fixture("migration_shop.sql");
    let output = run(&[
        "parse-file",
        "--input",
        input.to_str().unwrap(),
        "--format",
        "markdown",
    ]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("# orders (Orders)"));
    assert!(text.contains("`customer_id` → `customers.id`"));
}

#[test]
fn parse_file_force_pk_not_null() {
    let input = fixture("migration_shop.sql");
    let output = run(&[
        "parse-file",
        "--input",
        input.to_str().unwrap(),
        "--force-pk-not-null",
    ]);
    assert!(output.status.success());
    assert_eq!(json(&output)[0]["columns"][0]["is_nullable"], false);
}

#[test]
fn parse_file_missing_input_fails() {
    let output = run(&["parse-file", "--input", "/nonexistent/schema.sql"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("error: Failed to read '/nonexistent/schema.sql'"));
}

#[test]
fn parse_stdin_reads_script() {
    let output = run_with_stdin(
        &["parse-stdin", "--format", "table"],
        "CREATE TABLE users (id serial PRIMARY KEY, email text NOT NULL);",
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Table: users  Entity: Users  Columns: 2"));
}

#[test]
fn parse_stdin_without_tables_is_an_error() {
    let output = run_with_stdin(&["parse-stdin"], "SELECT 1;");
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
    assert!(
        stderr(&output)
            .contains("error: No tables extracted: no CREATE TABLE statements found")
    );
}

// ---------------------------------------------------------------------------
// Strategy selection
// ---------------------------------------------------------------------------

#[test]
fn llm_mode_with_disabled_llm_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "llm:\n  enabled: false\n");
    let input = fixture("migration_shop.sql");
    let output = run(&[
        "parse-file",
        "--input",
        input.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--mode",
        "llm",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("llm extraction is disabled in configuration"));
}

#[test]
fn hybrid_mode_falls_back_to_regex_when_llm_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "parser:\n  mode: hybrid\nllm:\n  enabled: false\n  cache_responses: false\n",
    );
    let input = fixture("migration_shop.sql");
    let output = run(&[
        "parse-file",
        "--input",
        input.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--with-report",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let value = json(&output);
    assert_eq!(value["report"]["strategy"], "hybrid");
    assert_eq!(value["report"]["tables"], 3);
}

#[test]
fn invalid_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "llm:\n  temperature: 7.5\n");
    let input = fixture("migration_shop.sql");
    let output = run(&[
        "parse-file",
        "--input",
        input.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("error: Invalid configuration"));
}

// ---------------------------------------------------------------------------
// context / validate
// ---------------------------------------------------------------------------

#[test]
fn context_for_single_table() {
    let input = fixture("migration_shop.sql");
    let output = run(&[
        "context",
        "--input",
        input.to_str().unwrap(),
        "--table",
        "ORDERS",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let context = json(&output);
    assert_eq!(context["EntityName"], "Orders");
    assert_eq!(context["primary_key"]["name"], "id");
    assert_eq!(context["columns"][1]["IsForeignKey"], true);
    let editable: Vec<&str> = context["editable_columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert!(!editable.contains(&"id"));
}

#[test]
fn context_expands_path_template() {
    let input = fixture("migration_shop.sql");
    let output = run(&[
        "context",
        "--input",
        input.to_str().unwrap(),
        "--expand",
        "$table$/$table$Service.cs",
    ]);
    assert!(output.status.success());
    let lines: Vec<String> = stdout(&output).lines().map(String::from).collect();
    assert_eq!(
        lines,
        vec![
            "Customers/CustomersService.cs",
            "Orders/OrdersService.cs",
            "OrderLines/OrderLinesService.cs",
        ]
    );
}

#[test]
fn context_unknown_table_fails() {
    let input = fixture("migration_shop.sql");
    let output = run(&["context", "--input", input.to_str().unwrap(), "--table", "nope"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Table 'nope' not found"));
}

#[test]
fn validate_passes_and_strict_mode_flags_nullable_keys() {
    let input = fixture("migration_shop.sql");
    let path = input.to_str().unwrap();

    let output = run(&["validate", "--input", path]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(
        stdout(&output).contains("Validated 3 table(s) with 13 column(s) and 3 foreign key(s).")
    );

    let strict = run(&["validate", "--input", path, "--strict-primary-keys"]);
    assert_eq!(strict.status.code(), Some(1));
    let err = stderr(&strict);
    assert!(err.contains("primary key column id in table customers is nullable"));
    assert!(err.contains("error: 2 validation error(s)"));

    let forced = run(&[
        "validate",
        "--input",
        path,
        "--strict-primary-keys",
        "--force-pk-not-null",
    ]);
    assert!(forced.status.success(), "stderr: {}", stderr(&forced));
}

// ---------------------------------------------------------------------------
// batch
// ---------------------------------------------------------------------------

#[test]
fn batch_writes_outputs_and_report() {
    let inputs = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();
    fs::copy(fixture("migration_shop.sql"), inputs.path().join("shop.sql")).unwrap();
    fs::copy(fixture("pg_dump_blog.sql"), inputs.path().join("blog.sql")).unwrap();
    fs::write(inputs.path().join("empty.sql"), "-- nothing yet\n").unwrap();
    fs::write(inputs.path().join("README.txt"), "not sql").unwrap();

    let output = run(&[
        "batch",
        "--inputs",
        inputs.path().to_str().unwrap(),
        "--output",
        output_dir.path().to_str().unwrap(),
        "--format",
        "yaml",
        "--jobs",
        "2",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Extracted 2 of 3 input(s)"));
    assert!(stderr(&output).contains("1 input(s) failed"));

    assert!(output_dir.path().join("shop.yaml").exists());
    assert!(output_dir.path().join("blog.yaml").exists());
    assert!(!output_dir.path().join("empty.yaml").exists());

    let raw = fs::read_to_string(output_dir.path().join("batch-report.json")).unwrap();
    let report: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(report["total"], 3);
    assert_eq!(report["succeeded"], 2);
    assert_eq!(report["failed"], 1);
    // inputs are processed in sorted order
    assert!(
        report["entries"][0]["input"]
            .as_str()
            .unwrap()
            .ends_with("blog.sql")
    );
    assert_eq!(report["entries"][1]["report"]["success"], false);
}

#[test]
fn batch_without_any_tables_fails() {
    let inputs = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();
    let empty = inputs.path().join("empty.sql");
    fs::write(&empty, "SELECT 1;").unwrap();

    let output = run(&[
        "batch",
        "--inputs",
        empty.to_str().unwrap(),
        "--output",
        output_dir.path().to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("error: No input produced any tables"));
    assert!(output_dir.path().join("batch-report.json").exists());
}
