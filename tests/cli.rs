//! Integration tests for the `analyst` binary.
//!
//! Each test builds a temporary document directory and config file, runs the
//! compiled binary, and checks its output. The model provider is disabled so
//! no test touches the network.

use std::fs;
use std::path::{Path, PathBuf};
use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn analyst_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.push("analyst");
    path
}

fn minimal_docx_with_text(phrase: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file(
            "word/document.xml",
            zip::write::SimpleFileOptions::default(),
        )
        .unwrap();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>",
            phrase
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

/// Creates `config/analyst.toml` and a `reports/` directory holding a docx
/// and a text file.
fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    fs::create_dir_all(root.join("config")).unwrap();
    let reports = root.join("reports");
    fs::create_dir_all(&reports).unwrap();

    let config_content = format!(
        r#"[documents]
root = "{}/reports"
include_globs = ["**/*.pdf", "**/*.docx", "**/*.txt"]

[model]
provider = "disabled"

[server]
bind = "127.0.0.1:0"
"#,
        root.display()
    );
    let config_path = root.join("config").join("analyst.toml");
    fs::write(&config_path, config_content).unwrap();

    fs::write(
        reports.join("market.docx"),
        minimal_docx_with_text("Orange holds 23% share"),
    )
    .unwrap();
    fs::write(reports.join("notes.txt"), "Revenue grew 5%\n").unwrap();

    (tmp, config_path)
}

fn run_analyst(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(analyst_binary())
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run analyst: {}", e));
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_status_reports_documents() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, stderr, success) = run_analyst(&config_path, &["status"]);
    assert!(success, "status failed: {}", stderr);
    assert!(stdout.contains("Context:   available"), "got: {}", stdout);
    assert!(stdout.contains("Documents: 2"), "got: {}", stdout);
    assert!(stdout.contains("Failed:    0"), "got: {}", stdout);
    assert!(stdout.contains("Model:     not configured"), "got: {}", stdout);
}

#[test]
fn test_context_blocks_in_name_order() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, success) = run_analyst(&config_path, &["context"]);
    assert!(success);
    assert_eq!(
        stdout,
        "DOCUMENT: market.docx\nOrange holds 23% share\n\nDOCUMENT: notes.txt\nRevenue grew 5%\n\n"
    );
}

#[test]
fn test_context_is_stable_across_runs() {
    let (_tmp, config_path) = setup_test_env();
    let (first, _, _) = run_analyst(&config_path, &["context"]);
    let (second, _, _) = run_analyst(&config_path, &["context"]);
    assert_eq!(first, second);
}

#[test]
fn test_prompt_embeds_query_once() {
    let (_tmp, config_path) = setup_test_env();
    let query = "What is Orange's market share?";
    let (stdout, _, success) = run_analyst(&config_path, &["prompt", query]);
    assert!(success);
    assert!(stdout.starts_with("You are a telecom data analyst"));
    assert!(stdout.contains("DOCUMENT: market.docx\nOrange holds 23% share"));
    assert!(stdout.contains("INSTRUCTIONS:"));
    assert_eq!(stdout.matches(query).count(), 1);
    assert!(stdout.trim_end().ends_with("ANSWER:"));
}

#[test]
fn test_documents_shows_failed_extraction() {
    let (tmp, config_path) = setup_test_env();
    fs::write(tmp.path().join("reports").join("broken.pdf"), b"not a valid pdf").unwrap();

    let (stdout, stderr, success) = run_analyst(&config_path, &["documents"]);
    assert!(success, "documents must succeed despite a corrupt file: {}", stderr);
    assert!(stdout.contains("broken.pdf  FAILED"), "got: {}", stdout);
    assert!(stdout.contains("market.docx  22 chars"), "got: {}", stdout);
    assert!(stdout.contains("notes.txt  16 chars"), "got: {}", stdout);

    let (stdout, _, _) = run_analyst(&config_path, &["status"]);
    assert!(stdout.contains("Documents: 3"));
    assert!(stdout.contains("Failed:    1"));
}

#[test]
fn test_ask_without_model_returns_fallback() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, success) = run_analyst(
        &config_path,
        &["ask", "What are the current market shares?", "--json"],
    );
    assert!(success);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["source"], "fallback");
    assert_eq!(json["error"]["kind"], "adapter_unavailable");
    assert!(json["text"]
        .as_str()
        .unwrap()
        .starts_with("**Telecom Market Overview**"));
}

#[test]
fn test_ask_plain_output_notes_source() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, stderr, success) = run_analyst(&config_path, &["ask", "anything"]);
    assert!(success);
    assert!(stdout.contains("Total Market Revenue (2024)"));
    assert!(stderr.contains("(source: fallback)"));
}

#[test]
fn test_missing_config_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let output = Command::new(analyst_binary())
        .current_dir(tmp.path())
        .args(["--config", "does-not-exist.toml", "status"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Context:   unavailable"), "got: {}", stdout);
    assert!(stdout.contains("Documents: 0"), "got: {}", stdout);
}

#[test]
fn test_invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("analyst.toml");
    fs::write(&config_path, "[model]\nprovider = \"palm\"\n").unwrap();

    let (_, stderr, success) = run_analyst(&config_path, &["status"]);
    assert!(!success);
    assert!(stderr.contains("Unknown model provider"), "got: {}", stderr);
}

#[test]
fn test_chat_history_lists_turns() {
    let (_tmp, config_path) = setup_test_env();
    let mut child = Command::new(analyst_binary())
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("chat")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"What are the current market shares?\n/history\n/clear\n/history\n/quit\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(2 documents loaded)"), "got: {}", stdout);
    assert!(
        stdout.contains("[user] What are the current market shares?"),
        "got: {}",
        stdout
    );
    assert!(stdout.contains("[assistant] **Telecom Market Overview**"), "got: {}", stdout);
    assert_eq!(stdout.matches("[user] ").count(), 1);
    // Greeting and answer before the clear, only the clear notice after.
    assert_eq!(stdout.matches("[assistant] ").count(), 3);
}

#[test]
fn test_completions() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, success) = run_analyst(&config_path, &["completions", "bash"]);
    assert!(success);
    assert!(stdout.contains("analyst"));
}
