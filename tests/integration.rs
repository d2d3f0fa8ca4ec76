use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn docchat_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_docchat"))
}

/// Temp dir with a documents folder and a config using the disabled
/// embedder and an inference URL nothing listens on.
fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let docs_dir = root.join("documents");
    fs::create_dir_all(docs_dir.join("guides")).unwrap();

    fs::write(docs_dir.join("alpha.md"), "alpha ".repeat(40)).unwrap();
    fs::write(docs_dir.join("guides/beta.md"), "beta text").unwrap();
    fs::write(docs_dir.join("empty.md"), "   \n").unwrap();
    fs::write(docs_dir.join("gamma.txt"), "not included").unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/docchat.sqlite"

[documents]
dir = "{root}/documents"
include_globs = ["**/*.md"]

[chunking]
chunk_size = 100
chunk_overlap = 20

[retrieval]
top_k = 3

[embedding]
provider = "disabled"

[model]
path = "{root}/models/test.gguf"
url = "http://127.0.0.1:9"
timeout_secs = 5
"#,
        root = root.display().to_string().replace('\\', "/")
    );

    let config_path = root.join("docchat.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_docchat_in(dir: &Path, config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = docchat_binary();
    let output = Command::new(&binary)
        .current_dir(dir)
        .env("RUST_LOG", "warn")
        .arg("--config")
        .arg(config_path)
        .arg("--progress")
        .arg("off")
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run docchat binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn run_docchat(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let dir = config_path.parent().unwrap();
    run_docchat_in(dir, config_path, args)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_docchat(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/docchat.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_docchat(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_docchat(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_ingest_dry_run_counts() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_docchat(&config_path, &["ingest", "--dry-run"]);
    assert!(success, "dry-run failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("(dry-run)"));
    assert!(stdout.contains("chunk size: 100, overlap: 20"), "stdout={}", stdout);
    // alpha.md (240 chars) → 3 chunks, beta.md → 1, empty.md → 0.
    assert!(stdout.contains("documents found: 3"), "stdout={}", stdout);
    assert!(stdout.contains("chunks: 4"), "stdout={}", stdout);
}

#[test]
fn test_ingest_with_disabled_embedder_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_docchat(&config_path, &["init"]);
    let (stdout, stderr, success) = run_docchat(&config_path, &["ingest"]);
    assert!(!success, "ingest should fail without embeddings");
    assert!(stdout.contains("failed: 2"), "stdout={}", stdout);
    assert!(stdout.contains("empty: 1"), "stdout={}", stdout);
    assert!(
        stdout.contains("alpha.md: embedding backend error: embedding provider is disabled"),
        "stdout={}",
        stdout
    );
    assert!(!stdout.contains("no valid chunks"), "stdout={}", stdout);
    assert!(stderr.contains("No chunks were stored"), "stderr={}", stderr);
}

#[test]
fn test_ask_empty_query_fallback() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_docchat(&config_path, &["ask", "   "]);
    assert!(success, "ask failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Please provide a valid query."));
    assert!(stdout.contains("(~0 tokens)"));
}

#[test]
fn test_ask_empty_query_json() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_docchat(&config_path, &["ask", "", "--json"]);
    assert!(success);
    let answer: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(answer["response"], "Please provide a valid query.");
    assert_eq!(answer["token_estimate"], 0);
    assert_eq!(answer["sources"].as_array().unwrap().len(), 0);
}

#[test]
fn test_ask_without_model_server_reports_not_ready() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_docchat(&config_path, &["ask", "What is alpha?"]);
    assert!(!success, "ask should fail when the model is unavailable: stdout={}", stdout);
    assert!(stderr.contains("not ready"), "stderr={}", stderr);
}

#[test]
fn test_search_with_disabled_embedder_finds_nothing() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_docchat(&config_path, &["search", "alpha", "-k", "5"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("No relevant context found."));
}

#[test]
fn test_stats_on_empty_index() {
    let (_tmp, config_path) = setup_test_env();

    run_docchat(&config_path, &["init"]);
    let (stdout, stderr, success) = run_docchat(&config_path, &["stats"]);
    assert!(success, "stats failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Chunks:      0"));
    assert!(stdout.contains("Sources:     0"));
}

#[test]
fn test_missing_config_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");

    let (stdout, stderr, success) = run_docchat_in(tmp.path(), &missing, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(tmp.path().join("vectorstore/docchat.sqlite").exists());
    assert!(stderr.contains("using built-in defaults"), "stderr={}", stderr);
}

#[test]
fn test_invalid_config_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("docchat.toml");
    fs::write(&config_path, "[chunking]\nchunk_size = 0\n").unwrap();

    let (_, stderr, success) = run_docchat(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("chunk_size"), "stderr={}", stderr);
}

#[test]
fn test_completions() {
    let tmp = TempDir::new().unwrap();
    let (stdout, _, success) =
        run_docchat_in(tmp.path(), &tmp.path().join("unused.toml"), &["completions", "bash"]);
    assert!(success);
    assert!(stdout.contains("docchat"));
}
