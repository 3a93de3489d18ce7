use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn chatvec_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("chatvec");
    path
}

const GROUP_CHAT: &str = "\
Alice added Bob
Mon 10:01
Anyone up for dinner tonight?
Mon 10:02
Sure, dinner tonight works https://maps.example.com/place
Bob left the conversation
Tue 09:15
Quarterly tax filing is due soon
";

const WORK_CHAT: &str = "\
2024-03-04
Deploy the release candidate
Standup notes are in the wiki
";

fn write_config(root: &Path, dims: usize) -> PathBuf {
    let config_content = format!(
        r#"[input]
root = '{root}/chats'
include_globs = ["**/*.txt"]

[embedding]
provider = "hash"
dims = {dims}
batch_size = 2

[index]
dir = '{root}/data/index'

[retrieval]
top_k = 3
"#,
        root = root.display(),
        dims = dims
    );

    let config_path = root.join("config").join("chatvec.toml");
    fs::write(&config_path, config_content).unwrap();
    config_path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    fs::create_dir_all(root.join("config")).unwrap();
    let chats = root.join("chats");
    fs::create_dir_all(&chats).unwrap();
    fs::write(chats.join("group.txt"), GROUP_CHAT).unwrap();
    fs::write(chats.join("work.txt"), WORK_CHAT).unwrap();
    fs::write(chats.join("notes.md"), "not a chat export").unwrap();

    let config_path = write_config(&root, 64);
    (tmp, config_path)
}

fn run_chatvec(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = chatvec_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run chatvec binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn build(config_path: &Path) -> String {
    let (stdout, stderr, success) = run_chatvec(config_path, &["build", "--progress", "off"]);
    assert!(success, "build failed: stdout={}, stderr={}", stdout, stderr);
    stdout
}

#[test]
fn test_build_indexes_timestamped_messages() {
    let (_tmp, config_path) = setup_test_env();

    let stdout = build(&config_path);
    assert!(stdout.contains("sources scanned: 2"), "{}", stdout);
    assert!(stdout.contains("messages assembled: 5"), "{}", stdout);
    assert!(stdout.contains("entries committed: 5"), "{}", stdout);
    assert!(stdout.contains("ok"));
}

#[test]
fn test_build_writes_index_files() {
    let (tmp, config_path) = setup_test_env();
    build(&config_path);

    let dir = tmp.path().join("data/index");
    assert!(dir.join("vectors.idx").is_file());
    assert!(dir.join("manifest.json").is_file());

    let metadata: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("metadata.json")).unwrap()).unwrap();
    let records = metadata.as_array().unwrap();
    assert_eq!(records.len(), 5);
    assert_eq!(records[0]["id"], 0);
    assert_eq!(records[0]["text"], "Mon 10:01 - Anyone up for dinner tonight?");
    assert_eq!(records[1]["text"], "Mon 10:02 - Sure, dinner tonight works");
    assert_eq!(records[3]["text"], "2024-03-04 - Deploy the release candidate");
    assert_eq!(records[4]["text"], "Standup notes are in the wiki");
    assert_eq!(records[4]["source"], "work.txt");
}

#[test]
fn test_build_is_deterministic() {
    let (tmp, config_path) = setup_test_env();
    let dir = tmp.path().join("data/index");

    build(&config_path);
    let vectors_a = fs::read(dir.join("vectors.idx")).unwrap();
    let metadata_a = fs::read(dir.join("metadata.json")).unwrap();

    build(&config_path);
    assert_eq!(vectors_a, fs::read(dir.join("vectors.idx")).unwrap());
    assert_eq!(metadata_a, fs::read(dir.join("metadata.json")).unwrap());
}

#[test]
fn test_search_ranks_matching_message_first() {
    let (_tmp, config_path) = setup_test_env();
    build(&config_path);

    let (stdout, stderr, success) = run_chatvec(
        &config_path,
        &["search", "Quarterly tax filing is due soon", "-k", "1"],
    );
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.starts_with("1. ["), "{}", stdout);
    assert!(stdout.contains("Tue 09:15 - Quarterly tax filing is due soon"));
    assert!(!stdout.contains("2. ["));
}

#[test]
fn test_search_json_is_sorted_by_distance() {
    let (_tmp, config_path) = setup_test_env();
    build(&config_path);

    let (stdout, _, success) = run_chatvec(&config_path, &["search", "dinner tonight", "--json"]);
    assert!(success);
    let hits: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 3); // retrieval.top_k
    let distances: Vec<f64> = hits
        .iter()
        .map(|h| h["distance"].as_f64().unwrap())
        .collect();
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(hits[0]["source"], "group.txt");
}

#[test]
fn test_search_source_filter() {
    let (_tmp, config_path) = setup_test_env();
    build(&config_path);

    let (stdout, _, success) = run_chatvec(
        &config_path,
        &["search", "dinner", "--source", "work.txt", "--json"],
    );
    assert!(success);
    let hits: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h["source"] == "work.txt"));
}

#[test]
fn test_search_k_larger_than_index() {
    let (_tmp, config_path) = setup_test_env();
    build(&config_path);

    let (stdout, _, success) =
        run_chatvec(&config_path, &["search", "anything", "-k", "50", "--json"]);
    assert!(success);
    let hits: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(hits.as_array().unwrap().len(), 5);
}

#[test]
fn test_search_empty_query() {
    let (_tmp, config_path) = setup_test_env();
    build(&config_path);

    let (stdout, _, success) = run_chatvec(&config_path, &["search", "   "]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_without_index_errors() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_chatvec(&config_path, &["search", "dinner"]);
    assert!(!success);
    assert!(stderr.contains("chatvec build"), "{}", stderr);
}

#[test]
fn test_get_entry() {
    let (_tmp, config_path) = setup_test_env();
    build(&config_path);

    let (stdout, _, success) = run_chatvec(&config_path, &["get", "2"]);
    assert!(success);
    assert!(stdout.contains("Tue 09:15 - Quarterly tax filing is due soon"));
    assert!(stdout.contains("source:  group.txt"));
    assert!(stdout.contains("dims:    64"));
    assert!(stdout.contains("norm:    1.0000"));
}

#[test]
fn test_get_missing_entry() {
    let (_tmp, config_path) = setup_test_env();
    build(&config_path);

    let (_, stderr, success) = run_chatvec(&config_path, &["get", "99"]);
    assert!(!success);
    assert!(stderr.contains("99"));
}

#[test]
fn test_stats() {
    let (_tmp, config_path) = setup_test_env();
    build(&config_path);

    let (stdout, _, success) = run_chatvec(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Entries:   5"));
    assert!(stdout.contains("Model:     hash"));
    assert!(stdout.contains("group.txt"));
    assert!(stdout.contains("work.txt"));
}

#[test]
fn test_append_continues_ids() {
    let (tmp, config_path) = setup_test_env();
    build(&config_path);

    fs::write(
        tmp.path().join("chats/work.txt"),
        format!("{}Retro moved to next sprint\n", WORK_CHAT),
    )
    .unwrap();
    let (stdout, stderr, success) =
        run_chatvec(&config_path, &["build", "--append", "--progress", "off"]);
    assert!(success, "append failed: {}", stderr);
    assert!(stdout.contains("previous entries: 5"));
    assert!(stdout.contains("total entries: 11"));

    let (stdout, _, _) = run_chatvec(&config_path, &["get", "10"]);
    assert!(stdout.contains("Retro moved to next sprint"));
}

#[test]
fn test_append_refuses_different_dimension() {
    let (tmp, config_path) = setup_test_env();
    build(&config_path);

    write_config(tmp.path(), 32);
    let (_, stderr, success) = run_chatvec(&config_path, &["build", "--append"]);
    assert!(!success);
    assert!(stderr.contains("dimension"), "{}", stderr);
}

#[test]
fn test_build_without_append_replaces_index() {
    let (_tmp, config_path) = setup_test_env();
    build(&config_path);
    build(&config_path);

    let (stdout, _, _) = run_chatvec(&config_path, &["stats"]);
    assert!(stdout.contains("Entries:   5"));
}

#[test]
fn test_build_dry_run() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_chatvec(&config_path, &["build", "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("dry-run"));
    assert!(stdout.contains("lines read: 11"));
    assert!(stdout.contains("messages assembled: 5"));
    assert!(!tmp.path().join("data/index/manifest.json").exists());
}

#[test]
fn test_build_with_limit() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_chatvec(
        &config_path,
        &["build", "--limit", "2", "--progress", "off"],
    );
    assert!(success);
    assert!(stdout.contains("entries committed: 2"));
    assert!(stdout.contains("total entries: 2"));
}

#[test]
fn test_invalid_utf8_source_is_skipped() {
    let (tmp, config_path) = setup_test_env();
    fs::write(tmp.path().join("chats/broken.txt"), [0xffu8, 0xfe, b'\n']).unwrap();

    let stdout = build(&config_path);
    assert!(stdout.contains("sources scanned: 3"));
    assert!(stdout.contains("sources unreadable: 1"));
    assert!(stdout.contains("entries committed: 5"));
}

#[test]
fn test_json_progress_on_stderr() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_chatvec(&config_path, &["build", "--progress", "json"]);
    assert!(success);
    assert!(!stdout.contains("\"event\""));
    let events: Vec<serde_json::Value> = stderr
        .lines()
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect();
    assert!(events
        .iter()
        .any(|e| e["phase"] == "scanning" && e["source"] == "group.txt"));
    assert!(events
        .iter()
        .any(|e| e["phase"] == "embedding" && e["n"] == 3 && e["total"] == 3));
}

#[test]
fn test_sources() {
    let (tmp, config_path) = setup_test_env();
    fs::write(tmp.path().join("chats/broken.txt"), [0xffu8, 0xfe]).unwrap();

    let (stdout, _, success) = run_chatvec(&config_path, &["sources"]);
    assert!(success);
    assert!(stdout.contains("group.txt"));
    assert!(stdout.contains("UNREADABLE"));
    assert!(!stdout.contains("notes.md"));
}

#[test]
fn test_classify_without_config() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("chat.txt");
    fs::write(&file, GROUP_CHAT).unwrap();

    let (stdout, stderr, success) = run_chatvec(
        &tmp.path().join("missing.toml"),
        &["classify", file.to_str().unwrap()],
    );
    assert!(success, "classify failed: {}", stderr);
    assert!(stdout.contains("system"));
    assert!(stdout.contains("timestamp"));
    assert!(stdout.contains("timestamp lines: 4-50 chars, at most 8 digits, years 1900-2100"));
    assert!(stdout.contains("--- Messages (3) ---"));
    assert!(stdout.contains("Mon 10:02 - Sure, dinner tonight works"));
}

#[test]
fn test_disabled_provider_cannot_build() {
    let (tmp, config_path) = setup_test_env();
    let content = fs::read_to_string(&config_path)
        .unwrap()
        .replace("provider = \"hash\"", "provider = \"disabled\"");
    fs::write(&config_path, content).unwrap();

    let (_, stderr, success) = run_chatvec(&config_path, &["build"]);
    assert!(!success);
    assert!(stderr.contains("disabled"));
    assert!(!tmp.path().join("data/index").exists());
}
