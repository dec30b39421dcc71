use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn stash_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("stash");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/stash.sqlite"

[dataset]
max_items = 200
max_content_chars = 400

[model]
provider = "disabled"
"#,
        root.display()
    );

    let config_path = config_dir.join("stash.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_stash(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = stash_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run stash binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn saved_id(stdout: &str) -> String {
    stdout
        .trim()
        .strip_prefix("Saved ✓ ")
        .unwrap_or_else(|| panic!("unexpected save output: {}", stdout))
        .to_string()
}

fn list_json(config_path: &Path, args: &[&str]) -> Vec<serde_json::Value> {
    let mut full = vec!["list", "--json"];
    full.extend_from_slice(args);
    let (stdout, stderr, success) = run_stash(config_path, &full);
    assert!(success, "list failed: {}", stderr);
    serde_json::from_str(&stdout).unwrap()
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_stash(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/stash.sqlite").exists());

    let (_, _, again) = run_stash(&config_path, &["init"]);
    assert!(again, "Second init failed (not idempotent)");
}

#[test]
fn test_save_classifies_and_normalizes() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_stash(
        &config_path,
        &[
            "save",
            "  https://example.com/nebula.PNG  ",
            "--title",
            "Nebula",
            "--tags",
            "#Space, space ##Art",
        ],
    );
    assert!(success, "save failed: {}", stderr);
    let id = saved_id(&stdout);

    let items = list_json(&config_path, &[]);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], id);
    assert_eq!(items[0]["type"], "image");
    assert_eq!(items[0]["content"], "https://example.com/nebula.PNG");
    assert_eq!(items[0]["tags"], serde_json::json!(["space", "art"]));
}

#[test]
fn test_save_rejects_empty_content() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_stash(&config_path, &["save", "   "]);
    assert!(!success);
    assert!(stderr.contains("content is required"));
    assert!(list_json(&config_path, &[]).is_empty());
}

#[test]
fn test_list_filters_and_orders() {
    let (_tmp, config_path) = setup_test_env();

    run_stash(&config_path, &["save", "Falcon 9 launch", "--title", "b launch", "--tags", "space"]);
    run_stash(&config_path, &["save", "sourdough starter", "--title", "Bread", "--tags", "food"]);
    run_stash(&config_path, &["save", "https://example.com/m.mp4", "--title", "a moon", "--tags", "space video"]);

    let space = list_json(&config_path, &["#space"]);
    assert_eq!(space.len(), 2);
    // Newest first.
    assert_eq!(space[0]["title"], "a moon");

    let oldest = list_json(&config_path, &["#space", "--order", "oldest"]);
    assert_eq!(oldest[0]["title"], "b launch");

    let by_title = list_json(&config_path, &["--order", "title"]);
    let titles: Vec<&str> = by_title.iter().map(|v| v["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["a moon", "b launch", "Bread"]);

    let text = list_json(&config_path, &["FALCON"]);
    assert_eq!(text.len(), 1);

    let none = list_json(&config_path, &["#space sourdough"]);
    assert!(none.is_empty());
}

#[test]
fn test_list_renders_cards() {
    let (_tmp, config_path) = setup_test_env();

    let (empty, _, _) = run_stash(&config_path, &["list"]);
    assert!(empty.contains("No items."));

    run_stash(&config_path, &["save", "remember the milk", "--tags", "todo"]);
    let (stdout, stderr, success) = run_stash(&config_path, &["list"]);
    assert!(success, "list failed: {}", stderr);
    assert!(stdout.contains("── Today ──"));
    assert!(stdout.contains("Note"));
    assert!(stdout.contains("remember the milk"));
    assert!(stdout.contains("#todo"));
}

#[test]
fn test_delete() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, _) = run_stash(&config_path, &["save", "first"]);
    let first = saved_id(&stdout);
    run_stash(&config_path, &["save", "second"]);

    let (_, stderr, success) = run_stash(&config_path, &["delete", &first]);
    assert!(success, "delete failed: {}", stderr);

    let items = list_json(&config_path, &[]);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["content"], "second");

    let (_, stderr, success) = run_stash(&config_path, &["delete", &first]);
    assert!(!success);
    assert!(stderr.contains("No item with id"));
}

#[test]
fn test_export_to_file() {
    let (tmp, config_path) = setup_test_env();

    run_stash(&config_path, &["save", "one", "--tags", "a"]);
    run_stash(&config_path, &["save", "two"]);

    let out = tmp.path().join("exports/nested/all.json");
    let (_, stderr, success) = run_stash(
        &config_path,
        &["export", "--output", out.to_str().unwrap()],
    );
    assert!(success, "export failed: {}", stderr);
    assert!(stderr.contains("Exported 2 items"));

    let doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert!(doc["exportedAt"].is_string());
    let items = doc["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["content"], "two");
}

#[test]
fn test_export_to_stdout() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_stash(&config_path, &["export"]);
    assert!(success);
    let doc: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(doc["items"], serde_json::json!([]));
}

#[test]
fn test_ask_without_model_is_unavailable() {
    let (_tmp, config_path) = setup_test_env();

    run_stash(&config_path, &["save", "something"]);
    let (_, stderr, success) = run_stash(&config_path, &["ask", "What is this?"]);
    assert!(!success);
    assert!(stderr.contains("feature not available"));

    let (_, stderr, success) = run_stash(&config_path, &["params"]);
    assert!(!success);
    assert!(stderr.contains("feature not available"));
}

#[test]
fn test_invalid_config_is_error() {
    let (_tmp, config_path) = setup_test_env();
    fs::write(&config_path, "[model]\ntemperature = 9.0\n").unwrap();

    let (_, stderr, success) = run_stash(&config_path, &["list"]);
    assert!(!success);
    assert!(stderr.contains("temperature"));
}

#[test]
fn test_export_into_directory() {
    let (tmp, config_path) = setup_test_env();

    run_stash(&config_path, &["save", "kept"]);
    let dir = tmp.path().join("out");
    fs::create_dir_all(&dir).unwrap();
    let (_, stderr, success) = run_stash(&config_path, &["export", "--output", dir.to_str().unwrap()]);
    assert!(success, "export failed: {}", stderr);

    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("webstash-export.json")).unwrap()).unwrap();
    assert_eq!(doc["items"][0]["content"], "kept");
}
