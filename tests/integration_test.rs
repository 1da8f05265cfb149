use std::process::Command;
use tempfile::TempDir;

fn stickydoc_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_stickydoc"));
    cmd.env("STICKYDOC_HOME", home.path());
    cmd.env_remove("STICKYDOC_DOC_ID");
    cmd.env_remove("STICKYDOC_TOKEN");
    cmd
}

fn created_note_id(stdout: &str) -> String {
    // "Created note abc1234 - Title"
    stdout
        .split_whitespace()
        .nth(2)
        .expect("note id in add output")
        .to_string()
}

#[test]
fn test_add_then_list_shows_dirty_note() {
    let home = TempDir::new().unwrap();

    let output = stickydoc_cmd(&home)
        .args(["add", "Groceries", "--content", "<p>milk</p>"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Created note"));
    assert!(stdout.contains("Groceries"));

    let output = stickydoc_cmd(&home).args(["list"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Groceries"));
    assert!(stdout.contains("1 dirty"));
}

#[test]
fn test_get_by_prefix() {
    let home = TempDir::new().unwrap();

    let output = stickydoc_cmd(&home)
        .args(["add", "Prefix me", "--content", "<p>x</p>", "--url", "https://example.com"])
        .output()
        .unwrap();
    let id = created_note_id(&String::from_utf8_lossy(&output.stdout));

    let output = stickydoc_cmd(&home).args(["get", &id]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Prefix me"));
    assert!(stdout.contains("https://example.com"));
    assert!(stdout.contains("(never saved)"));
}

#[test]
fn test_delete_removes_note() {
    let home = TempDir::new().unwrap();

    let output = stickydoc_cmd(&home)
        .args(["add", "Doomed"])
        .output()
        .unwrap();
    let id = created_note_id(&String::from_utf8_lossy(&output.stdout));

    let output = stickydoc_cmd(&home).args(["delete", &id]).output().unwrap();
    assert!(output.status.success());

    let output = stickydoc_cmd(&home).args(["get", &id]).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Note not found"));
}

#[test]
fn test_config_round_trip() {
    let home = TempDir::new().unwrap();

    let output = stickydoc_cmd(&home)
        .args(["config", "set-doc", "doc-abc123"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let output = stickydoc_cmd(&home)
        .args(["config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("doc-abc123"));
}

#[test]
fn test_save_without_config_hints_setup() {
    let home = TempDir::new().unwrap();

    let output = stickydoc_cmd(&home)
        .args(["add", "Unconfigured", "--content", "<p>x</p>"])
        .output()
        .unwrap();
    let id = created_note_id(&String::from_utf8_lossy(&output.stdout));

    let output = stickydoc_cmd(&home).args(["save", &id]).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config set-doc"));
}

#[test]
fn test_saving_empty_note_is_a_quiet_no_op() {
    let home = TempDir::new().unwrap();

    // No title, no content: the save path must not even need a doc id.
    let output = stickydoc_cmd(&home).args(["add", ""]).output().unwrap();
    let id = created_note_id(&String::from_utf8_lossy(&output.stdout));

    let output = stickydoc_cmd(&home).args(["save", &id]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("nothing to save"));
}

#[test]
fn test_sync_with_clean_store() {
    let home = TempDir::new().unwrap();

    let output = stickydoc_cmd(&home).args(["sync"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Nothing to sync"));
}
