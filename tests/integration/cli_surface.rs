//! CLI argument surface smoke tests

use assert_cmd::Command;

fn bin() -> Command {
    Command::cargo_bin("channel-batch-fetcher").unwrap()
}

#[test]
fn test_help_lists_subcommands() {
    let output = bin().arg("--help").assert().success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();
    assert!(stdout.contains("fetch"));
    assert!(stdout.contains("clear-cache"));
}

#[test]
fn test_fetch_requires_input() {
    bin().args(["fetch", "--keys", "AIzaFakeKey123"])
        .assert()
        .failure();
}

#[test]
fn test_fetch_rejects_zero_concurrency() {
    bin()
        .args([
            "fetch",
            "--input",
            "urls.txt",
            "--keys",
            "AIzaFakeKey123",
            "--concurrency",
            "0",
        ])
        .assert()
        .failure()
        .stderr(predicates::str::contains("at least 1"));
}

#[test]
fn test_clear_cache_tolerates_missing_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("no-such-cache.json");
    bin()
        .args(["clear-cache", "--cache-file"])
        .arg(&path)
        .assert()
        .success();
}
