use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// A stagehand command isolated in `dir`: it runs there and keeps its
/// config and run logs under `dir/.stagehand`.
fn stagehand(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("stagehand").unwrap();
    cmd.current_dir(dir)
        .env("STAGEHAND_HOME", dir.join(".stagehand"))
        .env_remove("RUST_LOG");
    cmd
}

/// Lay out the socket solution's Debug outputs under `dir`
fn socket_solution(dir: &Path) {
    let files = [
        "FileManager/bin/Debug/FileManager.exe",
        "FileManager/bin/Debug/SocketLib.dll",
        "ServerForm/bin/Debug/ServerForm.exe",
        "ServerForm/bin/Debug/SocketLib.dll",
    ];
    for rel in files {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, rel).unwrap();
    }
}

// ─── Help & version ──────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    let tmp = TempDir::new().unwrap();
    stagehand(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("staging"))
        .stdout(predicate::str::contains("stage"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("verify"))
        .stdout(predicate::str::contains("preset"));
}

#[test]
fn test_version_flag() {
    let tmp = TempDir::new().unwrap();
    stagehand(tmp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stagehand"));
}

// ─── Stage command ───────────────────────────────────────────────────────────

#[test]
fn test_stage_socket_preset() {
    let tmp = TempDir::new().unwrap();
    socket_solution(tmp.path());

    stagehand(tmp.path())
        .args(["stage", "--preset", "socket", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Socket_build"));

    let root = tmp.path().join("Socket_build");
    for rel in [
        "Client/FileManager.exe",
        "Client/SocketLib.dll",
        "Server/ServerForm.exe",
        "Server/SocketLib.dll",
    ] {
        assert!(root.join(rel).is_file(), "{} should be staged", rel);
    }
    assert_eq!(
        std::fs::read_to_string(root.join("Server/SocketLib.dll")).unwrap(),
        "ServerForm/bin/Debug/SocketLib.dll"
    );
}

#[test]
fn test_stage_missing_artifact_fails_with_entry() {
    let tmp = TempDir::new().unwrap();
    socket_solution(tmp.path());
    std::fs::remove_file(tmp.path().join("ServerForm/bin/Debug/ServerForm.exe")).unwrap();

    stagehand(tmp.path())
        .args(["stage", "--preset", "socket", "--quiet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Server"))
        .stderr(predicate::str::contains("ServerForm.exe"))
        .stderr(predicate::str::contains("after 2 of 4"));
}

#[test]
fn test_stage_inline_entries_json() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("tool.bin"), "tool").unwrap();

    stagehand(tmp.path())
        .args([
            "stage",
            "--root",
            "dist",
            "--entry",
            "bin/renamed.bin=tool.bin",
            "--entry",
            "extra=tool.bin",
            "--format",
            "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_bytes\": 8"))
        .stdout(predicate::str::contains("\"strategy\": \"direct\""));

    assert!(tmp.path().join("dist/bin/renamed.bin").is_file());
    assert!(tmp.path().join("dist/extra/tool.bin").is_file());
}

#[test]
fn test_stage_atomic_from_manifest_file() {
    let tmp = TempDir::new().unwrap();
    socket_solution(tmp.path());
    std::fs::write(
        tmp.path().join("stage.toml"),
        r#"
source_root = "FileManager/bin/Debug"

[[artifact]]
group = "Client"
source = "FileManager.exe"
"#,
    )
    .unwrap();

    stagehand(tmp.path())
        .args(["stage", "-m", "stage.toml", "--root", "out", "--atomic", "-q"])
        .assert()
        .success();

    assert!(tmp.path().join("out/Client/FileManager.exe").is_file());
}

#[test]
fn test_stage_requires_a_manifest_source() {
    let tmp = TempDir::new().unwrap();
    stagehand(tmp.path())
        .args(["stage", "--root", "out"])
        .assert()
        .failure();
}

#[test]
fn test_stage_refuses_working_directory() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("keep.txt"), "precious").unwrap();
    std::fs::write(tmp.path().join("a.exe"), "a").unwrap();

    stagehand(tmp.path())
        .args(["stage", "--root", ".", "--entry", "Client=a.exe", "-q"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("refusing"));

    assert!(tmp.path().join("keep.txt").exists());
}

#[test]
fn test_stage_records_run_log() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("a.exe"), "a").unwrap();

    stagehand(tmp.path())
        .args(["stage", "--root", "out", "--entry", "Client=a.exe", "-q"])
        .assert()
        .success();

    let logs: Vec<_> = std::fs::read_dir(tmp.path().join(".stagehand/logs"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("runs-"))
        .collect();
    assert_eq!(logs.len(), 1);
    let contents = std::fs::read_to_string(logs[0].path()).unwrap();
    assert!(contents.contains("\"success\":true"));
    assert!(contents.contains("\"origin\":\"cli\""));
}

#[test]
fn test_failed_stage_logs_failing_group() {
    let tmp = TempDir::new().unwrap();
    socket_solution(tmp.path());
    std::fs::remove_file(tmp.path().join("ServerForm/bin/Debug/SocketLib.dll")).unwrap();

    stagehand(tmp.path())
        .args(["stage", "--preset", "socket", "-q"])
        .assert()
        .failure();

    let log = std::fs::read_dir(tmp.path().join(".stagehand/logs"))
        .unwrap()
        .filter_map(|e| e.ok())
        .find(|e| e.file_name().to_string_lossy().starts_with("runs-"))
        .unwrap();
    let contents = std::fs::read_to_string(log.path()).unwrap();
    assert!(contents.contains("\"success\":false"));
    assert!(contents.contains("\"failed_group\":\"Server\""));
}

#[test]
fn test_stage_entry_with_rename() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("bin")).unwrap();
    std::fs::write(tmp.path().join("bin/a.exe"), "client").unwrap();

    stagehand(tmp.path())
        .args(["stage", "--root", "out", "--entry", "Client/renamed.exe=bin/a.exe", "-q"])
        .assert()
        .success();

    assert_eq!(
        std::fs::read_to_string(tmp.path().join("out/Client/renamed.exe")).unwrap(),
        "client"
    );
    assert!(!tmp.path().join("out/Client/a.exe").exists());
}

#[test]
fn test_stage_dry_run_touches_nothing() {
    let tmp = TempDir::new().unwrap();
    socket_solution(tmp.path());

    stagehand(tmp.path())
        .args(["stage", "--preset", "socket", "--dry-run", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FileManager.exe"));

    assert!(!tmp.path().join("Socket_build").exists());
}

// ─── Plan & verify ───────────────────────────────────────────────────────────

#[test]
fn test_plan_reports_missing_sources() {
    let tmp = TempDir::new().unwrap();

    stagehand(tmp.path())
        .args(["plan", "--preset", "socket", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("4  4"));
}

#[test]
fn test_verify_after_stage_then_tamper() {
    let tmp = TempDir::new().unwrap();
    socket_solution(tmp.path());

    stagehand(tmp.path())
        .args(["stage", "--preset", "socket", "-q"])
        .assert()
        .success();

    stagehand(tmp.path())
        .args(["verify", "--preset", "socket"])
        .assert()
        .success()
        .stdout(predicate::str::contains("matches"));

    std::fs::write(tmp.path().join("Socket_build/Client/stale.pdb"), "old").unwrap();

    stagehand(tmp.path())
        .args(["verify", "--preset", "socket", "--format", "json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("stale.pdb"));
}

// ─── Preset & config ─────────────────────────────────────────────────────────

#[test]
fn test_preset_list_and_show() {
    let tmp = TempDir::new().unwrap();

    stagehand(tmp.path())
        .args(["preset", "list", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("socket"));

    stagehand(tmp.path())
        .args(["preset", "show", "socket", "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Server/ServerForm.exe"));
}

#[test]
fn test_unknown_preset() {
    let tmp = TempDir::new().unwrap();
    stagehand(tmp.path())
        .args(["plan", "--preset", "nonexistent_xyz"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_config_set_and_show() {
    let tmp = TempDir::new().unwrap();

    stagehand(tmp.path())
        .args(["config", "set", "default_root", "Socket_build"])
        .assert()
        .success();

    stagehand(tmp.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_root = \"Socket_build\""));

    stagehand(tmp.path())
        .args(["config", "set", "no_such_key", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    stagehand(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stagehand"));
}
