use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn gateflow(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("gateflow").unwrap();
    cmd.current_dir(dir.path()).env("GATEFLOW_ROOT", dir.path());
    cmd
}

fn init_project(dir: &TempDir) {
    gateflow(dir).arg("init").assert().success();
}

fn git(dir: &TempDir, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(args)
        .current_dir(dir.path())
        .status()
        .expect("git not available");
    assert!(status.success(), "git {args:?} failed");
}

fn init_git_repo(dir: &TempDir) {
    git(dir, &["init", "-b", "main"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "user.name", "Test"]);
    std::fs::write(dir.path().join("README.md"), "readme\n").unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "-m", "initial"]);
}

// ---------------------------------------------------------------------------
// gateflow init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_directory_tree() {
    let dir = TempDir::new().unwrap();
    gateflow(&dir).arg("init").assert().success();

    assert!(dir.path().join(".gateflow").is_dir());
    assert!(dir.path().join(".gateflow/backups").is_dir());
    assert!(dir.path().join(".gateflow/skills").is_dir());
    assert!(dir.path().join(".gateflow/config.yaml").exists());
    assert!(dir.path().join(".gateflow/versions/1.0.0/schema.json").exists());
    assert!(dir.path().join(".gateflow/schemas/workflow-state.json").exists());
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    gateflow(&dir).arg("init").assert().success();
    gateflow(&dir).arg("init").assert().success();
}

// ---------------------------------------------------------------------------
// gateflow start / status
// ---------------------------------------------------------------------------

#[test]
fn start_initializes_workflow() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    gateflow(&dir)
        .args(["start", "user-auth"])
        .assert()
        .success()
        .stdout(predicate::str::contains("user-auth"));

    assert!(dir.path().join(".gateflow/workflow-state.json").exists());

    gateflow(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("user-auth"))
        .stdout(predicate::str::contains("Requirements Gathering"));
}

#[test]
fn start_twice_fails() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    gateflow(&dir).args(["start", "first"]).assert().success();
    gateflow(&dir)
        .args(["start", "second"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn status_without_workflow_fails() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    gateflow(&dir)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no workflow"));
}

// ---------------------------------------------------------------------------
// gateflow phase
// ---------------------------------------------------------------------------

#[test]
fn phase_next_activates_first_phase() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    gateflow(&dir).args(["start", "user-auth"]).assert().success();

    gateflow(&dir)
        .args(["phase", "next"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Requirements Gathering"))
        .stdout(predicate::str::contains("client/user-auth-"));

    gateflow(&dir)
        .args(["phase", "next"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not complete"));
}

// ---------------------------------------------------------------------------
// gateflow commit (real git repo)
// ---------------------------------------------------------------------------

#[test]
fn commit_records_head_and_spawns_work_branch() {
    let dir = TempDir::new().unwrap();
    init_git_repo(&dir);
    init_project(&dir);
    gateflow(&dir).args(["start", "user-auth"]).assert().success();
    gateflow(&dir).args(["phase", "next"]).assert().success();

    gateflow(&dir)
        .args(["commit", "-m", "requirements draft"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created branch: client/user-auth-"));

    gateflow(&dir)
        .args(["review", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("client/user-auth-"))
        .stdout(predicate::str::contains("pending"));
}

#[test]
fn commit_without_active_phase_fails() {
    let dir = TempDir::new().unwrap();
    init_git_repo(&dir);
    init_project(&dir);
    gateflow(&dir).args(["start", "user-auth"]).assert().success();

    gateflow(&dir)
        .args(["commit", "-m", "too early"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no active phase"));
}

// ---------------------------------------------------------------------------
// gateflow version
// ---------------------------------------------------------------------------

#[test]
fn version_list_shows_current() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    gateflow(&dir)
        .args(["version", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.0.0"))
        .stdout(predicate::str::contains("current"));
}

#[test]
fn version_check_reports_no_updates() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    gateflow(&dir)
        .args(["version", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No updates available"));
}

#[test]
fn version_check_sees_new_store_entry() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::create_dir_all(dir.path().join(".gateflow/versions/2.0.0")).unwrap();

    gateflow(&dir)
        .args(["version", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Update available: 2.0.0"));
}

#[test]
fn version_update_fails_without_registered_migration() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    gateflow(&dir).args(["start", "user-auth"]).assert().success();
    std::fs::create_dir_all(dir.path().join(".gateflow/versions/2.0.0")).unwrap();

    gateflow(&dir)
        .args(["version", "update", "--to", "2.0.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no migration registered"))
        .stderr(predicate::str::contains("backup available"));
}

#[test]
fn version_update_dry_run_prints_path() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::create_dir_all(dir.path().join(".gateflow/versions/2.0.0")).unwrap();

    gateflow(&dir)
        .args(["version", "update", "--to", "2.0.0", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would migrate through: 2.0.0"));
}

// ---------------------------------------------------------------------------
// gateflow backup
// ---------------------------------------------------------------------------

#[test]
fn backup_list_empty() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    gateflow(&dir)
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups"));
}

#[test]
fn failed_update_leaves_restorable_backup() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    gateflow(&dir).args(["start", "user-auth"]).assert().success();
    std::fs::create_dir_all(dir.path().join(".gateflow/versions/2.0.0")).unwrap();

    gateflow(&dir)
        .args(["version", "update", "--to", "2.0.0"])
        .assert()
        .failure();

    gateflow(&dir)
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("backup_"))
        .stdout(predicate::str::contains("update"));
}

// ---------------------------------------------------------------------------
// gateflow skill
// ---------------------------------------------------------------------------

#[test]
fn skill_list_empty() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    gateflow(&dir)
        .args(["skill", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No skills installed"));
}

#[test]
fn skill_show_reads_store() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let skill_dir = dir.path().join(".gateflow/skills/auto-review");
    std::fs::create_dir_all(skill_dir.join("versions/1.2.0")).unwrap();
    std::fs::write(skill_dir.join("config.json"), r#"{"version": "1.2.0"}"#).unwrap();
    std::fs::write(
        skill_dir.join("versions/1.2.0/capabilities.json"),
        r#"{"capabilities": ["review", "score"]}"#,
    )
    .unwrap();

    gateflow(&dir)
        .args(["skill", "show", "auto-review"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.2.0 (current)"))
        .stdout(predicate::str::contains("review, score"));
}
