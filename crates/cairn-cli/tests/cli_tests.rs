use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const PLAN: &str = r#"{
    "id": "launch",
    "goal": "Ship the launch page",
    "max_parallel": 2,
    "steps": [
        {"id": "copy", "description": "Draft copy", "action": "text.write"},
        {"id": "hero", "description": "Render hero", "action": "image.render",
         "params": {"size": 1024}},
        {"id": "page", "description": "Assemble page", "action": "page.build",
         "depends_on": ["copy", "hero"]}
    ]
}"#;

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temporary directory"),
        }
    }

    fn db(&self) -> PathBuf {
        self.dir.path().join("cli_test.db")
    }

    /// Command with --no-color and the test database.
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("cairn").expect("Failed to find cairn binary");
        cmd.arg("--no-color").arg("--database-file").arg(self.db());
        cmd
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).expect("Failed to write test file");
        path
    }

    fn create_plan(&self) {
        let file = self.write("plan.json", PLAN);
        self.cmd()
            .args(["plan", "create", "--file"])
            .arg(&file)
            .assert()
            .success();
    }

    fn run(&self, args: &[&str]) {
        self.cmd().args(args).assert().success();
    }
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_cli_create_plan() {
    let env = Env::new();
    let file = env.write("plan.json", PLAN);

    env.cmd()
        .args(["plan", "create", "--file", path_arg(&file)])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created plan with ID: launch"))
        .stdout(predicate::str::contains("# Ship the launch page"))
        .stdout(predicate::str::contains("- Status: planning"))
        .stdout(predicate::str::contains("- Active steps: 0/2"))
        .stdout(predicate::str::contains("### 1. Draft copy (○ Pending)"))
        .stdout(predicate::str::contains("- Depends on: `copy`, `hero`"));
}

#[test]
fn test_cli_create_plan_from_stdin() {
    let env = Env::new();

    env.cmd()
        .args(["--workspace", "studio", "plan", "create", "--file", "-", "--auto-advance"])
        .write_stdin(PLAN)
        .assert()
        .success()
        .stdout(predicate::str::contains("- Workspace: studio"))
        .stdout(predicate::str::contains("- Auto-advance: on"));
}

#[test]
fn test_cli_create_plan_rejects_cycle() {
    let env = Env::new();
    let file = env.write(
        "cycle.json",
        r#"{"goal": "Loop", "steps": [
            {"id": "a", "description": "A", "action": "x", "depends_on": ["b"]},
            {"id": "b", "description": "B", "action": "x", "depends_on": ["a"]}
        ]}"#,
    );

    env.cmd()
        .args(["plan", "create", "--file", path_arg(&file)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to create plan"))
        .stderr(predicate::str::contains("dependency cycle"));
}

#[test]
fn test_cli_create_plan_invalid_json() {
    let env = Env::new();
    let file = env.write("broken.json", "{ not json");

    env.cmd()
        .args(["plan", "create", "--file", path_arg(&file)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid JSON in"));
}

#[test]
fn test_cli_without_command_shows_active_plan() {
    let env = Env::new();

    env.cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("No active plan in workspace default."));

    env.create_plan();

    env.cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("# Ship the launch page"));

    env.cmd()
        .args(["--workspace", "elsewhere", "plan", "active"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No active plan in workspace elsewhere."));
}

#[test]
fn test_cli_show_unknown_plan() {
    let env = Env::new();

    env.cmd()
        .args(["plan", "show", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Plan with ID ghost not found"));
}

#[test]
fn test_cli_approve_twice() {
    let env = Env::new();
    env.create_plan();

    env.cmd()
        .args(["plan", "approve", "launch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated plan with ID: launch"))
        .stdout(predicate::str::contains("Approved by cli"))
        .stdout(predicate::str::contains("- Status: executing"));

    env.cmd()
        .args(["plan", "approve", "launch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Cannot approve plan launch: current status is executing",
        ));
}

#[test]
fn test_cli_viewer_cannot_approve() {
    let env = Env::new();
    env.create_plan();

    env.cmd()
        .args(["--actor", "vic", "--role", "viewer", "plan", "approve", "launch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Actor 'vic' is not allowed"));
}

#[test]
fn test_cli_reject() {
    let env = Env::new();
    env.create_plan();

    env.cmd()
        .args(["plan", "reject", "launch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rejected by cli"))
        .stdout(predicate::str::contains("- Status: cancelled"));

    env.cmd()
        .args(["plan", "advance", "launch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot advance plan launch"));
}

#[test]
fn test_cli_manual_execution() {
    let env = Env::new();
    env.create_plan();
    env.run(&["plan", "approve", "launch"]);

    env.cmd()
        .args(["plan", "advance", "launch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Started step with ID: copy"))
        .stdout(predicate::str::contains("(➤ In Progress)"));

    env.cmd()
        .args(["step", "complete", "copy", "--result", r#"{"words": 120}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated step with ID: copy"))
        .stdout(predicate::str::contains("Marked as completed"))
        .stdout(predicate::str::contains("{\"words\":120}"));

    env.run(&["plan", "advance", "launch"]);
    env.run(&["step", "complete", "hero", "--result", "rendered"]);
    env.run(&["plan", "advance", "launch"]);
    env.run(&["step", "complete", "page"]);

    env.cmd()
        .args(["plan", "show", "launch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- Status: completed"))
        .stdout(predicate::str::contains("## Steps (3/3)"))
        .stdout(predicate::str::contains("\"rendered\""));
}

#[test]
fn test_cli_advance_respects_dependencies() {
    let env = Env::new();
    env.create_plan();
    env.run(&["plan", "approve", "launch"]);
    env.run(&["plan", "advance", "launch"]);
    env.run(&["plan", "advance", "launch"]);

    // copy and hero are in progress; page still waits for both
    env.cmd()
        .args(["plan", "advance", "launch"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "No step started; plan launch is executing with 2/2 active steps",
        ));
}

#[test]
fn test_cli_fail_and_retry() {
    let env = Env::new();
    env.create_plan();
    env.run(&["plan", "approve", "launch"]);
    env.run(&["plan", "advance", "launch"]);

    env.cmd()
        .args(["step", "fail", "copy", "--error", "model timeout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Marked step copy as failed"))
        .stdout(predicate::str::contains("model timeout"))
        .stdout(predicate::str::contains("## Blocked steps"))
        .stdout(predicate::str::contains("### 3. Assemble page (⊘ Blocked)"));

    env.cmd()
        .args(["plan", "show", "launch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- Status: paused"));

    env.cmd()
        .args(["step", "retry", "copy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Success: Step copy is pending again"))
        .stdout(predicate::str::contains("Started step with ID: copy"));

    env.cmd()
        .args(["step", "retry", "copy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot retry step copy"));
}

#[test]
fn test_cli_revise_plan() {
    let env = Env::new();
    env.create_plan();
    let revisions = env.write(
        "revisions.json",
        r#"[
            {"action": "update_description", "step_id": "hero", "description": "Render hero at 2x"},
            {"action": "insert_after", "step_id": "copy",
             "step": {"id": "review", "description": "Review copy", "action": "text.review",
                      "depends_on": ["copy"]}}
        ]"#,
    );

    env.cmd()
        .args(["plan", "revise", "launch", "--file", path_arg(&revisions)])
        .assert()
        .success()
        .stdout(predicate::str::contains("Description updated"))
        .stdout(predicate::str::contains("Render hero at 2x"))
        .stdout(predicate::str::contains("Created step with ID: review"))
        .stdout(predicate::str::contains("### 2. Review copy (○ Pending)"));

    env.cmd()
        .args(["plan", "show", "launch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- Revised after creation"))
        .stdout(predicate::str::contains("### 3. Render hero at 2x"));
}

#[test]
fn test_cli_revise_plan_applies_nothing_on_failure() {
    let env = Env::new();
    env.create_plan();
    let revisions = env.write(
        "revisions.json",
        r#"[
            {"action": "update_description", "step_id": "copy", "description": "NEW COPY"},
            {"action": "skip", "step_id": "ghost"}
        ]"#,
    );

    env.cmd()
        .args(["plan", "revise", "launch", "--file", path_arg(&revisions)])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Description updated").not())
        .stderr(predicate::str::contains(
            "Failed to revise plan launch; no revision was applied",
        ))
        .stderr(predicate::str::contains("ghost"));

    env.cmd()
        .args(["plan", "show", "launch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NEW COPY").not())
        .stdout(predicate::str::contains("Revised after creation").not());
}

#[test]
fn test_cli_skip_step() {
    let env = Env::new();
    env.create_plan();
    env.run(&["plan", "approve", "launch"]);

    env.cmd()
        .args(["step", "skip", "hero"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped"))
        .stdout(predicate::str::contains("(↷ Skipped)"));

    env.cmd()
        .args(["step", "skip", "hero"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot skip step hero"));
}

#[test]
fn test_cli_late_completion_after_cancel() {
    let env = Env::new();
    env.create_plan();
    env.run(&["plan", "approve", "launch"]);
    env.run(&["plan", "advance", "launch"]);

    env.cmd()
        .args(["plan", "cancel", "launch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled by cli"))
        .stdout(predicate::str::contains("- Status: cancelled"));

    env.cmd()
        .args(["step", "complete", "copy"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Error: Plan of step copy has ended; the result was ignored",
        ));
}

#[test]
fn test_cli_auto_advance_toggle() {
    let env = Env::new();
    env.create_plan();

    env.cmd()
        .args(["plan", "auto-advance", "launch", "on"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Auto-advance turned on"))
        .stdout(predicate::str::contains("- Auto-advance: on"));

    env.cmd()
        .args(["plan", "auto-advance", "launch", "maybe"])
        .assert()
        .failure();
}

#[cfg(unix)]
#[test]
fn test_cli_run_plan_to_completion() {
    let env = Env::new();
    env.create_plan();

    env.cmd()
        .args([
            "plan",
            "run",
            "launch",
            "--command",
            "sh",
            "--",
            "-c",
            r#"cat >/dev/null; echo "{\"by\": \"$CAIRN_STEP_ID\"}""#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("**plan:updated** `launch` completed"))
        .stdout(predicate::str::contains("- Status: completed"))
        .stdout(predicate::str::contains("{\"by\":\"page\"}"));
}

#[cfg(unix)]
#[test]
fn test_cli_run_plan_stops_on_failure() {
    let env = Env::new();
    let file = env.write(
        "chain.json",
        r#"{"id": "chain", "goal": "Chain", "steps": [
            {"id": "first", "description": "First", "action": "fail"},
            {"id": "second", "description": "Second", "action": "noop", "depends_on": ["first"]}
        ]}"#,
    );
    env.run(&["plan", "create", "--file", path_arg(&file)]);

    env.cmd()
        .args([
            "plan",
            "run",
            "chain",
            "--command",
            "sh",
            "--",
            "-c",
            "echo 'quota exceeded' >&2; exit 1",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "**step:updated** `first` ✗ Failed: quota exceeded",
        ))
        .stdout(predicate::str::contains("### 2. Second (⊘ Blocked)"))
        .stderr(predicate::str::contains("plan chain stopped while paused"));
}

#[cfg(unix)]
#[test]
fn test_cli_run_plan_after_manual_advance() {
    let env = Env::new();
    env.create_plan();
    env.run(&["plan", "approve", "launch"]);
    env.run(&["plan", "advance", "launch"]);

    // copy was started by hand; the run finishes hero and returns
    env.cmd()
        .args(["plan", "run", "launch", "--command", "sh", "--", "-c", "cat >/dev/null"])
        .timeout(Duration::from_secs(30))
        .assert()
        .failure()
        .stdout(predicate::str::contains("### 2. Render hero (✓ Completed)"))
        .stdout(predicate::str::contains("### 1. Draft copy (➤ In Progress)"))
        .stdout(predicate::str::contains(
            "Error: Not started by this run, still in progress: `copy`",
        ))
        .stderr(predicate::str::contains("plan launch stopped while paused"));

    env.run(&["step", "complete", "copy"]);
    env.cmd()
        .args(["plan", "run", "launch", "--command", "sh", "--", "-c", "cat >/dev/null"])
        .timeout(Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("- Status: completed"));
}
