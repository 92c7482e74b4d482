// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ao_adapters::{FakeGateway, FakeProcessTree};
use ao_core::FakeClock;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    repo: PathBuf,
    gateway: FakeGateway,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let repo = dir.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        Self {
            _dir: dir,
            repo,
            gateway: FakeGateway::new(),
        }
    }

    fn supervisor(
        &self,
        config: SupervisorConfig,
    ) -> Supervisor<FakeGateway, FakeClock, FakeProcessTree> {
        let clock = FakeClock::new();
        clock.set_epoch_ms(1_750_000_000_000);
        Supervisor::new(
            self.gateway.clone(),
            clock,
            FakeProcessTree::new(),
            &self.repo,
            config,
        )
    }

    fn config(&self, goal: &str) -> SupervisorConfig {
        SupervisorConfig {
            goal: goal.to_string(),
            bd_sync_policy: BdSyncPolicy::Never,
            ..SupervisorConfig::default()
        }
    }
}

#[tokio::test]
async fn happy_path_supervise_completes_the_run() {
    let fx = Fixture::new();
    fx.gateway.succeed_with("claude", "done. vibe PASS");

    let summary = fx.supervisor(fx.config("fix typo")).run().await.unwrap();

    assert!(summary.completed);
    assert!(!summary.kill_switch);
    assert_eq!(summary.cycles_run, 1);
    assert!(summary.epic_id.as_str().starts_with("epic-"));

    // The run landed in the worktree's registry with a terminal record
    let workdir = fx
        .repo
        .parent()
        .unwrap()
        .join(format!("repo-rpi-{}", summary.run_id));
    let registry = RunRegistry::new(&workdir);
    let run = registry.get(&summary.run_id).unwrap();
    assert_eq!(run.terminal_status, "completed");
    assert_eq!(run.verdicts.get("vibe").map(|v| v.as_str()), Some("PASS"));
    assert!(run.options.fast_path, "\"fix typo\" is a fast-path goal");
    run.validate().unwrap();

    // live-status reflects the terminal state
    let live = std::fs::read_to_string(workdir.join(".agents/rpi/live-status.md")).unwrap();
    assert!(live.contains("completed"));
}

#[tokio::test]
async fn each_cycle_runs_a_watchdog_pass_over_phase_sessions() {
    let fx = Fixture::new();
    fx.gateway.succeed_with("claude", "done. vibe PASS");

    let summary = fx.supervisor(fx.config("fix typo")).run().await.unwrap();
    assert!(summary.completed);

    // The context guard tracked a budget for every phase session
    let workdir = fx
        .repo
        .parent()
        .unwrap()
        .join(format!("repo-rpi-{}", summary.run_id));
    let context_dir = workdir.join(".agents/ao/context");
    for n in 1..=3 {
        let budget = context_dir.join(format!("budget-ao-rpi-{}-p{}.json", summary.run_id, n));
        assert!(budget.exists(), "missing {}", budget.display());
    }
}

#[tokio::test]
async fn kill_switch_exits_cleanly_before_any_cycle() {
    let fx = Fixture::new();
    let kill = fx.repo.join(".agents/rpi/KILL");
    std::fs::create_dir_all(kill.parent().unwrap()).unwrap();
    std::fs::write(&kill, "").unwrap();

    let summary = fx.supervisor(fx.config("fix typo")).run().await.unwrap();

    assert!(summary.kill_switch);
    assert!(!summary.completed);
    // No runtime invocation happened
    assert!(!fx.gateway.calls().iter().any(|c| c.starts_with("claude")));
}

#[tokio::test]
async fn custom_kill_switch_path_is_honored() {
    let fx = Fixture::new();
    let kill = fx.repo.join("STOP-NOW");
    std::fs::write(&kill, "").unwrap();

    let mut config = fx.config("fix typo");
    config.kill_switch_path = Some(kill);
    let summary = fx.supervisor(config).run().await.unwrap();
    assert!(summary.kill_switch);
}

#[tokio::test]
async fn required_gate_failure_fails_the_cycle() {
    let fx = Fixture::new();
    fx.gateway.succeed_with("claude", "PASS");
    fx.gateway.fail_with("./validate.sh", "lint errors");

    let mut config = fx.config("fix typo");
    config.gate_policy = GatePolicy::Required;
    config.gates.validate_fast = Some("./validate.sh".to_string());

    let err = fx.supervisor(config).run().await.unwrap_err();
    assert!(err.to_string().contains("gate validate_fast failed"), "got: {err}");
    assert_eq!(err.failure_kind(), ao_core::FailureKind::Task);
}

#[tokio::test]
async fn gates_off_skips_scripts() {
    let fx = Fixture::new();
    fx.gateway.succeed_with("claude", "PASS");

    let mut config = fx.config("fix typo");
    config.gates.validate_fast = Some("./validate.sh".to_string());
    // policy stays Off
    let summary = fx.supervisor(config).run().await.unwrap();
    assert!(summary.completed);
    assert!(!fx.gateway.calls().iter().any(|c| c.contains("validate.sh")));
}

#[tokio::test]
async fn continue_policy_with_zero_retries_moves_to_next_cycle() {
    let fx = Fixture::new();
    fx.gateway.time_out("claude", 1);

    let mut config = fx.config("fix typo");
    config.failure_policy = FailurePolicy::Continue;
    config.cycles = 2;
    config.cycle_retries = 0;
    config.cycle_delay = Duration::ZERO;

    let summary = fx.supervisor(config).run().await.unwrap();
    assert!(!summary.completed);
    assert_eq!(summary.cycles_run, 2);
}

#[tokio::test]
async fn stop_policy_surfaces_the_first_failure() {
    let fx = Fixture::new();
    fx.gateway.time_out("claude", 1);

    let mut config = fx.config("fix typo");
    config.cycles = 3;
    let err = fx.supervisor(config).run().await.unwrap_err();
    assert!(matches!(err, EngineError::Gateway(_)));
}

#[tokio::test]
async fn retry_backoff_is_bounded_by_config() {
    let fx = Fixture::new();
    fx.gateway.time_out("claude", 1);

    let mut config = fx.config("fix typo");
    config.failure_policy = FailurePolicy::Continue;
    config.cycle_retries = 2;
    config.retry_backoff = Duration::from_millis(5);

    let start = std::time::Instant::now();
    let summary = fx.supervisor(config).run().await.unwrap();
    assert!(!summary.completed);
    // Backoff was bounded by retry_backoff, not the 1s base
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn supervisor_lease_is_released_on_exit() {
    let fx = Fixture::new();
    fx.gateway.succeed_with("claude", "PASS");

    let mut config = fx.config("fix typo");
    config.use_lease = true;
    let summary = fx.supervisor(config).run().await.unwrap();
    assert!(summary.completed);

    let workdir = fx
        .repo
        .parent()
        .unwrap()
        .join(format!("repo-rpi-{}", summary.run_id));
    assert!(!workdir.join(".agents/rpi/supervisor.lock").exists());
}

#[tokio::test]
async fn landing_commit_holds_and_releases_the_landing_lease() {
    let fx = Fixture::new();
    fx.gateway.succeed_with("claude", "PASS");
    fx.gateway.succeed_with("status --porcelain", "");

    let mut config = fx.config("fix typo");
    config.landing_policy = LandingPolicy::Commit;
    let summary = fx.supervisor(config).run().await.unwrap();
    assert!(summary.completed);

    let workdir = fx
        .repo
        .parent()
        .unwrap()
        .join(format!("repo-rpi-{}", summary.run_id));
    assert!(!workdir.join(".agents/rpi/landing.lock").exists());
    // A clean tree lands nothing
    assert!(!fx.gateway.calls().iter().any(|c| c.starts_with("git commit")));
}

#[tokio::test]
async fn bd_sync_always_errors_without_the_binary() {
    let fx = Fixture::new();
    fx.gateway.succeed_with("claude", "PASS");

    let mut config = fx.config("fix typo");
    config.bd_sync_policy = BdSyncPolicy::Always;
    config.tools.bd_command = "definitely-not-a-bd-binary-3f9".to_string();

    let err = fx.supervisor(config).run().await.unwrap_err();
    assert!(err.to_string().contains("not on PATH"), "got: {err}");
}

#[tokio::test]
async fn bd_sync_auto_skips_without_beads_dir() {
    let fx = Fixture::new();
    fx.gateway.succeed_with("claude", "PASS");

    let mut config = fx.config("fix typo");
    config.bd_sync_policy = BdSyncPolicy::Auto;
    // `sh` resolves on PATH but there is no .beads directory
    config.tools.bd_command = "sh".to_string();

    let summary = fx.supervisor(config).run().await.unwrap();
    assert!(summary.completed);
    assert!(!fx.gateway.calls().iter().any(|c| c.starts_with("sh sync")));
}

#[tokio::test]
async fn resume_merges_existing_progress_and_respects_from() {
    let fx = Fixture::new();
    fx.gateway.succeed_with("claude", "PASS");
    fx.gateway.fail_with("worktree list", "not a git repo");

    // An earlier run got through discovery and implementation
    let mut existing = Run::new(RunId::new("abcdef0123"), "fix typo", Phase::Discovery);
    existing.phase = Phase::Validation;
    existing.record_verdict(Phase::Discovery, ao_core::Verdict::Pass);
    existing.record_verdict(Phase::Implementation, ao_core::Verdict::Warn);
    RunRegistry::new(&fx.repo).put(&existing).unwrap();

    let mut config = fx.config("");
    config.run_id = Some(RunId::new("abcdef0123"));

    let summary = fx.supervisor(config).run().await.unwrap();
    assert!(summary.completed);
    assert_eq!(summary.run_id, "abcdef0123");

    // Only validation ran; earlier verdicts survived the merge
    let runtime_calls = fx
        .gateway
        .calls()
        .iter()
        .filter(|c| c.starts_with("claude"))
        .count();
    assert_eq!(runtime_calls, 1);

    let run = RunRegistry::new(&fx.repo).get(&RunId::new("abcdef0123")).unwrap();
    assert_eq!(run.verdicts.get("pre_mortem").map(|v| v.as_str()), Some("PASS"));
    assert_eq!(run.verdicts.get("vibe").map(|v| v.as_str()), Some("WARN"));
    assert_eq!(run.terminal_status, "completed");
}

#[tokio::test]
async fn resume_missing_run_is_an_error() {
    let fx = Fixture::new();
    fx.gateway.fail_with("worktree list", "not a git repo");

    let mut config = fx.config("");
    config.run_id = Some(RunId::new("ffffffff00"));
    let err = fx.supervisor(config).run().await.unwrap_err();
    assert!(matches!(err, EngineError::RunNotFound(_)));
}
