//! End-to-end tests driving real `sh` processes through lifecycle stages.

#![cfg(unix)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::json;
use tempfile::TempDir;

use stagexec::{
    ConfigError, Event, EventKind, Scheduler, SchedulerConfig, Stage, Subscribe, TaskSpec,
};

fn scheduler_in(dir: &TempDir) -> Scheduler {
    let mut cfg = SchedulerConfig::default();
    cfg.workdir = dir.path().to_path_buf();
    cfg.poll_interval = Duration::from_millis(50);
    Scheduler::new(cfg, Vec::new())
}

fn drain_kinds(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<EventKind> {
    let mut kinds = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        kinds.push(ev.kind);
    }
    kinds
}

#[tokio::test]
async fn blocking_echo_end_to_end() {
    let dir = TempDir::new().unwrap();
    let mut sched = scheduler_in(&dir);
    sched
        .add_task(
            TaskSpec::new("echo hi", Stage::Prepare)
                .with_stop(Stage::Prepare)
                .with_block(true)
                .with_label("hello"),
        )
        .unwrap();

    sched.process_stage(Stage::Prepare).await.unwrap();

    let out = std::fs::read_to_string(dir.path().join("hello.out")).unwrap();
    let err = std::fs::read_to_string(dir.path().join("hello.err")).unwrap();
    assert_eq!(out, "hi\n");
    assert_eq!(err, "");
    assert!(sched.is_empty());
}

#[tokio::test]
async fn non_blocking_start_returns_promptly() {
    let dir = TempDir::new().unwrap();
    let mut sched = scheduler_in(&dir);
    sched
        .add_task(
            TaskSpec::new("sleep 5", Stage::Prepare)
                .with_stop(Stage::Shutdown)
                .with_label("sleeper"),
        )
        .unwrap();

    let begin = Instant::now();
    sched.process_stage(Stage::Prepare).await.unwrap();
    assert!(
        begin.elapsed() < Duration::from_secs(2),
        "non-blocking start must not wait for process completion"
    );
    assert_eq!(sched.live_tasks(), vec!["sleeper"]);

    // The unfinished task is forcibly terminated at its stop stage.
    sched.process_stage(Stage::Shutdown).await.unwrap();
    assert!(sched.is_empty());
    assert!(
        begin.elapsed() < Duration::from_secs(3),
        "forced termination must not wait out the sleep"
    );
}

#[tokio::test]
async fn blocking_wait_polls_until_exit() {
    let dir = TempDir::new().unwrap();
    let mut sched = scheduler_in(&dir);
    sched
        .add_task(
            TaskSpec::new("sleep 0.3; echo done", Stage::Check)
                .with_stop(Stage::Check)
                .with_block(true)
                .with_label("worker"),
        )
        .unwrap();

    let begin = Instant::now();
    sched.process_stage(Stage::Check).await.unwrap();
    assert!(
        begin.elapsed() >= Duration::from_millis(250),
        "blocking stage returned before the task finished"
    );

    let out = std::fs::read_to_string(dir.path().join("worker.out")).unwrap();
    assert_eq!(out, "done\n");
    assert!(sched.is_empty());
}

#[tokio::test]
async fn stop_on_fail_aborts_before_stop_phase() {
    let dir = TempDir::new().unwrap();
    let mut sched = scheduler_in(&dir);
    let mut rx = sched.subscribe();
    sched
        .add_task(
            TaskSpec::new("exit 1", Stage::Check)
                .with_stop(Stage::Check)
                .with_block(true)
                .with_stop_on_fail(true)
                .with_label("guard"),
        )
        .unwrap();

    let err = sched.process_stage(Stage::Check).await.unwrap_err();
    assert!(err.is_abort());
    assert_eq!(err.as_label(), "run_aborted");

    // The stop phase of the stage was skipped: the task is still live.
    assert_eq!(sched.live_tasks(), vec!["guard"]);

    let kinds = drain_kinds(&mut rx);
    assert!(kinds.contains(&EventKind::TaskFailed));
    assert!(kinds.contains(&EventKind::RunAborted));
    assert!(!kinds.contains(&EventKind::TaskRemoved));
}

#[tokio::test]
async fn stop_on_fail_failure_observed_at_stop_stage() {
    let dir = TempDir::new().unwrap();
    let mut sched = scheduler_in(&dir);
    let mut rx = sched.subscribe();
    // Non-blocking: nothing polls this task until its stop stage.
    sched
        .add_task(
            TaskSpec::new("exit 7", Stage::Prepare)
                .with_stop(Stage::Check)
                .with_stop_on_fail(true)
                .with_label("canary"),
        )
        .unwrap();

    sched.process_stage(Stage::Prepare).await.unwrap();
    // Let the process exit while no stage is watching it.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let err = sched.process_stage(Stage::Check).await.unwrap_err();
    assert!(
        err.is_abort(),
        "a failure first seen at the stop stage must still abort the run"
    );

    let kinds = drain_kinds(&mut rx);
    assert!(kinds.contains(&EventKind::TaskFailed));
    assert!(kinds.contains(&EventKind::RunAborted));
    assert!(!kinds.contains(&EventKind::TaskRemoved));
    assert_eq!(sched.live_tasks(), vec!["canary"]);
}

#[tokio::test]
async fn nonzero_exit_without_stop_on_fail_is_recoverable() {
    let dir = TempDir::new().unwrap();
    let mut sched = scheduler_in(&dir);
    sched
        .add_task(
            TaskSpec::new("exit 3", Stage::Prepare)
                .with_stop(Stage::Prepare)
                .with_block(true),
        )
        .unwrap();

    sched.process_stage(Stage::Prepare).await.unwrap();
    assert!(sched.is_empty());
}

#[tokio::test]
async fn output_files_capture_exact_bytes() {
    let dir = TempDir::new().unwrap();
    let mut sched = scheduler_in(&dir);
    sched
        .add_task(
            TaskSpec::new("printf 'a\\nb'; printf oops 1>&2", Stage::Prepare)
                .with_stop(Stage::Prepare)
                .with_block(true)
                .with_label("cap"),
        )
        .unwrap();

    sched.process_stage(Stage::Prepare).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(dir.path().join("cap.out")).unwrap(),
        "a\nb"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("cap.err")).unwrap(),
        "oops"
    );
}

#[tokio::test]
async fn non_utf8_output_is_drained_lossily() {
    let dir = TempDir::new().unwrap();
    let mut sched = scheduler_in(&dir);
    let mut rx = sched.subscribe();
    sched
        .add_task(
            TaskSpec::new("printf '\\377\\376 raw'", Stage::Prepare)
                .with_stop(Stage::Prepare)
                .with_block(true)
                .with_label("binary"),
        )
        .unwrap();

    sched
        .process_stage(Stage::Prepare)
        .await
        .expect("invalid UTF-8 in a sink file must not fail shutdown");
    assert!(sched.is_empty());

    let captured: Vec<Event> = {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::StdoutCaptured {
                events.push(ev);
            }
        }
        events
    };
    assert_eq!(captured.len(), 1);
    let reason = captured[0].reason.as_deref().unwrap();
    assert!(reason.contains(" raw"), "readable bytes survive the decode");
    assert!(reason.contains('\u{FFFD}'), "bad bytes become replacements");
}

#[tokio::test]
async fn explicit_sink_paths_override_prefix() {
    let dir = TempDir::new().unwrap();
    let mut sched = scheduler_in(&dir);
    sched
        .add_task(
            TaskSpec::new("echo custom", Stage::Prepare)
                .with_stop(Stage::Prepare)
                .with_block(true)
                .with_label("labeled")
                .with_out("custom.log"),
        )
        .unwrap();

    sched.process_stage(Stage::Prepare).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(dir.path().join("custom.log")).unwrap(),
        "custom\n"
    );
    assert!(!dir.path().join("labeled.out").exists());
    // The error sink still falls back to the label prefix.
    assert!(dir.path().join("labeled.err").exists());
}

#[tokio::test]
async fn generated_prefixes_are_unique() {
    let dir = TempDir::new().unwrap();
    let mut sched = scheduler_in(&dir);
    for _ in 0..2 {
        sched
            .add_task(
                TaskSpec::new("true", Stage::Prepare)
                    .with_stop(Stage::Prepare)
                    .with_block(true),
            )
            .unwrap();
    }

    sched.process_stage(Stage::Prepare).await.unwrap();

    let out_files = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "out"))
        .count();
    assert_eq!(out_files, 2, "each unlabeled task gets its own sink prefix");
}

#[tokio::test]
async fn missing_command_rejected() {
    let dir = TempDir::new().unwrap();
    let mut sched = scheduler_in(&dir);

    let raw = json!({"label": "broken"});
    let err = sched
        .add_from_config(Stage::Prepare, raw.as_object().unwrap())
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingCommand));
    assert_eq!(err.as_label(), "config_missing_command");
    assert!(sched.is_empty());
}

#[tokio::test]
async fn blocking_on_startup_rejected() {
    let dir = TempDir::new().unwrap();
    let mut sched = scheduler_in(&dir);

    let raw = json!({"command": "true", "block": true});
    let err = sched
        .add_from_config(Stage::Startup, raw.as_object().unwrap())
        .unwrap_err();
    assert!(matches!(err, ConfigError::BlockingOnStartup));
    assert!(sched.is_empty());
}

#[tokio::test]
async fn unknown_config_keys_are_warned_not_fatal() {
    let dir = TempDir::new().unwrap();
    let mut sched = scheduler_in(&dir);
    let mut rx = sched.subscribe();

    let raw = json!({"command": "true", "retries": 5});
    sched
        .add_from_config(Stage::Prepare, raw.as_object().unwrap())
        .unwrap();
    assert_eq!(sched.len(), 1);

    let ignored: Vec<Event> = {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::OptionIgnored {
                events.push(ev);
            }
        }
        events
    };
    assert_eq!(ignored.len(), 1);
    assert_eq!(ignored[0].reason.as_deref(), Some("retries"));
}

#[tokio::test]
async fn leftover_tasks_warned_at_post_process() {
    let dir = TempDir::new().unwrap();
    let mut sched = scheduler_in(&dir);
    let mut rx = sched.subscribe();
    sched
        .add_task(
            TaskSpec::new("sleep 5", Stage::Prepare)
                .with_stop(Stage::Shutdown)
                .with_label("straggler"),
        )
        .unwrap();

    sched.process_stage(Stage::Prepare).await.unwrap();
    sched.process_stage(Stage::PostProcess).await.unwrap();

    let kinds = drain_kinds(&mut rx);
    assert!(
        kinds.contains(&EventKind::TasksLeftOver),
        "a task alive after post-process must be reported"
    );
    assert_eq!(sched.live_tasks(), vec!["straggler"]);

    // Warning only: the run goes on and the stop stage still works.
    sched.process_stage(Stage::Shutdown).await.unwrap();
    assert!(sched.is_empty());
}

#[tokio::test]
async fn never_started_task_is_removed_silently() {
    let dir = TempDir::new().unwrap();
    let mut sched = scheduler_in(&dir);
    // Stop stage earlier than start stage: removed while still Idle.
    sched
        .add_task(
            TaskSpec::new("echo never", Stage::Shutdown)
                .with_stop(Stage::Prepare)
                .with_label("misconfigured"),
        )
        .unwrap();

    sched.process_stage(Stage::Prepare).await.unwrap();
    assert!(sched.is_empty());
    assert!(
        !dir.path().join("misconfigured.out").exists(),
        "a task that never started must not create sink files"
    );
}

struct Recorder {
    kinds: Arc<Mutex<Vec<EventKind>>>,
}

#[async_trait::async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.kinds.lock().unwrap().push(event.kind);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test]
async fn subscribers_observe_the_lifecycle() {
    let dir = TempDir::new().unwrap();
    let kinds = Arc::new(Mutex::new(Vec::new()));
    let mut cfg = SchedulerConfig::default();
    cfg.workdir = dir.path().to_path_buf();
    cfg.poll_interval = Duration::from_millis(50);
    let recorder: Arc<dyn Subscribe> = Arc::new(Recorder {
        kinds: kinds.clone(),
    });
    let mut sched = Scheduler::new(cfg, vec![recorder]);

    sched
        .add_task(
            TaskSpec::new("echo observed", Stage::Prepare)
                .with_stop(Stage::Prepare)
                .with_block(true)
                .with_label("observed"),
        )
        .unwrap();
    sched.process_stage(Stage::Prepare).await.unwrap();

    // The listener is fire-and-forget; give it a beat to catch up.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let seen = kinds.lock().unwrap().clone();
    assert!(seen.contains(&EventKind::TaskAdded));
    assert!(seen.contains(&EventKind::TaskLaunched));
    assert!(seen.contains(&EventKind::StdoutCaptured));
    assert!(seen.contains(&EventKind::TaskRemoved));
}
