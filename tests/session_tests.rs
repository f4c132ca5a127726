// End-to-end interactive sessions driven by scripted input

mod common;

use common::{FakeExecutor, mb};
use std::sync::Arc;
use std::time::Duration;
use volshrink::audit_repo::AuditRepo;
use volshrink::error::{SessionError, TargetError};
use volshrink::session::{Orchestrator, SessionOutcome, SessionSettings};
use volshrink::units::MIB;

fn settings() -> SessionSettings {
    SessionSettings {
        request_timeout: Duration::from_secs(5),
        min_granularity: MIB,
        max_targets: 8,
        parallel_collection: true,
    }
}

fn two_hosts() -> Arc<FakeExecutor> {
    Arc::new(
        FakeExecutor::new()
            .with_host("H1", mb(100_000), mb(50_000))
            .with_host("H2", mb(80_000), mb(60_000)),
    )
}

async fn run(exec: Arc<FakeExecutor>, script: &str) -> (Option<SessionOutcome>, String) {
    let orchestrator = Orchestrator::new(exec, settings(), None);
    let mut reader = script.as_bytes();
    let mut out = Vec::new();
    let last = orchestrator.run_loop(&mut reader, &mut out).await.unwrap();
    (last, String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn test_feasible_shrink_runs_on_every_target() {
    let exec = two_hosts();
    let (last, out) = run(exec.clone(), "2\nH1\nH2\nD\nadmin\nsecret\n15000\ny\nn\n").await;

    let Some(SessionOutcome::Completed(results)) = last else {
        panic!("expected a completed rollout, got {:?}", last);
    };
    assert!(results.iter().all(|r| r.is_success()));
    assert_eq!(
        exec.resize_calls(),
        vec![("H1".to_string(), mb(85_000)), ("H2".to_string(), mb(65_000))]
    );
    assert!(out.contains("Shared floor: 60000 MB (set by H2)"));
    let h2_row = out
        .lines()
        .find(|l| l.contains("H2") && l.contains("80000 MB"))
        .unwrap();
    assert!(h2_row.contains("60000 MB"));
    assert!(h2_row.contains('│'));
    assert!(out.contains("Rollout finished: 2 succeeded, 0 failed."));
    assert!(out.contains("Start over with new input?"));
}

#[tokio::test]
async fn test_shrink_below_floor_changes_nothing() {
    let exec = two_hosts();
    let (last, out) = run(exec.clone(), "2\nH1\nH2\nD\nadmin\nsecret\n25000\nn\n").await;

    let Some(SessionOutcome::Aborted(SessionError::ValidationFailed(rejections))) = last else {
        panic!("expected validation failure, got {:?}", last);
    };
    assert_eq!(rejections.len(), 1);
    assert_eq!(rejections[0].target, "H2");
    // H1 alone would have fit, but nothing is touched.
    assert!(exec.resize_calls().is_empty());
    assert!(out.contains("Shrink rejected; nothing was changed:"));
    assert!(out.contains("H2"));
    assert!(out.contains("Start over with new input?"));
}

#[tokio::test]
async fn test_no_responding_target_aborts_before_amount() {
    let exec = Arc::new(
        FakeExecutor::new().with_query_error("H1", TargetError::Unreachable("connection refused".into())),
    );
    let (last, out) = run(exec.clone(), "2\nH1\nH2\nD\nadmin\nsecret\nn\n").await;

    let Some(SessionOutcome::Aborted(SessionError::NoValidTargets(failures))) = last else {
        panic!("expected NoValidTargets, got {:?}", last);
    };
    assert_eq!(failures.len(), 2);
    assert!(!out.contains("Amount to shrink by"));
    assert!(out.contains("No target returned usable sizes"));
    assert!(out.contains("Start over with new input?"));
    assert!(exec.resize_calls().is_empty());
}

#[tokio::test]
async fn test_declined_confirmation_changes_nothing() {
    let exec = two_hosts();
    let (last, out) = run(exec.clone(), "2\nH1\nH2\nD\nadmin\nsecret\n15000\nn\nn\n").await;

    assert_eq!(last, Some(SessionOutcome::Aborted(SessionError::UserCancelled)));
    assert!(!last.unwrap().needs_attention());
    assert!(exec.resize_calls().is_empty());
    assert!(out.contains("Cancelled; nothing was changed."));
    assert!(out.contains("Start over with new input?"));
}

#[tokio::test]
async fn test_partial_rollout_failure_is_reported() {
    let exec = Arc::new(
        FakeExecutor::new()
            .with_host("H1", mb(100_000), mb(50_000))
            .with_host("H2", mb(80_000), mb(60_000))
            .with_resize_error("H1", TargetError::MutationFailed("volume busy".into())),
    );
    let (last, out) = run(exec.clone(), "2\nH1\nH2\nD\nadmin\nsecret\n15000\nyes\nn\n").await;

    let outcome = last.unwrap();
    assert!(outcome.needs_attention());
    let SessionOutcome::Completed(results) = outcome else {
        panic!("expected completed rollout");
    };
    assert!(!results[0].is_success());
    assert!(results[1].is_success());
    assert_eq!(exec.resize_calls().len(), 2);
    assert!(out.contains("Rollout finished: 1 succeeded, 1 failed."));
}

#[tokio::test]
async fn test_restart_starts_a_fresh_session() {
    let exec = two_hosts();
    let script = "2\nH1\nH2\nD\nadmin\nsecret\n15000\nn\ny\n1\nH1\nD\nadmin\nsecret\n1000\ny\nn\n";
    let (last, _) = run(exec.clone(), script).await;

    let Some(SessionOutcome::Completed(results)) = last else {
        panic!("expected a completed rollout, got {:?}", last);
    };
    assert_eq!(results.len(), 1);
    assert_eq!(exec.resize_calls(), vec![("H1".to_string(), mb(99_000))]);
}

#[tokio::test]
async fn test_invalid_entries_are_prompted_again() {
    let exec = two_hosts();
    let script = "0\nlots\n2\nH1\nh1\nH2\n\nD\n\nadmin\nsecret\n-5\n15000\ny\nn\n";
    let (last, out) = run(exec.clone(), script).await;

    assert!(matches!(last, Some(SessionOutcome::Completed(_))));
    assert_eq!(out.matches("Number of targets").count(), 3);
    assert_eq!(out.matches("Target 2 of 2:").count(), 2);
    assert_eq!(out.matches("Amount to shrink by").count(), 2);
    assert!(out.contains("  ! invalid"));
}

#[tokio::test]
async fn test_end_of_input_stops_without_outcome() {
    let (last, out) = run(two_hosts(), "2\nH1\n").await;
    assert!(last.is_none());
    assert!(!out.contains("Querying"));
}

#[tokio::test]
async fn test_completed_rollout_is_audited() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.db");
    let repo = AuditRepo::connect(path.to_str().unwrap(), 90).await.unwrap();
    repo.init().await.unwrap();
    let repo = Arc::new(repo);

    let orchestrator = Orchestrator::new(two_hosts(), settings(), Some(repo.clone()));
    let mut reader = "2\nH1\nH2\nD\nadmin\nsecret\n15000\ny\nn\n".as_bytes();
    let mut out = Vec::new();
    orchestrator.run_loop(&mut reader, &mut out).await.unwrap();

    let records = repo.recent(10).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].target, "H1");
    assert_eq!(records[0].requested_size, mb(85_000));
    assert!(records.iter().all(|r| r.status == "succeeded"));
}

/// Accepts output until `fail_on` is written, then reports a broken pipe.
struct BrokenOutput {
    buf: Vec<u8>,
    fail_on: &'static str,
}

impl std::io::Write for BrokenOutput {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        if String::from_utf8_lossy(data).contains(self.fail_on) {
            return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"));
        }
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_rollout_is_audited_even_when_output_breaks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.db");
    let repo = AuditRepo::connect(path.to_str().unwrap(), 90).await.unwrap();
    repo.init().await.unwrap();
    let repo = Arc::new(repo);
    let exec = two_hosts();

    let orchestrator = Orchestrator::new(exec.clone(), settings(), Some(repo.clone()));
    let mut reader = "2\nH1\nH2\nD\nadmin\nsecret\n15000\ny\nn\n".as_bytes();
    let mut out = BrokenOutput {
        buf: Vec::new(),
        fail_on: "Rollout finished",
    };
    let result = orchestrator.run_loop(&mut reader, &mut out).await;

    assert!(result.is_err());
    assert_eq!(exec.resize_calls().len(), 2);
    let records = repo.recent(10).await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.status == "succeeded"));
}

#[tokio::test]
async fn test_broken_progress_output_does_not_stop_rollout() {
    let exec = two_hosts();
    let orchestrator = Orchestrator::new(exec.clone(), settings(), None);
    let mut reader = "2\nH1\nH2\nD\nadmin\nsecret\n15000\ny\nn\n".as_bytes();
    let mut out = BrokenOutput {
        buf: Vec::new(),
        fail_on: "shrinking to",
    };
    let last = orchestrator.run_loop(&mut reader, &mut out).await.unwrap();

    let Some(SessionOutcome::Completed(results)) = last else {
        panic!("expected a completed rollout, got {:?}", last);
    };
    assert!(results.iter().all(|r| r.is_success()));
    assert_eq!(exec.resize_calls().len(), 2);
    assert!(String::from_utf8_lossy(&out.buf).contains("Rollout finished: 2 succeeded"));
}
