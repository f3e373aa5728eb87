//! Unit tests for termination triggers and grace window selection.

use std::time::Duration;

use agent_tether::orchestrator::cleanup::GraceWindows;
use agent_tether::orchestrator::TerminationTrigger;

#[test]
fn remote_kill_is_the_only_remote_trigger() {
    assert!(TerminationTrigger::RemoteKill.is_remote());
    assert!(!TerminationTrigger::ProcessError("x".into()).is_remote());
    assert!(!TerminationTrigger::Fault("x".into()).is_remote());
}

#[test]
fn archive_reasons_are_human_readable() {
    assert_eq!(TerminationTrigger::RemoteKill.archive_reason(), "User terminated");
    assert_eq!(
        TerminationTrigger::ProcessError("x".into()).archive_reason(),
        "Process failed"
    );
    assert_eq!(
        TerminationTrigger::Fault("x".into()).archive_reason(),
        "Internal error"
    );
}

#[test]
fn descriptions_carry_context() {
    assert_eq!(TerminationTrigger::RemoteKill.describe(), "remote kill request");
    assert_eq!(
        TerminationTrigger::ProcessError("binary missing".into()).describe(),
        "process error: binary missing"
    );
    assert_eq!(
        TerminationTrigger::Fault("boom".into()).describe(),
        "local fault: boom"
    );
}

#[cfg(unix)]
#[test]
fn exited_trigger_reports_code_and_reason() {
    let status = std::process::Command::new("sh")
        .args(["-c", "exit 7"])
        .status()
        .expect("run sh");
    let trigger = TerminationTrigger::ProcessExited(status);

    assert_eq!(trigger.describe(), "process exited with code 7");
    assert_eq!(trigger.archive_reason(), "Process exited");
    assert!(!trigger.is_remote());
}

// ── Grace window selection ───────────────────────────────────

#[test]
fn default_windows_keep_the_asymmetry() {
    let grace = GraceWindows::default();
    assert_eq!(grace.remote_kill, Duration::from_secs(2));
    assert_eq!(grace.local, Duration::from_secs(1));
}

#[test]
fn remote_triggers_get_the_longer_window() {
    let grace = GraceWindows {
        remote_kill: Duration::from_millis(2000),
        local: Duration::from_millis(1000),
    };
    assert_eq!(
        grace.for_trigger(&TerminationTrigger::RemoteKill),
        Duration::from_millis(2000)
    );
    assert_eq!(
        grace.for_trigger(&TerminationTrigger::ProcessError("x".into())),
        Duration::from_millis(1000)
    );
    assert_eq!(
        grace.for_trigger(&TerminationTrigger::Fault("x".into())),
        Duration::from_millis(1000)
    );
}
