//! Behaviour of the background command waiter.

use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use rstest::rstest;
use tempfile::TempDir;

use nodectl_os::{CommandError, ManagedProcess, start_command, wait_for_command};

const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

fn start(dir: &TempDir, program: &str, args: &[&str]) -> ManagedProcess {
    let args: Vec<String> = args.iter().map(|arg| (*arg).to_owned()).collect();
    start_command(&dir.path().join("process.log"), program, &args).expect("command starts")
}

#[rstest]
fn sends_ok_when_the_process_exits_cleanly() {
    let dir = TempDir::new().expect("temp dir");
    let process = start(&dir, "ls", &[]);

    let outcome = wait_for_command(&process)
        .recv_timeout(RECEIVE_TIMEOUT)
        .expect("waiter reports exit");

    assert!(outcome.is_ok(), "unexpected outcome: {outcome:?}");
}

#[rstest]
fn sends_an_error_when_the_process_fails() {
    let dir = TempDir::new().expect("temp dir");
    let process = start(&dir, "sh", &["-c", "exit 3"]);

    let outcome = wait_for_command(&process)
        .recv_timeout(RECEIVE_TIMEOUT)
        .expect("waiter reports exit");

    match outcome {
        Err(CommandError::Failed { status, .. }) => assert_eq!(status.code(), Some(3)),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[rstest]
fn returns_before_the_process_exits() {
    let dir = TempDir::new().expect("temp dir");
    let process = start(&dir, "sleep", &["5"]);

    let receiver = wait_for_command(&process);
    assert!(matches!(
        receiver.recv_timeout(Duration::from_millis(100)),
        Err(RecvTimeoutError::Timeout)
    ));

    process.kill().expect("kill sleeping process");
    let outcome = receiver
        .recv_timeout(RECEIVE_TIMEOUT)
        .expect("waiter reports exit after kill");
    assert!(outcome.is_err(), "killed process must not report success");
}

#[rstest]
fn delivers_exactly_one_value() {
    let dir = TempDir::new().expect("temp dir");
    let process = start(&dir, "true", &[]);

    let receiver = wait_for_command(&process);
    receiver
        .recv_timeout(RECEIVE_TIMEOUT)
        .expect("first value arrives");
    assert!(matches!(
        receiver.recv_timeout(Duration::from_millis(200)),
        Err(RecvTimeoutError::Disconnected)
    ));
}

#[rstest]
fn start_command_appends_to_the_log() {
    let dir = TempDir::new().expect("temp dir");
    for word in ["first", "second"] {
        let process = start(&dir, "echo", &[word]);
        wait_for_command(&process)
            .recv_timeout(RECEIVE_TIMEOUT)
            .expect("waiter reports exit")
            .expect("echo succeeds");
    }

    let log = std::fs::read_to_string(dir.path().join("process.log")).expect("read log");
    assert_eq!(log, "first\nsecond\n");
}
