// End-to-end runs of the `pipesh` binary.

use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

fn pipesh(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pipesh"));
    cmd.current_dir(dir).arg("--no-color").env_remove("PS1");
    cmd
}

fn run_c(dir: &Path, line: &str) -> Output {
    pipesh(dir).args(["-c", line]).output().unwrap()
}

fn run_script(dir: &Path, script: &str) -> Output {
    let mut child = pipesh(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(script.as_bytes()).unwrap();
    child.wait_with_output().unwrap()
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[test]
fn plain_command_inherits_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_c(dir.path(), "echo hello world");
    assert!(out.status.success());
    assert_eq!(text(&out.stdout), "hello world\n");
}

#[test]
fn redirection_round_trip() {
    let dir = tempfile::tempdir().unwrap();

    let out = run_c(dir.path(), "echo hello >out.txt");
    assert!(out.status.success());
    assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "hello\n");

    let out = run_c(dir.path(), "cat <out.txt");
    assert_eq!(text(&out.stdout), "hello\n");
}

#[test]
fn pipeline_output() {
    let dir = tempfile::tempdir().unwrap();

    let out = run_c(dir.path(), r#"printf "b\na\nc\n" | sort"#);
    assert_eq!(text(&out.stdout), "a\nb\nc\n");

    let out = run_c(dir.path(), "yes | head -n 3");
    assert_eq!(text(&out.stdout), "y\ny\ny\n");
}

#[test]
fn command_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_c(dir.path(), "nonexistent_cmd_xyz");
    assert_eq!(out.status.code(), Some(127));
    assert!(text(&out.stderr).contains("nonexistent_cmd_xyz: command not found"));
}

#[test]
fn exec_failure_reports_the_os_error() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad");
    fs::write(&bad, [0x7f_u8, 0x00, 0xde, 0xad, 0xbe, 0xef]).unwrap();
    fs::set_permissions(&bad, fs::Permissions::from_mode(0o755)).unwrap();

    let out = run_c(dir.path(), "./bad");
    assert_eq!(out.status.code(), Some(8));
    assert_eq!(text(&out.stderr), "./bad: Exec format error\n");
}

#[test]
fn removed_directory_does_not_stop_later_commands() {
    let dir = tempfile::tempdir().unwrap();
    let gone = dir.path().join("gone");
    fs::create_dir(&gone).unwrap();

    let script = format!("cd gone\n/bin/rmdir {}\n/bin/echo still-alive\n", gone.display());
    let out = run_script(dir.path(), &script);
    assert!(out.status.success());
    assert_eq!(text(&out.stdout), "still-alive\n");
    assert_eq!(text(&out.stderr), "");
}

#[test]
fn syntax_errors_run_nothing() {
    let dir = tempfile::tempdir().unwrap();

    let out = run_c(dir.path(), "echo hi >made.txt | | wc");
    assert_eq!(out.status.code(), Some(2));
    assert!(text(&out.stderr).contains("syntax error"));
    assert!(!dir.path().join("made.txt").exists());

    let out = run_c(dir.path(), r#"echo "open"#);
    assert_eq!(out.status.code(), Some(2));
    assert!(text(&out.stderr).contains("unterminated quote"));
}

#[test]
fn missing_input_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_c(dir.path(), "cat <absent.txt");
    assert_eq!(out.status.code(), Some(1));
    assert!(text(&out.stderr).contains("absent.txt"));
}

#[test]
fn cd_valid_then_invalid() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();

    let out = run_script(dir.path(), "cd sub\npwd\ncd nowhere\npwd\n");
    assert!(out.status.success());

    let sub = dir.path().join("sub").canonicalize().unwrap();
    let expected = format!("{0}\n{0}\n", sub.display());
    assert_eq!(text(&out.stdout), expected);
    assert!(text(&out.stderr).contains("cd: no such file or directory: nowhere"));
}

#[test]
fn exit_stops_reading() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_script(dir.path(), "echo one\nexit\necho two\n");
    assert!(out.status.success());
    assert_eq!(text(&out.stdout), "one\n");
}

#[test]
fn background_returns_control_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let log = File::create(dir.path().join("stdout.log")).unwrap();

    let start = Instant::now();
    let mut child = pipesh(dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::from(log))
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"sleep 2 &\necho after >after.txt\n")
        .unwrap();
    assert!(child.wait().unwrap().success());
    assert!(start.elapsed() < Duration::from_millis(1500));

    assert_eq!(fs::read_to_string(dir.path().join("after.txt")).unwrap(), "after\n");
    let printed = fs::read_to_string(dir.path().join("stdout.log")).unwrap();
    let pid = printed
        .strip_prefix("[1] ")
        .and_then(|rest| rest.lines().next())
        .and_then(|pid| pid.parse::<u32>().ok());
    assert!(pid.is_some(), "no pid in {printed:?}");
}
