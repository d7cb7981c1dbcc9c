//! Drives the built shell binary through piped stdio. With stdin not a
//! terminal the shell skips the terminal-ownership dance and runs as a plain
//! interpreter, which is exactly what these sessions exercise. Prompts are
//! written to stdout unconditionally, so assertions look for containment,
//! not equality.

use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn shell() -> Command {
	Command::new(env!("CARGO_BIN_EXE_minish"))
}

fn run_script(mut cmd: Command, script: &str) -> Output {
	let mut child = cmd
		.stdin(Stdio::piped())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.spawn()
		.expect("failed to spawn shell");
	child
		.stdin
		.take()
		.unwrap()
		.write_all(script.as_bytes())
		.expect("failed to write script");
	child.wait_with_output().expect("failed to wait for shell")
}

fn stdout_of(output: &Output) -> String {
	String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(output: &Output) -> String {
	String::from_utf8_lossy(&output.stderr).into_owned()
}

fn scratch_dir(tag: &str) -> PathBuf {
	let dir = env::temp_dir().join(format!("minish-{}-{}", tag, std::process::id()));
	let _ = fs::remove_dir_all(&dir);
	fs::create_dir_all(&dir).expect("failed to create scratch dir");
	dir
}

#[test]
fn runs_a_simple_command() {
	let output = run_script(shell(), "echo hello\n");
	assert!(output.status.success());
	assert!(stdout_of(&output).contains("hello\n"));
}

#[test]
fn eof_exits_cleanly() {
	let output = run_script(shell(), "");
	assert!(output.status.success());
	assert!(stdout_of(&output).ends_with("\n"));
}

#[test]
fn exit_says_bye() {
	let output = run_script(shell(), "exit\necho unreachable\n");
	assert!(output.status.success());
	let stdout = stdout_of(&output);
	assert!(stdout.contains("bye\n"));
	assert!(!stdout.contains("unreachable"));
}

#[test]
fn quit_is_an_alias_for_exit() {
	let output = run_script(shell(), "quit\n");
	assert!(output.status.success());
	assert!(stdout_of(&output).contains("bye\n"));
}

#[test]
fn cd_then_pwd_reports_the_new_directory() {
	let dir = scratch_dir("cdpwd");
	let canonical = fs::canonicalize(&dir).unwrap();
	let script = format!("cd {}\npwd\n", dir.display());
	let output = run_script(shell(), &script);
	assert!(stdout_of(&output).contains(&format!("{}\n", canonical.display())));
}

#[test]
fn bare_cd_goes_home() {
	let dir = scratch_dir("home");
	let canonical = fs::canonicalize(&dir).unwrap();
	let mut cmd = shell();
	cmd.env("HOME", &dir);
	let output = run_script(cmd, "cd\npwd\n");
	assert!(stdout_of(&output).contains(&format!("{}\n", canonical.display())));
}

#[test]
fn cd_failure_keeps_the_shell_alive() {
	let output = run_script(shell(), "cd /definitely/not/a/dir\necho still-here\n");
	assert!(stderr_of(&output).contains("cd:"));
	assert!(stdout_of(&output).contains("still-here\n"));
}

#[test]
fn redirection_through_a_pipeline() {
	let dir = scratch_dir("redir");
	fs::write(dir.join("in.txt"), "one\ntwo\nthree\n").unwrap();
	let script = format!("cd {}\ncat < in.txt | wc -l > out.txt\n", dir.display());
	let output = run_script(shell(), &script);
	assert!(output.status.success());
	let out = fs::read_to_string(dir.join("out.txt")).expect("out.txt missing");
	assert_eq!(out.trim(), "3");
}

#[test]
fn append_redirection_accumulates() {
	let dir = scratch_dir("append");
	let script = format!("cd {}\necho one > f\necho two >> f\n", dir.display());
	run_script(shell(), &script);
	assert_eq!(fs::read_to_string(dir.join("f")).unwrap(), "one\ntwo\n");
}

#[test]
fn truncating_redirection_overwrites() {
	let dir = scratch_dir("trunc");
	let script = format!("cd {}\necho long-first-line > f\necho x > f\n", dir.display());
	run_script(shell(), &script);
	assert_eq!(fs::read_to_string(dir.join("f")).unwrap(), "x\n");
}

#[test]
fn stderr_redirection_captures_diagnostics() {
	let dir = scratch_dir("errs");
	let script = format!("cd {}\ncat /definitely/not/a/file 2> errs\n", dir.display());
	let output = run_script(shell(), &script);
	let errs = fs::read_to_string(dir.join("errs")).expect("errs missing");
	assert!(!errs.is_empty());
	assert!(!stderr_of(&output).contains("No such file"));
}

#[test]
fn pipeline_writer_dies_with_its_reader() {
	// `yes` must not survive `head`; the run finishing at all is the point
	let output = run_script(shell(), "yes | head -n 1\n");
	assert!(stdout_of(&output).contains("y\n"));
}

#[test]
fn background_jobs_are_announced_and_listed() {
	let output = run_script(shell(), "sleep 1 &\njobs\n");
	let stdout = stdout_of(&output);
	assert!(stdout.contains("[1] "));
	assert!(stdout.contains("running \tsleep 1 &"));
}

#[test]
fn finished_jobs_leave_the_table() {
	// the foreground true gives the background echo time to exit and raise
	// SIGCHLD before the reap that precedes the jobs listing
	let output = run_script(shell(), "echo bg-done &\nsleep 1\njobs\nexit\n");
	let stdout = stdout_of(&output);
	assert!(stdout.contains("bg-done"));
	assert!(!stdout.contains("running \techo"));
	assert!(!stdout.contains("stopped \techo"));
}

#[test]
fn parse_errors_do_not_kill_the_shell() {
	let output = run_script(shell(), "echo |\necho > \necho ok\n");
	assert!(stderr_of(&output).contains("parse error"));
	assert!(stdout_of(&output).contains("ok\n"));
}

#[test]
fn unknown_commands_report_and_continue() {
	let output = run_script(shell(), "definitely-not-a-command-zzz\necho after\n");
	assert!(stderr_of(&output).contains("definitely-not-a-command-zzz"));
	assert!(stdout_of(&output).contains("after\n"));
}

#[test]
fn fg_and_bg_reject_bad_job_ids() {
	let output = run_script(shell(), "fg 99\nbg nope\nfg\necho ok\n");
	let stderr = stderr_of(&output);
	assert!(stderr.contains("fg: no such job: 99"));
	assert!(stderr.contains("bg: expected a job id"));
	assert!(stderr.contains("fg: expected a job id"));
	assert!(stdout_of(&output).contains("ok\n"));
}

#[test]
fn fg_waits_for_a_background_job() {
	let dir = scratch_dir("fgwait");
	let marker = dir.join("marker");
	let script = format!(
		"sh -c 'sleep 1; echo done > {}' &\nfg 1\ncat {}\n",
		marker.display(),
		marker.display()
	);
	let output = run_script(shell(), &script);
	assert!(stdout_of(&output).contains("done\n"));
}
