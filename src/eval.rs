use std::error;
use std::ffi::{self, CString};
use std::fmt;
use std::io::{self, Write};
use std::os::unix::io::RawFd;

use libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use log::debug;
use nix::fcntl::{self, OFlag};
use nix::sys::signal::{killpg, Signal};
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};

use crate::global::State;
use crate::signals;
use crate::types::{Command, Pipeline, Redirection, Target};

#[derive(Debug)]
pub enum ExecError {
	Nix(nix::Error),
	Nul(ffi::NulError),
	Redirect(String, nix::Error),
}

impl From<nix::Error> for ExecError {
	fn from(e: nix::Error) -> ExecError {
		ExecError::Nix(e)
	}
}

impl From<ffi::NulError> for ExecError {
	fn from(e: ffi::NulError) -> ExecError {
		ExecError::Nul(e)
	}
}

impl fmt::Display for ExecError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			ExecError::Nix(e) => write!(f, "{}", e),
			ExecError::Nul(e) => write!(f, "{}", e),
			ExecError::Redirect(path, e) => write!(f, "{}: {}", path, e),
		}
	}
}

impl error::Error for ExecError {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match self {
			ExecError::Nix(e) => Some(e),
			ExecError::Nul(e) => Some(e),
			ExecError::Redirect(_, e) => Some(e),
		}
	}
}

fn open_input(path: &str) -> Result<(), ExecError> {
	let fd = fcntl::open(path, OFlag::O_RDONLY, Mode::empty())
		.map_err(|e| ExecError::Redirect(path.to_string(), e))?;
	unistd::dup2(fd, STDIN_FILENO)?;
	unistd::close(fd)?;
	Ok(())
}

fn open_output(target: &Target, dest: RawFd) -> Result<(), ExecError> {
	let mut flags = OFlag::O_WRONLY | OFlag::O_CREAT;
	flags |= if target.append { OFlag::O_APPEND } else { OFlag::O_TRUNC };
	let fd = fcntl::open(target.path.as_str(), flags, Mode::from_bits_truncate(0o644))
		.map_err(|e| ExecError::Redirect(target.path.clone(), e))?;
	unistd::dup2(fd, dest)?;
	unistd::close(fd)?;
	Ok(())
}

/// Child-side setup between fork and exec: default signal dispositions,
/// pipe ends onto stdin/stdout, then file redirections. The stdin redirect
/// belongs to the first command (no pipe feeding it), stdout and stderr to
/// the last (no pipe draining it).
fn prepare_child(
	redirection: &Redirection,
	pipe_stdin: Option<RawFd>,
	pipe_stdout: Option<RawFd>,
) -> Result<(), ExecError> {
	signals::restore_child_defaults()?;
	match pipe_stdin {
		Some(fd) => {
			unistd::dup2(fd, STDIN_FILENO)?;
		},
		None => {
			if let Some(path) = &redirection.stdin {
				open_input(path)?;
			}
		},
	}
	if let Some(fd) = pipe_stdout {
		unistd::dup2(fd, STDOUT_FILENO)?;
	} else {
		if let Some(target) = &redirection.stdout {
			open_output(target, STDOUT_FILENO)?;
		}
		if let Some(target) = &redirection.stderr {
			open_output(target, STDERR_FILENO)?;
		}
	}
	Ok(())
}

fn exec_program(command: &Command) -> ExecError {
	let argv: Result<Vec<CString>, ffi::NulError> =
		command.argv.iter().map(|a| CString::new(a.as_str())).collect();
	let argv = match argv {
		Ok(v) => v,
		Err(e) => return ExecError::from(e),
	};
	match unistd::execvp(&argv[0], &argv) {
		Ok(_) => unreachable!(),
		Err(e) => ExecError::from(e),
	}
}

/// Runs in the forked child and never returns to the shell loop. Redirection
/// failures exit 1, exec failures exit 127, both after a diagnostic on the
/// child's stderr.
fn exec_child(
	command: &Command,
	redirection: &Redirection,
	pipe_stdin: Option<RawFd>,
	pipe_stdout: Option<RawFd>,
) -> ! {
	if let Err(e) = prepare_child(redirection, pipe_stdin, pipe_stdout) {
		let _ = writeln!(io::stderr(), "minish: {}", e);
		unsafe { libc::_exit(1) }
	}
	let e = exec_program(command);
	let _ = writeln!(io::stderr(), "minish: {}: {}", command.argv[0], e);
	unsafe { libc::_exit(127) }
}

fn close_pipes(pipes: &[(RawFd, RawFd)]) {
	for &(r, w) in pipes {
		let _ = unistd::close(r);
		let _ = unistd::close(w);
	}
}

/// Forks every member of the pipeline into one fresh process group led by
/// the first child. Pipes are opened close-on-exec, so children leak no
/// descriptors through exec and the parent closes its copies once the loop
/// is done. On fork failure the partial pipeline is abandoned; its children
/// are consumed later by the reap drain and dropped.
fn spawn_pipeline(pipeline: &Pipeline) -> Result<(Pid, Vec<Pid>), ExecError> {
	let n = pipeline.commands.len();
	let mut pipes: Vec<(RawFd, RawFd)> = Vec::with_capacity(n - 1);
	for _ in 1..n {
		match unistd::pipe2(OFlag::O_CLOEXEC) {
			Ok(p) => pipes.push(p),
			Err(e) => {
				close_pipes(&pipes);
				return Err(e.into());
			},
		}
	}

	let mut pgid = Pid::from_raw(0);
	let mut pids: Vec<Pid> = Vec::with_capacity(n);
	for (i, command) in pipeline.commands.iter().enumerate() {
		match unsafe { unistd::fork() } {
			Err(e) => {
				close_pipes(&pipes);
				return Err(e.into());
			},
			Ok(ForkResult::Child) => {
				// both parent and child assign the group to close the fork
				// ordering race
				let _ = unistd::setpgid(Pid::from_raw(0), pgid);
				let pipe_stdin = if i > 0 { Some(pipes[i - 1].0) } else { None };
				let pipe_stdout = if i + 1 < n { Some(pipes[i].1) } else { None };
				exec_child(command, &pipeline.redirection, pipe_stdin, pipe_stdout);
			},
			Ok(ForkResult::Parent { child }) => {
				if pgid.as_raw() == 0 {
					pgid = child;
				}
				let _ = unistd::setpgid(child, pgid);
				pids.push(child);
			},
		}
	}
	close_pipes(&pipes);
	debug!("spawned pipeline pgid {} with {} member(s)", pgid, pids.len());
	Ok((pgid, pids))
}

/// Waits on each member in launch order, retrying interrupted waits. A stop
/// halts that member's wait loop; exit and signal-death end it. Every
/// observation goes through the job table so the reaper and this loop share
/// one classification.
fn wait_members(state: &mut State, pids: &[Pid]) {
	for &pid in pids {
		loop {
			let status = match waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
				Ok(s) => s,
				Err(nix::Error::EINTR) => continue,
				Err(e) => {
					debug!("waitpid({}): {}", pid, e);
					break;
				},
			};
			state.jobs.record(status);
			match status {
				WaitStatus::Exited(..) | WaitStatus::Signaled(..) | WaitStatus::Stopped(..) => break,
				_ => continue,
			}
		}
	}
}

/// Foreground protocol shared by the executor and `fg`: hand the terminal to
/// the job's group, continue it when resuming, wait for every member, then
/// take the terminal back and restore its attributes. The job leaves the
/// table unless a member stopped. `resume` is false only for a freshly
/// spawned pipeline; `fg` always continues the group, which is harmless for
/// a running one and closes the race against a stop the table has not seen.
pub fn run_foreground(state: &mut State, id: u32, resume: bool) {
	let (pgid, pids) = {
		let job = match state.jobs.get_mut(id) {
			Some(j) => j,
			None => return,
		};
		debug!("job [{}] -> foreground (background={}, stopped={})", id, job.background, job.stopped);
		job.background = false;
		(job.pgid, job.pids())
	};
	state.term.give(pgid);
	if resume {
		if let Err(e) = killpg(pgid, Signal::SIGCONT) {
			debug!("SIGCONT pgid {}: {}", pgid, e);
		}
		if let Some(job) = state.jobs.get_mut(id) {
			job.stopped = false;
		}
	}
	wait_members(state, &pids);
	state.term.reclaim();
	if state.jobs.get(id).map_or(false, |j| !j.stopped) {
		state.jobs.remove(id);
	}
}

fn do_eval(state: &mut State, pipeline: &Pipeline) -> Result<u8, ExecError> {
	let (pgid, pids) = spawn_pipeline(pipeline)?;
	let id = state.jobs.register(pgid, &pids, &pipeline.line, pipeline.is_background);
	if pipeline.is_background {
		println!("[{}] {}", id, pgid);
		return Ok(0);
	}
	run_foreground(state, id, false);
	Ok(0)
}

pub fn eval(state: &mut State, pipeline: &Pipeline) -> u8 {
	debug_assert!(!pipeline.commands.is_empty());
	do_eval(state, pipeline).unwrap_or_else(|e| {
		let _ = writeln!(io::stderr(), "minish: {}", e);
		1
	})
}
