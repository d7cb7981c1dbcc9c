use std::env;
use std::path::PathBuf;

use nix::sys::signal::{killpg, Signal};
use nix::unistd;

use crate::eval;
use crate::global::State;

pub type Builtin = fn(&mut State, &[String]) -> u8;

pub fn match_builtin(name: &str) -> Option<Builtin> {
	match name {
		"cd" => Some(builtin_cd),
		"pwd" => Some(builtin_pwd),
		"exit" | "quit" => Some(builtin_exit),
		"jobs" => Some(builtin_jobs),
		"fg" => Some(builtin_fg),
		"bg" => Some(builtin_bg),
		_ => None,
	}
}

fn builtin_cd(_: &mut State, argv: &[String]) -> u8 {
	let dir = match argv.get(1) {
		Some(d) => PathBuf::from(d),
		None => env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("/")),
	};
	match unistd::chdir(&dir) {
		Ok(()) => 0,
		Err(e) => {
			eprintln!("cd: {}: {}", dir.display(), e);
			1
		},
	}
}

fn builtin_pwd(_: &mut State, _: &[String]) -> u8 {
	match unistd::getcwd() {
		Ok(path) => {
			println!("{}", path.display());
			0
		},
		Err(e) => {
			eprintln!("pwd: {}", e);
			1
		},
	}
}

fn builtin_exit(_: &mut State, _: &[String]) -> u8 {
	println!("bye");
	std::process::exit(0);
}

fn builtin_jobs(state: &mut State, _: &[String]) -> u8 {
	state.jobs.reap();
	for job in state.jobs.iter() {
		println!("[{}] {} {} \t{}", job.id, job.pgid, job.state_name(), job.label);
	}
	0
}

/// Accepts `7` and `%7`; anything else is not a job id.
fn parse_job_id(arg: &str) -> Option<u32> {
	let digits = arg.strip_prefix('%').unwrap_or(arg);
	if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	digits.parse().ok()
}

fn builtin_fg(state: &mut State, argv: &[String]) -> u8 {
	let id = match argv.get(1).and_then(|a| parse_job_id(a)) {
		Some(id) => id,
		None => {
			eprintln!("fg: expected a job id");
			return 1;
		},
	};
	if state.jobs.get(id).is_none() {
		eprintln!("fg: no such job: {}", id);
		return 1;
	}
	eval::run_foreground(state, id, true);
	0
}

fn builtin_bg(state: &mut State, argv: &[String]) -> u8 {
	let id = match argv.get(1).and_then(|a| parse_job_id(a)) {
		Some(id) => id,
		None => {
			eprintln!("bg: expected a job id");
			return 1;
		},
	};
	let (jid, pgid) = match state.jobs.get_mut(id) {
		Some(job) => {
			job.stopped = false;
			job.background = true;
			(job.id, job.pgid)
		},
		None => {
			eprintln!("bg: no such job: {}", id);
			return 1;
		},
	};
	if let Err(e) = killpg(pgid, Signal::SIGCONT) {
		eprintln!("bg: {}", e);
		return 1;
	}
	println!("[{}] {}", jid, pgid);
	0
}
