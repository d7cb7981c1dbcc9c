mod builtin;
mod eval;
mod global;
mod job;
mod parser;
mod signals;
mod term;
mod types;

use std::io;
use std::io::prelude::*;

fn main() {
	env_logger::init();
	if let Err(e) = signals::install_shell_handlers() {
		eprintln!("minish: signal setup: {}", e);
	}
	let mut state = global::State::new();

	let stdin = io::stdin();
	let mut stdin = stdin.lock();
	let mut stdout = io::stdout();
	loop {
		state.jobs.reap();

		let cwd = prompt_cwd();
		let _ = write!(stdout, "mini:{}$ ", cwd);
		let _ = stdout.flush();

		let mut line = String::new();
		match stdin.read_line(&mut line) {
			Ok(0) => {
				println!();
				return;
			},
			Err(e) => {
				eprintln!("minish: read: {}", e);
				continue;
			},
			Ok(_) => {},
		}
		let line = line.trim_end_matches('\n');
		if line.is_empty() {
			continue;
		}

		let pipeline = match parser::parse(line) {
			Ok(Some(p)) => p,
			Ok(None) => continue,
			Err(e) => {
				eprintln!("minish: parse error: {}", e);
				continue;
			},
		};

		// lone built-in with no redirections runs in-process; in any other
		// position the word execs like an external program
		if pipeline.commands.len() == 1 && pipeline.redirection.is_empty() {
			if let Some(func) = builtin::match_builtin(&pipeline.commands[0].argv[0]) {
				func(&mut state, &pipeline.commands[0].argv);
				continue;
			}
		}
		eval::eval(&mut state, &pipeline);
	}
}

fn prompt_cwd() -> String {
	match nix::unistd::getcwd() {
		Ok(path) => path.display().to_string(),
		Err(_) => String::new(),
	}
}
