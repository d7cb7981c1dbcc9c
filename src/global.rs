use crate::job::JobSet;
use crate::term::Terminal;

/// Process-wide shell state, built once at startup and threaded explicitly
/// into the executor and the built-ins. The only ambient piece is the
/// SIGCHLD flag in `signals`.
pub struct State {
	pub jobs: JobSet,
	pub term: Terminal,
}

impl State {
	pub fn new() -> State {
		State { jobs: JobSet::new(), term: Terminal::new() }
	}
}
