use libc::STDIN_FILENO;
use log::debug;
use nix::sys::termios::{self, SetArg, Termios};
use nix::unistd::{self, Pid};

/// Ownership of the controlling terminal. At most one process group owns it
/// at a time; transitions happen only at foreground entry and exit. When
/// stdin is not a terminal everything here degrades to a no-op and the shell
/// runs as a plain interpreter.
pub struct Terminal {
	shell_pgid: Pid,
	saved: Option<Termios>,
}

impl Terminal {
	/// Puts the shell into its own group, makes that group the foreground
	/// group, and snapshots the line-discipline attributes. The snapshot is
	/// what every later reclamation restores.
	pub fn new() -> Terminal {
		let shell_pgid = unistd::getpid();
		if !unistd::isatty(STDIN_FILENO).unwrap_or(false) {
			debug!("stdin is not a terminal, job control degraded");
			return Terminal { shell_pgid, saved: None };
		}
		if let Err(e) = unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0)) {
			debug!("setpgid(shell): {}", e);
		}
		let saved = match termios::tcgetattr(STDIN_FILENO) {
			Ok(t) => Some(t),
			Err(e) => {
				debug!("tcgetattr: {}", e);
				None
			},
		};
		if let Err(e) = unistd::tcsetpgrp(STDIN_FILENO, shell_pgid) {
			debug!("tcsetpgrp(shell): {}", e);
		}
		Terminal { shell_pgid, saved }
	}

	/// Hands the terminal to a job's group for a foreground run.
	pub fn give(&self, pgid: Pid) {
		if self.saved.is_none() {
			return;
		}
		debug!("terminal -> pgid {}", pgid);
		if let Err(e) = unistd::tcsetpgrp(STDIN_FILENO, pgid) {
			debug!("tcsetpgrp({}): {}", pgid, e);
		}
	}

	/// Takes the terminal back for the shell and restores the startup
	/// attributes, undoing whatever discipline the foreground job left.
	pub fn reclaim(&self) {
		let saved = match &self.saved {
			Some(t) => t,
			None => return,
		};
		debug!("terminal -> shell (pgid {})", self.shell_pgid);
		if let Err(e) = unistd::tcsetpgrp(STDIN_FILENO, self.shell_pgid) {
			debug!("tcsetpgrp(shell): {}", e);
		}
		if let Err(e) = termios::tcsetattr(STDIN_FILENO, SetArg::TCSADRAIN, saved) {
			debug!("tcsetattr: {}", e);
		}
	}
}
