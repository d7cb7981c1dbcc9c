use std::sync::atomic::{AtomicBool, Ordering};

use libc::c_int;
use log::debug;
use nix::sys::signal::{signal, SigHandler, Signal};

/// Set by the SIGCHLD handler, cleared by the reap drain. The handler does
/// nothing else; all table mutation happens on the main thread.
static CHILD_PENDING: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigchld(_: c_int) {
	CHILD_PENDING.store(true, Ordering::Relaxed);
}

/// Returns whether any SIGCHLD arrived since the last call, clearing the flag.
pub fn take_child_pending() -> bool {
	CHILD_PENDING.swap(false, Ordering::Relaxed)
}

const JOB_CONTROL_SIGNALS: [Signal; 5] = [
	Signal::SIGINT,
	Signal::SIGQUIT,
	Signal::SIGTSTP,
	Signal::SIGTTIN,
	Signal::SIGTTOU,
];

/// Shell-side dispositions: terminal-generated and terminal-I/O signals must
/// only ever reach the foreground child group, and SIGCHLD merely flags the
/// next drain.
pub fn install_shell_handlers() -> nix::Result<()> {
	for sig in JOB_CONTROL_SIGNALS {
		unsafe { signal(sig, SigHandler::SigIgn) }?;
	}
	unsafe { signal(Signal::SIGCHLD, SigHandler::Handler(handle_sigchld)) }?;
	debug!("shell signal dispositions installed");
	Ok(())
}

/// Child-side reset between fork and exec. SIGPIPE is included because the
/// Rust runtime ignores it in the shell and ignored dispositions survive
/// exec; pipeline writers must die of it.
pub fn restore_child_defaults() -> nix::Result<()> {
	for sig in JOB_CONTROL_SIGNALS {
		unsafe { signal(sig, SigHandler::SigDfl) }?;
	}
	unsafe { signal(Signal::SIGCHLD, SigHandler::SigDfl) }?;
	unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) }?;
	Ok(())
}
