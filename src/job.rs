use log::debug;
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::signals;

/// One observed child transition. The foreground wait loops and the SIGCHLD
/// drain both classify raw wait statuses through this.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ChildEvent {
	Exited(i32),
	Signaled(Signal),
	Stopped(Signal),
	Continued,
}

pub trait WaitStatusExt {
	fn target_pid(&self) -> Option<Pid>;
	fn event(&self) -> Option<ChildEvent>;
}

impl WaitStatusExt for WaitStatus {
	fn target_pid(&self) -> Option<Pid> {
		match *self {
			WaitStatus::Exited(pid, _) => Some(pid),
			WaitStatus::Signaled(pid, ..) => Some(pid),
			WaitStatus::Stopped(pid, _) => Some(pid),
			WaitStatus::Continued(pid) => Some(pid),
			_ => None,
		}
	}

	fn event(&self) -> Option<ChildEvent> {
		match *self {
			WaitStatus::Exited(_, code) => Some(ChildEvent::Exited(code)),
			WaitStatus::Signaled(_, sig, _) => Some(ChildEvent::Signaled(sig)),
			WaitStatus::Stopped(_, sig) => Some(ChildEvent::Stopped(sig)),
			WaitStatus::Continued(_) => Some(ChildEvent::Continued),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Process {
	pub pid: Pid,
	pub alive: bool,
}

#[derive(Debug)]
pub struct Job {
	pub id: u32,
	pub pgid: Pid,
	pub label: String,
	pub stopped: bool,
	pub background: bool,
	pub processes: Vec<Process>,
}

impl Job {
	pub fn state_name(&self) -> &'static str {
		if self.stopped { "stopped" } else { "running" }
	}

	pub fn has_live_member(&self) -> bool {
		self.processes.iter().any(|p| p.alive)
	}

	pub fn pids(&self) -> Vec<Pid> {
		self.processes.iter().map(|p| p.pid).collect()
	}
}

/// The job table. Ids are handed out monotonically from 1 and never reused;
/// jobs stay listed across stop/continue and leave only once every member
/// has been observed terminated.
#[derive(Debug)]
pub struct JobSet {
	jobs: Vec<Job>,
	next_id: u32,
}

impl JobSet {
	pub fn new() -> JobSet {
		JobSet { jobs: vec![], next_id: 1 }
	}

	pub fn register(&mut self, pgid: Pid, pids: &[Pid], label: &str, background: bool) -> u32 {
		let id = self.next_id;
		self.next_id += 1;
		self.jobs.push(Job {
			id,
			pgid,
			label: label.to_string(),
			stopped: false,
			background,
			processes: pids.iter().map(|&pid| Process { pid, alive: true }).collect(),
		});
		debug!("registered job [{}] pgid {} ({} member(s))", id, pgid, pids.len());
		id
	}

	pub fn get(&self, id: u32) -> Option<&Job> {
		self.jobs.iter().find(|j| j.id == id)
	}

	pub fn get_mut(&mut self, id: u32) -> Option<&mut Job> {
		self.jobs.iter_mut().find(|j| j.id == id)
	}

	pub fn iter(&self) -> std::slice::Iter<'_, Job> {
		self.jobs.iter()
	}

	pub fn remove(&mut self, id: u32) {
		self.jobs.retain(|j| j.id != id);
	}

	/// Applies one wait status to the member it names. Statuses for pids no
	/// job knows (abandoned partial pipelines) are dropped.
	pub fn record(&mut self, status: WaitStatus) {
		let (pid, event) = match (status.target_pid(), status.event()) {
			(Some(pid), Some(event)) => (pid, event),
			_ => return,
		};
		for job in &mut self.jobs {
			let member = match job.processes.iter().position(|p| p.pid == pid) {
				Some(i) => i,
				None => continue,
			};
			match event {
				ChildEvent::Exited(_) | ChildEvent::Signaled(_) => job.processes[member].alive = false,
				ChildEvent::Stopped(_) => job.stopped = true,
				ChildEvent::Continued => job.stopped = false,
			}
			debug!("job [{}]: pid {} -> {:?}", job.id, pid, event);
			return;
		}
		debug!("dropped status for unknown pid {}", pid);
	}

	/// Drains every pending child transition without blocking and brings the
	/// table up to date. Runs only at quiescent points: the top of the
	/// interactive loop and ahead of `jobs` output.
	pub fn reap(&mut self) {
		if !signals::take_child_pending() {
			return;
		}
		let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
		loop {
			match waitpid(None, Some(flags)) {
				Ok(WaitStatus::StillAlive) => break,
				Ok(status) => self.record(status),
				Err(nix::Error::EINTR) => continue,
				Err(nix::Error::ECHILD) => break,
				Err(e) => {
					debug!("waitpid: {}", e);
					break;
				},
			}
		}
		self.sweep();
	}

	/// Forgets jobs with no surviving member.
	pub fn sweep(&mut self) {
		self.jobs.retain(|job| {
			if !job.has_live_member() {
				debug!("job [{}] finished, removing", job.id);
				return false;
			}
			true
		});
	}
}
