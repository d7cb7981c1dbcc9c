#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
	pub argv: Vec<String>,
}

/// An output file target, shared by the `>`/`>>` and `2>`/`2>>` forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
	pub path: String,
	pub append: bool,
}

/// Redirection is a property of the pipeline as a whole: stdin applies to
/// the first command, stdout and stderr to the last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redirection {
	pub stdin: Option<String>,
	pub stdout: Option<Target>,
	pub stderr: Option<Target>,
}

impl Redirection {
	pub fn is_empty(&self) -> bool {
		self.stdin.is_none() && self.stdout.is_none() && self.stderr.is_none()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
	pub commands: Vec<Command>,
	pub redirection: Redirection,
	pub is_background: bool,
	/// The input line as typed, kept as the job label.
	pub line: String,
}
