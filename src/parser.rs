use crate::types::{Command, Pipeline, Redirection, Target};

pub type ParseResult<T> = Result<T, String>;

fn is_space(c: char) -> bool {
	c == ' ' || c == '\t' || c == '\n'
}

/// Splits a line into words. A backslash escapes the next character, inside
/// quotes or not; single and double quotes open literal runs in which the
/// other quote kind is ordinary; an unterminated quote runs to end of line.
pub fn tokenize(line: &str) -> Vec<String> {
	let mut tokens: Vec<String> = vec![];
	let mut cur = String::new();
	let (mut sq, mut dq, mut esc) = (false, false, false);
	for c in line.chars() {
		if esc {
			cur.push(c);
			esc = false;
			continue;
		}
		match c {
			'\\' => esc = true,
			'\'' if !dq => sq = !sq,
			'"' if !sq => dq = !dq,
			c if is_space(c) && !sq && !dq => {
				if !cur.is_empty() {
					tokens.push(std::mem::take(&mut cur));
				}
			},
			c => cur.push(c),
		}
	}
	if !cur.is_empty() {
		tokens.push(cur);
	}
	tokens
}

fn next_target(it: &mut std::vec::IntoIter<String>, op: &str) -> ParseResult<String> {
	it.next().ok_or_else(|| format!("missing target after '{}'", op))
}

/// Turns a line into a pipeline. `Ok(None)` means the line held no command
/// at all and is to be dropped silently; `Err` carries a diagnostic for the
/// user. Redirections apply pipeline-wide and the last one per channel wins.
pub fn parse(line: &str) -> ParseResult<Option<Pipeline>> {
	let mut segments: Vec<Vec<String>> = vec![vec![]];
	for tok in tokenize(line) {
		if tok == "|" {
			segments.push(vec![]);
		} else {
			segments.last_mut().unwrap().push(tok);
		}
	}

	let mut is_background = false;
	let last = segments.last_mut().unwrap();
	if last.last().map(String::as_str) == Some("&") {
		is_background = true;
		last.pop();
	}

	let piped = segments.len() > 1;
	let mut redirection = Redirection::default();
	let mut commands: Vec<Command> = vec![];
	for segment in segments {
		let mut argv: Vec<String> = vec![];
		let mut it = segment.into_iter();
		while let Some(tok) = it.next() {
			match tok.as_str() {
				"<" => redirection.stdin = Some(next_target(&mut it, "<")?),
				">" | ">>" => {
					redirection.stdout = Some(Target {
						path: next_target(&mut it, &tok)?,
						append: tok == ">>",
					});
				},
				"2>" | "2>>" => {
					redirection.stderr = Some(Target {
						path: next_target(&mut it, &tok)?,
						append: tok == "2>>",
					});
				},
				_ => argv.push(tok),
			}
		}
		if argv.is_empty() {
			if piped {
				return Err("empty command in pipeline".to_string());
			}
			continue;
		}
		commands.push(Command { argv });
	}

	if commands.is_empty() {
		return Ok(None);
	}
	Ok(Some(Pipeline {
		commands,
		redirection,
		is_background,
		line: line.to_string(),
	}))
}
