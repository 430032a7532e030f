//! Shell-local command shorthands.
//!
//! A command typed at the prompt is checked against the magic forms before
//! it is sent. Each form either becomes a Python expression run by the
//! kernel, a control message, or an action for the front end.

use kiln_kernel::{ControlCommand, DebugCommand, DebugState};

/// What a typed command turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MagicOutcome {
	/// Source to send on the input channel.
	Execute(String),
	/// A control message; nothing is sent on the input channel.
	Control(ControlCommand),
	/// Open a file, directory or the file defining an object in the editor.
	Open {
		/// What to open, as typed.
		target: String,
		/// Open every file in a directory.
		directory: bool,
	},
	/// Show a location of the focused debugger frame in the editor.
	Focus {
		/// File of the frame.
		file: String,
		/// One-based line.
		line: u64,
	},
}

/// Help text printed by `?`.
pub const HELP: &str = "\
*magic* commands that are evaluated in the shell, before sending the command to the kernel:
?               - show this message
?X or X?        - print(X.__doc__)
??X or X??      - help(X)
cd              - import os; print(os.getcwd())
cd X            - import os; os.chdir(\"X\"); print(os.getcwd())
ls              - list the current directory
open X          - open file, module, or file that defines X
opendir X       - open all files in directory X
timeit [N] X    - times execution of command X
who             - list variables in current workspace
whos            - list variables plus their class and representation
db start        - start post mortem debugging
db stop         - stop debugging
db up/down      - go up or down the stack frames
db frame X      - go to the Xth stack frame
db where        - print the stack trace and indicate the current stack
db focus        - open the file and show the line of the stack frame";

const TIMEIT_USAGE: &str = "\
Time execution duration, usage:
timeit fun # where fun is a callable
timeit 'expression' # where fun is a callable
timeit 20 fun # tests 20 passes
For more advanced use, see the timeit module.";

const WHO: &str = concat!(
	"print((lambda names: \"Your variables are:\\n\" + \"\".join(",
	"(n if len(n) <= 18 else n[:15] + \"...\").ljust(20) for n in names) ",
	"if names else \"There are no variables defined in this scope.\")",
	"(sorted(n for n in dir() if not n.startswith(\"__\"))))",
);

const WHOS: &str = concat!(
	"print((lambda ns, j: (lambda rows: \"VARIABLE:\".ljust(20) + \"TYPE:\".ljust(20) ",
	"+ \"REPRESENTATION:\\n\" + \"\\n\".join(rows) if rows else ",
	"\"There are no variables defined in this scope.\")",
	"([j(k, 18) + j(type(v).__name__, 18) + j(repr(v), 38) ",
	"for k, v in sorted(ns.items()) if not k.startswith(\"__\")]))",
	"(dict(locals()), lambda t, w: (t if len(t) <= w else t[:w - 3] + \"...\").ljust(w + 2)))",
);

/// Information magic commands may consult.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicContext<'a> {
	/// Current debugger state, if debugging.
	pub debug: Option<&'a DebugState>,
}

/// Rewrites `text` if it is a magic form; otherwise returns it unchanged
/// as [`MagicOutcome::Execute`].
pub fn rewrite(text: &str, cx: MagicContext<'_>) -> MagicOutcome {
	use MagicOutcome::Execute;

	if text == "?" {
		return Execute(print_literal(HELP));
	}
	if let Some(name) = text.strip_prefix("??") {
		return Execute(format!("help({name})"));
	}
	if let Some(name) = text.strip_suffix("??") {
		return Execute(format!("help({name})"));
	}
	if let Some(name) = text.strip_prefix('?') {
		return Execute(format!("print({name}.__doc__)"));
	}
	if let Some(name) = text.strip_suffix('?') {
		return Execute(format!("print({name}.__doc__)"));
	}

	if text == "timeit" {
		return Execute(print_literal(TIMEIT_USAGE));
	}
	if let Some(rest) = text.strip_prefix("timeit ") {
		return Execute(timeit(rest));
	}

	if text == "cd" || (text.starts_with("cd ") && !text.contains('=')) {
		let dir = text[2..].trim();
		return Execute(if dir.is_empty() {
			"import os;print(os.getcwd())".to_owned()
		} else {
			format!("import os;os.chdir({});print(os.getcwd())", py_string(dir))
		});
	}
	if text == "ls" {
		let cmd = if cfg!(windows) { "dir" } else { "ls" };
		return Execute(format!("import os;print(os.popen(\"{cmd}\").read())"));
	}
	if text == "who" {
		return Execute(WHO.to_owned());
	}
	if text == "whos" {
		return Execute(WHOS.to_owned());
	}

	if let Some(target) = text.strip_prefix("open ") {
		return MagicOutcome::Open {
			target: target.trim().to_owned(),
			directory: false,
		};
	}
	if let Some(target) = text.strip_prefix("opendir ") {
		return MagicOutcome::Open {
			target: target.trim().to_owned(),
			directory: true,
		};
	}

	if let Some(db) = text.strip_prefix("db ")
		&& let Some(outcome) = debug_command(db.trim(), cx)
	{
		return outcome;
	}

	Execute(text.to_owned())
}

fn debug_command(sub: &str, cx: MagicContext<'_>) -> Option<MagicOutcome> {
	let command = match sub {
		"start" => DebugCommand::Start,
		"stop" => DebugCommand::Stop,
		"up" => DebugCommand::Up,
		"down" => DebugCommand::Down,
		"where" => DebugCommand::Where,
		"focus" => return Some(focus(cx)),
		_ => {
			let index = sub.strip_prefix("frame ")?.trim().parse().ok()?;
			DebugCommand::Index(index)
		}
	};
	Some(MagicOutcome::Control(ControlCommand::Debug(command)))
}

fn focus(cx: MagicContext<'_>) -> MagicOutcome {
	match cx.debug.and_then(DebugState::current_location) {
		Some((file, line)) => MagicOutcome::Focus {
			file: file.to_owned(),
			line,
		},
		None => MagicOutcome::Execute(print_literal("Not in debug mode.")),
	}
}

fn timeit(rest: &str) -> String {
	let (count, command) = match rest.split_once(' ') {
		Some((n, command)) => match n.parse::<u32>() {
			Ok(n) => (n, command),
			Err(_) => (1, rest),
		},
		None => (1, rest),
	};
	format!(
		"import timeit; t=timeit.Timer({command}); print(str( t.timeit({count})/{count} ) \
		 +\" seconds on average for {count} iterations.\" )"
	)
}

fn print_literal(text: &str) -> String {
	format!("print({})", py_string(text))
}

/// Quotes `text` as a Python string literal.
pub fn py_string(text: &str) -> String {
	let mut out = String::with_capacity(text.len() + 2);
	out.push('"');
	for c in text.chars() {
		match c {
			'\\' => out.push_str("\\\\"),
			'"' => out.push_str("\\\""),
			'\n' => out.push_str("\\n"),
			'\r' => out.push_str("\\r"),
			'\t' => out.push_str("\\t"),
			c => out.push(c),
		}
	}
	out.push('"');
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	fn run(command: &str) -> MagicOutcome {
		rewrite(command, MagicContext::default())
	}

	fn exec(command: &str) -> String {
		match run(command) {
			MagicOutcome::Execute(src) => src,
			other => panic!("expected source for {command:?}, got {other:?}"),
		}
	}

	#[test]
	fn doc_and_help_lookups() {
		assert_eq!(exec("os.path?"), "print(os.path.__doc__)");
		assert_eq!(exec("?os.path"), "print(os.path.__doc__)");
		assert_eq!(exec("len??"), "help(len)");
		assert_eq!(exec("??len"), "help(len)");
		let help = exec("?");
		assert!(help.starts_with("print(\"*magic*"));
		assert!(!help.contains('\n'));
	}

	#[test]
	fn directory_commands() {
		assert_eq!(exec("cd"), "import os;print(os.getcwd())");
		assert_eq!(
			exec("cd /tmp/my dir"),
			"import os;os.chdir(\"/tmp/my dir\");print(os.getcwd())"
		);
		// An assignment to a variable named cd is plain code.
		assert_eq!(exec("cd = 3"), "cd = 3");
		assert!(exec("ls").contains("os.popen"));
	}

	#[test]
	fn timeit_forms() {
		assert!(exec("timeit").starts_with("print(\"Time execution duration"));
		let src = exec("timeit 20 f");
		assert!(src.contains("timeit.Timer(f)"));
		assert!(src.contains("t.timeit(20)/20"));
		let src = exec("timeit 'x + 1'");
		assert!(src.contains("timeit.Timer('x + 1')"));
		assert!(src.contains("t.timeit(1)/1"));
	}

	#[test]
	fn variable_listings_run_remotely() {
		assert!(exec("who").contains("dir()"));
		assert!(exec("whos").contains("locals()"));
	}

	#[test]
	fn debugger_commands_go_to_control() {
		let control = |c| MagicOutcome::Control(ControlCommand::Debug(c));
		assert_eq!(run("db start"), control(DebugCommand::Start));
		assert_eq!(run("db stop"), control(DebugCommand::Stop));
		assert_eq!(run("db up"), control(DebugCommand::Up));
		assert_eq!(run("db down"), control(DebugCommand::Down));
		assert_eq!(run("db where"), control(DebugCommand::Where));
		assert_eq!(run("db frame 2"), control(DebugCommand::Index(2)));
		assert_eq!(exec("db frame x"), "db frame x");
	}

	#[test]
	fn focus_needs_a_debugger() {
		assert_eq!(exec("db focus"), "print(\"Not in debug mode.\")");
		let state = DebugState {
			index: 0,
			frames: vec!["File \"/p/a.py\", line 12, in f".into()],
		};
		let cx = MagicContext { debug: Some(&state) };
		assert_eq!(
			rewrite("db focus", cx),
			MagicOutcome::Focus {
				file: "/p/a.py".into(),
				line: 12
			}
		);
	}

	#[test]
	fn open_forms() {
		assert_eq!(
			run("open os.path"),
			MagicOutcome::Open {
				target: "os.path".into(),
				directory: false
			}
		);
		assert_eq!(
			run("opendir src"),
			MagicOutcome::Open {
				target: "src".into(),
				directory: true
			}
		);
	}

	#[test]
	fn ordinary_code_passes_through() {
		assert_eq!(exec("x = [1, 2]"), "x = [1, 2]");
		assert_eq!(exec(""), "");
		assert_eq!(exec("    return x"), "    return x");
	}

	#[test]
	fn python_literals_are_escaped() {
		assert_eq!(py_string("a\"b\\c\nd"), "\"a\\\"b\\\\c\\nd\"");
	}
}
