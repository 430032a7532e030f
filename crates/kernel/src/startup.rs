use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::Error;

/// Placeholder resolved to the `PYTHONSTARTUP` environment variable.
pub const PYTHONSTARTUP_PLACEHOLDER: &str = "$PYTHONSTARTUP";

/// GUI toolkit whose event loop the kernel integrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GuiToolkit {
	/// No integration.
	#[default]
	None,
	/// Tkinter.
	Tk,
	/// wxPython.
	Wx,
	/// PySide.
	PySide,
	/// PyQt4.
	PyQt4,
	/// FLTK.
	Fltk,
	/// PyGTK.
	Gtk,
}

impl GuiToolkit {
	/// Wire name.
	pub const fn name(self) -> &'static str {
		match self {
			GuiToolkit::None => "NONE",
			GuiToolkit::Tk => "TK",
			GuiToolkit::Wx => "WX",
			GuiToolkit::PySide => "PYSIDE",
			GuiToolkit::PyQt4 => "PYQT4",
			GuiToolkit::Fltk => "FLTK",
			GuiToolkit::Gtk => "GTK",
		}
	}
}

impl fmt::Display for GuiToolkit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for GuiToolkit {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(match s.trim().to_ascii_uppercase().as_str() {
			"" | "NONE" => GuiToolkit::None,
			"TK" => GuiToolkit::Tk,
			"WX" => GuiToolkit::Wx,
			"PYSIDE" => GuiToolkit::PySide,
			"PYQT4" | "QT4" => GuiToolkit::PyQt4,
			"FLTK" => GuiToolkit::Fltk,
			"GTK" => GuiToolkit::Gtk,
			_ => return Err(Error::Protocol(format!("unknown gui toolkit '{s}'"))),
		})
	}
}

impl TryFrom<String> for GuiToolkit {
	type Error = Error;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<GuiToolkit> for String {
	fn from(gui: GuiToolkit) -> Self {
		gui.name().to_owned()
	}
}

/// Startup handshake sent to the kernel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StartupInfo {
	/// Event loop integration.
	pub gui: GuiToolkit,
	/// Script to run as `__main__`.
	pub script_file: Option<String>,
	/// Script run before the first prompt; may be the `$PYTHONSTARTUP` placeholder.
	pub startup_script: Option<String>,
	/// Directory prepended to the module search path.
	pub project_path: Option<String>,
	/// Initial working directory.
	pub start_dir: Option<String>,
}

impl StartupInfo {
	/// Resolves the startup-script placeholder through `env`.
	///
	/// An unset or empty variable clears the startup script.
	pub fn resolve_placeholders(&mut self, env: impl Fn(&str) -> Option<String>) {
		if self.startup_script.as_deref() == Some(PYTHONSTARTUP_PLACEHOLDER) {
			self.startup_script = env("PYTHONSTARTUP").filter(|s| !s.is_empty());
		}
		for field in [&mut self.script_file, &mut self.project_path, &mut self.start_dir] {
			if field.as_deref().is_some_and(str::is_empty) {
				*field = None;
			}
		}
	}
}

/// The kernel's reply: the handshake augmented with interpreter facts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartupReply {
	/// The handshake as the kernel received it.
	#[serde(flatten)]
	pub info: StartupInfo,
	/// Interpreter version, e.g. `[3, 12, 1, "final", 0]`.
	#[serde(default)]
	pub version: JsonValue,
	/// Builtin names.
	#[serde(default)]
	pub builtins: Vec<String>,
	/// Language keywords.
	#[serde(default)]
	pub keywords: Vec<String>,
}

impl StartupReply {
	/// Dotted version string from the leading numeric components.
	pub fn version_string(&self) -> String {
		match &self.version {
			JsonValue::Array(parts) => parts
				.iter()
				.map_while(JsonValue::as_u64)
				.map(|n| n.to_string())
				.collect::<Vec<_>>()
				.join("."),
			JsonValue::String(s) => s.clone(),
			_ => String::new(),
		}
	}
}
