//! GUI event-loop integration.
//!
//! When the kernel integrates a GUI toolkit, the front end gives that
//! toolkit's event loop a turn once per poll tick. The toolkit bindings live
//! outside this crate; they plug in through [`EventPump`].

use kiln_kernel::GuiToolkit;

/// Runs one round of a toolkit's pending events.
pub trait EventPump: Send {
	/// The toolkit this pump drives.
	fn toolkit(&self) -> GuiToolkit;

	/// Processes pending events without blocking.
	fn process_events(&mut self);
}

/// Pump for sessions without GUI integration.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPump;

impl EventPump for NoPump {
	fn toolkit(&self) -> GuiToolkit {
		GuiToolkit::None
	}

	fn process_events(&mut self) {}
}
