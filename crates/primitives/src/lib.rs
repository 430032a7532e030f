//! Core text primitives shared by the highlighter and the shell.
//!
//! The editing stack is built by composition: a [`TextRegion`] is the minimal
//! editable text abstraction, and higher layers (syntax highlighting, shell
//! boundary enforcement) wrap one region in another, each adding a single
//! capability.

/// Positions that follow edits made elsewhere in a region.
pub mod anchor;
/// Edit errors.
pub mod error;
/// Key event types.
pub mod key;
/// Text range types measured in characters.
pub mod range;
/// Editable text regions.
pub mod region;
/// Rope helpers.
pub mod rope;

pub use anchor::{Anchor, Gravity};
pub use error::{EditError, Result};
pub use key::{Key, KeyCode, Modifiers};
pub use range::{CharIdx, CharLen, Range};
pub use region::{LineDelta, RegionEdit, TextBuffer, TextRegion};
pub use rope::line_text;
pub use ropey::{Rope, RopeSlice};
