#![forbid(unsafe_code)]

//! Cursor styling for Keystroke.
//!
//! Computes the CSS for blinking cursors and manages the single stylesheet
//! node the engine owns in the host document.

pub mod color;
pub mod cursor;
pub mod stylesheet;

pub use color::{Rgba, normalize_color};
pub use cursor::{
    BLINK_ANIMATION, BLINK_KEYFRAMES, CURSOR_ATTRIBUTE, CursorSignature, cursor_style,
};
pub use stylesheet::{CursorSheet, ensure_stylesheet, teardown_stylesheet};
