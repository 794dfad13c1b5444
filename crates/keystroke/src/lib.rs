#![forbid(unsafe_code)]

//! Keystroke public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users. It
//! re-exports common types from internal crates and offers a lightweight
//! prelude for day-to-day usage.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use keystroke::prelude::*;
//!
//! let mut doc = MemoryDocument::new();
//! let title = doc.insert(Element::new("h1").id("title"));
//!
//! let mut engine = Engine::new(doc);
//! engine
//!     .node()
//!     .select("#title")
//!     .config(ConfigOverride::default())
//!     .write("Hello")
//!     .run()?;
//! engine.advance(Duration::from_secs(1));
//! assert_eq!(engine.document().text(title).as_deref(), Some("Hello"));
//! # Ok::<(), keystroke::Error>(())
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use keystroke_core::config::{
    Config, ConfigOverride, CursorConfig, CursorDir, CursorOverride, NodeDescriptor, Speed,
    SpeedOverride, StyleConfig, StyleOverride, clone_default, merge_into,
};
pub use keystroke_core::document::{ContainerId, Document, STYLE_MARKER};
pub use keystroke_core::selector::{Selector, SelectorError};

// --- Text re-exports -------------------------------------------------------

pub use keystroke_text::{Scene, SentenceSet, bulk_segment, segment};

// --- Style re-exports ------------------------------------------------------

pub use keystroke_style::{CURSOR_ATTRIBUTE, CursorSheet, cursor_style};

// --- Runtime re-exports ----------------------------------------------------

pub use keystroke_runtime::{
    Action, ControllerId, Engine, EngineError, Node, NodeEvent, NodeId, NodeState, Process,
    Program, ProgramBuilder, ProgramId, ProgramState,
};

// --- Memory host re-exports ----------------------------------------------

#[cfg(feature = "memory")]
pub use keystroke_memory::{Element, MemoryDocument};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for Keystroke hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Engine configuration, resolution or lifecycle failure.
    Engine(EngineError),
    /// Malformed selector text.
    Selector(SelectorError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine(err) => write!(f, "{err}"),
            Self::Selector(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Engine(err) => Some(err),
            Self::Selector(err) => Some(err),
        }
    }
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

impl From<SelectorError> for Error {
    fn from(err: SelectorError) -> Self {
        Self::Selector(err)
    }
}

/// Standard result type for Keystroke APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Config, ConfigOverride, ContainerId, Document, Engine, Error, NodeDescriptor, NodeState,
        Process, Result,
    };

    #[cfg(feature = "memory")]
    pub use crate::{Element, MemoryDocument};

    pub use crate::{core, runtime, style, text};
}

pub use keystroke_core as core;
pub use keystroke_runtime as runtime;
pub use keystroke_style as style;
pub use keystroke_text as text;
#[cfg(feature = "memory")]
pub use keystroke_memory as memory;
