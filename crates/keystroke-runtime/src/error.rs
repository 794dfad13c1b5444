#![forbid(unsafe_code)]

//! Engine errors.

use std::fmt;

/// Failure reported by the engine or a program builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Invalid or incomplete configuration, such as a program without a
    /// target or an out-of-range pause.
    Configuration(String),
    /// A selector or container could not be resolved in the document.
    Resolution { selector: String, detail: String },
    /// Operation not valid in the engine's current lifecycle state.
    State(&'static str),
}

impl EngineError {
    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub(crate) fn resolution(selector: impl Into<String>, detail: impl fmt::Display) -> Self {
        Self::Resolution {
            selector: selector.into(),
            detail: detail.to_string(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Self::Resolution { selector, detail } => {
                write!(f, "cannot resolve {selector:?}: {detail}")
            }
            Self::State(msg) => write!(f, "invalid state: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
