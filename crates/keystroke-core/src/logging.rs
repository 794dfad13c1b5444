#![forbid(unsafe_code)]

//! Logging support.
//!
//! With the `tracing` feature the crate-internal log macros forward to
//! `tracing`. Without it they expand to nothing, so call sites never need
//! their own `cfg` guards.

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, trace};

#[cfg(not(feature = "tracing"))]
mod noop_macros {
    /// No-op debug macro when tracing is disabled.
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    /// No-op trace macro when tracing is disabled.
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    pub(crate) use {debug, trace};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use noop_macros::{debug, trace};
