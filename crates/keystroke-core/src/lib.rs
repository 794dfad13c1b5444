#![forbid(unsafe_code)]

//! Core: configuration model, host document contract, selectors, and the
//! deterministic clock and timer queue that drive playback.

pub mod config;
pub mod document;
pub mod logging;
pub mod selector;
pub mod timer;

pub use config::{
    Config, ConfigOverride, CursorConfig, CursorDir, CursorOverride, NodeDescriptor, Speed,
    SpeedOverride, StyleConfig, StyleOverride, MIN_TICK, clone_default, merge_into, seconds,
    tick_interval,
};
pub use document::{ContainerId, Document, STYLE_MARKER};
pub use selector::{ElementView, Selector, SelectorError};
pub use timer::{DeterministicClock, Fired, TimerId, TimerQueue};
