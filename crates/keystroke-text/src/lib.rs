#![forbid(unsafe_code)]

//! Text handling for Keystroke.
//!
//! This crate turns raw sentences into the units the animation engine types:
//! - [`segment`] / [`bulk_segment`] - whitespace word segmentation
//! - [`Word`] - a word with precomputed grapheme boundaries
//! - [`Scene`] - one sentence as an ordered list of words
//! - [`SentenceSet`] - value-deduplicated scenes in rotation order
//!
//! # Example
//! ```
//! use keystroke_text::{segment, Scene, SentenceSet};
//!
//! assert_eq!(segment("Hello,  world!"), vec!["Hello,", "world!"]);
//!
//! let scene = Scene::from_text("type me");
//! assert_eq!(scene.text(), "type me");
//! assert_eq!(scene.words().len(), 2);
//!
//! let set = SentenceSet::from_sentences(["a b", "a  b", "c"]);
//! assert_eq!(set.len(), 2);
//! ```

pub mod segment;

pub use segment::{
    Scene, SentenceSet, Word, bulk_segment, pop_grapheme, segment, split_graphemes,
};
