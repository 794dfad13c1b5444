#![forbid(unsafe_code)]

//! Host document contract.
//!
//! The engine never owns visual elements. It talks to whatever hosts them
//! through [`Document`]: locate containers by selector, read and overwrite
//! their text, tag them with attributes, and manage one marked stylesheet in
//! the document head.

use std::fmt;

use crate::selector::SelectorError;

/// Attribute that tags the engine's stylesheet node in the document head.
pub const STYLE_MARKER: &str = "keystroke-styles";

/// Opaque handle to a container element inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(pub u32);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container#{}", self.0)
    }
}

/// Addressable host of text containers and a head stylesheet slot.
pub trait Document {
    /// All containers matching `selector`, in document order.
    fn query_all(&self, selector: &str) -> Result<Vec<ContainerId>, SelectorError>;

    /// First container matching `selector`.
    fn query_one(&self, selector: &str) -> Result<Option<ContainerId>, SelectorError> {
        Ok(self.query_all(selector)?.into_iter().next())
    }

    /// Current text content, or `None` for an unknown container.
    fn text(&self, id: ContainerId) -> Option<String>;

    /// Overwrite text content. Returns `false` for an unknown container.
    fn set_text(&mut self, id: ContainerId, text: &str) -> bool;

    fn attribute(&self, id: ContainerId, name: &str) -> Option<String>;

    /// Set an attribute. Returns `false` for an unknown container.
    fn set_attribute(&mut self, id: ContainerId, name: &str, value: &str) -> bool;

    /// Create the stylesheet tagged `marker`, or replace its content if present.
    fn upsert_stylesheet(&mut self, marker: &str, css: &str);

    /// Remove every stylesheet tagged `marker`. Returns how many were removed.
    fn remove_stylesheets(&mut self, marker: &str) -> usize;

    /// Number of stylesheets tagged `marker`.
    fn stylesheet_count(&self, marker: &str) -> usize;

    /// Content of the first stylesheet tagged `marker`.
    fn stylesheet(&self, marker: &str) -> Option<String>;
}
