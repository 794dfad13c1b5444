#![forbid(unsafe_code)]

//! Shared cursor stylesheet.
//!
//! [`CursorSheet`] is a registry of cursor rules keyed by
//! [`CursorSignature`], similar to a set of CSS classes: every distinct cursor
//! configuration is defined once no matter how many containers use it. The
//! aggregate CSS is written to the host in a single stylesheet node tagged
//! with [`STYLE_MARKER`].
//!
//! # Example
//! ```
//! use keystroke_core::config::CursorConfig;
//! use keystroke_style::CursorSheet;
//!
//! let mut sheet = CursorSheet::new();
//! let a = sheet.define(&CursorConfig::default());
//! let b = sheet.define(&CursorConfig::default());
//! assert_eq!(a, b);
//! assert_eq!(sheet.len(), 1);
//! assert!(sheet.render().starts_with("@keyframes"));
//! ```

use std::collections::BTreeMap;

use keystroke_core::config::CursorConfig;
use keystroke_core::document::{Document, STYLE_MARKER};

use crate::cursor::{BLINK_KEYFRAMES, CursorSignature};

/// Registry of cursor rules, one per distinct signature.
///
/// Each rule counts the containers using it; the rule leaves the sheet when
/// the last of them is released.
#[derive(Debug, Clone, Default)]
pub struct CursorSheet {
    rules: BTreeMap<CursorSignature, Rule>,
}

#[derive(Debug, Clone)]
struct Rule {
    css: String,
    users: usize,
}

impl CursorSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one more user of `cursor`, adding its rule if it is new.
    /// Returns the rule token.
    pub fn define(&mut self, cursor: &CursorConfig) -> String {
        let signature = CursorSignature::from_config(cursor);
        let token = signature.token();
        let rule = self.rules.entry(signature).or_insert_with_key(|sig| Rule {
            css: sig.rule(),
            users: 0,
        });
        rule.users += 1;
        token
    }

    /// Drop one user of `cursor`. Returns `true` if that removed its rule.
    pub fn release(&mut self, cursor: &CursorConfig) -> bool {
        let signature = CursorSignature::from_config(cursor);
        let Some(rule) = self.rules.get_mut(&signature) else {
            return false;
        };
        rule.users = rule.users.saturating_sub(1);
        if rule.users > 0 {
            return false;
        }
        self.rules.remove(&signature);
        true
    }

    /// Number of distinct cursor rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Drop every rule.
    pub fn clear(&mut self) {
        self.rules.clear();
    }

    /// Aggregate CSS: shared keyframes, then each rule in signature order.
    #[must_use]
    pub fn render(&self) -> String {
        let mut css = String::from(BLINK_KEYFRAMES);
        for rule in self.rules.values() {
            css.push('\n');
            css.push_str(&rule.css);
        }
        css.push('\n');
        css
    }
}

/// Create the tagged stylesheet, or replace its content if it exists.
pub fn ensure_stylesheet<D: Document + ?Sized>(doc: &mut D, css: &str) {
    doc.upsert_stylesheet(STYLE_MARKER, css);
}

/// Remove the tagged stylesheet. Returns how many nodes were removed.
pub fn teardown_stylesheet<D: Document + ?Sized>(doc: &mut D) -> usize {
    doc.remove_stylesheets(STYLE_MARKER)
}
