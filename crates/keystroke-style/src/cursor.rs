#![forbid(unsafe_code)]

//! Blinking cursor rules.
//!
//! A cursor is drawn as an `::after` pseudo-element on the container. Each
//! distinct cursor configuration gets one rule, addressed through the
//! container attribute [`CURSOR_ATTRIBUTE`] whose value is the signature
//! token.
//!
//! # Example
//! ```
//! use keystroke_core::config::CursorConfig;
//! use keystroke_style::cursor::{CursorSignature, cursor_style};
//!
//! let cursor = CursorConfig::default();
//! let css = cursor_style(&cursor);
//! let token = CursorSignature::from_config(&cursor).token();
//! assert!(css.contains(&token));
//! assert!(css.contains("keystroke-cursor-blink"));
//! ```

use std::fmt::Write as _;

use keystroke_core::config::{CursorConfig, CursorDir, DEFAULT_CURSOR_COLOR};

use crate::color::normalize_color;

/// Container attribute naming the cursor rule that applies to it.
pub const CURSOR_ATTRIBUTE: &str = "data-keystroke-cursor";

/// Name of the shared opacity keyframes.
pub const BLINK_ANIMATION: &str = "keystroke-cursor-blink";

/// Keyframes shared by every blinking cursor rule.
pub const BLINK_KEYFRAMES: &str =
    "@keyframes keystroke-cursor-blink { 0% { opacity: 1; } 100% { opacity: 0; } }";

const FNV64_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV64_PRIME: u64 = 0x100000001b3;

fn fnv1a64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV64_OFFSET_BASIS, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(FNV64_PRIME)
    })
}

/// Canonical identity of a cursor configuration.
///
/// Two configurations that render identically share a signature: colors are
/// normalized and the blink period is quantized to milliseconds. The period
/// is ignored when blinking is off.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CursorSignature {
    dir: CursorDir,
    blink: bool,
    blink_ms: u64,
    color: String,
}

impl CursorSignature {
    #[must_use]
    pub fn from_config(cursor: &CursorConfig) -> Self {
        let blink_ms = if cursor.blink && cursor.blink_time.is_finite() && cursor.blink_time > 0.0
        {
            (cursor.blink_time * 1000.0).round() as u64
        } else {
            0
        };
        Self {
            dir: cursor.dir,
            blink: cursor.blink && blink_ms > 0,
            blink_ms,
            color: normalize_color(&cursor.color)
                .unwrap_or_else(|| DEFAULT_CURSOR_COLOR.to_string()),
        }
    }

    #[must_use]
    pub fn dir(&self) -> CursorDir {
        self.dir
    }

    #[must_use]
    pub fn blinks(&self) -> bool {
        self.blink
    }

    #[must_use]
    pub fn color(&self) -> &str {
        &self.color
    }

    /// Stable attribute-safe token for this signature.
    #[must_use]
    pub fn token(&self) -> String {
        let canonical = format!(
            "{}|{}|{}|{}",
            self.dir.as_str(),
            self.blink,
            self.blink_ms,
            self.color
        );
        format!("c{:016x}", fnv1a64(canonical.as_bytes()))
    }

    /// The CSS rule drawing this cursor.
    #[must_use]
    pub fn rule(&self) -> String {
        let mut css = String::new();
        let _ = writeln!(css, "[{CURSOR_ATTRIBUTE}=\"{}\"]::after {{", self.token());
        css.push_str("  content: \"\";\n  display: inline-block;\n");
        match self.dir {
            CursorDir::Vertical => {
                css.push_str("  width: 2px;\n  height: 1em;\n  margin-left: 2px;\n");
                css.push_str("  vertical-align: text-bottom;\n");
            }
            CursorDir::Horizontal => {
                css.push_str("  width: 0.6em;\n  height: 2px;\n  margin-left: 1px;\n");
                css.push_str("  vertical-align: baseline;\n");
            }
        }
        let _ = writeln!(css, "  background-color: {};", self.color);
        if self.blink {
            let _ = writeln!(
                css,
                "  animation: {BLINK_ANIMATION} {}s ease-in-out infinite alternate;",
                self.blink_ms as f64 / 1000.0
            );
        } else {
            css.push_str("  animation: none;\n");
        }
        css.push('}');
        css
    }
}

/// CSS fragment for one cursor configuration.
#[must_use]
pub fn cursor_style(cursor: &CursorConfig) -> String {
    CursorSignature::from_config(cursor).rule()
}
