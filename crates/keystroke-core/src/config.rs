#![forbid(unsafe_code)]

//! Typing configuration and recursive partial overrides.
//!
//! [`Config`] is the fully-populated configuration owned by every animated
//! target. [`ConfigOverride`] mirrors its shape with every field optional and
//! is overlaid onto a config with [`merge_into`].
//!
//! # Invariants
//!
//! 1. A leaf present in the override replaces the target leaf.
//! 2. A leaf absent from the override leaves the target untouched.
//! 3. List-valued fields (`nodes`, descriptor `words`) are replaced wholesale,
//!    never merged element-wise.
//! 4. [`clone_default`] always returns a fresh, independent value.
//!
//! # Example
//! ```
//! use keystroke_core::config::{clone_default, merge_into, ConfigOverride, SpeedOverride};
//!
//! let mut config = clone_default();
//! let patch = ConfigOverride {
//!     speed: Some(SpeedOverride { write: Some(4.0), erase: None }),
//!     ..ConfigOverride::default()
//! };
//! merge_into(&mut config, &patch);
//! assert_eq!(config.speed.write, 4.0);
//! assert_eq!(config.speed.erase, 20.0);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default characters per second while writing.
pub const DEFAULT_WRITE_SPEED: f64 = 10.0;
/// Default characters per second while erasing.
pub const DEFAULT_ERASE_SPEED: f64 = 20.0;
/// Default hold time between a written scene and its erasure, in seconds.
pub const DEFAULT_DELAY: f64 = 3.0;
/// Default cursor blink period, in seconds.
pub const DEFAULT_BLINK_TIME: f64 = 1.0;
/// Default cursor color.
pub const DEFAULT_CURSOR_COLOR: &str = "#000000";
/// Selector used to discover containers when none is configured.
pub const DEFAULT_QUERY_SELECTOR: &str = ".keystroke";

/// Base time unit of the speed mapping: `interval_ms = BASE_UNIT_MS / speed`.
pub const BASE_UNIT_MS: f64 = 1000.0;

/// Shortest interval a tick can be scheduled at.
pub const MIN_TICK: Duration = Duration::from_micros(1);

/// Tick interval for a speed in characters per second.
///
/// Larger speeds give shorter intervals, never below [`MIN_TICK`]. Non-finite
/// or non-positive speeds fall back to [`DEFAULT_WRITE_SPEED`].
#[must_use]
pub fn tick_interval(speed: f64) -> Duration {
    let speed = if speed.is_finite() && speed > 0.0 {
        speed
    } else {
        DEFAULT_WRITE_SPEED
    };
    Duration::try_from_secs_f64(BASE_UNIT_MS / speed / 1000.0)
        .unwrap_or(MIN_TICK)
        .max(MIN_TICK)
}

/// Convert a duration in (fractional) seconds, clamping invalid input to zero.
#[must_use]
pub fn seconds(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

/// Typing and erasing speeds, in characters per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Speed {
    pub write: f64,
    pub erase: f64,
}

impl Speed {
    /// Interval between two written characters.
    #[must_use]
    pub fn write_interval(&self) -> Duration {
        tick_interval(self.write)
    }

    /// Interval between two erased characters.
    #[must_use]
    pub fn erase_interval(&self) -> Duration {
        tick_interval(self.erase)
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self {
            write: DEFAULT_WRITE_SPEED,
            erase: DEFAULT_ERASE_SPEED,
        }
    }
}

/// Cursor orientation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CursorDir {
    /// Underline caret below the text baseline.
    Horizontal,
    /// Bar after the last character.
    #[default]
    Vertical,
}

impl CursorDir {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
        }
    }
}

/// Visual cursor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorConfig {
    pub blink: bool,
    /// Blink period in seconds.
    pub blink_time: f64,
    pub dir: CursorDir,
    pub color: String,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            blink: true,
            blink_time: DEFAULT_BLINK_TIME,
            dir: CursorDir::Vertical,
            color: DEFAULT_CURSOR_COLOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StyleConfig {
    pub cursor: CursorConfig,
}

/// Declarative target: a selector, extra sentences, and a per-target override.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// Single-result selector for the container.
    pub select: String,
    /// Sentences typed after the container's own text.
    #[serde(default)]
    pub words: Vec<String>,
    /// Override applied on top of the global configuration.
    #[serde(default)]
    pub config: Option<ConfigOverride>,
}

impl NodeDescriptor {
    /// Descriptor with no extra words and no override.
    #[must_use]
    pub fn new(select: impl Into<String>) -> Self {
        Self {
            select: select.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.words = words.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn config(mut self, config: ConfigOverride) -> Self {
        self.config = Some(config);
        self
    }
}

/// Fully-populated typing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub speed: Speed,
    /// Seconds a fully written scene stays visible before erasing.
    pub delay: f64,
    pub style: StyleConfig,
    /// Rotate through scenes forever instead of stopping after the last one.
    #[serde(rename = "loop")]
    pub repeat: bool,
    /// Keep the last scene on screen when not looping.
    pub hold: bool,
    /// Render automatically whenever the global configuration changes.
    pub auto_render: bool,
    /// Selector used to discover containers during render.
    pub query_selector: String,
    /// Declarative targets resolved during render.
    pub nodes: Vec<NodeDescriptor>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            speed: Speed::default(),
            delay: DEFAULT_DELAY,
            style: StyleConfig::default(),
            repeat: true,
            hold: false,
            auto_render: true,
            query_selector: DEFAULT_QUERY_SELECTOR.to_string(),
            nodes: Vec::new(),
        }
    }
}

impl Config {
    /// Hold time between a written scene and its erasure.
    #[must_use]
    pub fn delay(&self) -> Duration {
        seconds(self.delay)
    }

    /// Copy of this config for a single target, without descriptor lists.
    #[must_use]
    pub fn for_target(&self) -> Self {
        Self {
            nodes: Vec::new(),
            ..self.clone()
        }
    }
}

/// A full, independent copy of the default configuration template.
#[must_use]
pub fn clone_default() -> Config {
    Config::default()
}

/// Overlay `patch` onto `target` in place.
pub fn merge_into(target: &mut Config, patch: &ConfigOverride) {
    patch.apply_to(target);
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpeedOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erase: Option<f64>,
}

impl SpeedOverride {
    fn apply_to(&self, target: &mut Speed) {
        if let Some(write) = self.write {
            target.write = write;
        }
        if let Some(erase) = self.erase {
            target.erase = erase;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blink: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blink_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<CursorDir>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CursorOverride {
    fn apply_to(&self, target: &mut CursorConfig) {
        if let Some(blink) = self.blink {
            target.blink = blink;
        }
        if let Some(blink_time) = self.blink_time {
            target.blink_time = blink_time;
        }
        if let Some(dir) = self.dir {
            target.dir = dir;
        }
        if let Some(color) = &self.color {
            target.color.clone_from(color);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StyleOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<CursorOverride>,
}

/// Partial configuration. Every field is optional; see [`merge_into`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<SpeedOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleOverride>,
    #[serde(default, rename = "loop", skip_serializing_if = "Option::is_none")]
    pub repeat: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_render: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<NodeDescriptor>>,
}

impl ConfigOverride {
    /// Overlay this override onto `target`.
    pub fn apply_to(&self, target: &mut Config) {
        if let Some(speed) = &self.speed {
            speed.apply_to(&mut target.speed);
        }
        if let Some(delay) = self.delay {
            target.delay = delay;
        }
        if let Some(cursor) = self.style.as_ref().and_then(|s| s.cursor.as_ref()) {
            cursor.apply_to(&mut target.style.cursor);
        }
        if let Some(repeat) = self.repeat {
            target.repeat = repeat;
        }
        if let Some(hold) = self.hold {
            target.hold = hold;
        }
        if let Some(auto_render) = self.auto_render {
            target.auto_render = auto_render;
        }
        if let Some(selector) = &self.query_selector {
            target.query_selector.clone_from(selector);
        }
        if let Some(nodes) = &self.nodes {
            target.nodes.clone_from(nodes);
        }
    }

    /// Override that sets only the write and erase speeds.
    #[must_use]
    pub fn speed(write: f64, erase: f64) -> Self {
        Self {
            speed: Some(SpeedOverride {
                write: Some(write),
                erase: Some(erase),
            }),
            ..Self::default()
        }
    }

    /// Override that replaces the descriptor list.
    #[must_use]
    pub fn nodes(nodes: Vec<NodeDescriptor>) -> Self {
        Self {
            nodes: Some(nodes),
            ..Self::default()
        }
    }

    /// Whether the override changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_default_is_independent() {
        let mut a = clone_default();
        let b = clone_default();
        a.speed.write = 99.0;
        a.nodes.push(NodeDescriptor::new("#x"));
        assert_eq!(b.speed.write, DEFAULT_WRITE_SPEED);
        assert!(b.nodes.is_empty());
    }

    #[test]
    fn empty_override_is_noop() {
        let mut config = clone_default();
        merge_into(&mut config, &ConfigOverride::default());
        assert_eq!(config, clone_default());
    }

    #[test]
    fn nested_cursor_override_keeps_siblings() {
        let mut config = clone_default();
        let patch = ConfigOverride {
            style: Some(StyleOverride {
                cursor: Some(CursorOverride {
                    dir: Some(CursorDir::Horizontal),
                    ..CursorOverride::default()
                }),
            }),
            ..ConfigOverride::default()
        };
        merge_into(&mut config, &patch);
        assert_eq!(config.style.cursor.dir, CursorDir::Horizontal);
        assert!(config.style.cursor.blink);
        assert_eq!(config.style.cursor.color, DEFAULT_CURSOR_COLOR);
    }

    #[test]
    fn style_without_cursor_is_noop() {
        let mut config = clone_default();
        let patch = ConfigOverride {
            style: Some(StyleOverride::default()),
            ..ConfigOverride::default()
        };
        merge_into(&mut config, &patch);
        assert_eq!(config.style, StyleConfig::default());
    }

    #[test]
    fn nodes_replace_wholesale() {
        let mut config = clone_default();
        config.nodes = vec![NodeDescriptor::new("#a"), NodeDescriptor::new("#b")];
        merge_into(
            &mut config,
            &ConfigOverride::nodes(vec![NodeDescriptor::new("#c")]),
        );
        assert_eq!(config.nodes, vec![NodeDescriptor::new("#c")]);
    }

    #[test]
    fn tick_interval_maps_speed_to_millis() {
        assert_eq!(tick_interval(10.0), Duration::from_millis(100));
        assert_eq!(tick_interval(4.0), Duration::from_millis(250));
        assert_eq!(tick_interval(0.0), tick_interval(DEFAULT_WRITE_SPEED));
        assert_eq!(tick_interval(f64::NAN), tick_interval(DEFAULT_WRITE_SPEED));
        assert_eq!(tick_interval(1e300), MIN_TICK);
    }

    #[test]
    fn seconds_clamps_invalid_input() {
        assert_eq!(seconds(-1.0), Duration::ZERO);
        assert_eq!(seconds(f64::INFINITY), Duration::ZERO);
        assert_eq!(seconds(0.5), Duration::from_millis(500));
    }

    #[test]
    fn for_target_drops_descriptors() {
        let mut config = clone_default();
        config.nodes.push(NodeDescriptor::new("#a"));
        assert!(config.for_target().nodes.is_empty());
    }

    #[test]
    fn deserializes_camel_case_override() {
        let json = r##"{
            "speed": { "write": 3 },
            "loop": false,
            "autoRender": false,
            "style": { "cursor": { "blinkTime": 0.5, "dir": "horizontal" } },
            "nodes": [{ "select": "#head1", "words": ["one", "two"] }]
        }"##;
        let patch: ConfigOverride = serde_json::from_str(json).unwrap();
        let mut config = clone_default();
        merge_into(&mut config, &patch);
        assert_eq!(config.speed.write, 3.0);
        assert_eq!(config.speed.erase, DEFAULT_ERASE_SPEED);
        assert!(!config.repeat);
        assert!(!config.auto_render);
        assert_eq!(config.style.cursor.blink_time, 0.5);
        assert_eq!(config.style.cursor.dir, CursorDir::Horizontal);
        assert_eq!(config.nodes.len(), 1);
        assert_eq!(config.nodes[0].words, vec!["one", "two"]);
        assert!(config.nodes[0].config.is_none());
    }
}
