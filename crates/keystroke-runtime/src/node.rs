#![forbid(unsafe_code)]

//! Animation nodes: rotate a set of sentences in one container.
//!
//! A [`Node`] types the current scene one grapheme per tick, holds it for the
//! configured delay, erases it one grapheme per tick and moves on to the next
//! scene. It never owns a timer itself: [`Node::start`] and [`Node::tick`]
//! return the delay until the next tick and the engine schedules it.
//!
//! # State machine
//!
//! ```text
//! Idle -> Writing -> Pausing -> Erasing -> Writing (next scene)
//!            |                     |
//!            +-> Finished (hold)   +-> Finished (last scene, no loop)
//! ```
//!
//! Pausing is orthogonal: a paused node parks at its next tick and does not
//! ask for another one until resumed.
//!
//! # Invariants
//!
//! 1. At most one tick is outstanding per node.
//! 2. Every state change is reported once as a [`NodeEvent::Transition`].
//! 3. A node with no scenes goes straight to `Finished` and never touches its
//!    container.

use std::fmt;
use std::time::Duration;

use keystroke_core::config::Config;
use keystroke_core::document::{ContainerId, Document};
use keystroke_text::{SentenceSet, pop_grapheme};
use tracing::trace;

/// Engine-local identity of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Playback state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    Idle,
    Writing,
    /// Holding a fully written scene.
    Pausing,
    Erasing,
    Finished,
}

/// Observable milestone of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    Transition {
        node: NodeId,
        from: NodeState,
        to: NodeState,
    },
}

/// One animated container.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    name: String,
    container: ContainerId,
    config: Config,
    sentences: SentenceSet,
    state: NodeState,
    scene: usize,
    word: usize,
    grapheme: usize,
    text: String,
    paused: bool,
    parked: bool,
    events: Vec<NodeEvent>,
}

impl Node {
    #[must_use]
    pub fn new(
        id: NodeId,
        name: impl Into<String>,
        container: ContainerId,
        config: Config,
        sentences: SentenceSet,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            container,
            config,
            sentences,
            state: NodeState::Idle,
            scene: 0,
            word: 0,
            grapheme: 0,
            text: String::new(),
            paused: false,
            parked: false,
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Name used by `pause_named` / `resume_named`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn container(&self) -> ContainerId {
        self.container
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn sentences(&self) -> &SentenceSet {
        &self.sentences
    }

    #[must_use]
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Index of the scene being played.
    #[must_use]
    pub fn scene_index(&self) -> usize {
        self.scene
    }

    /// Text the node last wrote to its container.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether the node is paused and has no tick outstanding.
    #[must_use]
    pub fn is_parked(&self) -> bool {
        self.parked
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == NodeState::Finished
    }

    /// Drain all pending events. Clears the event queue.
    pub fn drain_events(&mut self) -> Vec<NodeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Begin playback. Returns the delay until the first tick.
    pub fn start<D: Document + ?Sized>(&mut self, doc: &mut D) -> Option<Duration> {
        if self.state != NodeState::Idle {
            return None;
        }
        if self.sentences.is_empty() {
            self.transition(NodeState::Finished);
            return None;
        }
        self.text.clear();
        doc.set_text(self.container, &self.text);
        self.scene = 0;
        self.word = 0;
        self.grapheme = 0;
        self.transition(NodeState::Writing);
        Some(self.config.speed.write_interval())
    }

    /// Run one scheduled tick. Returns the delay until the next one, or
    /// `None` when the node parked or finished.
    pub fn tick<D: Document + ?Sized>(&mut self, doc: &mut D) -> Option<Duration> {
        if self.paused {
            self.parked = true;
            trace!(node = %self.id, "parked");
            return None;
        }
        match self.state {
            NodeState::Writing => self.write_step(doc),
            NodeState::Pausing => {
                // The hold lasts exactly `delay`; erasing starts on this tick.
                self.transition(NodeState::Erasing);
                self.erase_step(doc)
            }
            NodeState::Erasing => self.erase_step(doc),
            NodeState::Idle | NodeState::Finished => None,
        }
    }

    /// Request a pause. Returns `false` if already paused or finished.
    pub fn pause(&mut self) -> bool {
        if self.paused || self.is_finished() {
            return false;
        }
        self.paused = true;
        true
    }

    /// Lift a pause. Returns `true` when the node had parked and needs a
    /// fresh tick; a pending tick is otherwise left to fire as scheduled.
    pub fn resume(&mut self) -> bool {
        if !self.paused {
            return false;
        }
        self.paused = false;
        std::mem::take(&mut self.parked)
    }

    fn write_step<D: Document + ?Sized>(&mut self, doc: &mut D) -> Option<Duration> {
        let Some(scene) = self.sentences.get(self.scene) else {
            self.transition(NodeState::Finished);
            return None;
        };
        let total_words = scene.words().len();
        if let Some(word) = scene.word(self.word) {
            if self.grapheme == 0 && self.word > 0 {
                self.text.push(' ');
            }
            if let Some(g) = word.grapheme(self.grapheme) {
                self.text.push_str(g);
            }
            self.grapheme += 1;
            if self.grapheme >= word.len() {
                self.word += 1;
                self.grapheme = 0;
            }
            doc.set_text(self.container, &self.text);
            trace!(node = %self.id, text = %self.text, "write");
        }
        if self.word < total_words {
            return Some(self.config.speed.write_interval());
        }
        let last = self.scene + 1 >= self.sentences.len();
        if self.config.hold && !self.config.repeat && last {
            self.transition(NodeState::Finished);
            return None;
        }
        self.transition(NodeState::Pausing);
        Some(self.config.delay())
    }

    fn erase_step<D: Document + ?Sized>(&mut self, doc: &mut D) -> Option<Duration> {
        if pop_grapheme(&mut self.text).is_some() {
            while self.text.ends_with(' ') {
                self.text.pop();
            }
            doc.set_text(self.container, &self.text);
            trace!(node = %self.id, text = %self.text, "erase");
        }
        if !self.text.is_empty() {
            return Some(self.config.speed.erase_interval());
        }
        let last = self.scene + 1 >= self.sentences.len();
        if !self.config.repeat && last {
            self.transition(NodeState::Finished);
            return None;
        }
        self.scene = self.sentences.next_index(self.scene);
        self.word = 0;
        self.grapheme = 0;
        self.transition(NodeState::Writing);
        Some(self.config.speed.write_interval())
    }

    fn transition(&mut self, to: NodeState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        trace!(node = %self.id, ?from, ?to, "transition");
        self.events.push(NodeEvent::Transition {
            node: self.id,
            from,
            to,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystroke_core::config::ConfigOverride;
    use keystroke_memory::{Element, MemoryDocument};

    fn node_with(sentences: &[&str], patch: ConfigOverride) -> (Node, MemoryDocument) {
        let mut doc = MemoryDocument::new();
        let container = doc.insert(Element::new("p").text("seed"));
        let mut config = Config::default();
        patch.apply_to(&mut config);
        let node = Node::new(
            NodeId(0),
            "n",
            container,
            config,
            SentenceSet::from_sentences(sentences),
        );
        (node, doc)
    }

    fn once() -> ConfigOverride {
        ConfigOverride {
            repeat: Some(false),
            delay: Some(1.0),
            ..ConfigOverride::default()
        }
    }

    /// Drive a node until it stops asking for ticks, recording the text after each one.
    fn run(node: &mut Node, doc: &mut MemoryDocument, max_ticks: usize) -> Vec<String> {
        let mut frames = Vec::new();
        let mut next = node.start(doc);
        while let Some(_delay) = next {
            if frames.len() >= max_ticks {
                break;
            }
            next = node.tick(doc);
            frames.push(node.text().to_string());
        }
        frames
    }

    #[test]
    fn start_clears_container() {
        let (mut node, mut doc) = node_with(&["ab"], once());
        assert_eq!(node.start(&mut doc), Some(Duration::from_millis(100)));
        assert_eq!(doc.text(node.container()).as_deref(), Some(""));
        assert_eq!(node.state(), NodeState::Writing);
    }

    #[test]
    fn empty_node_finishes_without_touching_container() {
        let (mut node, mut doc) = node_with(&[], once());
        assert_eq!(node.start(&mut doc), None);
        assert!(node.is_finished());
        assert_eq!(doc.text(node.container()).as_deref(), Some("seed"));
        assert_eq!(doc.text_writes(), 0);
    }

    #[test]
    fn writes_words_with_single_spaces() {
        let (mut node, mut doc) = node_with(&["ab  c"], once());
        let frames = run(&mut node, &mut doc, 100);
        assert_eq!(frames, ["a", "ab", "ab c", "ab", "a", ""]);
    }

    #[test]
    fn delays_follow_speeds() {
        let (mut node, mut doc) = node_with(&["ab"], once());
        node.start(&mut doc);
        assert_eq!(node.tick(&mut doc), Some(Duration::from_millis(100)));
        assert_eq!(node.tick(&mut doc), Some(Duration::from_secs(1)));
        // The tick ending the hold already erases.
        assert_eq!(node.tick(&mut doc), Some(Duration::from_millis(50)));
        assert_eq!(node.state(), NodeState::Erasing);
        assert_eq!(node.text(), "a");
        assert_eq!(node.tick(&mut doc), None);
        assert!(node.is_finished());
    }

    #[test]
    fn hold_keeps_last_scene() {
        let mut patch = once();
        patch.hold = Some(true);
        let (mut node, mut doc) = node_with(&["hi"], patch);
        run(&mut node, &mut doc, 100);
        assert!(node.is_finished());
        assert_eq!(doc.text(node.container()).as_deref(), Some("hi"));
    }

    #[test]
    fn looping_rotates_scenes() {
        let (mut node, mut doc) = node_with(&["a", "b"], ConfigOverride::default());
        let frames = run(&mut node, &mut doc, 12);
        assert!(frames.contains(&"b".to_string()));
        assert_eq!(node.scene_index(), 0);
        assert!(!node.is_finished());
    }

    #[test]
    fn transitions_reported_once_each() {
        let (mut node, mut doc) = node_with(&["ab"], once());
        run(&mut node, &mut doc, 100);
        let states: Vec<_> = node
            .drain_events()
            .into_iter()
            .map(|NodeEvent::Transition { from, to, .. }| (from, to))
            .collect();
        assert_eq!(
            states,
            vec![
                (NodeState::Idle, NodeState::Writing),
                (NodeState::Writing, NodeState::Pausing),
                (NodeState::Pausing, NodeState::Erasing),
                (NodeState::Erasing, NodeState::Finished),
            ]
        );
        assert!(node.drain_events().is_empty());
    }

    #[test]
    fn paused_node_parks_and_resumes() {
        let (mut node, mut doc) = node_with(&["abc"], once());
        node.start(&mut doc);
        node.tick(&mut doc);
        assert!(node.pause());
        assert!(!node.pause());
        assert_eq!(node.tick(&mut doc), None);
        assert!(node.is_parked());
        assert_eq!(node.text(), "a");
        assert!(node.resume());
        assert!(!node.resume());
        assert!(node.tick(&mut doc).is_some());
        assert_eq!(node.text(), "ab");
    }

    #[test]
    fn resume_before_tick_keeps_pending_tick() {
        let (mut node, mut doc) = node_with(&["abc"], once());
        node.start(&mut doc);
        assert!(node.pause());
        assert!(!node.resume());
        assert!(node.tick(&mut doc).is_some());
        assert_eq!(node.text(), "a");
    }

    #[test]
    fn erases_whole_graphemes() {
        let (mut node, mut doc) = node_with(&["e\u{301}x"], once());
        let frames = run(&mut node, &mut doc, 100);
        assert_eq!(frames[0], "e\u{301}");
        assert!(frames.contains(&"e\u{301}".to_string()));
        assert_eq!(frames.last().map(String::as_str), Some(""));
    }
}
