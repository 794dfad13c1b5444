#![forbid(unsafe_code)]

//! The typing engine.
//!
//! [`Engine`] owns the host [`Document`], a deterministic clock and a single
//! timer queue shared by every controller. A controller is either an
//! animation [`Node`] or a scripted [`Program`]; each container is driven by
//! at most one controller at a time.
//!
//! Time only moves when the host calls [`Engine::advance`]. Due timers fire
//! in deadline order (ties in scheduling order) and each controller's next
//! tick is scheduled relative to the deadline that just fired, so playback
//! is identical however the host slices time.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use keystroke_core::document::Document;
//! use keystroke_runtime::Engine;
//! use keystroke_memory::{Element, MemoryDocument};
//!
//! let mut doc = MemoryDocument::new();
//! let hero = doc.insert(Element::new("h1").class("keystroke").text("Hello"));
//!
//! let mut engine = Engine::new(doc);
//! engine.initialize();
//! engine.render(None).unwrap();
//!
//! engine.advance(Duration::from_millis(500));
//! assert_eq!(engine.document().text(hero).as_deref(), Some("Hello"));
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use keystroke_core::config::{Config, ConfigOverride, CursorConfig};
use keystroke_core::document::{ContainerId, Document};
use keystroke_core::timer::{DeterministicClock, TimerId, TimerQueue};
use keystroke_style::{CURSOR_ATTRIBUTE, CursorSheet, ensure_stylesheet, teardown_stylesheet};
use keystroke_text::{SentenceSet, bulk_segment, segment};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, trace, warn};

use crate::error::EngineError;
use crate::node::{Node, NodeEvent, NodeId};
use crate::program::{Action, Program, ProgramBuilder, ProgramId, ProgramState};

const NOT_INITIALIZED: &str = "engine is not initialized";

/// Identity of any controller the engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ControllerId {
    Node(NodeId),
    Program(ProgramId),
}

#[derive(Debug)]
enum Controller {
    Node(Node),
    Program(Program),
}

impl Controller {
    fn cursor(&self) -> &CursorConfig {
        match self {
            Self::Node(node) => &node.config().style.cursor,
            Self::Program(program) => &program.config().style.cursor,
        }
    }
}

/// A container picked up during render, before it becomes a node.
struct Candidate {
    container: ContainerId,
    config: Config,
    sentences: SentenceSet,
}

/// Host-driven typing engine.
pub struct Engine<D: Document> {
    doc: D,
    clock: DeterministicClock,
    timers: TimerQueue<ControllerId>,
    /// Timer each controller is waiting on.
    pending: FxHashMap<ControllerId, TimerId>,
    config: Option<Config>,
    controllers: BTreeMap<ControllerId, Controller>,
    by_container: FxHashMap<ContainerId, ControllerId>,
    drafts: BTreeMap<ProgramId, Program>,
    next_node: u32,
    next_program: u32,
    sheet: CursorSheet,
    diagnostics: Vec<EngineError>,
    events: Vec<NodeEvent>,
}

impl<D: Document + std::fmt::Debug> std::fmt::Debug for Engine<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("doc", &self.doc)
            .field("now", &self.clock.now())
            .field("initialized", &self.config.is_some())
            .field("controllers", &self.controllers.len())
            .field("live_timers", &self.timers.len())
            .finish()
    }
}

impl<D: Document> Engine<D> {
    /// Create an uninitialized engine over `doc`.
    #[must_use]
    pub fn new(doc: D) -> Self {
        Self {
            doc,
            clock: DeterministicClock::new(),
            timers: TimerQueue::new(),
            pending: FxHashMap::default(),
            config: None,
            controllers: BTreeMap::new(),
            by_container: FxHashMap::default(),
            drafts: BTreeMap::new(),
            next_node: 0,
            next_program: 0,
            sheet: CursorSheet::new(),
            diagnostics: Vec::new(),
            events: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Install the default configuration. Calling it again keeps the current
    /// configuration.
    pub fn initialize(&mut self) {
        if self.config.is_none() {
            self.config = Some(Config::default());
            debug!("engine initialized");
        }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    /// Merge `overrides` into the global configuration, then render if
    /// `autoRender` is on. Returns the nodes started by that render.
    pub fn global_config(&mut self, overrides: &ConfigOverride) -> Result<Vec<NodeId>, EngineError> {
        let config = self.config.as_mut().ok_or(EngineError::State(NOT_INITIALIZED))?;
        overrides.apply_to(config);
        if config.auto_render {
            self.render(None)
        } else {
            Ok(Vec::new())
        }
    }

    /// Discover containers and start a node for each new one.
    ///
    /// Resolution order is the default selector query, then `explicit`, then
    /// the configured descriptors. The first registration of a container
    /// wins and containers that already have a controller are skipped.
    /// Descriptor failures are recorded as diagnostics, not returned.
    pub fn render(&mut self, explicit: Option<&[ContainerId]>) -> Result<Vec<NodeId>, EngineError> {
        let config = self.config.clone().ok_or(EngineError::State(NOT_INITIALIZED))?;
        let mut candidates = Vec::new();
        let mut seen = FxHashSet::default();

        if !config.query_selector.trim().is_empty() {
            match self.doc.query_all(&config.query_selector) {
                Ok(found) => {
                    for container in found {
                        self.collect(&mut candidates, &mut seen, container, config.for_target(), &[]);
                    }
                }
                Err(err) => self.diagnose(EngineError::resolution(&config.query_selector, err)),
            }
        }

        for &container in explicit.unwrap_or_default() {
            if self.doc.text(container).is_none() {
                self.diagnose(EngineError::resolution(
                    container.to_string(),
                    "container is not in the document",
                ));
                continue;
            }
            self.collect(&mut candidates, &mut seen, container, config.for_target(), &[]);
        }

        for descriptor in &config.nodes {
            if descriptor.select.trim().is_empty() {
                self.diagnose(EngineError::configuration("node descriptor has no selector"));
                continue;
            }
            let container = match self.doc.query_one(&descriptor.select) {
                Ok(Some(container)) => container,
                Ok(None) => {
                    self.diagnose(EngineError::resolution(
                        &descriptor.select,
                        "no matching container",
                    ));
                    continue;
                }
                Err(err) => {
                    self.diagnose(EngineError::resolution(&descriptor.select, err));
                    continue;
                }
            };
            let mut target = config.for_target();
            if let Some(patch) = &descriptor.config {
                patch.apply_to(&mut target);
                target.nodes.clear();
            }
            self.collect(&mut candidates, &mut seen, container, target, &descriptor.words);
        }

        let mut started = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let id = NodeId(self.next_node);
            self.next_node += 1;
            let name = self
                .doc
                .attribute(candidate.container, "id")
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| id.to_string());
            let token = self.sheet.define(&candidate.config.style.cursor);
            self.doc.set_attribute(candidate.container, CURSOR_ATTRIBUTE, &token);
            let node = Node::new(id, name, candidate.container, candidate.config, candidate.sentences);
            let key = ControllerId::Node(id);
            self.by_container.insert(candidate.container, key);
            self.controllers.insert(key, Controller::Node(node));
            started.push(id);
        }
        ensure_stylesheet(&mut self.doc, &self.sheet.render());

        for &id in &started {
            self.start_controller(ControllerId::Node(id));
        }
        info!(nodes = started.len(), total = self.controllers.len(), "render complete");
        Ok(started)
    }

    fn collect(
        &self,
        candidates: &mut Vec<Candidate>,
        seen: &mut FxHashSet<ContainerId>,
        container: ContainerId,
        config: Config,
        words: &[String],
    ) {
        if self.by_container.contains_key(&container) || !seen.insert(container) {
            trace!(%container, "container already registered");
            return;
        }
        let own = self.doc.text(container).unwrap_or_default();
        let own = own.trim();
        let sentences = if words.is_empty() {
            SentenceSet::from_sentences((!own.is_empty()).then_some(own))
        } else {
            let first = (!own.is_empty()).then_some(own);
            SentenceSet::from_sentences(first.into_iter().chain(words.iter().map(|w| w.trim())))
        };
        candidates.push(Candidate {
            container,
            config,
            sentences,
        });
    }

    fn diagnose(&mut self, err: EngineError) {
        warn!(error = %err, "skipping target");
        self.diagnostics.push(err);
    }

    /// Cancel every timer, drop all controllers and the stylesheet, and
    /// return to the uninitialized state. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        self.timers.clear();
        self.pending.clear();
        self.controllers.clear();
        self.by_container.clear();
        self.drafts.clear();
        self.next_node = 0;
        self.next_program = 0;
        self.sheet.clear();
        let removed = teardown_stylesheet(&mut self.doc);
        self.diagnostics.clear();
        self.events.clear();
        if self.config.take().is_some() || removed > 0 {
            debug!(stylesheets = removed, "engine destroyed");
        }
    }

    /// Stop and forget the controller driving `container`. Text is left as
    /// is; a cursor rule no other container uses is dropped from the
    /// stylesheet.
    pub fn remove(&mut self, container: ContainerId) -> bool {
        let Some(key) = self.by_container.remove(&container) else {
            return false;
        };
        if self.retire(key) {
            ensure_stylesheet(&mut self.doc, &self.sheet.render());
        }
        debug!(?key, %container, "controller removed");
        true
    }

    /// Cancel and drop a controller. Returns `true` if its cursor rule left
    /// the sheet.
    fn retire(&mut self, key: ControllerId) -> bool {
        self.cancel(key);
        self.controllers
            .remove(&key)
            .is_some_and(|controller| self.sheet.release(controller.cursor()))
    }

    // -----------------------------------------------------------------------
    // Pause / resume
    // -----------------------------------------------------------------------

    /// Pause every node. Returns how many were newly paused.
    pub fn pause_all(&mut self) -> Result<usize, EngineError> {
        self.require_initialized()?;
        Ok(self.nodes_mut().map(Node::pause).filter(|paused| *paused).count())
    }

    /// Pause the node called `name`. Returns whether it was newly paused.
    pub fn pause_named(&mut self, name: &str) -> Result<bool, EngineError> {
        self.require_initialized()?;
        Ok(self
            .nodes_mut()
            .find(|node| node.name() == name)
            .is_some_and(Node::pause))
    }

    /// Resume every paused node. Returns how many were paused.
    pub fn resume_all(&mut self) -> Result<usize, EngineError> {
        self.require_initialized()?;
        let mut resumed = 0;
        let mut parked = Vec::new();
        for node in self.nodes_mut() {
            if node.is_paused() {
                resumed += 1;
                if node.resume() {
                    parked.push(node.id());
                }
            }
        }
        for id in parked {
            self.schedule(ControllerId::Node(id), Duration::ZERO);
        }
        Ok(resumed)
    }

    /// Resume the node called `name`. Resuming a running node does nothing.
    pub fn resume_named(&mut self, name: &str) -> Result<bool, EngineError> {
        self.require_initialized()?;
        let Some(node) = self.nodes_mut().find(|node| node.name() == name) else {
            return Ok(false);
        };
        if !node.is_paused() {
            return Ok(false);
        }
        if node.resume() {
            let id = node.id();
            self.schedule(ControllerId::Node(id), Duration::ZERO);
        }
        Ok(true)
    }

    fn require_initialized(&self) -> Result<(), EngineError> {
        if self.config.is_some() {
            Ok(())
        } else {
            Err(EngineError::State(NOT_INITIALIZED))
        }
    }

    fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.controllers.values_mut().filter_map(|c| match c {
            Controller::Node(node) => Some(node),
            Controller::Program(_) => None,
        })
    }

    // -----------------------------------------------------------------------
    // Programs
    // -----------------------------------------------------------------------

    /// Open a builder for a scripted program.
    pub fn node(&mut self) -> ProgramBuilder<'_, D> {
        ProgramBuilder::new(self)
    }

    pub(crate) fn register_program(
        &mut self,
        container: ContainerId,
        patch: &ConfigOverride,
        actions: &[Action],
        forever: bool,
    ) -> Result<ProgramId, EngineError> {
        let mut config = self.config.as_ref().map_or_else(Config::default, Config::for_target);
        patch.apply_to(&mut config);
        config.nodes.clear();
        let id = ProgramId(self.next_program);
        let program = Program::new(id, container, config, actions, forever)?;
        self.next_program += 1;
        self.drafts.insert(id, program);
        debug!(program = %id, %container, actions = actions.len(), "program registered");
        Ok(id)
    }

    /// Start a registered program. Returns `false` if it is already running
    /// or finished.
    pub fn run_program(&mut self, id: ProgramId) -> Result<bool, EngineError> {
        let Some(program) = self.drafts.remove(&id) else {
            return if self.controllers.contains_key(&ControllerId::Program(id)) {
                Ok(false)
            } else {
                Err(EngineError::State("unknown program"))
            };
        };
        let container = program.container();
        if let Some(previous) = self.by_container.get(&container).copied() {
            debug!(?previous, program = %id, "replacing controller");
            self.retire(previous);
        }
        let token = self.sheet.define(&program.config().style.cursor);
        self.doc.set_attribute(container, CURSOR_ATTRIBUTE, &token);
        ensure_stylesheet(&mut self.doc, &self.sheet.render());

        let key = ControllerId::Program(id);
        self.by_container.insert(container, key);
        self.controllers.insert(key, Controller::Program(program));
        self.start_controller(key);
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    /// Advance the clock by `dt` and fire every timer that became due.
    /// Returns the number of ticks dispatched.
    pub fn advance(&mut self, dt: Duration) -> usize {
        self.clock.advance(dt);
        let now = self.clock.now();
        let mut fired = 0;
        while let Some(due) = self.timers.pop_due(now) {
            if self.pending.get(&due.owner) != Some(&due.id) {
                continue;
            }
            self.pending.remove(&due.owner);
            let next = match self.controllers.get_mut(&due.owner) {
                Some(Controller::Node(node)) => {
                    let next = node.tick(&mut self.doc);
                    self.events.extend(node.drain_events());
                    next
                }
                Some(Controller::Program(program)) => program.tick(&mut self.doc),
                None => None,
            };
            fired += 1;
            if let Some(delay) = next {
                let id = self.timers.schedule(due.deadline, delay, due.owner);
                self.pending.insert(due.owner, id);
            }
        }
        fired
    }

    /// When the next tick is due, or `None` when nothing is scheduled. Hosts
    /// can arm one one-shot wakeup for it and call [`Engine::advance`] with
    /// the difference from [`Engine::now`].
    pub fn next_deadline(&mut self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    fn start_controller(&mut self, key: ControllerId) {
        let next = match self.controllers.get_mut(&key) {
            Some(Controller::Node(node)) => {
                let next = node.start(&mut self.doc);
                self.events.extend(node.drain_events());
                next
            }
            Some(Controller::Program(program)) => program.start(&mut self.doc),
            None => None,
        };
        if let Some(delay) = next {
            self.schedule(key, delay);
        }
    }

    fn schedule(&mut self, key: ControllerId, delay: Duration) {
        self.cancel(key);
        let id = self.timers.schedule(self.clock.now(), delay, key);
        self.pending.insert(key, id);
    }

    fn cancel(&mut self, key: ControllerId) {
        if let Some(id) = self.pending.remove(&key) {
            self.timers.cancel(id);
        }
    }

    // -----------------------------------------------------------------------
    // Segmentation
    // -----------------------------------------------------------------------

    /// Split sentence text into words.
    #[must_use]
    pub fn convert(&self, text: &str) -> Vec<String> {
        segment(text)
    }

    #[must_use]
    pub fn bulk_convert(&self, texts: &[&str]) -> Vec<Vec<String>> {
        bulk_segment(texts)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn document(&self) -> &D {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.doc
    }

    /// Give the document back to the host.
    #[must_use]
    pub fn into_document(self) -> D {
        self.doc
    }

    /// Current global configuration, if initialized.
    #[must_use]
    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Number of scheduled timers.
    #[must_use]
    pub fn live_timers(&self) -> usize {
        self.timers.len()
    }

    /// Number of running or finished controllers (drafts excluded).
    #[must_use]
    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    /// Non-fatal resolution problems since the last `destroy()`.
    #[must_use]
    pub fn diagnostics(&self) -> &[EngineError] {
        &self.diagnostics
    }

    /// Drain node events collected since the last call.
    pub fn drain_events(&mut self) -> Vec<NodeEvent> {
        std::mem::take(&mut self.events)
    }

    /// All nodes, in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.controllers.values().filter_map(|c| match c {
            Controller::Node(node) => Some(node),
            Controller::Program(_) => None,
        })
    }

    #[must_use]
    pub fn node_named(&self, name: &str) -> Option<&Node> {
        self.nodes().find(|node| node.name() == name)
    }

    /// Running or finished program.
    #[must_use]
    pub fn program(&self, id: ProgramId) -> Option<&Program> {
        match self.controllers.get(&ControllerId::Program(id)) {
            Some(Controller::Program(program)) => Some(program),
            _ => self.drafts.get(&id),
        }
    }

    #[must_use]
    pub fn program_state(&self, id: ProgramId) -> Option<ProgramState> {
        self.program(id).map(Program::state)
    }

    /// Controller currently driving `container`.
    #[must_use]
    pub fn controller_for(&self, container: ContainerId) -> Option<ControllerId> {
        self.by_container.get(&container).copied()
    }

    /// Number of distinct cursor rules in the stylesheet.
    #[must_use]
    pub fn cursor_rules(&self) -> usize {
        self.sheet.len()
    }
}
