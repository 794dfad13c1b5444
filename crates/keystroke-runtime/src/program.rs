#![forbid(unsafe_code)]

//! Scripted typing programs.
//!
//! A program is an ordered list of [`Action`]s played against one container:
//! write text at the cursor, backspace, move the cursor, wait, or clear
//! everything. Actions run strictly in sequence; each one starts when the
//! previous one's last tick has fired.
//!
//! Programs are assembled with a [`ProgramBuilder`] obtained from
//! [`Engine::node`](crate::Engine::node), or from a list of wire-level
//! [`Process`] entries.
//!
//! # Invariants
//!
//! 1. A program starts from an empty container with the cursor at the end.
//! 2. The cursor always stays within `0..=len` of the displayed text.
//! 3. With `forever`, every cycle starts from the same empty state, so cycles
//!    never drift. A cycle in which no action takes time ends the program.

use std::fmt;
use std::time::Duration;

use keystroke_core::config::{Config, ConfigOverride, seconds, tick_interval};
use keystroke_core::document::{ContainerId, Document};
use keystroke_text::split_graphemes;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::engine::Engine;
use crate::error::EngineError;

/// Engine-local identity of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program-{}", self.0)
    }
}

/// One scripted step. Speeds are characters per second; `None` or a
/// non-positive speed uses the program's configured speed.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Write { text: String, speed: Option<f64> },
    /// Remove `count` graphemes from the end of the text.
    Erase { count: usize, speed: Option<f64> },
    /// Move the cursor by `offset` graphemes, one per tick.
    Move { offset: i64, speed: Option<f64> },
    Pause { secs: f64 },
    AllErase { speed: Option<f64> },
}

/// Wire form of one builder call, as supplied by wrapper components.
///
/// ```
/// use keystroke_runtime::Process;
///
/// let steps: Vec<Process> = serde_json::from_str(
///     r#"[{"action":"write","value":"hi","speed":4},{"action":"pause","value":1},{"action":"run"}]"#,
/// ).unwrap();
/// assert_eq!(steps.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Process {
    Write {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        speed: Option<f64>,
    },
    Erase {
        value: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        speed: Option<f64>,
    },
    Move {
        value: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        speed: Option<f64>,
    },
    Pause {
        value: f64,
    },
    AllErase,
    Run,
    Forever {
        #[serde(default)]
        value: bool,
    },
}

/// Lifecycle of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramState {
    /// Built but not started.
    Ready,
    Running,
    Finished,
}

#[derive(Debug, Clone)]
enum Op {
    Write {
        graphemes: Vec<String>,
        interval: Duration,
    },
    Erase {
        count: usize,
        interval: Duration,
    },
    Move {
        offset: i64,
        interval: Duration,
    },
    Pause(Duration),
    AllErase {
        interval: Duration,
    },
}

impl Op {
    fn resolve(action: &Action, config: &Config) -> Result<Self, EngineError> {
        let at = |speed: Option<f64>, fallback: Duration| match speed {
            Some(s) if s.is_finite() && s > 0.0 => tick_interval(s),
            _ => fallback,
        };
        let write = config.speed.write_interval();
        let erase = config.speed.erase_interval();
        Ok(match action {
            Action::Write { text, speed } => Self::Write {
                graphemes: split_graphemes(text),
                interval: at(*speed, write),
            },
            Action::Erase { count, speed } => Self::Erase {
                count: *count,
                interval: at(*speed, erase),
            },
            Action::Move { offset, speed } => Self::Move {
                offset: *offset,
                interval: at(*speed, write),
            },
            Action::Pause { secs } => {
                if !secs.is_finite() || *secs < 0.0 {
                    return Err(EngineError::configuration(format!(
                        "pause must be a non-negative number of seconds, got {secs}"
                    )));
                }
                Self::Pause(seconds(*secs))
            }
            Action::AllErase { speed } => Self::AllErase {
                interval: at(*speed, erase),
            },
        })
    }

    fn interval(&self) -> Duration {
        match self {
            Self::Write { interval, .. }
            | Self::Erase { interval, .. }
            | Self::Move { interval, .. }
            | Self::AllErase { interval } => *interval,
            Self::Pause(d) => *d,
        }
    }
}

/// A resolved program bound to one container.
#[derive(Debug, Clone)]
pub struct Program {
    id: ProgramId,
    container: ContainerId,
    config: Config,
    ops: Vec<Op>,
    forever: bool,
    state: ProgramState,
    pc: usize,
    progress: usize,
    graphemes: Vec<String>,
    cursor: usize,
    timed_in_cycle: bool,
}

impl Program {
    /// Resolve `actions` against `config`.
    pub fn new(
        id: ProgramId,
        container: ContainerId,
        config: Config,
        actions: &[Action],
        forever: bool,
    ) -> Result<Self, EngineError> {
        let ops = actions
            .iter()
            .map(|a| Op::resolve(a, &config))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id,
            container,
            config,
            ops,
            forever,
            state: ProgramState::Ready,
            pc: 0,
            progress: 0,
            graphemes: Vec::new(),
            cursor: 0,
            timed_in_cycle: false,
        })
    }

    #[must_use]
    pub fn id(&self) -> ProgramId {
        self.id
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
    pub fn state(&self) -> ProgramState {
        self.state
    }

    #[must_use]
    pub fn is_forever(&self) -> bool {
        self.forever
    }

    /// Number of scripted actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Text currently displayed.
    #[must_use]
    pub fn text(&self) -> String {
        self.graphemes.concat()
    }

    /// Cursor position in graphemes.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Begin playback from an empty container. Returns the delay until the
    /// first tick, or `None` if the program has nothing to time.
    pub fn start<D: Document + ?Sized>(&mut self, doc: &mut D) -> Option<Duration> {
        if self.state != ProgramState::Ready {
            return None;
        }
        self.state = ProgramState::Running;
        self.reset();
        doc.set_text(self.container, "");
        self.next_delay(doc)
    }

    /// Apply one unit of the current action. Returns the delay until the
    /// next tick, or `None` once the program finished.
    pub fn tick<D: Document + ?Sized>(&mut self, doc: &mut D) -> Option<Duration> {
        if self.state != ProgramState::Running {
            return None;
        }
        if let Some(op) = self.ops.get(self.pc) {
            match op {
                Op::Write { graphemes, .. } => {
                    if let Some(g) = graphemes.get(self.progress) {
                        self.graphemes.insert(self.cursor, g.clone());
                        self.cursor += 1;
                    }
                }
                Op::Erase { .. } | Op::AllErase { .. } => {
                    self.graphemes.pop();
                    self.cursor = self.cursor.min(self.graphemes.len());
                }
                Op::Move { offset, .. } => {
                    if *offset < 0 {
                        self.cursor = self.cursor.saturating_sub(1);
                    } else {
                        self.cursor = (self.cursor + 1).min(self.graphemes.len());
                    }
                }
                Op::Pause(_) => {}
            }
            self.progress += 1;
            doc.set_text(self.container, &self.text());
            trace!(program = %self.id, pc = self.pc, cursor = self.cursor, "program step");
        }
        self.next_delay(doc)
    }

    fn has_unit(&self, op: &Op) -> bool {
        match op {
            Op::Write { graphemes, .. } => self.progress < graphemes.len(),
            Op::Erase { count, .. } => self.progress < *count && !self.graphemes.is_empty(),
            Op::Move { offset, .. } => {
                let steps = usize::try_from(offset.unsigned_abs()).unwrap_or(usize::MAX);
                let room = if *offset < 0 {
                    self.cursor
                } else {
                    self.graphemes.len() - self.cursor
                };
                self.progress < steps && room > 0
            }
            Op::Pause(d) => self.progress == 0 && !d.is_zero(),
            Op::AllErase { .. } => !self.graphemes.is_empty(),
        }
    }

    /// Skip exhausted actions and report when the next unit is due.
    ///
    /// A new `forever` cycle starts from an empty container, exactly like the
    /// first one.
    fn next_delay<D: Document + ?Sized>(&mut self, doc: &mut D) -> Option<Duration> {
        loop {
            let Some(op) = self.ops.get(self.pc) else {
                if self.forever && self.timed_in_cycle {
                    self.pc = 0;
                    self.reset();
                    doc.set_text(self.container, "");
                    trace!(program = %self.id, "program cycle restarted");
                    continue;
                }
                self.state = ProgramState::Finished;
                trace!(program = %self.id, "program finished");
                return None;
            };
            if self.has_unit(op) {
                self.timed_in_cycle = true;
                return Some(op.interval());
            }
            self.pc += 1;
            self.progress = 0;
        }
    }

    fn reset(&mut self) {
        self.graphemes.clear();
        self.cursor = 0;
        self.progress = 0;
        self.timed_in_cycle = false;
    }
}

/// Where a program writes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Selector(String),
    Container(ContainerId),
}

/// Chainable builder for a [`Program`].
///
/// A target and a configuration are required; both are checked when the
/// program is built, before any timer is scheduled.
pub struct ProgramBuilder<'e, D: Document> {
    engine: &'e mut Engine<D>,
    target: Option<Target>,
    config: Option<ConfigOverride>,
    actions: Vec<Action>,
    forever: bool,
}

impl<'e, D: Document> ProgramBuilder<'e, D> {
    pub(crate) fn new(engine: &'e mut Engine<D>) -> Self {
        Self {
            engine,
            target: None,
            config: None,
            actions: Vec::new(),
            forever: false,
        }
    }

    /// Target the first container matching `selector`.
    #[must_use]
    pub fn select(mut self, selector: impl Into<String>) -> Self {
        self.target = Some(Target::Selector(selector.into()));
        self
    }

    /// Target a known container.
    #[must_use]
    pub fn target(mut self, container: ContainerId) -> Self {
        self.target = Some(Target::Container(container));
        self
    }

    /// Configuration overlay for this program. Pass an empty override to use
    /// the engine configuration as is.
    #[must_use]
    pub fn config(mut self, config: ConfigOverride) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn write(self, text: impl Into<String>) -> Self {
        self.push(Action::Write {
            text: text.into(),
            speed: None,
        })
    }

    #[must_use]
    pub fn write_at(self, text: impl Into<String>, speed: f64) -> Self {
        self.push(Action::Write {
            text: text.into(),
            speed: Some(speed),
        })
    }

    /// Remove `count` trailing graphemes; the cursor is clamped to the text.
    #[must_use]
    pub fn erase(self, count: usize) -> Self {
        self.push(Action::Erase { count, speed: None })
    }

    #[must_use]
    pub fn erase_at(self, count: usize, speed: f64) -> Self {
        self.push(Action::Erase {
            count,
            speed: Some(speed),
        })
    }

    /// Move the cursor; negative offsets move left.
    #[must_use]
    pub fn move_by(self, offset: i64) -> Self {
        self.push(Action::Move {
            offset,
            speed: None,
        })
    }

    #[must_use]
    pub fn move_at(self, offset: i64, speed: f64) -> Self {
        self.push(Action::Move {
            offset,
            speed: Some(speed),
        })
    }

    #[must_use]
    pub fn pause(self, secs: f64) -> Self {
        self.push(Action::Pause { secs })
    }

    /// Erase everything, like `erase` with the current length.
    #[must_use]
    pub fn all_erase(self) -> Self {
        self.push(Action::AllErase { speed: None })
    }

    #[must_use]
    pub fn action(self, action: Action) -> Self {
        self.push(action)
    }

    fn push(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Validate and register the program without starting it.
    pub fn build(self) -> Result<ProgramId, EngineError> {
        self.register().map(|(_, id)| id)
    }

    /// Build and start the program.
    pub fn run(self) -> Result<ProgramId, EngineError> {
        let (engine, id) = self.register()?;
        engine.run_program(id)?;
        Ok(id)
    }

    /// Build and start the program, looping it when `repeat` is set.
    pub fn forever(mut self, repeat: bool) -> Result<ProgramId, EngineError> {
        self.forever = repeat;
        self.run()
    }

    /// Append wire-level steps. The program is started if the list contains
    /// `run` or `forever`; otherwise it is only registered.
    pub fn processes(mut self, processes: &[Process]) -> Result<ProgramId, EngineError> {
        let mut start = false;
        for process in processes {
            match process {
                Process::Write { value, speed } => self.actions.push(Action::Write {
                    text: value.clone(),
                    speed: *speed,
                }),
                Process::Erase { value, speed } => self.actions.push(Action::Erase {
                    count: *value,
                    speed: *speed,
                }),
                Process::Move { value, speed } => self.actions.push(Action::Move {
                    offset: *value,
                    speed: *speed,
                }),
                Process::Pause { value } => self.actions.push(Action::Pause { secs: *value }),
                Process::AllErase => self.actions.push(Action::AllErase { speed: None }),
                Process::Run => start = true,
                Process::Forever { value } => {
                    self.forever = *value;
                    start = true;
                }
            }
        }
        if start { self.run() } else { self.build() }
    }

    fn register(self) -> Result<(&'e mut Engine<D>, ProgramId), EngineError> {
        let Self {
            engine,
            target,
            config,
            actions,
            forever,
        } = self;
        let target = target.ok_or_else(|| EngineError::configuration("program has no target"))?;
        let patch =
            config.ok_or_else(|| EngineError::configuration("program has no configuration"))?;
        let container = target_container(engine, &target)?;
        let id = engine.register_program(container, &patch, &actions, forever)?;
        Ok((engine, id))
    }
}

fn target_container<D: Document>(
    engine: &Engine<D>,
    target: &Target,
) -> Result<ContainerId, EngineError> {
    match target {
        Target::Container(id) => {
            if engine.document().text(*id).is_none() {
                return Err(EngineError::resolution(
                    id.to_string(),
                    "container is not in the document",
                ));
            }
            Ok(*id)
        }
        Target::Selector(selector) => match engine.document().query_one(selector) {
            Ok(Some(id)) => Ok(id),
            Ok(None) => Err(EngineError::resolution(selector.clone(), "no matching container")),
            Err(err) => Err(EngineError::resolution(selector.clone(), err)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystroke_memory::{Element, MemoryDocument};

    fn play(actions: &[Action], forever: bool, max_ticks: usize) -> (Program, MemoryDocument) {
        let mut doc = MemoryDocument::new();
        let container = doc.insert(Element::new("p").text("seed"));
        let mut program =
            Program::new(ProgramId(0), container, Config::default(), actions, forever).unwrap();
        let mut next = program.start(&mut doc);
        let mut ticks = 0;
        while next.is_some() && ticks < max_ticks {
            next = program.tick(&mut doc);
            ticks += 1;
        }
        (program, doc)
    }

    fn write(text: &str) -> Action {
        Action::Write {
            text: text.to_string(),
            speed: None,
        }
    }

    fn erase(count: usize) -> Action {
        Action::Erase { count, speed: None }
    }

    fn mv(offset: i64) -> Action {
        Action::Move {
            offset,
            speed: None,
        }
    }

    #[test]
    fn write_then_erase() {
        let (program, doc) = play(&[write("ab"), erase(1)], false, 100);
        assert_eq!(program.text(), "a");
        assert_eq!(program.state(), ProgramState::Finished);
        assert_eq!(doc.text(program.container()).as_deref(), Some("a"));
    }

    #[test]
    fn move_then_insert() {
        let (program, _) = play(&[write("ab"), mv(-1), write("c")], false, 100);
        assert_eq!(program.text(), "acb");
        assert_eq!(program.cursor(), 2);
    }

    #[test]
    fn erase_removes_trailing_characters() {
        let (program, doc) = play(&[write("abc"), mv(-1), erase(1)], false, 100);
        assert_eq!(program.text(), "ab");
        assert_eq!(program.cursor(), 2);
        assert_eq!(doc.text(program.container()).as_deref(), Some("ab"));

        let (program, _) = play(&[write("abc"), mv(-1), erase(2), write("x")], false, 100);
        assert_eq!(program.text(), "ax");
    }

    #[test]
    fn erase_of_whole_length_matches_all_erase() {
        let (erased, _) = play(&[write("abc"), mv(-2), erase(3)], false, 100);
        let (cleared, _) = play(
            &[write("abc"), mv(-2), Action::AllErase { speed: None }],
            false,
            100,
        );
        assert_eq!(erased.text(), "");
        assert_eq!(erased.text(), cleared.text());
        assert_eq!(erased.cursor(), cleared.cursor());
    }

    #[test]
    fn erase_truncates_at_start() {
        let (program, _) = play(&[write("ab"), erase(5)], false, 100);
        assert_eq!(program.text(), "");
    }

    #[test]
    fn move_is_clamped() {
        let (program, _) = play(&[write("ab"), mv(-10), write("x"), mv(10)], false, 100);
        assert_eq!(program.text(), "xab");
        assert_eq!(program.cursor(), 3);
    }

    #[test]
    fn all_erase_clears_from_the_end() {
        let (program, _) = play(
            &[write("abc"), mv(-2), Action::AllErase { speed: None }],
            false,
            100,
        );
        assert_eq!(program.text(), "");
        assert_eq!(program.cursor(), 0);
    }

    #[test]
    fn start_clears_container_and_sets_first_delay() {
        let mut doc = MemoryDocument::new();
        let container = doc.insert(Element::new("p").text("seed"));
        let config = Config::default();
        let actions = [Action::Pause { secs: 0.0 }, write("a")];
        let mut program = Program::new(ProgramId(1), container, config, &actions, false).unwrap();
        assert_eq!(program.start(&mut doc), Some(Duration::from_millis(100)));
        assert_eq!(doc.text(container).as_deref(), Some(""));
        assert_eq!(program.start(&mut doc), None);
    }

    #[test]
    fn per_action_speed_overrides_config() {
        let mut doc = MemoryDocument::new();
        let container = doc.insert(Element::new("p"));
        let actions = [
            Action::Write {
                text: "ab".into(),
                speed: Some(4.0),
            },
            Action::Erase {
                count: 1,
                speed: Some(-1.0),
            },
        ];
        let mut program =
            Program::new(ProgramId(0), container, Config::default(), &actions, false).unwrap();
        assert_eq!(program.start(&mut doc), Some(Duration::from_millis(250)));
        assert_eq!(program.tick(&mut doc), Some(Duration::from_millis(250)));
        assert_eq!(program.tick(&mut doc), Some(Duration::from_millis(50)));
        assert_eq!(program.tick(&mut doc), None);
    }

    #[test]
    fn invalid_pause_is_a_configuration_error() {
        for secs in [-1.0, f64::NAN, f64::INFINITY] {
            let err = Program::new(
                ProgramId(0),
                ContainerId(0),
                Config::default(),
                &[Action::Pause { secs }],
                false,
            )
            .unwrap_err();
            assert!(matches!(err, EngineError::Configuration(_)));
        }
    }

    #[test]
    fn forever_restarts_from_empty() {
        let (program, _) = play(&[write("ab"), erase(1)], true, 7);
        // Two full cycles (2 writes + 1 erase each) plus one write.
        assert_eq!(program.text(), "a");
        assert_eq!(program.state(), ProgramState::Running);
    }

    #[test]
    fn forever_clears_the_container_between_cycles() {
        let mut doc = MemoryDocument::new();
        let container = doc.insert(Element::new("p"));
        let actions = [Action::Pause { secs: 1.0 }, write("ab")];
        let mut program =
            Program::new(ProgramId(0), container, Config::default(), &actions, true).unwrap();
        program.start(&mut doc);
        let mut frames = Vec::new();
        for _ in 0..6 {
            program.tick(&mut doc);
            frames.push(doc.text(container).unwrap_or_default());
        }
        // pause, "a", "ab" then wrap; the second cycle repeats the first.
        assert_eq!(frames, vec!["", "a", "", "", "a", ""]);
        assert_eq!(program.text(), "");
    }

    #[test]
    fn forever_without_timed_steps_finishes() {
        let (program, _) = play(&[erase(3), Action::Pause { secs: 0.0 }], true, 100);
        assert_eq!(program.state(), ProgramState::Finished);
    }

    #[test]
    fn process_wire_format() {
        let json = r#"[
            {"action": "write", "value": "hi", "speed": 2},
            {"action": "erase", "value": 1},
            {"action": "move", "value": -1},
            {"action": "pause", "value": 0.5},
            {"action": "allErase"},
            {"action": "run"},
            {"action": "forever"}
        ]"#;
        let steps: Vec<Process> = serde_json::from_str(json).unwrap();
        assert_eq!(
            steps,
            vec![
                Process::Write {
                    value: "hi".into(),
                    speed: Some(2.0)
                },
                Process::Erase {
                    value: 1,
                    speed: None
                },
                Process::Move {
                    value: -1,
                    speed: None
                },
                Process::Pause { value: 0.5 },
                Process::AllErase,
                Process::Run,
                Process::Forever { value: false },
            ]
        );
    }

    #[test]
    fn malformed_process_is_rejected() {
        assert!(serde_json::from_str::<Process>(r#"{"action": "write"}"#).is_err());
        assert!(serde_json::from_str::<Process>(r#"{"action": "jump", "value": 1}"#).is_err());
        assert!(serde_json::from_str::<Process>(r#"{"action": "erase", "value": -1}"#).is_err());
    }
}
