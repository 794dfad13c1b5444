#![forbid(unsafe_code)]

//! Keystroke runtime: animation nodes, scripted programs, and the engine that
//! schedules them against a host document.
//!
//! Everything is single-threaded and host-driven. The engine never sleeps or
//! spawns; the host calls [`Engine::advance`] with elapsed time and the engine
//! fires whatever became due.

pub mod engine;
pub mod error;
pub mod node;
pub mod program;

pub use engine::{ControllerId, Engine};
pub use error::EngineError;
pub use node::{Node, NodeEvent, NodeId, NodeState};
pub use program::{Action, Process, Program, ProgramBuilder, ProgramId, ProgramState};
