//! Deterministic fault-injection evaluation and injection hook for a
//! full-system CPU emulator.
//!
//! The engine decides, on every guest memory/register access, instruction
//! fetch, or virtual-time tick, whether a fault from a declarative XML
//! catalogue applies to the event and, if so, mutates the value in flight
//! (or the underlying architectural state) accordingly.

pub mod counters;
pub mod engine;
pub mod error;
pub mod history;
pub mod hook;
pub mod inject;
pub mod loader;
pub mod profiler;
pub mod schema;
pub mod time;
pub mod validate;

mod catalogue;
mod fault;

pub use catalogue::Catalogue;
pub use engine::{Engine, FaultReport, LoadReport};
pub use error::{EngineError, ParseError, ValidationError};
pub use fault::{Fault, FaultParams};
pub use history::{CellOp, HistoryTable};
pub use hook::{hook, AccessKind, EventKind, HookOutcome};
pub use inject::EmulatorAccess;
pub use profiler::{NoopProfiler, Profiler};
pub use schema::enums::{FaultComponent, FaultMode, FaultTarget, FaultTrigger, FaultType};
