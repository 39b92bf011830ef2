//! Access-trace collaborator contracts.
//!
//! The profiler writes `fies-memory-accesses`, `fies-register-accesses`, and
//! `fies-debuglog`; actually producing those files is out of scope for this
//! engine. This trait exists only so [`crate::engine::Engine`] has somewhere
//! to forward access notifications without owning file I/O itself.

use crate::hook::{AccessKind, EventKind};

/// Forwarded one call per hook invocation, before fault evaluation.
pub trait Profiler {
    fn log_access(&mut self, event: EventKind, access: AccessKind, addr: u64);
}

/// The default profiler: discards every notification. Production
/// embeddings supply their own, writing to the log files above.
#[derive(Debug, Default)]
pub struct NoopProfiler;

impl Profiler for NoopProfiler {
    fn log_access(&mut self, _event: EventKind, _access: AccessKind, _addr: u64) {}
}
