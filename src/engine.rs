//! The engine: the single handle an emulator integration owns, bundling the
//! catalogue, history table, counters, virtual-time origin, and the
//! collect-faults switch behind one API.

use std::fs;
use std::path::Path;

use crate::catalogue::Catalogue;
use crate::counters::{Counters, FaultCounter};
use crate::error::EngineError;
use crate::history::HistoryTable;
use crate::hook::{self, AccessKind, EventKind, HookContext, HookOutcome};
use crate::inject::EmulatorAccess;
use crate::loader::parse_catalogue;
use crate::profiler::{NoopProfiler, Profiler};
use crate::schema::enums::FaultComponent;
use crate::time::VirtualClock;
use crate::validate::validate_catalogue;

/// Result of a successful `fault_reload`.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub fault_count: usize,
    pub message: String,
}

/// One row of an `info_faults` report.
#[derive(Debug, Clone, Copy)]
pub struct FaultReport {
    pub id: u32,
    pub component: FaultComponent,
    pub counter: FaultCounter,
}

/// Owns every piece of engine-global state and mediates all access to it.
/// Only `reload`/`reload_str` mutate the catalogue; the hook only ever
/// touches `Fault::was_triggered`, history, and counters.
pub struct Engine {
    catalogue: Catalogue,
    history: HistoryTable,
    counters: Counters,
    clock: VirtualClock,
    collect_faults: bool,
    profiler: Box<dyn Profiler>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            catalogue: Catalogue::new(Vec::new()),
            history: HistoryTable::new(0),
            counters: Counters::new(),
            clock: VirtualClock::starting_at(0),
            collect_faults: false,
            profiler: Box::new(NoopProfiler),
        }
    }

    #[must_use]
    pub fn with_profiler(profiler: impl Profiler + 'static) -> Self {
        Self { profiler: Box::new(profiler), ..Self::new() }
    }

    /// Mirrors the `-fi` CLI flag: whether the hook evaluates faults at all.
    pub fn set_collect_faults(&mut self, on: bool) {
        self.collect_faults = on;
    }

    #[must_use]
    pub fn collect_faults(&self) -> bool {
        self.collect_faults
    }

    #[must_use]
    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    #[must_use]
    pub fn history(&self) -> &HistoryTable {
        &self.history
    }

    /// Implements the `fault_reload <path>` monitor command.
    pub fn reload(&mut self, path: impl AsRef<Path>, now_ns: i64) -> Result<LoadReport, EngineError> {
        let xml = fs::read_to_string(path)?;
        self.reload_str(&xml, now_ns)
    }

    /// Parses and validates `xml`, replacing the engine's state only on
    /// success. On any failure — parse or semantic — the previous catalogue,
    /// history, and counters are discarded, matching the reference loader's
    /// behaviour of never running against a half-loaded configuration.
    pub fn reload_str(&mut self, xml: &str, now_ns: i64) -> Result<LoadReport, EngineError> {
        let faults = match parse_catalogue(xml) {
            Ok(faults) => faults,
            Err(e) => {
                self.clear();
                let e = EngineError::from(e);
                log::error!("{e}");
                return Err(e);
            }
        };

        let catalogue = Catalogue::new(faults);
        let violations = validate_catalogue(&catalogue);
        if !violations.is_empty() {
            self.clear();
            let e = EngineError::from(violations);
            log::error!("{e}");
            return Err(e);
        }

        let fault_count = catalogue.len();
        self.history = HistoryTable::new(catalogue.max_id());
        self.counters.reset();
        self.clock = VirtualClock::starting_at(now_ns);
        self.catalogue = catalogue;

        let message = "FIESER: Configuration file loaded successfully".to_string();
        log::info!("{message}");
        Ok(LoadReport { fault_count, message })
    }

    fn clear(&mut self) {
        self.catalogue = Catalogue::new(Vec::new());
        self.history = HistoryTable::new(0);
        self.counters.reset();
    }

    /// The single entry point the emulator calls on every guest event.
    pub fn hook(
        &mut self,
        emulator: &mut dyn EmulatorAccess,
        event: EventKind,
        access: AccessKind,
        addr: &mut u64,
        value: &mut u32,
    ) -> HookOutcome {
        self.profiler.log_access(event, access, *addr);
        if !self.collect_faults {
            return HookOutcome::default();
        }

        let mut ctx = HookContext {
            catalogue: &self.catalogue,
            history: &mut self.history,
            counters: &mut self.counters,
            clock: &self.clock,
        };
        hook::hook(&mut ctx, emulator, event, access, addr, value)
    }

    /// Implements the `info_faults` monitor command.
    #[must_use]
    pub fn info_faults(&self) -> Vec<FaultReport> {
        self.catalogue
            .iter()
            .map(|fault| FaultReport {
                id: fault.id,
                component: fault.component,
                counter: self.counters.get(fault.id),
            })
            .collect()
    }

    /// Records one detection of `id`, set externally by whatever downstream
    /// analysis recognises a fault's effect (not computed by this engine).
    pub fn record_detection(&mut self, id: u32) {
        self.counters.record_detection(id);
    }
}
