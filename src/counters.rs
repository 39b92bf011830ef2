//! Per-fault activation counters and the component/severity summaries the
//! `info faults` monitor command reports.

use std::collections::HashMap;

use crate::catalogue::Catalogue;
use crate::schema::enums::{FaultComponent, FaultType};

/// Activation tallies for a single fault id.
#[derive(Debug, Default, Clone, Copy)]
pub struct FaultCounter {
    pub transient: u64,
    pub permanent: u64,
    pub intermittent: u64,
    pub detections: u64,
}

impl FaultCounter {
    #[must_use]
    pub fn total_activations(&self) -> u64 {
        self.transient + self.permanent + self.intermittent
    }
}

/// Activation and detection counters, keyed by fault id.
#[derive(Debug, Default)]
pub struct Counters {
    per_fault: HashMap<u32, FaultCounter>,
}

impl Counters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_activation(&mut self, id: u32, severity: FaultType) {
        let entry = self.per_fault.entry(id).or_default();
        match severity {
            FaultType::Transient => entry.transient += 1,
            FaultType::Permanent => entry.permanent += 1,
            FaultType::Intermittent => entry.intermittent += 1,
            FaultType::None => {}
        }
    }

    pub fn record_detection(&mut self, id: u32) {
        self.per_fault.entry(id).or_default().detections += 1;
    }

    #[must_use]
    pub fn get(&self, id: u32) -> FaultCounter {
        self.per_fault.get(&id).copied().unwrap_or_default()
    }

    pub fn reset(&mut self) {
        self.per_fault.clear();
    }

    /// Total activations per (component, severity) pair, for the `info
    /// faults` summary view.
    #[must_use]
    pub fn summary_by_component_severity(
        &self,
        catalogue: &Catalogue,
    ) -> HashMap<(FaultComponent, FaultType), u64> {
        let mut summary: HashMap<(FaultComponent, FaultType), u64> = HashMap::new();
        for fault in catalogue.iter() {
            let counter = self.get(fault.id);
            if counter.transient > 0 {
                *summary.entry((fault.component, FaultType::Transient)).or_default() += counter.transient;
            }
            if counter.permanent > 0 {
                *summary.entry((fault.component, FaultType::Permanent)).or_default() += counter.permanent;
            }
            if counter.intermittent > 0 {
                *summary.entry((fault.component, FaultType::Intermittent)).or_default() += counter.intermittent;
            }
        }
        summary
    }
}
