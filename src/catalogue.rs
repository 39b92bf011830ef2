use std::collections::HashMap;

use crate::fault::Fault;

/// An immutable, loaded set of faults, indexed for O(1) lookup by id.
///
/// The original fault-injection library kept faults in a singly linked list
/// and scanned it linearly for every lookup; this catalogue keeps the same
/// load-once-then-replace-atomically lifecycle but adds an id index, since
/// nothing about the declarative format requires the list's insertion order
/// to double as its lookup structure.
#[derive(Debug, Default)]
pub struct Catalogue {
    faults: Vec<Fault>,
    by_id: HashMap<u32, usize>,
    max_id: u32,
}

impl Catalogue {
    #[must_use]
    pub fn new(faults: Vec<Fault>) -> Self {
        let mut by_id = HashMap::with_capacity(faults.len());
        let mut max_id = 0;
        for (index, fault) in faults.iter().enumerate() {
            by_id.insert(fault.id, index);
            max_id = max_id.max(fault.id);
        }
        Self { faults, by_id, max_id }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.faults.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }

    /// Highest fault id in the catalogue, or 0 for an empty one. Sizes the
    /// per-fault history and counter tables on load.
    #[must_use]
    pub fn max_id(&self) -> u32 {
        self.max_id
    }

    #[must_use]
    pub fn get_by_id(&self, id: u32) -> Option<&Fault> {
        self.by_id.get(&id).map(|&index| &self.faults[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fault> {
        self.faults.iter()
    }
}
