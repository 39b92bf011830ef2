//! Per-bit dynamic-history table: the last observed write transition of each
//! bit a fault's mask covers, used to detect stuck-at and coupling behavior
//! across repeated activations.

/// Width, in bits, of the memory/register cell the history table tracks.
pub const MEMORY_WIDTH: usize = 32;

/// The last observed write transition of one tracked bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellOp {
    /// No write to this bit has been logged yet.
    Unobserved,
    ZeroToZero,
    ZeroToOne,
    OneToZero,
    OneToOne,
}

impl CellOp {
    fn from_transition(before: bool, after: bool) -> Self {
        match (before, after) {
            (false, false) => Self::ZeroToZero,
            (false, true) => Self::ZeroToOne,
            (true, false) => Self::OneToZero,
            (true, true) => Self::OneToOne,
        }
    }
}

/// One row per fault id (indexed `0..=max_id`), one column per tracked bit.
#[derive(Debug, Default)]
pub struct HistoryTable {
    rows: Vec<[CellOp; MEMORY_WIDTH]>,
}

impl HistoryTable {
    /// Allocates a table sized for fault ids `0..=max_id`.
    #[must_use]
    pub fn new(max_id: u32) -> Self {
        let rows = vec![[CellOp::Unobserved; MEMORY_WIDTH]; max_id as usize + 1];
        Self { rows }
    }

    #[must_use]
    pub fn get(&self, id: u32, bit: u32) -> CellOp {
        self.rows
            .get(id as usize)
            .and_then(|row| row.get(bit as usize))
            .copied()
            .unwrap_or(CellOp::Unobserved)
    }

    /// Records a write-access transition for `bit` of `id`'s tracked cell.
    /// Only write accesses are logged; reads never touch the history table.
    pub fn record_write(&mut self, id: u32, bit: u32, before: bool, after: bool) {
        if let Some(row) = self.rows.get_mut(id as usize) {
            if let Some(cell) = row.get_mut(bit as usize) {
                *cell = CellOp::from_transition(before, after);
            }
        }
    }

    /// Records a write-access transition for every bit set in `mask`,
    /// comparing `before`/`after` at that bit position.
    pub fn record_write_masked(&mut self, id: u32, mask: u32, before: u32, after: u32) {
        let mut remaining = mask;
        while remaining != 0 {
            let bit = remaining.trailing_zeros();
            self.record_write(id, bit, (before >> bit) & 1 != 0, (after >> bit) & 1 != 0);
            remaining &= remaining - 1;
        }
    }
}
