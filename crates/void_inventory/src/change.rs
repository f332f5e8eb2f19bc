//! Change records and the per-container change journal
//!
//! Every successful mutation of a container emits exactly one
//! [`ChangeRecord`] carrying the next sequence number and the resulting
//! contents of each affected slot. Replicas apply records in sequence order;
//! equip bindings filter them by slot.

use crate::error::{InventoryError, InventoryResult};
use crate::item::ItemStack;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of records a journal retains
pub const DEFAULT_JOURNAL_CAPACITY: usize = 256;

/// Kind of mutation a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Units added by `try_add_stack`
    Added,
    /// Units removed from one or more slots
    Removed,
    /// Units consumed by using the item in a slot
    Used,
    /// Stack moved or merged from one slot to another
    Moved {
        /// Source slot
        from: usize,
        /// Destination slot
        to: usize,
    },
    /// Stack split into a new slot
    Split {
        /// Source slot
        from: usize,
        /// Slot holding the new stack
        to: usize,
    },
    /// Two slots exchanged contents
    Swapped {
        /// First slot
        a: usize,
        /// Second slot
        b: usize,
    },
    /// Every slot emptied
    Cleared,
    /// One side of a cross-container transfer
    Transferred,
    /// Applied from an authoritative snapshot
    Synced,
}

/// Resulting contents of one slot after a mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotChange {
    /// Slot index
    pub slot: usize,
    /// New contents (None = slot is now empty)
    pub stack: Option<ItemStack>,
}

/// One sequence-numbered mutation of a container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Monotonically increasing per container, starting at 1
    pub sequence: u64,
    /// What happened
    pub kind: ChangeKind,
    /// Every affected slot with its resulting contents
    pub slots: Vec<SlotChange>,
}

impl ChangeRecord {
    /// Check if the record affects a slot
    pub fn touches(&self, slot: usize) -> bool {
        self.slots.iter().any(|change| change.slot == slot)
    }

    /// Resulting contents for a slot, if the record affects it
    pub fn slot(&self, slot: usize) -> Option<&SlotChange> {
        self.slots.iter().find(|change| change.slot == slot)
    }

    /// Affected slot indices
    pub fn slot_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots.iter().map(|change| change.slot)
    }
}

/// Bounded history of recent change records
#[derive(Debug, Clone)]
pub struct ChangeJournal {
    records: VecDeque<ChangeRecord>,
    capacity: usize,
    latest: u64,
    generation: u64,
}

impl ChangeJournal {
    /// Create an empty journal retaining at most `capacity` records
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(DEFAULT_JOURNAL_CAPACITY)),
            capacity,
            latest: 0,
            generation: 0,
        }
    }

    /// Sequence number of the most recent record (0 before any mutation)
    pub fn latest(&self) -> u64 {
        self.latest
    }

    /// Number of history resets. Records from different generations do not
    /// describe one continuous history, even at equal sequence numbers.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Oldest retained sequence number
    pub fn oldest(&self) -> Option<u64> {
        self.records.front().map(|record| record.sequence)
    }

    /// Number of retained records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no records are retained
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Next sequence number to assign
    pub fn next_sequence(&self) -> u64 {
        self.latest + 1
    }

    /// Append a record. Its sequence must be the journal's next sequence.
    pub(crate) fn push(&mut self, record: ChangeRecord) {
        debug_assert_eq!(record.sequence, self.next_sequence());
        self.latest = record.sequence;
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Drop all history, start a new generation and continue numbering
    /// after `sequence`
    pub(crate) fn reset(&mut self, sequence: u64) {
        self.records.clear();
        self.latest = sequence;
        self.generation += 1;
    }

    /// Records with a sequence number greater than `since`
    pub fn since(&self, since: u64) -> InventoryResult<Vec<ChangeRecord>> {
        if since >= self.latest {
            return Ok(Vec::new());
        }

        let first_needed = since + 1;
        match self.oldest() {
            Some(oldest) if oldest <= first_needed => Ok(self
                .records
                .iter()
                .filter(|record| record.sequence > since)
                .cloned()
                .collect()),
            oldest => Err(InventoryError::HistoryUnavailable {
                requested: since,
                oldest: oldest.unwrap_or(self.next_sequence()),
            }),
        }
    }

    /// Iterate retained records, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records.iter()
    }
}

impl Default for ChangeJournal {
    fn default() -> Self {
        Self::new(DEFAULT_JOURNAL_CAPACITY)
    }
}
