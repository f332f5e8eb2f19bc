//! Replication hooks
//!
//! The container exposes its full state as a [`ContainerSnapshot`], its
//! recent history as [`ChangeRecord`]s, and accepts either back from an
//! authority. Transport, compression and retry policy belong to the adapter
//! that calls these hooks. Save games consume the same snapshot.

use crate::change::{ChangeKind, ChangeRecord, SlotChange};
use crate::config::ContainerConfig;
use crate::error::{InventoryError, InventoryResult, SnapshotError};
use crate::inventory::{validate_slots, InventoryContainer};
use crate::item::ItemStack;
use crate::registry::ItemRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Full container state at a sequence number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    /// Sequence number of the last change included
    pub sequence: u64,
    /// Slot count
    pub capacity: usize,
    /// Weight cap of the authority
    pub max_weight: Option<f32>,
    /// Slot contents in index order
    pub slots: Vec<Option<ItemStack>>,
}

impl ContainerSnapshot {
    /// Encode to bincode
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from bincode
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Encode to JSON
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode from JSON
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Occupied slots
    pub fn used_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

/// What a replica needs to catch up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncPayload {
    /// Ordered change records after the replica's sequence
    Delta(Vec<ChangeRecord>),
    /// Full state, when the history is no longer retained
    Full(ContainerSnapshot),
}

impl InventoryContainer {
    /// Ready container that receives its contents from an authority.
    ///
    /// Initial items are skipped: they arrive through the authority's
    /// change stream.
    pub fn replica(registry: Arc<ItemRegistry>, mut config: ContainerConfig) -> InventoryResult<Self> {
        config.initial_items.clear();
        Self::spawn(registry, config)
    }

    /// Current full state
    pub fn snapshot(&self) -> ContainerSnapshot {
        ContainerSnapshot {
            sequence: self.sequence(),
            capacity: self.capacity(),
            max_weight: self.config.max_weight,
            slots: self.slots.clone(),
        }
    }

    /// Change records after `sequence`, oldest first
    pub fn changes_since(&self, sequence: u64) -> InventoryResult<Vec<ChangeRecord>> {
        self.journal.since(sequence)
    }

    /// Delta for a replica at `sequence`, or a full snapshot when the delta
    /// cannot be produced
    pub fn sync_since(&self, sequence: u64) -> SyncPayload {
        if sequence > self.sequence() {
            log::warn!(
                "Replica at sequence {} is ahead of authority at {}, sending snapshot",
                sequence,
                self.sequence()
            );
            return SyncPayload::Full(self.snapshot());
        }
        match self.changes_since(sequence) {
            Ok(records) => SyncPayload::Delta(records),
            Err(err) => {
                log::debug!("Falling back to snapshot: {}", err);
                SyncPayload::Full(self.snapshot())
            }
        }
    }

    /// Replace the contents with an authoritative snapshot.
    ///
    /// The snapshot is validated against this container's capacity, registry
    /// and weight cap before anything is written. Applying the snapshot the
    /// container already matches is a no-op, and a snapshot older than the
    /// applied state fails with `StaleSnapshot`. A snapshot exactly one step
    /// ahead is recorded as a single `Synced` change; any other jump (or a
    /// different state at the same sequence) starts a new journal generation.
    pub fn apply_snapshot(&mut self, snapshot: &ContainerSnapshot) -> InventoryResult<()> {
        self.ensure_ready()?;
        if snapshot.sequence < self.sequence() {
            log::debug!(
                "Ignoring snapshot at sequence {}, already at {}",
                snapshot.sequence,
                self.sequence()
            );
            return Err(InventoryError::StaleSnapshot {
                snapshot: snapshot.sequence,
                current: self.sequence(),
            });
        }
        self.overwrite_from(snapshot)
    }

    /// Replace the contents with a snapshot regardless of its sequence, for
    /// an authority that restarted behind its replicas. Always starts a new
    /// journal generation unless the state already matches.
    pub fn reset_to_snapshot(&mut self, snapshot: &ContainerSnapshot) -> InventoryResult<()> {
        self.ensure_ready()?;
        if snapshot.sequence < self.sequence() {
            log::warn!(
                "Rewinding replica from sequence {} to {}",
                self.sequence(),
                snapshot.sequence
            );
        }
        self.overwrite_from(snapshot)
    }

    fn overwrite_from(&mut self, snapshot: &ContainerSnapshot) -> InventoryResult<()> {
        if snapshot.capacity != self.capacity() || snapshot.slots.len() != self.capacity() {
            return Err(InventoryError::SnapshotMismatch(format!(
                "snapshot has {} slots, container has {}",
                snapshot.slots.len(),
                self.capacity()
            )));
        }
        validate_slots(&self.registry, &snapshot.slots, self.config.max_weight)
            .map_err(InventoryError::SnapshotMismatch)?;

        if snapshot.sequence == self.sequence() && snapshot.slots == self.slots {
            return Ok(());
        }

        let changed: Vec<usize> = (0..self.capacity())
            .filter(|&slot| self.slots[slot] != snapshot.slots[slot])
            .collect();
        let contiguous = snapshot.sequence == self.sequence() + 1;

        self.slots.clone_from(&snapshot.slots);
        if contiguous {
            self.emit(ChangeKind::Synced, changed);
        } else {
            self.journal.reset(snapshot.sequence);
        }

        log::debug!(
            "Applied snapshot at sequence {} ({} slots occupied)",
            snapshot.sequence,
            snapshot.used_slots()
        );
        Ok(())
    }

    /// Apply an ordered batch of authoritative change records.
    ///
    /// Records already applied are skipped. A batch that skips a sequence
    /// number fails with `SequenceGap` and the caller must fall back to a
    /// snapshot. Nothing is written unless the whole batch validates.
    /// Returns the number of records applied.
    pub fn apply_changes(&mut self, records: &[ChangeRecord]) -> InventoryResult<usize> {
        self.ensure_ready()?;

        let mut expected = self.sequence() + 1;
        let mut staged = self.slots.clone();
        let mut applied = Vec::new();
        for record in records {
            if record.sequence < expected {
                continue;
            }
            if record.sequence > expected {
                log::debug!("Sequence gap: expected {}, found {}", expected, record.sequence);
                return Err(InventoryError::SequenceGap {
                    expected,
                    found: record.sequence,
                });
            }
            for SlotChange { slot, stack } in &record.slots {
                let target = staged.get_mut(*slot).ok_or_else(|| {
                    InventoryError::SnapshotMismatch(format!(
                        "record {} touches slot {} beyond capacity {}",
                        record.sequence,
                        slot,
                        self.slots.len()
                    ))
                })?;
                target.clone_from(stack);
            }
            applied.push(record);
            expected += 1;
        }

        validate_slots(&self.registry, &staged, self.config.max_weight)
            .map_err(InventoryError::SnapshotMismatch)?;

        self.slots = staged;
        for record in &applied {
            self.journal.push((*record).clone());
        }
        if !applied.is_empty() {
            log::trace!("Applied {} change records, now at {}", applied.len(), self.sequence());
        }
        Ok(applied.len())
    }

    /// Apply whatever [`sync_since`](Self::sync_since) produced. A replica
    /// ahead of a restarted authority gets `StaleSnapshot` and must call
    /// [`reset_to_snapshot`](Self::reset_to_snapshot) to follow it.
    pub fn apply_sync(&mut self, payload: &SyncPayload) -> InventoryResult<()> {
        match payload {
            SyncPayload::Delta(records) => self.apply_changes(records).map(|_| ()),
            SyncPayload::Full(snapshot) => self.apply_snapshot(snapshot),
        }
    }
}
