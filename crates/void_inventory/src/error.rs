//! Inventory error types

use crate::id::ItemId;
use thiserror::Error;

/// Errors returned by registry, container, transfer and replication operations.
///
/// Every variant is a local, recoverable condition. Partial success is not an
/// error: operations that can place fewer units than requested report the
/// actual quantity in their outcome instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InventoryError {
    /// Identifier text is not a valid hierarchical tag
    #[error("Invalid item identifier: {0:?}")]
    InvalidItemId(String),
    /// Definition violates its own constraints
    #[error("Invalid definition for {id}: {reason}")]
    InvalidDefinition {
        /// Offending identifier
        id: ItemId,
        /// What is wrong with it
        reason: String,
    },
    /// No definition registered for the identifier
    #[error("Unknown item: {0}")]
    UnknownItem(ItemId),
    /// Identifier registered twice
    #[error("Duplicate item definition: {0}")]
    DuplicateDefinition(ItemId),
    /// Registration attempted after the registry was sealed
    #[error("Item registry is sealed")]
    RegistryLocked,
    /// Container initialized against a registry that is still open
    #[error("Item registry must be sealed before containers are initialized")]
    RegistryNotSealed,

    /// Slot is out of range, empty, or otherwise unusable for the operation
    #[error("Invalid slot: {0}")]
    InvalidSlot(usize),
    /// Requested quantity exceeds what the slot (or container) holds
    #[error("Insufficient quantity: requested {requested}, available {available}")]
    InsufficientQuantity {
        /// Quantity asked for
        requested: u32,
        /// Quantity present
        available: u32,
    },
    /// Destination slot holds a stack that cannot take the source
    #[error("Slot {0} is occupied by a non-mergeable stack")]
    SlotOccupied(usize),
    /// Nothing could be placed
    #[error("Container is full")]
    ContainerFull,
    /// Zero quantity passed to a mutating operation
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    /// Item has no use behaviour
    #[error("Item is not usable: {0}")]
    NotUsable(ItemId),
    /// The container's add policy allows none of the requested units
    #[error("Add of {0} rejected by container policy")]
    AddRejected(ItemId),
    /// Container has not reached the ready state
    #[error("Container is not initialized")]
    NotReady,

    /// Transfer validation found nothing movable, or the authority vetoed it
    #[error("Transfer rejected: {0}")]
    TransferRejected(String),

    /// Change batch skips sequence numbers; a full resync is required
    #[error("Sequence gap: expected {expected}, found {found}")]
    SequenceGap {
        /// Next sequence number the replica can apply
        expected: u64,
        /// First sequence number in the batch
        found: u64,
    },
    /// Change history no longer retained for the requested point
    #[error("Change history unavailable since {requested} (oldest retained {oldest})")]
    HistoryUnavailable {
        /// Sequence number the caller has seen
        requested: u64,
        /// Oldest sequence number still in the journal
        oldest: u64,
    },
    /// Snapshot is older than the state already applied
    #[error("Stale snapshot: sequence {snapshot} is behind {current}")]
    StaleSnapshot {
        /// Sequence number the snapshot was taken at
        snapshot: u64,
        /// Sequence number the replica has reached
        current: u64,
    },
    /// Snapshot or change record does not fit this container
    #[error("Snapshot mismatch: {0}")]
    SnapshotMismatch(String),
}

impl InventoryError {
    /// Whether the caller should fall back to a full-state resynchronization
    pub fn requires_resync(&self) -> bool {
        matches!(
            self,
            Self::SequenceGap { .. } | Self::HistoryUnavailable { .. }
        )
    }
}

/// Result alias for inventory operations
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Snapshot encoding errors
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Binary encoding failed
    #[error("Binary encoding error: {0}")]
    Binary(#[from] bincode::Error),
    /// JSON encoding failed
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML document could not be parsed
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Parsed values are out of range
    #[error("Invalid config: {0}")]
    Invalid(String),
    /// Parsed values are rejected by the inventory
    #[error(transparent)]
    Inventory(#[from] InventoryError),
}
