//! Gear error types

use crate::gear::GearSlot;
use thiserror::Error;
use void_inventory::{InventoryError, ItemId};

/// Equip and selection errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GearError {
    /// Gear slot is not configured for this owner
    #[error("Gear slot {0:?} not available")]
    SlotNotAvailable(GearSlot),
    /// Item cannot be equipped in this gear slot
    #[error("{item} cannot be equipped in {slot:?}")]
    InvalidSlotForItem {
        /// Requested gear slot
        slot: GearSlot,
        /// Item in the referenced container slot
        item: ItemId,
    },
    /// Selectable weapon list is at its configured limit
    #[error("Selectable weapon list is full ({0} entries)")]
    SelectionFull(usize),
    /// Selection index out of range
    #[error("No selectable weapon at index {0}")]
    NoSuchSelection(usize),
    /// Selection cycled with an empty list
    #[error("No selectable weapons")]
    NothingSelectable,
    /// Config values are out of range
    #[error("Invalid gear config: {0}")]
    InvalidConfig(String),
    /// Config document could not be parsed
    #[error("Gear config parse error: {0}")]
    Parse(String),
    /// Underlying container lookup failed
    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

impl From<toml::de::Error> for GearError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result alias for gear operations
pub type GearResult<T> = Result<T, GearError>;
