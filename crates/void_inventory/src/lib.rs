//! Void Inventory - Item and Inventory State Engine
//!
//! This crate tracks item ownership, stacking and transfer for in-game
//! actors, and keeps replicated copies of that state consistent.
//!
//! # Features
//!
//! - Hierarchical item identifiers with category prefix matching
//! - Sealed item definition registry, loadable from TOML
//! - Fixed-capacity slot containers with stack size and weight limits
//! - Sequence-numbered change records for every mutation
//! - Item use with per-definition consumption, and an authority add policy
//! - Two-phase transfers between containers with partial results
//! - Snapshot and delta replication hooks (bincode / JSON)
//!
//! # Example
//!
//! ```
//! use void_inventory::prelude::*;
//!
//! let mut registry = ItemRegistry::new();
//! registry
//!     .register(
//!         ItemDefinition::new(ItemId::new("Item.Potion").unwrap(), "Potion")
//!             .with_category(ItemCategory::Consumable)
//!             .with_max_stack(5),
//!     )
//!     .unwrap();
//!
//! let mut bag = InventoryContainer::spawn(registry.into_shared(), ContainerConfig::new(20)).unwrap();
//! let outcome = bag.try_add_stack(ItemId::new("Item.Potion").unwrap(), 7, None).unwrap();
//! assert_eq!(outcome.affected_slots, vec![0, 1]);
//! ```

pub mod change;
pub mod config;
pub mod error;
pub mod id;
pub mod inventory;
pub mod item;
pub mod registry;
pub mod replication;
pub mod transfer;

pub mod prelude {
    pub use crate::change::{ChangeKind, ChangeRecord, SlotChange};
    pub use crate::config::{ContainerConfig, InitialItem};
    pub use crate::error::{ConfigError, InventoryError, InventoryResult, SnapshotError};
    pub use crate::id::ItemId;
    pub use crate::inventory::{AddOutcome, AddPolicy, ContainerState, InventoryContainer, MoveOutcome, UseOutcome};
    pub use crate::item::{
        Handedness, InstanceData, ItemCategory, ItemDefinition, ItemProperty, ItemStack, StackingRule,
        WeaponTraits,
    };
    pub use crate::registry::ItemRegistry;
    pub use crate::replication::{ContainerSnapshot, SyncPayload};
    pub use crate::transfer::{AllowAll, TransferCoordinator, TransferOutcome, TransferPlan, TransferPolicy};
}

pub use prelude::*;
