//! Void Inventory Weapons - Gear Slots and Equip Binding
//!
//! Equips weapons and armor by reference: a gear slot points at a slot of the
//! owner's [`InventoryContainer`](void_inventory::InventoryContainer) and the
//! item never leaves the container. The [`GearManager`] follows the
//! container's change records to keep those references valid.
//!
//! # Example
//!
//! ```
//! use void_inventory::prelude::*;
//! use void_inventory_weapons::prelude::*;
//!
//! let mut registry = ItemRegistry::new();
//! registry
//!     .register(
//!         ItemDefinition::new(ItemId::new("Item.Weapon.Sword").unwrap(), "Sword")
//!             .with_category(ItemCategory::Weapon(WeaponTraits::default())),
//!     )
//!     .unwrap();
//! let mut bag = InventoryContainer::spawn(registry.into_shared(), ContainerConfig::new(8)).unwrap();
//! bag.try_add_stack(ItemId::new("Item.Weapon.Sword").unwrap(), 1, None).unwrap();
//!
//! let mut gear = GearManager::new(GearConfig::default(), &bag);
//! gear.equip(&bag, GearSlot::MainHand, 0).unwrap();
//!
//! bag.move_stack(0, 5).unwrap();
//! let events = gear.sync(&bag);
//! assert_eq!(events, vec![GearEvent::Relocated { gear: GearSlot::MainHand, from: 0, to: 5 }]);
//! assert_eq!(gear.equipped(GearSlot::MainHand), Some(5));
//! ```

pub mod binding;
pub mod error;
pub mod gear;

pub mod prelude {
    pub use crate::binding::{EquipBinding, GearEvent, GearManager, ReleaseReason};
    pub use crate::error::{GearError, GearResult};
    pub use crate::gear::{GearConfig, GearSlot, DEFAULT_MAX_SELECTABLE_WEAPONS};
}

pub use prelude::*;
