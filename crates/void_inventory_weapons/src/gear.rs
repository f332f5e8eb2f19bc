//! Gear slots and configuration
//!
//! ```toml
//! slots = ["MainHand", "OffHand", { Armor = 0 }, { Armor = 1 }]
//! max_selectable_weapons = 9
//! two_handed_category = "Item.Weapon.Heavy"
//! ```

use crate::error::{GearError, GearResult};
use serde::{Deserialize, Serialize};
use void_inventory::{Handedness, ItemCategory, ItemDefinition, ItemId};

/// Default length of the selectable weapon list
pub const DEFAULT_MAX_SELECTABLE_WEAPONS: usize = 9;

/// Gear slot types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GearSlot {
    /// Main hand weapon (two-handed weapons go here)
    MainHand,
    /// Off hand (shield, second weapon)
    OffHand,
    /// Armor piece by index
    Armor(u32),
}

impl GearSlot {
    /// Default slot set
    pub fn all_standard() -> Vec<Self> {
        vec![Self::MainHand, Self::OffHand, Self::Armor(0)]
    }

    /// Check if this is a weapon slot
    pub fn is_weapon(&self) -> bool {
        matches!(self, Self::MainHand | Self::OffHand)
    }

    /// Check if this is an armor slot
    pub fn is_armor(&self) -> bool {
        matches!(self, Self::Armor(_))
    }

    /// Whether an item of `category` may be equipped here
    pub fn accepts(&self, category: &ItemCategory) -> bool {
        match self {
            Self::MainHand | Self::OffHand => category.is_weapon(),
            Self::Armor(_) => *category == ItemCategory::Armor,
        }
    }
}

fn default_max_selectable() -> usize {
    DEFAULT_MAX_SELECTABLE_WEAPONS
}

fn default_slots() -> Vec<GearSlot> {
    GearSlot::all_standard()
}

/// Gear configuration for one owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GearConfig {
    /// Available gear slots
    #[serde(default = "default_slots")]
    pub slots: Vec<GearSlot>,
    /// Selectable weapon list limit
    #[serde(default = "default_max_selectable")]
    pub max_selectable_weapons: usize,
    /// Items under this tag are two-handed regardless of their definition
    #[serde(default)]
    pub two_handed_category: Option<ItemId>,
}

impl GearConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> GearResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> GearResult<()> {
        if self.max_selectable_weapons == 0 {
            return Err(GearError::InvalidConfig(
                "max_selectable_weapons must be at least 1".into(),
            ));
        }
        if self.slots.is_empty() {
            return Err(GearError::InvalidConfig("at least one gear slot is required".into()));
        }
        Ok(())
    }

    /// Check if a gear slot is configured
    pub fn has_slot(&self, slot: GearSlot) -> bool {
        self.slots.contains(&slot)
    }

    /// Whether the item occupies both hands
    pub fn is_two_handed(&self, def: &ItemDefinition) -> bool {
        let by_traits = def
            .category
            .weapon()
            .is_some_and(|traits| traits.handedness == Handedness::TwoHanded);
        let by_tag = self
            .two_handed_category
            .as_ref()
            .is_some_and(|category| def.id.matches(category));
        by_traits || by_tag
    }
}

impl Default for GearConfig {
    fn default() -> Self {
        Self {
            slots: GearSlot::all_standard(),
            max_selectable_weapons: DEFAULT_MAX_SELECTABLE_WEAPONS,
            two_handed_category: None,
        }
    }
}
