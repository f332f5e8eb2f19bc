//! Item definitions and stacks

use crate::id::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a weapon is held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Handedness {
    /// Occupies one hand
    #[default]
    OneHanded,
    /// Occupies both hands
    TwoHanded,
}

/// Weapon-specific definition data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WeaponTraits {
    /// Hands required to wield
    #[serde(default)]
    pub handedness: Handedness,
}

/// Item category, carrying per-category data where the core needs it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ItemCategory {
    /// Weapons (swords, bows, etc.)
    Weapon(WeaponTraits),
    /// Armor pieces
    Armor,
    /// Consumables (potions, food, etc.)
    Consumable,
    /// Ammunition
    Ammo,
    /// Materials for crafting
    Material,
    /// Quest items
    Quest,
    /// Currency
    Currency,
    /// Misc items
    #[default]
    Misc,
}

impl ItemCategory {
    /// Check if this is a weapon
    pub fn is_weapon(&self) -> bool {
        matches!(self, Self::Weapon(_))
    }

    /// Weapon data, if any
    pub fn weapon(&self) -> Option<&WeaponTraits> {
        match self {
            Self::Weapon(traits) => Some(traits),
            _ => None,
        }
    }
}

/// Whether stacks with differing instance data may merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StackingRule {
    /// Only stacks with identical (or absent) instance data merge
    #[default]
    RequireIdenticalPayload,
    /// Any two stacks of the item merge; the destination keeps its data
    MergeAnyPayload,
}

/// Item property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemProperty {
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// String value
    Text(String),
}

impl ItemProperty {
    /// Get as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// Per-instance data (durability, charges, ...). Ordered so that equal data
/// serializes identically.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceData(BTreeMap<String, ItemProperty>);

impl InstanceData {
    /// Empty instance data
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: ItemProperty) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Insert or replace a property
    pub fn insert(&mut self, key: impl Into<String>, value: ItemProperty) -> Option<ItemProperty> {
        self.0.insert(key.into(), value)
    }

    /// Get property value
    pub fn get(&self, key: &str) -> Option<&ItemProperty> {
        self.0.get(key)
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate properties in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ItemProperty)> {
        self.0.iter()
    }
}

/// Immutable item metadata, keyed by identifier in the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Unique identifier
    pub id: ItemId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Category
    #[serde(default)]
    pub category: ItemCategory,
    /// Maximum stack size (1 = not stackable)
    #[serde(default = "default_max_stack")]
    pub max_stack: u32,
    /// Weight per unit
    #[serde(default)]
    pub weight: f32,
    /// Base value/price per unit
    #[serde(default)]
    pub value: u32,
    /// Merge rule for stacks with instance data
    #[serde(default)]
    pub stacking: StackingRule,
    /// Units consumed by one use (None = not usable, 0 = reusable)
    #[serde(default)]
    pub quantity_per_use: Option<u32>,
}

fn default_max_stack() -> u32 {
    1
}

impl ItemDefinition {
    /// Create a new item definition
    pub fn new(id: ItemId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            category: ItemCategory::default(),
            max_stack: 1,
            weight: 0.0,
            value: 0,
            stacking: StackingRule::default(),
            quantity_per_use: None,
        }
    }

    /// Set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Set category
    pub fn with_category(mut self, category: ItemCategory) -> Self {
        self.category = category;
        self
    }

    /// Set max stack size
    pub fn with_max_stack(mut self, max: u32) -> Self {
        self.max_stack = max.max(1);
        self
    }

    /// Set weight
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Set value
    pub fn with_value(mut self, value: u32) -> Self {
        self.value = value;
        self
    }

    /// Set stacking rule
    pub fn with_stacking(mut self, stacking: StackingRule) -> Self {
        self.stacking = stacking;
        self
    }

    /// Make usable, consuming `quantity` units per use
    pub fn with_quantity_per_use(mut self, quantity: u32) -> Self {
        self.quantity_per_use = Some(quantity);
        self
    }

    /// Check if the item can be used
    pub fn is_usable(&self) -> bool {
        self.quantity_per_use.is_some()
    }

    /// Check if stackable
    pub fn is_stackable(&self) -> bool {
        self.max_stack > 1
    }

    /// Whether stacks carrying `a` and `b` may share a slot
    pub fn payloads_compatible(&self, a: Option<&InstanceData>, b: Option<&InstanceData>) -> bool {
        match self.stacking {
            StackingRule::MergeAnyPayload => true,
            StackingRule::RequireIdenticalPayload => a == b,
        }
    }

    /// Weight of `quantity` units
    pub fn weight_of(&self, quantity: u32) -> f32 {
        self.weight * quantity as f32
    }
}

/// A quantity of one item type, occupying one slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Item ID (references ItemDefinition)
    pub item_id: ItemId,
    /// Quantity, at least 1 while the stack exists
    pub quantity: u32,
    /// Instance-specific properties (durability, enchantments, etc.)
    #[serde(default)]
    pub instance_data: Option<InstanceData>,
}

impl ItemStack {
    /// Create a new item stack
    pub fn new(item_id: ItemId, quantity: u32) -> Self {
        Self {
            item_id,
            quantity: quantity.max(1),
            instance_data: None,
        }
    }

    /// Create a single item
    pub fn single(item_id: ItemId) -> Self {
        Self::new(item_id, 1)
    }

    /// Attach instance data
    pub fn with_instance_data(mut self, data: InstanceData) -> Self {
        self.instance_data = Some(data);
        self
    }

    /// Set durability
    pub fn with_durability(self, current: f32, max: f32) -> Self {
        let data = self
            .instance_data
            .clone()
            .unwrap_or_default()
            .with("durability", ItemProperty::Float(current as f64))
            .with("max_durability", ItemProperty::Float(max as f64));
        self.with_instance_data(data)
    }

    /// Get durability (current, max)
    pub fn durability(&self) -> Option<(f32, f32)> {
        let data = self.instance_data.as_ref()?;
        let current = data.get("durability")?.as_float()? as f32;
        let max = data.get("max_durability")?.as_float()? as f32;
        Some((current, max))
    }

    /// Check if this stack is empty
    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }

    /// Room left before reaching `max_stack`
    pub fn space(&self, max_stack: u32) -> u32 {
        max_stack.saturating_sub(self.quantity)
    }

    /// Add to this stack (returns overflow if any)
    pub fn add(&mut self, amount: u32, max_stack: u32) -> u32 {
        let to_add = amount.min(self.space(max_stack));
        self.quantity += to_add;
        amount - to_add
    }

    /// Remove from this stack (returns amount actually removed)
    pub fn remove(&mut self, amount: u32) -> u32 {
        let to_remove = amount.min(self.quantity);
        self.quantity -= to_remove;
        to_remove
    }

    /// Split `amount` off into a new stack, leaving at least one unit behind
    pub fn split(&mut self, amount: u32) -> Option<ItemStack> {
        if amount > 0 && amount < self.quantity {
            self.quantity -= amount;
            Some(ItemStack {
                item_id: self.item_id.clone(),
                quantity: amount,
                instance_data: self.instance_data.clone(),
            })
        } else {
            None
        }
    }

    /// Same item and compatible instance data, regardless of room left
    pub fn can_stack_with(&self, item_id: &ItemId, instance_data: Option<&InstanceData>, def: &ItemDefinition) -> bool {
        self.item_id == *item_id && def.payloads_compatible(self.instance_data.as_ref(), instance_data)
    }

    /// Mergeable: stackable together and the combined quantity fits one stack
    pub fn can_merge(&self, other: &ItemStack, def: &ItemDefinition) -> bool {
        self.can_stack_with(&other.item_id, other.instance_data.as_ref(), def)
            && self.quantity + other.quantity <= def.max_stack
    }
}
