//! Item definition registry
//!
//! Definitions are registered during a setup phase, after which the registry
//! is sealed and shared read-only with every container (usually behind an
//! `Arc`). Containers refuse to initialize against an unsealed registry.
//!
//! ```toml
//! [[item]]
//! id = "Item.Potion.Health"
//! name = "Health Potion"
//! category = "Consumable"
//! max_stack = 5
//! weight = 0.5
//!
//! [[item]]
//! id = "Item.Weapon.Greatsword"
//! name = "Greatsword"
//! category = { Weapon = { handedness = "TwoHanded" } }
//! weight = 8.0
//! ```

use crate::error::{ConfigError, InventoryError, InventoryResult};
use crate::id::ItemId;
use crate::item::ItemDefinition;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct RegistryDocument {
    #[serde(default, rename = "item")]
    items: Vec<ItemDefinition>,
}

/// Mapping from item identifier to immutable definition
#[derive(Debug, Clone, Default)]
pub struct ItemRegistry {
    definitions: BTreeMap<ItemId, ItemDefinition>,
    sealed: bool,
}

impl ItemRegistry {
    /// Create an empty, open registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition
    pub fn register(&mut self, definition: ItemDefinition) -> InventoryResult<()> {
        if self.sealed {
            return Err(InventoryError::RegistryLocked);
        }
        Self::validate(&definition)?;
        if self.definitions.contains_key(&definition.id) {
            return Err(InventoryError::DuplicateDefinition(definition.id));
        }

        log::trace!("Registered item {}", definition.id);
        self.definitions.insert(definition.id.clone(), definition);
        Ok(())
    }

    fn validate(definition: &ItemDefinition) -> InventoryResult<()> {
        let reason = if definition.max_stack == 0 {
            Some("max stack size must be at least 1")
        } else if !definition.weight.is_finite() || definition.weight < 0.0 {
            Some("weight must be finite and non-negative")
        } else if definition.quantity_per_use.is_some_and(|per_use| per_use > definition.max_stack) {
            Some("quantity per use cannot exceed max stack size")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(InventoryError::InvalidDefinition {
                id: definition.id.clone(),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Register every `[[item]]` table of a TOML document.
    ///
    /// The document is validated as a whole first; on error nothing is
    /// registered. Returns the number of definitions added.
    pub fn load_toml(&mut self, source: &str) -> Result<usize, ConfigError> {
        if self.sealed {
            return Err(InventoryError::RegistryLocked.into());
        }

        let document: RegistryDocument = toml::from_str(source)?;

        {
            let mut seen = BTreeSet::new();
            for definition in &document.items {
                Self::validate(definition)?;
                if self.definitions.contains_key(&definition.id) || !seen.insert(&definition.id) {
                    return Err(InventoryError::DuplicateDefinition(definition.id.clone()).into());
                }
            }
        }

        let count = document.items.len();
        for definition in document.items {
            self.definitions.insert(definition.id.clone(), definition);
        }
        log::debug!("Loaded {} item definitions", count);
        Ok(count)
    }

    /// Look up a definition
    pub fn lookup(&self, id: &ItemId) -> InventoryResult<&ItemDefinition> {
        self.definitions
            .get(id)
            .ok_or_else(|| InventoryError::UnknownItem(id.clone()))
    }

    /// Look up a definition without an error
    pub fn get(&self, id: &ItemId) -> Option<&ItemDefinition> {
        self.definitions.get(id)
    }

    /// Check if an identifier is registered
    pub fn contains(&self, id: &ItemId) -> bool {
        self.definitions.contains_key(id)
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// All definitions in identifier order
    pub fn iter(&self) -> impl Iterator<Item = &ItemDefinition> {
        self.definitions.values()
    }

    /// Definitions whose identifier matches `category`
    pub fn in_category<'a>(&'a self, category: &'a ItemId) -> impl Iterator<Item = &'a ItemDefinition> + 'a {
        self.definitions
            .values()
            .filter(move |def| def.id.matches(category))
    }

    /// End the registration phase
    pub fn seal(&mut self) {
        if !self.sealed {
            log::debug!("Item registry sealed with {} definitions", self.definitions.len());
        }
        self.sealed = true;
    }

    /// Check if sealed
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Seal and wrap for sharing with containers
    pub fn into_shared(mut self) -> Arc<Self> {
        self.seal();
        Arc::new(self)
    }
}
