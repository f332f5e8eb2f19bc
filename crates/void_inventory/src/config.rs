//! Container configuration
//!
//! Supplied by the owning actor at spawn time, typically from TOML:
//!
//! ```toml
//! capacity = 20
//! max_weight = 75.0
//! journal_capacity = 128
//!
//! [[initial_items]]
//! item = "Item.Potion.Health"
//! quantity = 3
//! ```

use crate::change::DEFAULT_JOURNAL_CAPACITY;
use crate::error::ConfigError;
use crate::id::ItemId;
use serde::{Deserialize, Serialize};

/// Item placed into a container when it initializes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialItem {
    /// Item to place
    pub item: ItemId,
    /// Units to place
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

fn default_journal_capacity() -> usize {
    DEFAULT_JOURNAL_CAPACITY
}

/// Construction parameters for an inventory container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Number of slots
    pub capacity: usize,
    /// Total weight cap (None = unlimited)
    #[serde(default)]
    pub max_weight: Option<f32>,
    /// Change records retained for delta replication
    #[serde(default = "default_journal_capacity")]
    pub journal_capacity: usize,
    /// Items placed during initialization
    #[serde(default)]
    pub initial_items: Vec<InitialItem>,
}

impl ContainerConfig {
    /// Create a config with the given slot count and no weight cap
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            max_weight: None,
            journal_capacity: DEFAULT_JOURNAL_CAPACITY,
            initial_items: Vec::new(),
        }
    }

    /// Set maximum weight
    pub fn with_max_weight(mut self, weight: f32) -> Self {
        self.max_weight = Some(weight);
        self
    }

    /// Set journal retention
    pub fn with_journal_capacity(mut self, records: usize) -> Self {
        self.journal_capacity = records;
        self
    }

    /// Add an item placed on initialization
    pub fn with_initial_item(mut self, item: ItemId, quantity: u32) -> Self {
        self.initial_items.push(InitialItem { item, quantity });
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be at least 1".into()));
        }
        if let Some(weight) = self.max_weight {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "max_weight must be finite and non-negative, got {}",
                    weight
                )));
            }
        }
        if let Some(item) = self.initial_items.iter().find(|i| i.quantity == 0) {
            return Err(ConfigError::Invalid(format!(
                "initial item {} has zero quantity",
                item.item
            )));
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self::new(20)
    }
}
