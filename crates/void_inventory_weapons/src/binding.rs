//! Weapon equip binding
//!
//! Equipped items stay in their container. A binding remembers the container
//! slot and the item it held when equipped, then follows the container's
//! change records: explicit moves and swaps relocate it, and a binding whose
//! stack is consumed or replaced by a different item is released.

use crate::error::{GearError, GearResult};
use crate::gear::{GearConfig, GearSlot};
use std::collections::BTreeMap;
use void_inventory::{ChangeKind, ChangeRecord, InventoryContainer, InventoryError, ItemId, ItemStack};

/// Why a binding was released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseReason {
    /// Stack quantity reached zero (used up, dropped, transferred away)
    Consumed,
    /// Slot now holds a different item
    Replaced,
    /// Displaced by another equip (two-handed rule or same stack re-equipped)
    Displaced,
}

/// Notification produced by equip and sync calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GearEvent {
    /// A container slot was bound to a gear slot
    Equipped {
        /// Gear slot
        gear: GearSlot,
        /// Container slot
        slot: usize,
    },
    /// A binding was released
    Unequipped {
        /// Gear slot
        gear: GearSlot,
        /// Container slot it referenced
        slot: usize,
        /// Cause
        reason: ReleaseReason,
    },
    /// An equipped stack moved to another container slot
    Relocated {
        /// Gear slot
        gear: GearSlot,
        /// Old container slot
        from: usize,
        /// New container slot
        to: usize,
    },
    /// A selectable weapon left the list
    SelectionLost {
        /// Container slot it referenced
        slot: usize,
        /// Cause
        reason: ReleaseReason,
    },
}

/// Reference to a container slot and the item it held when bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquipBinding {
    /// Container slot
    pub slot: usize,
    /// Item the slot held when bound
    pub item_id: ItemId,
}

enum Follow {
    Kept,
    Relocated { from: usize, to: usize },
    Lost(ReleaseReason),
}

impl EquipBinding {
    fn new(slot: usize, stack: &ItemStack) -> Self {
        Self {
            slot,
            item_id: stack.item_id.clone(),
        }
    }

    /// Update from one change record
    fn follow(&mut self, record: &ChangeRecord) -> Follow {
        let from = self.slot;
        match record.kind {
            ChangeKind::Moved { from: src, to } if src == self.slot => {
                let source_emptied = record.slot(src).is_some_and(|change| change.stack.is_none());
                if source_emptied {
                    self.slot = to;
                }
            }
            ChangeKind::Swapped { a, b } if a == self.slot => self.slot = b,
            ChangeKind::Swapped { a, b } if b == self.slot => self.slot = a,
            _ => {}
        }

        if let Some(change) = record.slot(self.slot) {
            match &change.stack {
                None => return Follow::Lost(ReleaseReason::Consumed),
                Some(stack) if stack.item_id != self.item_id => return Follow::Lost(ReleaseReason::Replaced),
                Some(_) => {}
            }
        }

        if from == self.slot {
            Follow::Kept
        } else {
            Follow::Relocated { from, to: self.slot }
        }
    }

    /// Check against current contents when history is unavailable
    fn revalidate(&self, container: &InventoryContainer) -> Option<ReleaseReason> {
        match container.get_slot(self.slot) {
            None => Some(ReleaseReason::Consumed),
            Some(stack) if stack.item_id != self.item_id => Some(ReleaseReason::Replaced),
            Some(_) => None,
        }
    }
}

/// Gear manager for one owner and its container
#[derive(Debug, Clone)]
pub struct GearManager {
    config: GearConfig,
    equipped: BTreeMap<GearSlot, EquipBinding>,
    selectable: Vec<EquipBinding>,
    active: Option<usize>,
    last_sequence: u64,
    last_generation: u64,
    /// Events produced by internal catch-up, returned by the next `sync`
    pending: Vec<GearEvent>,
}

impl GearManager {
    /// Create a manager tracking `container` from its current sequence
    pub fn new(config: GearConfig, container: &InventoryContainer) -> Self {
        Self {
            config,
            equipped: BTreeMap::new(),
            selectable: Vec::new(),
            active: None,
            last_sequence: container.sequence(),
            last_generation: container.generation(),
            pending: Vec::new(),
        }
    }

    /// Gear configuration
    pub fn config(&self) -> &GearConfig {
        &self.config
    }

    /// Container sequence number the bindings reflect
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Container slot bound to a gear slot
    pub fn equipped(&self, gear: GearSlot) -> Option<usize> {
        self.equipped.get(&gear).map(|binding| binding.slot)
    }

    /// Gear slot a container slot is bound to, if any
    pub fn gear_slot_of(&self, slot: usize) -> Option<GearSlot> {
        self.equipped
            .iter()
            .find(|(_, binding)| binding.slot == slot)
            .map(|(gear, _)| *gear)
    }

    /// Get all bindings
    pub fn all_equipped(&self) -> impl Iterator<Item = (&GearSlot, &EquipBinding)> {
        self.equipped.iter()
    }

    /// Current stack behind a gear slot
    pub fn resolve<'a>(&self, container: &'a InventoryContainer, gear: GearSlot) -> Option<&'a ItemStack> {
        container.get_slot(self.equipped(gear)?)
    }

    /// Bind a container slot to a gear slot. Returns everything that changed,
    /// including bindings released by catching up with the container first.
    pub fn equip(
        &mut self,
        container: &InventoryContainer,
        gear: GearSlot,
        slot: usize,
    ) -> GearResult<Vec<GearEvent>> {
        if !self.config.has_slot(gear) {
            return Err(GearError::SlotNotAvailable(gear));
        }
        let stack = container.get_slot(slot).ok_or(InventoryError::InvalidSlot(slot))?;
        let def = container.registry().lookup(&stack.item_id)?;
        if !gear.accepts(&def.category) {
            return Err(GearError::InvalidSlotForItem {
                slot: gear,
                item: stack.item_id.clone(),
            });
        }
        let two_handed = gear.is_weapon() && self.config.is_two_handed(def);
        if two_handed && gear == GearSlot::OffHand {
            return Err(GearError::InvalidSlotForItem {
                slot: gear,
                item: stack.item_id.clone(),
            });
        }

        let mut events = self.sync(container);

        let mut displaced: Vec<GearSlot> = self
            .equipped
            .iter()
            .filter(|(other, binding)| **other != gear && binding.slot == slot)
            .map(|(other, _)| *other)
            .collect();
        if two_handed {
            displaced.push(GearSlot::OffHand);
        }
        if gear == GearSlot::OffHand && self.main_hand_is_two_handed(container) {
            displaced.push(GearSlot::MainHand);
        }
        for other in displaced {
            if let Some(binding) = self.equipped.remove(&other) {
                events.push(GearEvent::Unequipped {
                    gear: other,
                    slot: binding.slot,
                    reason: ReleaseReason::Displaced,
                });
            }
        }

        if let Some(previous) = self.equipped.insert(gear, EquipBinding::new(slot, stack)) {
            if previous.slot != slot {
                events.push(GearEvent::Unequipped {
                    gear,
                    slot: previous.slot,
                    reason: ReleaseReason::Displaced,
                });
            }
        }
        log::debug!("Equipped {} from slot {} in {:?}", stack.item_id, slot, gear);
        events.push(GearEvent::Equipped { gear, slot });
        Ok(events)
    }

    fn main_hand_is_two_handed(&self, container: &InventoryContainer) -> bool {
        self.resolve(container, GearSlot::MainHand)
            .and_then(|stack| container.registry().get(&stack.item_id))
            .is_some_and(|def| self.config.is_two_handed(def))
    }

    /// Release a gear slot, returning the container slot it referenced
    pub fn unequip(&mut self, gear: GearSlot) -> Option<usize> {
        let binding = self.equipped.remove(&gear)?;
        log::debug!("Unequipped {:?} (slot {})", gear, binding.slot);
        Some(binding.slot)
    }

    /// Catch up with the container's change records.
    ///
    /// When the records are no longer retained, or the container's history
    /// was replaced by a snapshot, every binding is checked against the
    /// current slot contents instead.
    pub fn sync(&mut self, container: &InventoryContainer) -> Vec<GearEvent> {
        let mut events = std::mem::take(&mut self.pending);
        let rebased =
            container.generation() != self.last_generation || container.sequence() < self.last_sequence;
        if rebased {
            log::debug!("Gear revalidating by lookup: container history replaced");
            self.revalidate(container, &mut events);
        } else {
            self.follow_records(container, &mut events);
        }
        self.last_sequence = container.sequence();
        self.last_generation = container.generation();
        events
    }

    fn follow_records(&mut self, container: &InventoryContainer, events: &mut Vec<GearEvent>) {
        match container.changes_since(self.last_sequence) {
            Ok(records) => {
                for record in &records {
                    self.apply_record(record, events);
                }
            }
            Err(err) => {
                log::debug!("Gear revalidating by lookup: {}", err);
                self.revalidate(container, events);
            }
        }
    }

    fn apply_record(&mut self, record: &ChangeRecord, events: &mut Vec<GearEvent>) {
        let mut lost = Vec::new();
        for (gear, binding) in self.equipped.iter_mut() {
            match binding.follow(record) {
                Follow::Kept => {}
                Follow::Relocated { from, to } => events.push(GearEvent::Relocated { gear: *gear, from, to }),
                Follow::Lost(reason) => lost.push((*gear, reason)),
            }
        }
        for (gear, reason) in lost {
            if let Some(binding) = self.equipped.remove(&gear) {
                log::debug!("Released {:?} (slot {}): {:?}", gear, binding.slot, reason);
                events.push(GearEvent::Unequipped {
                    gear,
                    slot: binding.slot,
                    reason,
                });
            }
        }

        let mut index = 0;
        while index < self.selectable.len() {
            match self.selectable[index].follow(record) {
                Follow::Lost(reason) => {
                    let binding = self.remove_selectable_at(index);
                    events.push(GearEvent::SelectionLost {
                        slot: binding.slot,
                        reason,
                    });
                }
                _ => index += 1,
            }
        }
    }

    fn revalidate(&mut self, container: &InventoryContainer, events: &mut Vec<GearEvent>) {
        let lost: Vec<(GearSlot, ReleaseReason)> = self
            .equipped
            .iter()
            .filter_map(|(gear, binding)| binding.revalidate(container).map(|reason| (*gear, reason)))
            .collect();
        for (gear, reason) in lost {
            if let Some(binding) = self.equipped.remove(&gear) {
                events.push(GearEvent::Unequipped {
                    gear,
                    slot: binding.slot,
                    reason,
                });
            }
        }

        let mut index = 0;
        while index < self.selectable.len() {
            match self.selectable[index].revalidate(container) {
                Some(reason) => {
                    let binding = self.remove_selectable_at(index);
                    events.push(GearEvent::SelectionLost {
                        slot: binding.slot,
                        reason,
                    });
                }
                None => index += 1,
            }
        }
    }

    /// Container slots of the selectable weapons, in selection order
    pub fn selectable(&self) -> Vec<usize> {
        self.selectable.iter().map(|binding| binding.slot).collect()
    }

    /// Add a weapon to the selectable list, returning its index
    pub fn add_selectable(&mut self, container: &InventoryContainer, slot: usize) -> GearResult<usize> {
        self.pending = self.sync(container);

        if let Some(index) = self.selectable.iter().position(|binding| binding.slot == slot) {
            return Ok(index);
        }
        let stack = container.get_slot(slot).ok_or(InventoryError::InvalidSlot(slot))?;
        let def = container.registry().lookup(&stack.item_id)?;
        if !def.category.is_weapon() {
            return Err(GearError::InvalidSlotForItem {
                slot: GearSlot::MainHand,
                item: stack.item_id.clone(),
            });
        }
        if self.selectable.len() >= self.config.max_selectable_weapons {
            return Err(GearError::SelectionFull(self.config.max_selectable_weapons));
        }

        self.selectable.push(EquipBinding::new(slot, stack));
        Ok(self.selectable.len() - 1)
    }

    /// Remove a container slot from the selectable list
    pub fn remove_selectable(&mut self, slot: usize) -> bool {
        match self.selectable.iter().position(|binding| binding.slot == slot) {
            Some(index) => {
                self.remove_selectable_at(index);
                true
            }
            None => false,
        }
    }

    fn remove_selectable_at(&mut self, index: usize) -> EquipBinding {
        let binding = self.selectable.remove(index);
        self.active = match self.active {
            Some(active) if active == index => None,
            Some(active) if active > index => Some(active - 1),
            other => other,
        };
        binding
    }

    /// Index of the active selection
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// Container slot of the active weapon
    pub fn active_weapon(&self) -> Option<usize> {
        self.selectable.get(self.active?).map(|binding| binding.slot)
    }

    /// Make a selectable weapon active and equip it in the main hand
    pub fn select(&mut self, container: &InventoryContainer, index: usize) -> GearResult<Vec<GearEvent>> {
        let mut events = self.sync(container);
        let slot = self
            .selectable
            .get(index)
            .map(|binding| binding.slot)
            .ok_or(GearError::NoSuchSelection(index))?;

        events.extend(self.equip(container, GearSlot::MainHand, slot)?);
        self.active = Some(index);
        Ok(events)
    }

    /// Select the next weapon, wrapping around
    pub fn select_next(&mut self, container: &InventoryContainer) -> GearResult<Vec<GearEvent>> {
        self.cycle(container, 1)
    }

    /// Select the previous weapon, wrapping around
    pub fn select_previous(&mut self, container: &InventoryContainer) -> GearResult<Vec<GearEvent>> {
        self.cycle(container, -1)
    }

    fn cycle(&mut self, container: &InventoryContainer, step: isize) -> GearResult<Vec<GearEvent>> {
        let mut events = self.sync(container);
        let len = self.selectable.len();
        if len == 0 {
            return Err(GearError::NothingSelectable);
        }
        let next = match self.active {
            Some(active) => (active as isize + step).rem_euclid(len as isize) as usize,
            None if step < 0 => len - 1,
            None => 0,
        };
        events.extend(self.select(container, next)?);
        Ok(events)
    }
}
