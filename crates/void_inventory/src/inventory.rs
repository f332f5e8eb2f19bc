//! Inventory container component
//!
//! A fixed number of slots, each empty or holding one [`ItemStack`], with an
//! optional total weight cap. Slot indices are stable handles: a stack only
//! changes slot through an explicit move, swap or split, never as a side
//! effect of adding or removing other stacks.
//!
//! Every mutating operation validates completely before writing anything, so
//! a failed call leaves the container untouched. A successful call emits one
//! [`ChangeRecord`] into the container's journal.

use crate::change::{ChangeJournal, ChangeKind, ChangeRecord, SlotChange};
use crate::config::ContainerConfig;
use crate::error::{InventoryError, InventoryResult};
use crate::id::ItemId;
use crate::item::{InstanceData, ItemDefinition, ItemStack};
use crate::registry::ItemRegistry;
use std::fmt;
use std::sync::Arc;

/// Tolerance applied to weight comparisons
pub const WEIGHT_EPSILON: f64 = 1e-4;

/// Container lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    /// Constructed, initial items not yet placed
    Uninitialized,
    /// Accepting operations for the rest of its lifetime
    Ready,
}

/// Result of [`InventoryContainer::try_add_stack`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOutcome {
    /// Units asked for
    pub requested: u32,
    /// Units placed
    pub placed: u32,
    /// Slots that received units, in placement order
    pub affected_slots: Vec<usize>,
    /// Sequence number of the emitted change record
    pub sequence: u64,
}

impl AddOutcome {
    /// Units that could not be placed
    pub fn rejected(&self) -> u32 {
        self.requested - self.placed
    }

    /// Whether every requested unit was placed
    pub fn is_complete(&self) -> bool {
        self.placed == self.requested
    }
}

/// Result of [`InventoryContainer::use_item`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseOutcome {
    /// Item that was used
    pub item_id: ItemId,
    /// Units consumed by the use
    pub consumed: u32,
    /// Units left in the slot (0 = slot emptied)
    pub remaining: u32,
    /// Sequence number of the emitted change record
    pub sequence: u64,
}

/// Authority hook limiting how many units of an item a container accepts.
/// Consulted for direct adds and for transfers into the container.
pub trait AddPolicy: Send + Sync {
    /// Units out of `placeable` the container may receive (0 rejects)
    fn allowed_quantity(&self, item_id: &ItemId, placeable: u32) -> u32;
}

impl<F> AddPolicy for F
where
    F: Fn(&ItemId, u32) -> u32 + Send + Sync,
{
    fn allowed_quantity(&self, item_id: &ItemId, placeable: u32) -> u32 {
        self(item_id, placeable)
    }
}

impl fmt::Debug for dyn AddPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AddPolicy")
    }
}

/// Result of [`InventoryContainer::move_stack`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Units now in the destination slot that came from the source
    pub moved: u32,
    /// Units left behind in the source slot (0 = source emptied)
    pub remaining: u32,
}

/// Units destined for one slot in an add plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Placement {
    pub slot: usize,
    pub quantity: u32,
    pub opens_slot: bool,
}

/// Simulated placement, computed without mutating the container
#[derive(Debug, Clone)]
pub(crate) struct AddPlan {
    pub item_id: ItemId,
    pub instance_data: Option<InstanceData>,
    pub placements: Vec<Placement>,
    pub placed: u32,
    /// Room existed but the add policy allowed nothing
    pub vetoed: bool,
}

/// Inventory container component
#[derive(Debug, Clone)]
pub struct InventoryContainer {
    /// Shared, sealed item definitions
    pub(crate) registry: Arc<ItemRegistry>,
    /// Construction parameters
    pub(crate) config: ContainerConfig,
    /// Inventory slots (None = empty)
    pub(crate) slots: Vec<Option<ItemStack>>,
    /// Lifecycle state
    pub(crate) state: ContainerState,
    /// Recent change records
    pub(crate) journal: ChangeJournal,
    /// Optional cap on incoming units
    pub(crate) add_policy: Option<Arc<dyn AddPolicy>>,
}

impl InventoryContainer {
    /// Create an uninitialized container
    pub fn new(registry: Arc<ItemRegistry>, config: ContainerConfig) -> Self {
        Self {
            slots: vec![None; config.capacity],
            journal: ChangeJournal::new(config.journal_capacity),
            registry,
            config,
            state: ContainerState::Uninitialized,
            add_policy: None,
        }
    }

    /// Create and initialize in one step, as an owning actor does at spawn
    pub fn spawn(registry: Arc<ItemRegistry>, config: ContainerConfig) -> InventoryResult<Self> {
        let mut container = Self::new(registry, config);
        container.initialize()?;
        Ok(container)
    }

    /// Place the configured initial items and enter the ready state.
    ///
    /// Initial items that do not fit are dropped with a warning.
    pub fn initialize(&mut self) -> InventoryResult<()> {
        if self.state == ContainerState::Ready {
            return Ok(());
        }
        if !self.registry.is_sealed() {
            return Err(InventoryError::RegistryNotSealed);
        }
        for initial in &self.config.initial_items {
            self.registry.lookup(&initial.item)?;
        }

        self.state = ContainerState::Ready;

        let initial_items = self.config.initial_items.clone();
        for initial in initial_items {
            match self.try_add_stack(initial.item.clone(), initial.quantity, None) {
                Ok(outcome) if !outcome.is_complete() => log::warn!(
                    "Initial item {} only partially placed ({}/{})",
                    initial.item,
                    outcome.placed,
                    outcome.requested
                ),
                Ok(_) => {}
                Err(err) => log::warn!("Initial item {} not placed: {}", initial.item, err),
            }
        }
        Ok(())
    }

    /// Install the hook that limits incoming units, replacing any previous one
    pub fn set_add_policy(&mut self, policy: impl AddPolicy + 'static) {
        self.add_policy = Some(Arc::new(policy));
    }

    /// Remove the add policy; every unit that fits is accepted again
    pub fn clear_add_policy(&mut self) {
        self.add_policy = None;
    }

    /// Lifecycle state
    pub fn state(&self) -> ContainerState {
        self.state
    }

    /// Check if ready for operations
    pub fn is_ready(&self) -> bool {
        self.state == ContainerState::Ready
    }

    /// Item definitions used by this container
    pub fn registry(&self) -> &Arc<ItemRegistry> {
        &self.registry
    }

    /// Construction parameters
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Get inventory capacity
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Weight cap, if any
    pub fn max_weight(&self) -> Option<f32> {
        self.config.max_weight
    }

    /// Sequence number of the last emitted change record
    pub fn sequence(&self) -> u64 {
        self.journal.latest()
    }

    /// Journal generation, bumped whenever history is discarded by a
    /// snapshot that does not follow on from the current state
    pub fn generation(&self) -> u64 {
        self.journal.generation()
    }

    /// Change journal
    pub fn journal(&self) -> &ChangeJournal {
        &self.journal
    }

    /// Get slot contents
    pub fn get_slot(&self, slot: usize) -> Option<&ItemStack> {
        self.slots.get(slot)?.as_ref()
    }

    /// All slots in index order
    pub fn slots(&self) -> &[Option<ItemStack>] {
        &self.slots
    }

    /// Get all items as iterator
    pub fn items(&self) -> impl Iterator<Item = (usize, &ItemStack)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|stack| (i, stack)))
    }

    /// Get number of used slots
    pub fn used_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Get number of free slots
    pub fn free_slots(&self) -> usize {
        self.capacity() - self.used_slots()
    }

    /// Check if every slot is occupied
    pub fn is_full(&self) -> bool {
        self.free_slots() == 0
    }

    /// Check if inventory is empty
    pub fn is_empty(&self) -> bool {
        self.used_slots() == 0
    }

    /// Find first empty slot
    pub fn find_empty_slot(&self) -> Option<usize> {
        self.slots.iter().position(|s| s.is_none())
    }

    /// Find slot containing specific item
    pub fn find_item(&self, item_id: &ItemId) -> Option<usize> {
        self.items()
            .find(|(_, stack)| stack.item_id == *item_id)
            .map(|(i, _)| i)
    }

    /// Find all slots containing specific item
    pub fn find_all_items(&self, item_id: &ItemId) -> Vec<usize> {
        self.items()
            .filter(|(_, stack)| stack.item_id == *item_id)
            .map(|(i, _)| i)
            .collect()
    }

    /// Slots whose item matches a category tag
    pub fn slots_in_category(&self, category: &ItemId) -> Vec<usize> {
        self.items()
            .filter(|(_, stack)| stack.item_id.matches(category))
            .map(|(i, _)| i)
            .collect()
    }

    /// Count total quantity of an item. Summed in `u64` since several
    /// stacks may together exceed `u32::MAX`.
    pub fn quantity_of(&self, item_id: &ItemId) -> u64 {
        self.items()
            .filter(|(_, stack)| stack.item_id == *item_id)
            .map(|(_, stack)| u64::from(stack.quantity))
            .sum()
    }

    /// Check if at least `quantity` units of an item are present
    pub fn contains(&self, item_id: &ItemId, quantity: u32) -> bool {
        self.quantity_of(item_id) >= u64::from(quantity)
    }

    /// Total weight of every stack
    pub fn current_weight(&self) -> f32 {
        self.total_weight() as f32
    }

    fn total_weight(&self) -> f64 {
        self.items()
            .filter_map(|(_, stack)| {
                self.registry
                    .get(&stack.item_id)
                    .map(|def| def.weight as f64 * stack.quantity as f64)
            })
            .sum()
    }

    /// Units of `def` that fit under the weight cap
    fn weight_room(&self, def: &ItemDefinition) -> u32 {
        match self.config.max_weight {
            Some(cap) if def.weight > 0.0 => {
                let room = (cap as f64 - self.total_weight() + WEIGHT_EPSILON) / def.weight as f64;
                if room <= 0.0 {
                    0
                } else {
                    room.floor().min(u32::MAX as f64) as u32
                }
            }
            _ => u32::MAX,
        }
    }

    /// Units of an item this container could receive right now, limited by
    /// slot room and weight
    pub fn receivable_quantity(&self, item_id: &ItemId, instance_data: Option<&InstanceData>) -> InventoryResult<u32> {
        Ok(self.plan_add(item_id, u32::MAX, instance_data)?.placed)
    }

    pub(crate) fn ensure_ready(&self) -> InventoryResult<()> {
        match self.state {
            ContainerState::Ready => Ok(()),
            ContainerState::Uninitialized => Err(InventoryError::NotReady),
        }
    }

    fn ensure_in_range(&self, slot: usize) -> InventoryResult<()> {
        if slot < self.slots.len() {
            Ok(())
        } else {
            Err(InventoryError::InvalidSlot(slot))
        }
    }

    /// Copy of the slot state with no history, for simulating a sequence of
    /// placements
    pub(crate) fn scratch(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            config: self.config.clone(),
            slots: self.slots.clone(),
            state: self.state,
            journal: ChangeJournal::new(0),
            add_policy: self.add_policy.clone(),
        }
    }

    /// Occupied slot contents, or `InvalidSlot`
    pub(crate) fn occupied(&self, slot: usize) -> InventoryResult<&ItemStack> {
        self.get_slot(slot).ok_or(InventoryError::InvalidSlot(slot))
    }

    /// Simulate placing `quantity` units: merge into compatible stacks by
    /// ascending slot, then open empty slots by ascending slot, within the
    /// weight cap and whatever the add policy allows.
    pub(crate) fn plan_add(
        &self,
        item_id: &ItemId,
        quantity: u32,
        instance_data: Option<&InstanceData>,
    ) -> InventoryResult<AddPlan> {
        let def = self.registry.lookup(item_id)?;
        let budget = quantity.min(self.weight_room(def));
        let (mut placements, mut placed) = self.placements(item_id, def, instance_data, budget);
        let mut vetoed = false;

        if let Some(policy) = &self.add_policy {
            if placed > 0 {
                let allowed = policy.allowed_quantity(item_id, placed);
                if allowed < placed {
                    log::debug!("Add policy limits {} to {} of {}", item_id, allowed, placed);
                    (placements, placed) = self.placements(item_id, def, instance_data, allowed);
                    vetoed = allowed == 0;
                }
            }
        }

        Ok(AddPlan {
            item_id: item_id.clone(),
            instance_data: instance_data.cloned(),
            placements,
            placed,
            vetoed,
        })
    }

    fn placements(
        &self,
        item_id: &ItemId,
        def: &ItemDefinition,
        instance_data: Option<&InstanceData>,
        budget: u32,
    ) -> (Vec<Placement>, u32) {
        let mut remaining = budget;
        let mut placements = Vec::new();

        for (slot, stack) in self.items() {
            if remaining == 0 {
                break;
            }
            if !stack.can_stack_with(item_id, instance_data, def) {
                continue;
            }
            let take = stack.space(def.max_stack).min(remaining);
            if take > 0 {
                placements.push(Placement { slot, quantity: take, opens_slot: false });
                remaining -= take;
            }
        }

        for (slot, contents) in self.slots.iter().enumerate() {
            if remaining == 0 {
                break;
            }
            if contents.is_none() {
                let take = def.max_stack.min(remaining);
                placements.push(Placement { slot, quantity: take, opens_slot: true });
                remaining -= take;
            }
        }

        (placements, budget - remaining)
    }

    /// Write a plan computed against the current state
    pub(crate) fn commit_add(&mut self, plan: &AddPlan) -> Vec<usize> {
        let mut touched = Vec::with_capacity(plan.placements.len());
        for placement in &plan.placements {
            if placement.opens_slot {
                self.slots[placement.slot] = Some(ItemStack {
                    item_id: plan.item_id.clone(),
                    quantity: placement.quantity,
                    instance_data: plan.instance_data.clone(),
                });
            } else if let Some(stack) = self.slots[placement.slot].as_mut() {
                stack.quantity += placement.quantity;
            }
            touched.push(placement.slot);
        }
        touched
    }

    /// Take `quantity` units out of an occupied slot, clearing it when it
    /// reaches zero. Caller has validated slot and quantity.
    pub(crate) fn take_units(&mut self, slot: usize, quantity: u32) -> Option<ItemStack> {
        let contents = &mut self.slots[slot];
        let available = contents.as_ref()?.quantity;
        if quantity >= available {
            contents.take()
        } else {
            contents.as_mut()?.split(quantity)
        }
    }

    /// Append a change record describing the current contents of `slots`
    pub(crate) fn emit(&mut self, kind: ChangeKind, slots: Vec<usize>) -> u64 {
        let mut indices = slots;
        indices.dedup();
        let record = ChangeRecord {
            sequence: self.journal.next_sequence(),
            kind,
            slots: indices
                .into_iter()
                .map(|slot| SlotChange {
                    slot,
                    stack: self.slots[slot].clone(),
                })
                .collect(),
        };
        let sequence = record.sequence;
        log::trace!("Container change #{} {:?} {:?}", sequence, record.kind, record.slots);
        self.journal.push(record);
        sequence
    }

    /// Add units of an item.
    ///
    /// Merges into existing compatible stacks first (lowest slot first), then
    /// opens the lowest empty slots. Placement stops when the quantity is
    /// exhausted, slots run out, or the weight cap is reached; the outcome
    /// reports how many units were placed. Fails with `ContainerFull` if no
    /// unit at all can be placed, or `AddRejected` if the add policy
    /// refuses every unit that would fit.
    pub fn try_add_stack(
        &mut self,
        item_id: ItemId,
        quantity: u32,
        instance_data: Option<InstanceData>,
    ) -> InventoryResult<AddOutcome> {
        self.ensure_ready()?;
        if quantity == 0 {
            return Err(InventoryError::InvalidQuantity);
        }

        let plan = self.plan_add(&item_id, quantity, instance_data.as_ref())?;
        if plan.vetoed {
            return Err(InventoryError::AddRejected(item_id));
        }
        if plan.placed == 0 {
            log::debug!("No room for {} x{}", item_id, quantity);
            return Err(InventoryError::ContainerFull);
        }

        let affected_slots = self.commit_add(&plan);
        let sequence = self.emit(ChangeKind::Added, affected_slots.clone());
        Ok(AddOutcome {
            requested: quantity,
            placed: plan.placed,
            affected_slots,
            sequence,
        })
    }

    /// Remove units from one slot, returning them as a stack. The slot is
    /// cleared when it reaches zero; other slots never shift.
    pub fn remove_quantity(&mut self, slot: usize, quantity: u32) -> InventoryResult<ItemStack> {
        self.ensure_ready()?;
        if quantity == 0 {
            return Err(InventoryError::InvalidQuantity);
        }
        let available = self.occupied(slot)?.quantity;
        if quantity > available {
            return Err(InventoryError::InsufficientQuantity {
                requested: quantity,
                available,
            });
        }

        let removed = self
            .take_units(slot, quantity)
            .ok_or(InventoryError::InvalidSlot(slot))?;
        self.emit(ChangeKind::Removed, vec![slot]);
        Ok(removed)
    }

    /// Remove units of an item across slots, lowest slot first. All or
    /// nothing: fails with `InsufficientQuantity` if not enough is present.
    pub fn remove_item(&mut self, item_id: &ItemId, quantity: u32) -> InventoryResult<Vec<ItemStack>> {
        self.ensure_ready()?;
        if quantity == 0 {
            return Err(InventoryError::InvalidQuantity);
        }
        let available = self.quantity_of(item_id);
        if available < u64::from(quantity) {
            return Err(InventoryError::InsufficientQuantity {
                requested: quantity,
                available: u32::try_from(available).unwrap_or(u32::MAX),
            });
        }

        let (removed, touched) = self.take_item_units(item_id, quantity);
        self.emit(ChangeKind::Removed, touched);
        Ok(removed)
    }

    /// Take units of an item from ascending slots. Caller has checked the
    /// total.
    pub(crate) fn take_item_units(&mut self, item_id: &ItemId, quantity: u32) -> (Vec<ItemStack>, Vec<usize>) {
        let mut remaining = quantity;
        let mut removed = Vec::new();
        let mut touched = Vec::new();

        for slot in self.find_all_items(item_id) {
            if remaining == 0 {
                break;
            }
            let take = self.slots[slot].as_ref().map_or(0, |s| s.quantity.min(remaining));
            if let Some(stack) = self.take_units(slot, take) {
                remaining -= stack.quantity;
                removed.push(stack);
                touched.push(slot);
            }
        }
        (removed, touched)
    }

    /// Use the item in a slot, consuming its definition's quantity per use.
    /// A stack that reaches zero is cleared, which releases any equip
    /// binding on the slot. Reusable items (zero per use) still emit a
    /// `Used` record.
    pub fn use_item(&mut self, slot: usize) -> InventoryResult<UseOutcome> {
        self.ensure_ready()?;
        let stack = self.occupied(slot)?;
        let item_id = stack.item_id.clone();
        let available = stack.quantity;
        let per_use = self
            .registry
            .lookup(&item_id)?
            .quantity_per_use
            .ok_or_else(|| InventoryError::NotUsable(item_id.clone()))?;
        if per_use > available {
            return Err(InventoryError::InsufficientQuantity {
                requested: per_use,
                available,
            });
        }

        if per_use > 0 {
            self.take_units(slot, per_use);
        }
        let sequence = self.emit(ChangeKind::Used, vec![slot]);
        log::trace!("Used {} from slot {} ({} consumed)", item_id, slot, per_use);
        Ok(UseOutcome {
            item_id,
            consumed: per_use,
            remaining: available - per_use,
            sequence,
        })
    }

    /// Move a stack to another slot.
    ///
    /// An empty destination takes the whole stack. A destination holding a
    /// compatible stack absorbs as much as fits and the overflow stays in the
    /// source. Any other destination fails with `SlotOccupied`.
    pub fn move_stack(&mut self, from: usize, to: usize) -> InventoryResult<MoveOutcome> {
        self.ensure_ready()?;
        self.ensure_in_range(to)?;
        let source = self.occupied(from)?;
        if from == to {
            return Err(InventoryError::InvalidSlot(to));
        }

        let source_quantity = source.quantity;
        let moved = match &self.slots[to] {
            None => source_quantity,
            Some(dest) => {
                let def = self.registry.lookup(&dest.item_id)?;
                if !dest.can_stack_with(&source.item_id, source.instance_data.as_ref(), def) {
                    return Err(InventoryError::SlotOccupied(to));
                }
                let room = dest.space(def.max_stack);
                if room == 0 {
                    return Err(InventoryError::SlotOccupied(to));
                }
                room.min(source_quantity)
            }
        };

        if self.slots[to].is_none() {
            self.slots[to] = self.slots[from].take();
        } else if let Some(taken) = self.take_units(from, moved) {
            if let Some(dest) = &mut self.slots[to] {
                dest.quantity += taken.quantity;
            }
        }

        self.emit(ChangeKind::Moved { from, to }, vec![from, to]);
        Ok(MoveOutcome {
            moved,
            remaining: source_quantity - moved,
        })
    }

    /// Exchange the contents of two slots
    pub fn swap_slots(&mut self, slot_a: usize, slot_b: usize) -> InventoryResult<()> {
        self.ensure_ready()?;
        self.ensure_in_range(slot_a)?;
        self.ensure_in_range(slot_b)?;
        if slot_a == slot_b {
            return Err(InventoryError::InvalidSlot(slot_b));
        }
        if self.slots[slot_a].is_none() && self.slots[slot_b].is_none() {
            return Err(InventoryError::InvalidSlot(slot_a));
        }

        self.slots.swap(slot_a, slot_b);
        self.emit(ChangeKind::Swapped { a: slot_a, b: slot_b }, vec![slot_a, slot_b]);
        Ok(())
    }

    /// Split `quantity` units off a stack into the lowest empty slot.
    /// At least one unit must stay behind. Returns the new slot.
    pub fn split_stack(&mut self, slot: usize, quantity: u32) -> InventoryResult<usize> {
        self.ensure_ready()?;
        if quantity == 0 {
            return Err(InventoryError::InvalidQuantity);
        }
        let available = self.occupied(slot)?.quantity;
        if quantity >= available {
            return Err(InventoryError::InsufficientQuantity {
                requested: quantity,
                available,
            });
        }
        let target = self.find_empty_slot().ok_or(InventoryError::ContainerFull)?;

        let split = self.slots[slot]
            .as_mut()
            .and_then(|stack| stack.split(quantity))
            .ok_or(InventoryError::InvalidSlot(slot))?;
        self.slots[target] = Some(split);

        self.emit(ChangeKind::Split { from: slot, to: target }, vec![slot, target]);
        Ok(target)
    }

    /// Empty every slot, returning what was removed
    pub fn clear(&mut self) -> InventoryResult<Vec<ItemStack>> {
        self.ensure_ready()?;

        let mut removed = Vec::new();
        let mut touched = Vec::new();
        for (slot, contents) in self.slots.iter_mut().enumerate() {
            if let Some(stack) = contents.take() {
                removed.push(stack);
                touched.push(slot);
            }
        }

        if !touched.is_empty() {
            self.emit(ChangeKind::Cleared, touched);
        }
        Ok(removed)
    }

    /// Verify the container invariants: no empty stacks, no stack above its
    /// max size, every item known, weight within the cap
    pub fn check_invariants(&self) -> InventoryResult<()> {
        validate_slots(&self.registry, &self.slots, self.config.max_weight)
            .map_err(InventoryError::SnapshotMismatch)
    }
}

/// Check a slot vector against the container invariants
pub(crate) fn validate_slots(
    registry: &ItemRegistry,
    slots: &[Option<ItemStack>],
    max_weight: Option<f32>,
) -> Result<(), String> {
    let mut weight = 0.0f64;
    for (slot, stack) in slots.iter().enumerate() {
        let Some(stack) = stack else { continue };
        let def = registry
            .get(&stack.item_id)
            .ok_or_else(|| format!("slot {} holds unknown item {}", slot, stack.item_id))?;
        if stack.quantity == 0 {
            return Err(format!("slot {} holds a zero-quantity stack", slot));
        }
        if stack.quantity > def.max_stack {
            return Err(format!(
                "slot {} holds {} x{} above max stack {}",
                slot, stack.item_id, stack.quantity, def.max_stack
            ));
        }
        weight += def.weight as f64 * stack.quantity as f64;
    }
    if let Some(cap) = max_weight {
        if weight > cap as f64 + WEIGHT_EPSILON {
            return Err(format!("weight {} exceeds cap {}", weight, cap));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemCategory, StackingRule, WeaponTraits};

    fn id(tag: &str) -> ItemId {
        ItemId::new(tag).unwrap()
    }

    fn registry() -> Arc<ItemRegistry> {
        let mut registry = ItemRegistry::new();
        for def in [
            ItemDefinition::new(id("Item.Potion"), "Potion")
                .with_max_stack(5)
                .with_weight(0.5)
                .with_quantity_per_use(1),
            ItemDefinition::new(id("Item.Arrow"), "Arrow").with_max_stack(10).with_weight(1.0),
            ItemDefinition::new(id("Item.Gold"), "Gold").with_max_stack(100),
            ItemDefinition::new(id("Item.Coin"), "Coin").with_max_stack(u32::MAX),
            ItemDefinition::new(id("Item.Bomb"), "Bomb").with_max_stack(10).with_quantity_per_use(2),
            ItemDefinition::new(id("Item.Scroll"), "Scroll").with_quantity_per_use(0),
            ItemDefinition::new(id("Item.Weapon.Sword"), "Sword")
                .with_category(ItemCategory::Weapon(WeaponTraits::default()))
                .with_weight(3.0),
            ItemDefinition::new(id("Item.Weapon.Dagger"), "Dagger")
                .with_category(ItemCategory::Weapon(WeaponTraits::default()))
                .with_max_stack(4)
                .with_stacking(StackingRule::MergeAnyPayload),
        ] {
            registry.register(def).unwrap();
        }
        registry.into_shared()
    }

    fn container(capacity: usize) -> InventoryContainer {
        InventoryContainer::spawn(registry(), ContainerConfig::new(capacity)).unwrap()
    }

    #[test]
    fn test_inventory_creation() {
        let inv = container(10);

        assert_eq!(inv.capacity(), 10);
        assert_eq!(inv.used_slots(), 0);
        assert!(inv.is_empty());
        assert!(inv.is_ready());
        assert_eq!(inv.sequence(), 0);
    }

    #[test]
    fn test_uninitialized_rejects_mutation() {
        let mut inv = InventoryContainer::new(registry(), ContainerConfig::new(4));

        assert_eq!(inv.state(), ContainerState::Uninitialized);
        assert_eq!(
            inv.try_add_stack(id("Item.Potion"), 1, None),
            Err(InventoryError::NotReady)
        );

        inv.initialize().unwrap();
        assert!(inv.try_add_stack(id("Item.Potion"), 1, None).is_ok());
    }

    #[test]
    fn test_unsealed_registry_rejected() {
        let mut open = ItemRegistry::new();
        open.register(ItemDefinition::new(id("Item.Potion"), "Potion")).unwrap();

        let result = InventoryContainer::spawn(Arc::new(open), ContainerConfig::new(4));
        assert_eq!(result.err(), Some(InventoryError::RegistryNotSealed));
    }

    #[test]
    fn test_initial_items() {
        let config = ContainerConfig::new(3)
            .with_initial_item(id("Item.Potion"), 7)
            .with_initial_item(id("Item.Weapon.Sword"), 1);
        let inv = InventoryContainer::spawn(registry(), config).unwrap();

        assert_eq!(inv.get_slot(0).unwrap().quantity, 5);
        assert_eq!(inv.get_slot(1).unwrap().quantity, 2);
        assert_eq!(inv.get_slot(2).unwrap().item_id, id("Item.Weapon.Sword"));
        assert_eq!(inv.sequence(), 2);
    }

    #[test]
    fn test_initial_unknown_item_fails() {
        let config = ContainerConfig::new(3).with_initial_item(id("Item.Missing"), 1);
        let result = InventoryContainer::spawn(registry(), config);
        assert_eq!(result.err(), Some(InventoryError::UnknownItem(id("Item.Missing"))));
    }

    #[test]
    fn test_add_merges_first() {
        let mut inv = container(5);
        inv.try_add_stack(id("Item.Potion"), 3, None).unwrap();

        let outcome = inv.try_add_stack(id("Item.Potion"), 4, None).unwrap();

        assert_eq!(outcome.placed, 4);
        assert_eq!(outcome.rejected(), 0);
        assert_eq!(outcome.affected_slots, vec![0, 1]);
        assert_eq!(inv.get_slot(0).unwrap().quantity, 5);
        assert_eq!(inv.get_slot(1).unwrap().quantity, 2);
    }

    #[test]
    fn test_add_fills_gaps_lowest_first() {
        let mut inv = container(4);
        inv.try_add_stack(id("Item.Weapon.Sword"), 1, None).unwrap();
        inv.try_add_stack(id("Item.Gold"), 10, None).unwrap();
        inv.remove_quantity(0, 1).unwrap();

        let outcome = inv.try_add_stack(id("Item.Arrow"), 5, None).unwrap();
        assert_eq!(outcome.affected_slots, vec![0]);
        assert_eq!(inv.get_slot(1).unwrap().item_id, id("Item.Gold"));
    }

    #[test]
    fn test_partial_add_reports_overflow() {
        let mut inv = container(2);

        let outcome = inv.try_add_stack(id("Item.Potion"), 12, None).unwrap();

        assert_eq!(outcome.placed, 10);
        assert_eq!(outcome.rejected(), 2);
        assert!(!outcome.is_complete());
        assert_eq!(inv.quantity_of(&id("Item.Potion")), 10);
    }

    #[test]
    fn test_add_to_full_container() {
        let mut inv = container(2);
        inv.try_add_stack(id("Item.Weapon.Sword"), 2, None).unwrap();
        let before = inv.slots().to_vec();

        assert_eq!(
            inv.try_add_stack(id("Item.Arrow"), 1, None),
            Err(InventoryError::ContainerFull)
        );
        assert_eq!(inv.slots(), before.as_slice());
        assert_eq!(inv.sequence(), 1);
    }

    #[test]
    fn test_weight_limit_partial() {
        let config = ContainerConfig::new(5).with_max_weight(6.0);
        let mut inv = InventoryContainer::spawn(registry(), config).unwrap();

        let outcome = inv.try_add_stack(id("Item.Arrow"), 10, None).unwrap();
        assert_eq!(outcome.placed, 6);
        assert!((inv.current_weight() - 6.0).abs() < 1e-4);

        assert_eq!(
            inv.try_add_stack(id("Item.Arrow"), 1, None),
            Err(InventoryError::ContainerFull)
        );
        // Weightless items still fit
        assert!(inv.try_add_stack(id("Item.Gold"), 50, None).is_ok());
    }

    #[test]
    fn test_add_unknown_and_zero() {
        let mut inv = container(2);
        assert_eq!(
            inv.try_add_stack(id("Item.Missing"), 1, None),
            Err(InventoryError::UnknownItem(id("Item.Missing")))
        );
        assert_eq!(
            inv.try_add_stack(id("Item.Potion"), 0, None),
            Err(InventoryError::InvalidQuantity)
        );
    }

    #[test]
    fn test_instance_data_keeps_stacks_apart() {
        let mut inv = container(4);
        let worn = InstanceData::new().with("durability", crate::item::ItemProperty::Int(3));

        inv.try_add_stack(id("Item.Potion"), 2, None).unwrap();
        let outcome = inv.try_add_stack(id("Item.Potion"), 2, Some(worn.clone())).unwrap();
        assert_eq!(outcome.affected_slots, vec![1]);

        // MergeAnyPayload keeps the destination's data
        inv.try_add_stack(id("Item.Weapon.Dagger"), 1, Some(worn)).unwrap();
        let outcome = inv.try_add_stack(id("Item.Weapon.Dagger"), 1, None).unwrap();
        assert_eq!(outcome.affected_slots, vec![2]);
        assert!(inv.get_slot(2).unwrap().instance_data.is_some());
    }

    #[test]
    fn test_remove_quantity() {
        let mut inv = container(3);
        inv.try_add_stack(id("Item.Arrow"), 8, None).unwrap();

        let removed = inv.remove_quantity(0, 3).unwrap();
        assert_eq!(removed.quantity, 3);
        assert_eq!(inv.get_slot(0).unwrap().quantity, 5);

        inv.remove_quantity(0, 5).unwrap();
        assert!(inv.get_slot(0).is_none());
    }

    #[test]
    fn test_remove_quantity_errors() {
        let mut inv = container(3);
        inv.try_add_stack(id("Item.Arrow"), 4, None).unwrap();

        assert_eq!(inv.remove_quantity(1, 1), Err(InventoryError::InvalidSlot(1)));
        assert_eq!(inv.remove_quantity(9, 1), Err(InventoryError::InvalidSlot(9)));
        assert_eq!(
            inv.remove_quantity(0, 5),
            Err(InventoryError::InsufficientQuantity { requested: 5, available: 4 })
        );
        assert_eq!(inv.get_slot(0).unwrap().quantity, 4);
        assert_eq!(inv.sequence(), 1);
    }

    #[test]
    fn test_remove_does_not_shift() {
        let mut inv = container(3);
        inv.try_add_stack(id("Item.Weapon.Sword"), 1, None).unwrap();
        inv.try_add_stack(id("Item.Arrow"), 2, None).unwrap();
        inv.try_add_stack(id("Item.Gold"), 2, None).unwrap();

        inv.remove_quantity(0, 1).unwrap();

        assert!(inv.get_slot(0).is_none());
        assert_eq!(inv.get_slot(1).unwrap().item_id, id("Item.Arrow"));
        assert_eq!(inv.get_slot(2).unwrap().item_id, id("Item.Gold"));
    }

    #[test]
    fn test_remove_item_all_or_nothing() {
        let mut inv = container(4);
        inv.try_add_stack(id("Item.Potion"), 8, None).unwrap();

        assert!(matches!(
            inv.remove_item(&id("Item.Potion"), 9),
            Err(InventoryError::InsufficientQuantity { requested: 9, available: 8 })
        ));
        assert_eq!(inv.quantity_of(&id("Item.Potion")), 8);

        let removed = inv.remove_item(&id("Item.Potion"), 6).unwrap();
        assert_eq!(removed.iter().map(|s| s.quantity).sum::<u32>(), 6);
        assert!(inv.get_slot(0).is_none());
        assert_eq!(inv.get_slot(1).unwrap().quantity, 2);
    }

    #[test]
    fn test_move_to_empty() {
        let mut inv = container(4);
        inv.try_add_stack(id("Item.Arrow"), 7, None).unwrap();

        let outcome = inv.move_stack(0, 3).unwrap();

        assert_eq!(outcome, MoveOutcome { moved: 7, remaining: 0 });
        assert!(inv.get_slot(0).is_none());
        assert_eq!(inv.get_slot(3).unwrap().quantity, 7);
    }

    #[test]
    fn test_move_merges_with_overflow() {
        let mut inv = container(4);
        inv.try_add_stack(id("Item.Potion"), 5, None).unwrap();
        inv.split_stack(0, 2).unwrap(); // slot0=3, slot1=2
        inv.try_add_stack(id("Item.Potion"), 2, None).unwrap(); // slot0=5, slot1=2

        let outcome = inv.move_stack(1, 0);
        assert_eq!(outcome, Err(InventoryError::SlotOccupied(0)));

        inv.remove_quantity(0, 4).unwrap(); // slot0=1
        let outcome = inv.move_stack(1, 0).unwrap();
        assert_eq!(outcome, MoveOutcome { moved: 2, remaining: 0 });
        assert_eq!(inv.get_slot(0).unwrap().quantity, 3);
        assert!(inv.get_slot(1).is_none());
    }

    #[test]
    fn test_move_partial_merge() {
        let mut inv = container(4);
        inv.try_add_stack(id("Item.Arrow"), 10, None).unwrap();
        inv.split_stack(0, 4).unwrap(); // slot0=6, slot1=4

        let outcome = inv.move_stack(0, 1).unwrap();

        assert_eq!(outcome, MoveOutcome { moved: 6, remaining: 0 });
        inv.try_add_stack(id("Item.Arrow"), 5, None).unwrap(); // slot0=5
        let outcome = inv.move_stack(0, 1);
        assert_eq!(outcome, Err(InventoryError::SlotOccupied(1)));

        inv.remove_quantity(1, 3).unwrap(); // slot1=7
        let outcome = inv.move_stack(0, 1).unwrap();
        assert_eq!(outcome, MoveOutcome { moved: 3, remaining: 2 });
        assert_eq!(inv.get_slot(0).unwrap().quantity, 2);
        assert_eq!(inv.get_slot(1).unwrap().quantity, 10);
    }

    #[test]
    fn test_move_errors() {
        let mut inv = container(3);
        inv.try_add_stack(id("Item.Weapon.Sword"), 1, None).unwrap();
        inv.try_add_stack(id("Item.Arrow"), 1, None).unwrap();

        assert_eq!(inv.move_stack(2, 0), Err(InventoryError::InvalidSlot(2)));
        assert_eq!(inv.move_stack(0, 7), Err(InventoryError::InvalidSlot(7)));
        assert_eq!(inv.move_stack(0, 0), Err(InventoryError::InvalidSlot(0)));
        assert_eq!(inv.move_stack(0, 1), Err(InventoryError::SlotOccupied(1)));
        assert_eq!(inv.sequence(), 2);
    }

    #[test]
    fn test_swap_slots() {
        let mut inv = container(5);
        inv.try_add_stack(id("Item.Weapon.Sword"), 1, None).unwrap();
        inv.try_add_stack(id("Item.Arrow"), 1, None).unwrap();

        inv.swap_slots(0, 1).unwrap();

        assert_eq!(inv.get_slot(0).unwrap().item_id, id("Item.Arrow"));
        assert_eq!(inv.get_slot(1).unwrap().item_id, id("Item.Weapon.Sword"));
        assert_eq!(inv.swap_slots(3, 4), Err(InventoryError::InvalidSlot(3)));
    }

    #[test]
    fn test_split_stack() {
        let mut inv = container(5);
        inv.try_add_stack(id("Item.Gold"), 100, None).unwrap();

        let target = inv.split_stack(0, 30).unwrap();

        assert_eq!(target, 1);
        assert_eq!(inv.get_slot(0).unwrap().quantity, 70);
        assert_eq!(inv.get_slot(1).unwrap().quantity, 30);
    }

    #[test]
    fn test_split_errors() {
        let mut inv = container(1);
        inv.try_add_stack(id("Item.Gold"), 10, None).unwrap();

        assert_eq!(inv.split_stack(0, 3), Err(InventoryError::ContainerFull));
        assert_eq!(
            inv.split_stack(0, 10),
            Err(InventoryError::InsufficientQuantity { requested: 10, available: 10 })
        );
        assert_eq!(inv.split_stack(0, 0), Err(InventoryError::InvalidQuantity));
        assert_eq!(inv.get_slot(0).unwrap().quantity, 10);
    }

    #[test]
    fn test_clear() {
        let mut inv = container(3);
        inv.try_add_stack(id("Item.Arrow"), 3, None).unwrap();
        inv.try_add_stack(id("Item.Weapon.Sword"), 1, None).unwrap();

        let removed = inv.clear().unwrap();

        assert_eq!(removed.len(), 2);
        assert!(inv.is_empty());
        let last = inv.journal().iter().last().unwrap();
        assert_eq!(last.kind, ChangeKind::Cleared);
        assert_eq!(last.slots.len(), 2);
    }

    #[test]
    fn test_queries() {
        let mut inv = container(5);
        inv.try_add_stack(id("Item.Weapon.Sword"), 1, None).unwrap();
        inv.try_add_stack(id("Item.Arrow"), 14, None).unwrap();
        inv.try_add_stack(id("Item.Weapon.Dagger"), 2, None).unwrap();

        assert_eq!(inv.find_item(&id("Item.Arrow")), Some(1));
        assert_eq!(inv.find_all_items(&id("Item.Arrow")), vec![1, 2]);
        assert_eq!(inv.slots_in_category(&id("Item.Weapon")), vec![0, 3]);
        assert!(inv.contains(&id("Item.Arrow"), 14));
        assert!(!inv.contains(&id("Item.Arrow"), 15));
        assert_eq!(inv.free_slots(), 1);
        assert_eq!(inv.receivable_quantity(&id("Item.Arrow"), None).unwrap(), 16);
    }

    #[test]
    fn test_change_records_emitted() {
        let mut inv = container(4);
        inv.try_add_stack(id("Item.Arrow"), 5, None).unwrap();
        inv.split_stack(0, 2).unwrap();
        inv.move_stack(1, 3).unwrap();

        let kinds: Vec<_> = inv.journal().iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChangeKind::Added,
                ChangeKind::Split { from: 0, to: 1 },
                ChangeKind::Moved { from: 1, to: 3 },
            ]
        );
        let last = inv.journal().iter().last().unwrap();
        assert_eq!(last.sequence, 3);
        assert_eq!(last.slot(1).unwrap().stack, None);
        assert_eq!(last.slot(3).unwrap().stack.as_ref().unwrap().quantity, 2);
    }

    #[test]
    fn test_invariant_check() {
        let mut inv = container(2);
        inv.try_add_stack(id("Item.Potion"), 5, None).unwrap();
        assert!(inv.check_invariants().is_ok());

        inv.slots[1] = Some(ItemStack {
            item_id: id("Item.Potion"),
            quantity: 9,
            instance_data: None,
        });
        assert!(inv.check_invariants().is_err());
    }

    #[test]
    fn test_quantity_beyond_u32() {
        let mut inv = container(3);
        inv.try_add_stack(id("Item.Coin"), u32::MAX, None).unwrap();
        inv.try_add_stack(id("Item.Coin"), 5, None).unwrap();

        assert_eq!(inv.quantity_of(&id("Item.Coin")), u64::from(u32::MAX) + 5);
        assert!(inv.contains(&id("Item.Coin"), u32::MAX));

        let removed = inv.remove_item(&id("Item.Coin"), u32::MAX).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(inv.quantity_of(&id("Item.Coin")), 5);
        assert_eq!(inv.get_slot(1).unwrap().quantity, 5);
    }

    #[test]
    fn test_use_item_consumes_until_empty() {
        let mut inv = container(4);
        inv.try_add_stack(id("Item.Potion"), 2, None).unwrap();

        let outcome = inv.use_item(0).unwrap();
        assert_eq!((outcome.consumed, outcome.remaining), (1, 1));
        assert_eq!(inv.get_slot(0).unwrap().quantity, 1);

        let outcome = inv.use_item(0).unwrap();
        assert_eq!(outcome.remaining, 0);
        assert!(inv.get_slot(0).is_none());
        let last = inv.journal().iter().last().unwrap();
        assert_eq!(last.kind, ChangeKind::Used);
        assert_eq!(last.sequence, outcome.sequence);
        assert_eq!(last.slot(0).unwrap().stack, None);

        assert_eq!(inv.use_item(0), Err(InventoryError::InvalidSlot(0)));
    }

    #[test]
    fn test_use_item_failures_leave_state() {
        let mut inv = container(4);
        inv.try_add_stack(id("Item.Weapon.Sword"), 1, None).unwrap();
        inv.try_add_stack(id("Item.Bomb"), 1, None).unwrap();
        let before = inv.slots().to_vec();

        assert_eq!(inv.use_item(0), Err(InventoryError::NotUsable(id("Item.Weapon.Sword"))));
        assert_eq!(
            inv.use_item(1),
            Err(InventoryError::InsufficientQuantity { requested: 2, available: 1 })
        );
        assert_eq!(inv.slots(), before.as_slice());
        assert_eq!(inv.sequence(), 2);
    }

    #[test]
    fn test_reusable_item_keeps_stack() {
        let mut inv = container(2);
        inv.try_add_stack(id("Item.Scroll"), 1, None).unwrap();

        let outcome = inv.use_item(0).unwrap();

        assert_eq!(outcome.consumed, 0);
        assert_eq!(inv.get_slot(0).unwrap().quantity, 1);
        assert_eq!(inv.sequence(), 2);
    }

    #[test]
    fn test_add_policy_limits_and_rejects() {
        let mut inv = container(4);
        inv.set_add_policy(|item: &ItemId, placeable: u32| {
            if item.matches(&id("Item.Weapon")) {
                0
            } else {
                placeable.min(3)
            }
        });

        let outcome = inv.try_add_stack(id("Item.Arrow"), 8, None).unwrap();
        assert_eq!(outcome.placed, 3);
        assert_eq!(inv.receivable_quantity(&id("Item.Arrow"), None).unwrap(), 3);

        assert_eq!(
            inv.try_add_stack(id("Item.Weapon.Sword"), 1, None),
            Err(InventoryError::AddRejected(id("Item.Weapon.Sword")))
        );
        assert_eq!(inv.sequence(), 1);

        inv.clear_add_policy();
        assert!(inv.try_add_stack(id("Item.Weapon.Sword"), 1, None).is_ok());
    }

    #[test]
    fn test_full_container_is_not_a_policy_rejection() {
        let mut inv = container(1);
        inv.set_add_policy(|_: &ItemId, placeable: u32| placeable);
        inv.try_add_stack(id("Item.Weapon.Sword"), 1, None).unwrap();

        assert_eq!(
            inv.try_add_stack(id("Item.Weapon.Sword"), 1, None),
            Err(InventoryError::ContainerFull)
        );
    }
}
