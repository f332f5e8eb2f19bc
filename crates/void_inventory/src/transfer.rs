//! Cross-container transfers
//!
//! A transfer runs in two phases. The plan phase checks removability from the
//! source and simulates placement in the destination without mutating
//! either, yielding the exact quantity that will move. The commit phase then
//! writes both sides. A plan that moves nothing, or one vetoed by the
//! [`TransferPolicy`], is rejected before either container is touched.

use crate::change::ChangeKind;
use crate::error::{InventoryError, InventoryResult};
use crate::id::ItemId;
use crate::inventory::{AddPlan, InventoryContainer};

/// Authority hook consulted after a plan validates and before it commits
pub trait TransferPolicy {
    /// Approve the plan, or return the reason for rejecting it
    fn approve(&self, plan: &TransferPlan) -> Result<(), String>;
}

/// Policy that approves every valid plan
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl TransferPolicy for AllowAll {
    fn approve(&self, _plan: &TransferPlan) -> Result<(), String> {
        Ok(())
    }
}

impl<F> TransferPolicy for F
where
    F: Fn(&TransferPlan) -> Result<(), String>,
{
    fn approve(&self, plan: &TransferPlan) -> Result<(), String> {
        self(plan)
    }
}

/// Units taken from one source slot and where they land
#[derive(Debug, Clone)]
struct TransferLeg {
    source_slot: usize,
    placement: AddPlan,
}

/// Validated, not yet committed transfer
#[derive(Debug, Clone)]
pub struct TransferPlan {
    item_id: ItemId,
    requested: u32,
    legs: Vec<TransferLeg>,
}

impl TransferPlan {
    /// Item being transferred
    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    /// Units asked for
    pub fn requested(&self) -> u32 {
        self.requested
    }

    /// Units that will move on commit
    pub fn quantity(&self) -> u32 {
        self.legs.iter().map(|leg| leg.placement.placed).sum()
    }

    /// Source slots units are drawn from, with the units taken from each
    pub fn source_slots(&self) -> Vec<(usize, u32)> {
        self.legs
            .iter()
            .filter(|leg| leg.placement.placed > 0)
            .map(|leg| (leg.source_slot, leg.placement.placed))
            .collect()
    }

    /// Destination slots that will receive units
    pub fn dest_slots(&self) -> Vec<usize> {
        let mut slots: Vec<usize> = self
            .legs
            .iter()
            .flat_map(|leg| leg.placement.placements.iter().map(|p| p.slot))
            .collect();
        slots.sort_unstable();
        slots.dedup();
        slots
    }
}

/// Result of a committed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Units asked for
    pub requested: u32,
    /// Units moved
    pub moved: u32,
    /// Source slots touched
    pub source_slots: Vec<usize>,
    /// Destination slots touched
    pub dest_slots: Vec<usize>,
    /// Sequence number of the source's change record
    pub source_sequence: u64,
    /// Sequence number of the destination's change record
    pub dest_sequence: u64,
}

impl TransferOutcome {
    /// Whether every requested unit moved
    pub fn is_complete(&self) -> bool {
        self.moved == self.requested
    }
}

/// Orchestrates moves between two containers.
///
/// Both containers are borrowed mutably for the duration of a call, so a
/// transfer cannot target its own source; use
/// [`InventoryContainer::move_stack`] within one container.
#[derive(Debug, Clone, Default)]
pub struct TransferCoordinator<P = AllowAll> {
    policy: P,
}

impl TransferCoordinator<AllowAll> {
    /// Coordinator that approves every valid plan
    pub fn new() -> Self {
        Self { policy: AllowAll }
    }
}

impl<P: TransferPolicy> TransferCoordinator<P> {
    /// Coordinator consulting `policy` before every commit
    pub fn with_policy(policy: P) -> Self {
        Self { policy }
    }

    /// Phase one for a single source slot
    pub fn plan(
        &self,
        source: &InventoryContainer,
        source_slot: usize,
        dest: &InventoryContainer,
        quantity: u32,
    ) -> InventoryResult<TransferPlan> {
        Self::check_ready(source, dest, quantity)?;

        let stack = source.occupied(source_slot)?;
        if quantity > stack.quantity {
            return Err(InventoryError::InsufficientQuantity {
                requested: quantity,
                available: stack.quantity,
            });
        }

        let placement = dest.plan_add(&stack.item_id, quantity, stack.instance_data.as_ref())?;
        let plan = TransferPlan {
            item_id: stack.item_id.clone(),
            requested: quantity,
            legs: vec![TransferLeg { source_slot, placement }],
        };
        Self::check_movable(&plan)?;
        Ok(plan)
    }

    /// Phase one for units of an item drawn from any source slots, lowest
    /// slot first
    pub fn plan_item(
        &self,
        source: &InventoryContainer,
        item_id: &ItemId,
        dest: &InventoryContainer,
        quantity: u32,
    ) -> InventoryResult<TransferPlan> {
        Self::check_ready(source, dest, quantity)?;

        let available = source.quantity_of(item_id);
        if available < u64::from(quantity) {
            return Err(InventoryError::InsufficientQuantity {
                requested: quantity,
                available: u32::try_from(available).unwrap_or(u32::MAX),
            });
        }

        // Source stacks may carry different payloads, so each leg is planned
        // against the destination as left by the previous legs.
        let mut scratch = dest.scratch();
        let mut remaining = quantity;
        let mut legs = Vec::new();
        for (source_slot, stack) in source.items().filter(|(_, s)| s.item_id == *item_id) {
            if remaining == 0 {
                break;
            }
            let wanted = stack.quantity.min(remaining);
            let placement = scratch.plan_add(item_id, wanted, stack.instance_data.as_ref())?;
            if placement.placed == 0 {
                continue;
            }
            scratch.commit_add(&placement);
            remaining -= placement.placed;
            legs.push(TransferLeg { source_slot, placement });
        }

        let plan = TransferPlan {
            item_id: item_id.clone(),
            requested: quantity,
            legs,
        };
        Self::check_movable(&plan)?;
        Ok(plan)
    }

    /// Move up to `quantity` units out of one source slot. Partial transfers
    /// succeed and report the quantity moved.
    pub fn transfer(
        &self,
        source: &mut InventoryContainer,
        source_slot: usize,
        dest: &mut InventoryContainer,
        quantity: u32,
    ) -> InventoryResult<TransferOutcome> {
        let plan = self.plan(source, source_slot, dest, quantity)?;
        self.commit(source, dest, plan)
    }

    /// Move up to `quantity` units of an item, drawing from as many source
    /// slots as needed. The source must hold at least `quantity` units.
    pub fn transfer_item(
        &self,
        source: &mut InventoryContainer,
        item_id: &ItemId,
        dest: &mut InventoryContainer,
        quantity: u32,
    ) -> InventoryResult<TransferOutcome> {
        let plan = self.plan_item(source, item_id, dest, quantity)?;
        self.commit(source, dest, plan)
    }

    /// Phase two. The plan must have been computed against the current state
    /// of both containers.
    fn commit(
        &self,
        source: &mut InventoryContainer,
        dest: &mut InventoryContainer,
        plan: TransferPlan,
    ) -> InventoryResult<TransferOutcome> {
        if let Err(reason) = self.policy.approve(&plan) {
            log::debug!("Transfer of {} vetoed: {}", plan.item_id, reason);
            return Err(InventoryError::TransferRejected(reason));
        }

        let moved = plan.quantity();
        let mut source_slots = Vec::with_capacity(plan.legs.len());
        let mut dest_slots = Vec::new();
        for leg in &plan.legs {
            let taken = source.take_units(leg.source_slot, leg.placement.placed);
            debug_assert_eq!(
                taken.map(|stack| stack.quantity),
                Some(leg.placement.placed),
                "transfer plan is stale for source slot {}",
                leg.source_slot
            );
            source_slots.push(leg.source_slot);
            dest_slots.extend(dest.commit_add(&leg.placement));
        }
        dest_slots.sort_unstable();
        dest_slots.dedup();

        let source_sequence = source.emit(ChangeKind::Transferred, source_slots.clone());
        let dest_sequence = dest.emit(ChangeKind::Transferred, dest_slots.clone());

        log::trace!(
            "Transferred {} x{} ({} requested)",
            plan.item_id,
            moved,
            plan.requested
        );
        Ok(TransferOutcome {
            requested: plan.requested,
            moved,
            source_slots,
            dest_slots,
            source_sequence,
            dest_sequence,
        })
    }

    fn check_ready(source: &InventoryContainer, dest: &InventoryContainer, quantity: u32) -> InventoryResult<()> {
        source.ensure_ready()?;
        dest.ensure_ready()?;
        if quantity == 0 {
            return Err(InventoryError::InvalidQuantity);
        }
        Ok(())
    }

    fn check_movable(plan: &TransferPlan) -> InventoryResult<()> {
        if plan.quantity() == 0 {
            log::debug!("Transfer of {} rejected: destination has no room", plan.item_id);
            return Err(InventoryError::TransferRejected(format!(
                "destination cannot receive {}",
                plan.item_id
            )));
        }
        Ok(())
    }
}
