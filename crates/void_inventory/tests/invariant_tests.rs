//! Invariant tests for void_inventory
//!
//! Random operation sequences against containers, checking the properties
//! that must hold after every call whether it succeeded or not.

use proptest::prelude::*;
use std::sync::Arc;
use void_inventory::prelude::*;

const ITEMS: [&str; 4] = ["Item.Arrow", "Item.Potion", "Item.Weapon.Sword", "Item.Ore.Iron"];
const CAPACITY: usize = 6;
const MAX_WEIGHT: f32 = 25.0;

fn id(tag: &str) -> ItemId {
    ItemId::new(tag).unwrap()
}

fn registry() -> Arc<ItemRegistry> {
    let mut registry = ItemRegistry::new();
    registry
        .load_toml(
            r#"
            [[item]]
            id = "Item.Arrow"
            category = "Ammo"
            max_stack = 10
            weight = 0.1
            quantity_per_use = 2

            [[item]]
            id = "Item.Potion"
            category = "Consumable"
            max_stack = 5
            weight = 0.5
            quantity_per_use = 1

            [[item]]
            id = "Item.Weapon.Sword"
            category = { Weapon = { handedness = "OneHanded" } }
            weight = 4.0

            [[item]]
            id = "Item.Ore.Iron"
            category = "Material"
            max_stack = 20
            weight = 1.5
            stacking = "MergeAnyPayload"
            "#,
        )
        .unwrap();
    registry.into_shared()
}

fn config() -> ContainerConfig {
    ContainerConfig::new(CAPACITY).with_max_weight(MAX_WEIGHT)
}

#[derive(Debug, Clone)]
enum Op {
    Add { item: usize, quantity: u32, marked: bool },
    Remove { slot: usize, quantity: u32 },
    RemoveItem { item: usize, quantity: u32 },
    Move { from: usize, to: usize },
    Split { slot: usize, quantity: u32 },
    Swap { a: usize, b: usize },
    Transfer { slot: usize, quantity: u32 },
    Use { slot: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let slot = 0..CAPACITY + 1;
    prop_oneof![
        3 => (0..ITEMS.len(), 0..30u32, any::<bool>())
            .prop_map(|(item, quantity, marked)| Op::Add { item, quantity, marked }),
        2 => (slot.clone(), 0..12u32).prop_map(|(slot, quantity)| Op::Remove { slot, quantity }),
        1 => (0..ITEMS.len(), 1..15u32).prop_map(|(item, quantity)| Op::RemoveItem { item, quantity }),
        2 => (slot.clone(), slot.clone()).prop_map(|(from, to)| Op::Move { from, to }),
        2 => (slot.clone(), 0..12u32).prop_map(|(slot, quantity)| Op::Split { slot, quantity }),
        1 => (slot.clone(), slot.clone()).prop_map(|(a, b)| Op::Swap { a, b }),
        1 => (slot.clone(), 1..12u32).prop_map(|(slot, quantity)| Op::Transfer { slot, quantity }),
        1 => slot.prop_map(|slot| Op::Use { slot }),
    ]
}

fn marked() -> InstanceData {
    InstanceData::new().with("marked", ItemProperty::Bool(true))
}

/// Apply an op to `main`, using `other` as the transfer destination.
/// Returns whether it succeeded.
fn apply(op: &Op, main: &mut InventoryContainer, other: &mut InventoryContainer) -> bool {
    match *op {
        Op::Add { item, quantity, marked: m } => main
            .try_add_stack(id(ITEMS[item]), quantity, m.then(marked))
            .is_ok(),
        Op::Remove { slot, quantity } => main.remove_quantity(slot, quantity).is_ok(),
        Op::RemoveItem { item, quantity } => main.remove_item(&id(ITEMS[item]), quantity).is_ok(),
        Op::Move { from, to } => main.move_stack(from, to).is_ok(),
        Op::Split { slot, quantity } => main.split_stack(slot, quantity).is_ok(),
        Op::Swap { a, b } => main.swap_slots(a, b).is_ok(),
        Op::Transfer { slot, quantity } => TransferCoordinator::new()
            .transfer(main, slot, other, quantity)
            .is_ok(),
        Op::Use { slot } => main.use_item(slot).is_ok(),
    }
}

fn total_units(container: &InventoryContainer) -> u32 {
    container.items().map(|(_, stack)| stack.quantity).sum()
}

fn assert_invariants(container: &InventoryContainer) -> Result<(), TestCaseError> {
    prop_assert!(container.check_invariants().is_ok());
    prop_assert!(container.current_weight() <= MAX_WEIGHT + 1e-3);
    for (_, stack) in container.items() {
        let def = container.registry().lookup(&stack.item_id).unwrap();
        prop_assert!(stack.quantity >= 1);
        prop_assert!(stack.quantity <= def.max_stack);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    /// INVARIANT: weight cap and max stack size hold after every operation
    #[test]
    fn invariant_limits_hold(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let registry = registry();
        let mut main = InventoryContainer::spawn(Arc::clone(&registry), config()).unwrap();
        let mut other = InventoryContainer::spawn(registry, config()).unwrap();

        for op in &ops {
            apply(op, &mut main, &mut other);
            assert_invariants(&main)?;
            assert_invariants(&other)?;
        }
    }

    /// INVARIANT: a failed operation leaves both containers unchanged
    #[test]
    fn invariant_failures_are_atomic(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let registry = registry();
        let mut main = InventoryContainer::spawn(Arc::clone(&registry), config()).unwrap();
        let mut other = InventoryContainer::spawn(registry, config()).unwrap();

        for op in &ops {
            let before = (main.snapshot(), other.snapshot());
            if !apply(op, &mut main, &mut other) {
                prop_assert_eq!(&main.snapshot(), &before.0);
                prop_assert_eq!(&other.snapshot(), &before.1);
            }
        }
    }

    /// INVARIANT: every success emits exactly one record per container touched
    #[test]
    fn invariant_one_record_per_mutation(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let registry = registry();
        let mut main = InventoryContainer::spawn(Arc::clone(&registry), config()).unwrap();
        let mut other = InventoryContainer::spawn(registry, config()).unwrap();

        for op in &ops {
            let before = main.sequence();
            let ok = apply(op, &mut main, &mut other);
            prop_assert_eq!(main.sequence(), before + u64::from(ok));
        }
    }

    /// INVARIANT: transfers conserve units across both containers
    #[test]
    fn invariant_transfer_conserves_units(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let registry = registry();
        let mut main = InventoryContainer::spawn(Arc::clone(&registry), config()).unwrap();
        let mut other = InventoryContainer::spawn(registry, config()).unwrap();

        for op in &ops {
            let before = total_units(&main) + total_units(&other);
            let ok = apply(op, &mut main, &mut other);
            if ok && matches!(op, Op::Transfer { .. }) {
                prop_assert_eq!(total_units(&main) + total_units(&other), before);
            }
        }
    }

    /// INVARIANT: a replica following the change stream matches its authority
    #[test]
    fn invariant_replica_converges(
        ops in prop::collection::vec(op_strategy(), 1..60),
        sync_every in 1..8usize,
    ) {
        let registry = registry();
        let mut main = InventoryContainer::spawn(Arc::clone(&registry), config().with_journal_capacity(6)).unwrap();
        let mut other = InventoryContainer::spawn(Arc::clone(&registry), config()).unwrap();
        let mut replica = InventoryContainer::replica(registry, config()).unwrap();

        for (i, op) in ops.iter().enumerate() {
            apply(op, &mut main, &mut other);
            if i % sync_every == 0 {
                replica.apply_sync(&main.sync_since(replica.sequence())).unwrap();
            }
        }
        replica.apply_sync(&main.sync_since(replica.sequence())).unwrap();

        prop_assert_eq!(replica.slots(), main.slots());
        prop_assert_eq!(replica.sequence(), main.sequence());
    }

    /// INVARIANT: applying a snapshot twice equals applying it once
    #[test]
    fn invariant_snapshot_idempotent(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let registry = registry();
        let mut main = InventoryContainer::spawn(Arc::clone(&registry), config()).unwrap();
        let mut other = InventoryContainer::spawn(Arc::clone(&registry), config()).unwrap();
        for op in &ops {
            apply(op, &mut main, &mut other);
        }

        let snapshot = ContainerSnapshot::from_bytes(&main.snapshot().to_bytes().unwrap()).unwrap();
        let mut replica = InventoryContainer::replica(registry, config()).unwrap();
        replica.apply_snapshot(&snapshot).unwrap();
        let once = replica.snapshot();
        replica.apply_snapshot(&snapshot).unwrap();

        prop_assert_eq!(replica.snapshot(), once);
        prop_assert_eq!(replica.slots(), main.slots());
    }
}
