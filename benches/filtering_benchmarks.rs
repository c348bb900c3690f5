#![allow(dead_code)]

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use std::rc::Rc;

use sift_ecs::{Aspect, ComponentMask, ComponentTypeId, EntityBag, EntityId, EntityManager};

// ---------------------------------------------------------------------------
// Helper component types
// ---------------------------------------------------------------------------

struct Position;
struct Velocity;
struct Frozen;

fn tracked_manager(capacity: usize) -> (Rc<EntityManager>, Aspect) {
    let manager = Rc::new(EntityManager::with_capacity(capacity));
    manager.register_component::<Position>();
    manager.register_component::<Velocity>();
    manager.register_component::<Frozen>();
    let aspect = manager.aspect(Aspect::builder().all::<Position>()).unwrap();
    (manager, aspect)
}

// ---------------------------------------------------------------------------
// Tracking entity creation and destruction
// ---------------------------------------------------------------------------

fn bench_track_creation_1k(c: &mut Criterion) {
    c.bench_function("track_create_attach_1k", |b| {
        b.iter_batched(
            || {
                let (manager, aspect) = tracked_manager(1_024);
                let subscription = manager.subscribe(aspect);
                (manager, subscription)
            },
            |(manager, subscription)| {
                for _ in 0..1_000 {
                    let entity = manager.create();
                    manager.attach::<Position>(entity).unwrap();
                }
                black_box(subscription.active_entities().unwrap().len());
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_track_destruction_1k(c: &mut Criterion) {
    c.bench_function("track_destroy_1k", |b| {
        b.iter_batched(
            || {
                let (manager, aspect) = tracked_manager(1_024);
                let subscription = manager.subscribe(aspect);
                let entities: Vec<_> = (0..1_000)
                    .map(|_| {
                        let entity = manager.create();
                        manager.attach::<Position>(entity).unwrap();
                        entity
                    })
                    .collect();
                subscription.active_entities().unwrap();
                (manager, subscription, entities)
            },
            |(manager, subscription, entities)| {
                // Removals land in the active set immediately
                for entity in entities {
                    manager.destroy(entity);
                }
                black_box(subscription.active_entities().unwrap().len());
            },
            BatchSize::SmallInput,
        );
    });
}

// ---------------------------------------------------------------------------
// Reading: clean short circuit vs. reconciliation
// ---------------------------------------------------------------------------

fn bench_clean_read_10k(c: &mut Criterion) {
    let (manager, aspect) = tracked_manager(16_384);
    let subscription = manager.subscribe(aspect);
    for _ in 0..10_000 {
        let entity = manager.create();
        manager.attach::<Position>(entity).unwrap();
    }
    subscription.active_entities().unwrap();

    c.bench_function("clean_read_10k_tracked", |b| {
        b.iter(|| {
            let active = subscription.active_entities().unwrap();
            black_box(active.len());
        });
    });
}

fn bench_reconcile_bulk_changes_10k(c: &mut Criterion) {
    c.bench_function("reconcile_10k_pending", |b| {
        b.iter_batched(
            || {
                let (manager, aspect) = tracked_manager(16_384);
                let subscription = manager.subscribe(aspect);
                let entities: Vec<_> = (0..10_000)
                    .map(|_| {
                        let entity = manager.create();
                        manager.attach::<Position>(entity).unwrap();
                        entity
                    })
                    .collect();
                subscription.active_entities().unwrap();
                // Queue one pending change per entity
                for entity in &entities {
                    manager.attach::<Velocity>(*entity).unwrap();
                }
                (manager, subscription)
            },
            |(_manager, subscription)| {
                black_box(subscription.active_entities().unwrap().len());
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_subscribe_prepopulated_10k(c: &mut Criterion) {
    c.bench_function("subscribe_after_10k_entities", |b| {
        b.iter_batched(
            || {
                let (manager, aspect) = tracked_manager(16_384);
                // Only half the population matches
                for i in 0..10_000 {
                    let entity = manager.create();
                    if i % 2 == 0 {
                        manager.attach::<Position>(entity).unwrap();
                    }
                }
                (manager, aspect)
            },
            |(manager, aspect)| {
                let subscription = manager.subscribe(aspect);
                black_box(subscription.active_entities().unwrap().len());
            },
            BatchSize::SmallInput,
        );
    });
}

// ---------------------------------------------------------------------------
// EntityBag operations (direct)
// ---------------------------------------------------------------------------

fn bench_bag_insert_10k(c: &mut Criterion) {
    c.bench_function("bag_insert_10k", |b| {
        b.iter_batched(
            EntityBag::new,
            |mut bag| {
                for i in 0..10_000u32 {
                    bag.insert(EntityId::new(i));
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_bag_remove_half(c: &mut Criterion) {
    c.bench_function("bag_remove_5k_of_10k", |b| {
        b.iter_batched(
            || {
                let mut bag = EntityBag::new();
                for i in 0..10_000u32 {
                    bag.insert(EntityId::new(i));
                }
                bag
            },
            |mut bag| {
                // Remove every other entity
                for i in (0..10_000u32).step_by(2) {
                    black_box(bag.remove(EntityId::new(i)));
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_aspect_match_10k(c: &mut Criterion) {
    let mut all = ComponentMask::new();
    all.insert(ComponentTypeId::new(0));
    let mut exclude = ComponentMask::new();
    exclude.insert(ComponentTypeId::new(2));
    let aspect = Aspect::from_masks(all, ComponentMask::new(), exclude);

    let masks: Vec<_> = (0..10_000usize)
        .map(|i| {
            let mut mask = ComponentMask::new();
            if i % 2 == 0 {
                mask.insert(ComponentTypeId::new(0));
            }
            if i % 3 == 0 {
                mask.insert(ComponentTypeId::new(1));
            }
            if i % 4 == 0 {
                mask.insert(ComponentTypeId::new(2));
            }
            mask
        })
        .collect();

    c.bench_function("aspect_match_10k_masks", |b| {
        b.iter(|| {
            let mut matched = 0usize;
            for mask in &masks {
                if aspect.matches(mask) {
                    matched += 1;
                }
            }
            black_box(matched);
        });
    });
}

criterion_group!(
    benches,
    bench_track_creation_1k,
    bench_track_destruction_1k,
    bench_clean_read_10k,
    bench_reconcile_bulk_changes_10k,
    bench_subscribe_prepopulated_10k,
    bench_bag_insert_10k,
    bench_bag_remove_half,
    bench_aspect_match_10k,
);
criterion_main!(benches);
