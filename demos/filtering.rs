//! Walkthrough of aspect-based entity filtering.
//!
//! Run with:
//!   cargo run --example filtering
//!
//! Spawns a small population, tracks two aspects through subscriptions and
//! prints the active sets as the population changes. Set RUST_LOG=trace to
//! watch reconciliation happen between reads.

use std::rc::Rc;

use sift_ecs::{Aspect, EntityId, EntityManager, Subscription};

struct Position;
struct Velocity;
struct Frozen;

fn print_active(label: &str, subscription: &Subscription<EntityManager>) {
    let active = subscription
        .active_entities()
        .expect("subscription is still connected");
    let ids: Vec<EntityId> = active.iter().collect();
    println!("  {label}: {ids:?}");
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let manager = Rc::new(EntityManager::with_capacity(16));
    manager.register_component::<Position>();
    manager.register_component::<Velocity>();
    manager.register_component::<Frozen>();

    // Movers carry Position and Velocity and are not Frozen
    let movers_aspect = manager
        .aspect(
            Aspect::builder()
                .all::<Position>()
                .all::<Velocity>()
                .exclude::<Frozen>(),
        )
        .expect("component types are registered");
    let movers = manager.subscribe(movers_aspect);

    // Placed entities just need a Position
    let placed_aspect = manager
        .aspect(Aspect::builder().all::<Position>())
        .expect("component types are registered");
    let placed = manager.subscribe(placed_aspect);

    println!("Spawning population:");
    let mut entities = Vec::new();
    for i in 0..6 {
        let entity = manager.create();
        manager.attach::<Position>(entity).expect("entity is alive");
        if i % 2 == 0 {
            manager.attach::<Velocity>(entity).expect("entity is alive");
        }
        println!("  spawned {entity} (velocity: {})", i % 2 == 0);
        entities.push(entity);
    }

    println!("After spawning:");
    print_active("movers", &movers);
    print_active("placed", &placed);

    println!("Freezing {} and stopping {}:", entities[0], entities[2]);
    manager
        .attach::<Frozen>(entities[0])
        .expect("entity is alive");
    manager
        .detach::<Velocity>(entities[2])
        .expect("entity is alive");
    print_active("movers", &movers);
    print_active("placed", &placed);

    println!("Destroying {}:", entities[4]);
    manager.destroy(entities[4]);
    print_active("movers", &movers);
    print_active("placed", &placed);

    // A subscription created late still sees the whole current population
    println!("Subscribing to Frozen entities after the fact:");
    let frozen_aspect = manager
        .aspect(Aspect::builder().all::<Frozen>())
        .expect("component types are registered");
    let frozen = manager.subscribe(frozen_aspect);
    print_active("frozen", &frozen);

    println!("Done; {} entities alive", manager.entity_count());
}
