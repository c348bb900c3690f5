//! # Sift ECS
//!
//! Incremental entity filtering for ECS runtimes. Aspects describe which
//! component compositions are interesting; subscriptions maintain the set
//! of entities currently matching one, kept consistent under entity
//! lifecycle events by deferred, coalesced recomputation rather than
//! per-event work or full rescans.
//!
//! ## Core Types
//!
//! - [`Aspect`]: pure predicate over component masks (all / one / exclude)
//! - [`Subscription`]: incrementally maintained set of matching entities
//! - [`ActiveEntities`]: read guard over the set, derefs to `&[EntityId]`
//! - [`EntityBag`]: sparse-set id collection backing the active and
//!   pending sets
//!
//! ## Entity Sources
//!
//! - [`EntitySource`]: the collaborator trait subscriptions filter over
//! - [`EntityManager`]: reference source with mask storage and id recycling
//! - [`EntityObserver`] / [`ObserverRegistry`]: the lifecycle channels and
//!   their delivery
//! - [`ComponentTypeRegistry`] / [`ComponentMask`]: type-to-bit assignment
//!   and the masks built from it
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//! use sift_ecs::{Aspect, EntityManager};
//!
//! struct Position;
//! struct Velocity;
//! struct Frozen;
//!
//! let manager = Rc::new(EntityManager::new());
//! manager.register_component::<Position>();
//! manager.register_component::<Velocity>();
//! manager.register_component::<Frozen>();
//!
//! let movable = manager.aspect(
//!     Aspect::builder()
//!         .all::<Position>()
//!         .all::<Velocity>()
//!         .exclude::<Frozen>(),
//! )?;
//! let moving = manager.subscribe(movable);
//!
//! let player = manager.create();
//! manager.attach::<Position>(player)?;
//! manager.attach::<Velocity>(player)?;
//!
//! let rock = manager.create();
//! manager.attach::<Position>(rock)?;
//!
//! assert_eq!(&*moving.active_entities()?, &[player]);
//!
//! // Freezing the player drops it from the set on the next read.
//! manager.attach::<Frozen>(player)?;
//! assert!(moving.active_entities()?.is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! See `DESIGN.md` in this crate for architecture decisions and goals.

mod aspect;
mod bag;
mod component;
mod entity;
mod manager;
mod observer;
mod source;
mod subscription;

pub use aspect::{Aspect, AspectBuilder};
pub use bag::EntityBag;
pub use component::{ComponentMask, ComponentTypeId, ComponentTypeRegistry, UnregisteredComponent};
pub use entity::EntityId;
pub use manager::{EntityError, EntityManager};
pub use observer::{EntityObserver, ObserverId, ObserverRegistry};
pub use source::EntitySource;
pub use subscription::{ActiveEntities, Subscription, SubscriptionError};
