use std::rc::Rc;

use crate::component::ComponentMask;
use crate::entity::EntityId;
use crate::observer::{EntityObserver, ObserverId};

/// The collaborator a [`Subscription`](crate::Subscription) filters over:
/// anything that owns entities, stores their component masks, and emits the
/// three lifecycle notifications.
///
/// [`EntityManager`](crate::EntityManager) is the reference implementation;
/// external worlds implement this trait to plug their own entity storage
/// in. Implementations must emit notifications synchronously, in mutation
/// order, and a mask query made after a notification was delivered must
/// reflect that mutation.
pub trait EntitySource {
    /// Sizing hint for consumers pre-allocating per-entity structures.
    /// Read once at subscription construction; not an upper bound.
    fn capacity(&self) -> usize;

    /// The current component mask of a live entity, or `None` if the id is
    /// dead or unknown. O(1).
    fn component_mask(&self, entity: EntityId) -> Option<ComponentMask>;

    /// Snapshot of every currently-live entity id. Used once at
    /// subscription construction to cover entities that predate it.
    fn live_entities(&self) -> Vec<EntityId>;

    /// Registers an observer for all three lifecycle channels.
    fn register_observer(&self, observer: Rc<dyn EntityObserver>) -> ObserverId;

    /// Deregisters a previously registered observer. Returns false if the
    /// token is unknown, including already-deregistered tokens.
    fn deregister_observer(&self, id: ObserverId) -> bool;
}
