use std::cell::{Ref, RefCell};
use std::ops::Deref;
use std::rc::Rc;

use thiserror::Error;

use crate::aspect::Aspect;
use crate::bag::EntityBag;
use crate::component::ComponentMask;
use crate::entity::EntityId;
use crate::observer::{EntityObserver, ObserverId};
use crate::source::EntitySource;

/// Error returned by reads on a disposed subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    /// The subscription no longer tracks its source. Stale membership is
    /// withheld rather than returned, since an empty result would be
    /// indistinguishable from a true empty match.
    #[error("subscription has been disposed and no longer tracks entities")]
    Disposed,
}

/// Mutable interior of a subscription, shared with its observer handle.
struct SubscriptionState {
    /// Entities currently satisfying the aspect.
    active: EntityBag,
    /// Entities whose composition changed since the last reconciliation.
    pending: EntityBag,
    /// Whether `pending` holds work. Cleared by reconciliation.
    rebuild: bool,
    /// Set by `dispose`; freezes the state and fails reads.
    disposed: bool,
}

impl SubscriptionState {
    /// The membership toggle shared by the added-handler and
    /// reconciliation: insert if interested, remove if not. Both branches
    /// tolerate ids already in the target condition.
    fn refresh(&mut self, entity: EntityId, interested: bool) {
        if interested {
            self.active.insert(entity);
        } else {
            self.active.remove(entity);
        }
    }
}

/// Immutable aspect plus the mutable state, shared between the
/// [`Subscription`] and the observer it registers with the source.
struct SubscriptionInner {
    aspect: Aspect,
    state: RefCell<SubscriptionState>,
}

/// The handle registered with the source. Receives the three lifecycle
/// channels and applies the O(1) bookkeeping; never queries the source.
struct SubscriptionObserver {
    inner: Rc<SubscriptionInner>,
}

impl EntityObserver for SubscriptionObserver {
    fn entity_added(&self, entity: EntityId, mask: &ComponentMask) {
        let mut state = self.inner.state.borrow_mut();
        if state.disposed {
            return;
        }
        let interested = self.inner.aspect.matches(mask);
        state.refresh(entity, interested);
    }

    fn entity_removed(&self, entity: EntityId) {
        let mut state = self.inner.state.borrow_mut();
        if state.disposed {
            return;
        }
        state.active.remove(entity);
    }

    fn entity_changed(&self, entity: EntityId) {
        let mut state = self.inner.state.borrow_mut();
        if state.disposed {
            return;
        }
        state.pending.insert(entity);
        state.rebuild = true;
    }
}

/// Maintains the set of entities matching an [`Aspect`] as its source
/// mutates, with deferred, coalesced recomputation.
///
/// Lifecycle notifications are handled in O(1): appearances and removals
/// update the active set immediately, composition changes only mark the
/// entity pending. [`active_entities`](Self::active_entities) settles all
/// pending work before returning, so an entity is re-evaluated at most once
/// per read no matter how many times it changed in between, and a read
/// with nothing pending costs nothing.
///
/// The subscription registers one observer with the source at construction
/// and keeps the source alive through an [`Rc`]. The source in turn holds
/// that observer until [`dispose`](Self::dispose) runs; dropping the
/// subscription disposes it, so the observer cannot outlive the
/// subscription value.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use sift_ecs::{Aspect, EntityManager};
///
/// struct Position;
/// struct Velocity;
///
/// let manager = Rc::new(EntityManager::new());
/// manager.register_component::<Position>();
/// manager.register_component::<Velocity>();
///
/// let movable = manager.aspect(Aspect::builder().all::<Position>().all::<Velocity>())?;
/// let subscription = manager.subscribe(movable);
///
/// let entity = manager.create();
/// manager.attach::<Position>(entity)?;
/// manager.attach::<Velocity>(entity)?;
///
/// assert_eq!(&*subscription.active_entities()?, &[entity]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Subscription<S: EntitySource> {
    source: Rc<S>,
    inner: Rc<SubscriptionInner>,
    /// Token for the registered observer; `None` once disposed.
    connection: Option<ObserverId>,
}

impl<S: EntitySource> Subscription<S> {
    /// Subscribes to `source`, tracking entities that satisfy `aspect`.
    ///
    /// The source's capacity hint pre-sizes the internal sets. Entities
    /// already live at this point are queued for evaluation on the first
    /// read rather than scanned eagerly.
    pub fn new(source: Rc<S>, aspect: Aspect) -> Self {
        let capacity = source.capacity();
        let mut state = SubscriptionState {
            active: EntityBag::with_capacity(capacity),
            pending: EntityBag::with_capacity(capacity),
            rebuild: false,
            disposed: false,
        };

        for entity in source.live_entities() {
            state.pending.insert(entity);
        }
        state.rebuild = !state.pending.is_empty();

        log::debug!(
            "subscription created: capacity hint {}, {} pre-existing entities queued",
            capacity,
            state.pending.len()
        );

        let inner = Rc::new(SubscriptionInner {
            aspect,
            state: RefCell::new(state),
        });
        let observer = Rc::new(SubscriptionObserver {
            inner: Rc::clone(&inner),
        });
        let connection = source.register_observer(observer);

        Self {
            source,
            inner,
            connection: Some(connection),
        }
    }

    /// Returns the entities currently satisfying the aspect, settling any
    /// pending composition changes first.
    ///
    /// The guard borrows the subscription; drop it before mutating the
    /// source again, or the next notification will panic on a state
    /// already borrowed for reading.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::Disposed`] after
    /// [`dispose`](Self::dispose).
    pub fn active_entities(&self) -> Result<ActiveEntities<'_>, SubscriptionError> {
        if self.inner.state.borrow().disposed {
            return Err(SubscriptionError::Disposed);
        }
        self.reconcile();
        Ok(ActiveEntities {
            state: self.inner.state.borrow(),
        })
    }

    /// Re-evaluates every pending entity against its current mask. An
    /// entity the source no longer knows counts as not matching.
    fn reconcile(&self) {
        let mut state = self.inner.state.borrow_mut();
        if !state.rebuild {
            return;
        }

        let mut pending = std::mem::take(&mut state.pending);
        log::trace!("reconciling {} pending entities", pending.len());
        for entity in pending.iter() {
            let interested = self
                .source
                .component_mask(entity)
                .is_some_and(|mask| self.inner.aspect.matches(&mask));
            state.refresh(entity, interested);
        }
        pending.clear();
        state.pending = pending;
        state.rebuild = false;
    }

    /// Detaches from the source and stops tracking. Idempotent; reads
    /// after this fail with [`SubscriptionError::Disposed`]. Runs
    /// automatically on drop, so an explicit call is only needed to detach
    /// before the value goes out of scope.
    pub fn dispose(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };
        if !self.source.deregister_observer(connection) {
            log::warn!("subscription observer was already deregistered from its source");
        }
        self.inner.state.borrow_mut().disposed = true;
    }

    /// Returns whether [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.connection.is_none()
    }

    /// The aspect this subscription filters with.
    pub fn aspect(&self) -> &Aspect {
        &self.inner.aspect
    }
}

impl<S: EntitySource> Drop for Subscription<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Read guard over a subscription's active set, dereferencing to the
/// dense `&[EntityId]` slice.
///
/// Holds a shared borrow on the subscription state: drop it before the
/// source is mutated again.
pub struct ActiveEntities<'a> {
    state: Ref<'a, SubscriptionState>,
}

impl ActiveEntities<'_> {
    /// Returns the number of matching entities.
    pub fn len(&self) -> usize {
        self.state.active.len()
    }

    /// Returns whether no entities match.
    pub fn is_empty(&self) -> bool {
        self.state.active.is_empty()
    }

    /// Returns whether the entity is in the active set.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.state.active.contains(entity)
    }

    /// Iterates over the matching entities in dense order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.state.active.iter()
    }
}

impl Deref for ActiveEntities<'_> {
    type Target = [EntityId];

    fn deref(&self) -> &Self::Target {
        self.state.active.as_slice()
    }
}

impl std::fmt::Debug for ActiveEntities<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
