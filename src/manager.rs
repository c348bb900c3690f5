use std::cell::{Ref, RefCell};
use std::rc::Rc;

use thiserror::Error;

use crate::aspect::{Aspect, AspectBuilder};
use crate::component::{
    ComponentMask, ComponentTypeId, ComponentTypeRegistry, UnregisteredComponent,
};
use crate::entity::{EntityId, EntityStore};
use crate::observer::{EntityObserver, ObserverId, ObserverRegistry};
use crate::source::EntitySource;
use crate::subscription::Subscription;

/// Error returned by mask edits on an [`EntityManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EntityError {
    /// The named component type was never registered.
    #[error(transparent)]
    UnregisteredComponent(#[from] UnregisteredComponent),
    /// The entity is dead or was never allocated.
    #[error("{0} is not alive")]
    NotAlive(EntityId),
}

/// Reference [`EntitySource`]: allocates entity ids, stores one component
/// mask per live entity, and emits the three lifecycle notifications
/// synchronously, in mutation order.
///
/// The manager stores composition bits only, never component values; pair
/// it with whatever component storage the surrounding application uses.
/// Everything takes `&self`: internals live behind `RefCell`, sized for a
/// single-threaded world.
///
/// Notifications go out after the mutation has fully landed, so observer
/// callbacks may read the manager freely and may even mutate it. A
/// notification emitted from inside a callback is queued behind the one in
/// flight rather than delivered recursively, so every observer sees
/// notifications in mutation order even when callbacks cascade; a cascade
/// that never settles panics after a bounded number of delivery rounds.
/// The one restriction is holding a subscription's read guard across a
/// mutation, which panics on the guard's borrow.
pub struct EntityManager {
    entities: RefCell<EntityStore>,
    types: RefCell<ComponentTypeRegistry>,
    observers: ObserverRegistry,
}

impl EntityManager {
    /// Entity capacity hint used by [`new`](Self::new).
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Creates a manager with the default capacity hint.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a manager pre-sized for `capacity` entities. The hint is
    /// what subscriptions read to pre-size their own sets; it is not an
    /// upper bound.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entities: RefCell::new(EntityStore::with_capacity(capacity)),
            types: RefCell::new(ComponentTypeRegistry::new()),
            observers: ObserverRegistry::new(),
        }
    }

    // ---- Component types ----

    /// Registers `T`, assigning it a mask bit. Idempotent.
    pub fn register_component<T: 'static>(&self) -> ComponentTypeId {
        self.types.borrow_mut().register::<T>()
    }

    /// Returns the bit assigned to `T`, if registered.
    pub fn component_id<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.types.borrow().get::<T>()
    }

    /// Read access to the component type registry, for name lookups and
    /// other diagnostics. Drop the guard before registering another type;
    /// holding it across [`register_component`](Self::register_component)
    /// panics on the `RefCell` borrow.
    pub fn registry(&self) -> Ref<'_, ComponentTypeRegistry> {
        self.types.borrow()
    }

    /// Resolves an [`AspectBuilder`] against this manager's registry.
    ///
    /// # Errors
    ///
    /// Returns [`UnregisteredComponent`] if the builder names a type that
    /// was never registered here.
    pub fn aspect(&self, builder: AspectBuilder) -> Result<Aspect, UnregisteredComponent> {
        builder.build(&self.types.borrow())
    }

    // ---- Entity lifecycle ----

    /// Creates an entity with an empty mask and announces it.
    pub fn create(&self) -> EntityId {
        let entity = self.entities.borrow_mut().allocate();
        self.observers.emit_added(entity, &ComponentMask::new());
        entity
    }

    /// Destroys an entity, recycling its slot.
    ///
    /// Returns `true` if the entity was alive and is now gone, `false` if
    /// it was already dead. The removal is announced after the slot is
    /// reclaimed, so mask queries made from callbacks see the entity dead.
    pub fn destroy(&self, entity: EntityId) -> bool {
        if !self.entities.borrow_mut().release(entity) {
            return false;
        }
        self.observers.emit_removed(entity);
        true
    }

    /// Returns whether the entity is currently alive.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.borrow().is_alive(entity)
    }

    /// Returns the number of alive entities.
    pub fn entity_count(&self) -> u32 {
        self.entities.borrow().count()
    }

    // ---- Mask edits ----

    /// Sets the mask bit for `T` on a live entity.
    ///
    /// A composition change is announced only if the bit was not already
    /// set; re-attaching is a quiet no-op.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::UnregisteredComponent`] if `T` was never
    /// registered, [`EntityError::NotAlive`] if the entity is dead.
    pub fn attach<T: 'static>(&self, entity: EntityId) -> Result<(), EntityError> {
        let type_id = self.types.borrow().lookup::<T>()?;
        let flipped = {
            let mut entities = self.entities.borrow_mut();
            let mask = entities
                .mask_mut(entity)
                .ok_or(EntityError::NotAlive(entity))?;
            mask.insert(type_id)
        };
        if flipped {
            self.observers.emit_changed(entity);
        }
        Ok(())
    }

    /// Clears the mask bit for `T` on a live entity.
    ///
    /// A composition change is announced only if the bit was set.
    ///
    /// # Errors
    ///
    /// Same conditions as [`attach`](Self::attach).
    pub fn detach<T: 'static>(&self, entity: EntityId) -> Result<(), EntityError> {
        let type_id = self.types.borrow().lookup::<T>()?;
        let flipped = {
            let mut entities = self.entities.borrow_mut();
            let mask = entities
                .mask_mut(entity)
                .ok_or(EntityError::NotAlive(entity))?;
            mask.remove(type_id)
        };
        if flipped {
            self.observers.emit_changed(entity);
        }
        Ok(())
    }

    /// Returns whether a live entity carries the bit for `T`. Dead
    /// entities and unregistered types read as `false`.
    pub fn has<T: 'static>(&self, entity: EntityId) -> bool {
        let Some(type_id) = self.types.borrow().get::<T>() else {
            return false;
        };
        self.entities
            .borrow()
            .mask(entity)
            .is_some_and(|mask| mask.contains(type_id))
    }

    // ---- Subscriptions ----

    /// Subscribes to entities satisfying `aspect`. Sugar for
    /// [`Subscription::new`] on a shared manager.
    pub fn subscribe(self: &Rc<Self>, aspect: Aspect) -> Subscription<EntityManager> {
        Subscription::new(Rc::clone(self), aspect)
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EntitySource for EntityManager {
    fn capacity(&self) -> usize {
        self.entities.borrow().capacity()
    }

    fn component_mask(&self, entity: EntityId) -> Option<ComponentMask> {
        self.entities.borrow().mask(entity).cloned()
    }

    fn live_entities(&self) -> Vec<EntityId> {
        self.entities.borrow().iter_alive().collect()
    }

    fn register_observer(&self, observer: Rc<dyn EntityObserver>) -> ObserverId {
        self.observers.register(observer)
    }

    fn deregister_observer(&self, id: ObserverId) -> bool {
        self.observers.deregister(id)
    }
}
