use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::component::ComponentMask;
use crate::entity::EntityId;

/// Receiver for the three entity lifecycle channels.
///
/// One observer covers all channels and is deregistered as a unit. Sources
/// deliver synchronously, in emission order, to observers in registration
/// order. Methods take `&self` because observers are shared (`Rc`) and keep
/// any state behind interior mutability.
pub trait EntityObserver {
    /// A new entity appeared. The delivered mask is the entity's mask at
    /// emission time; any composition edit made since then has queued its
    /// own changed-notification, so receivers need not query the source
    /// back.
    fn entity_added(&self, entity: EntityId, mask: &ComponentMask);

    /// An entity was destroyed. Its mask is already gone.
    fn entity_removed(&self, entity: EntityId);

    /// An entity's composition changed. No mask is delivered: receivers
    /// that defer work only care about the mask at read time.
    fn entity_changed(&self, entity: EntityId);
}

/// Token returned by observer registration, used to deregister.
///
/// Tokens are never reused by the registry that minted them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// A queued lifecycle notification. The mask is captured at emission time
/// because the entity may be edited again before delivery.
enum Notification {
    Added(EntityId, ComponentMask),
    Removed(EntityId),
    Changed(EntityId),
}

/// Registry of lifecycle observers for an entity source.
///
/// Notifications are queued and drained in emission order. One emitted from
/// inside a callback lands behind the notification in flight instead of
/// being delivered recursively, so every observer sees the same order no
/// matter how deep a cascade runs.
///
/// Delivery clones the observer list out of the registry per notification,
/// so an observer may register or deregister observers (itself included)
/// while a notification is in flight. An observer deregistered mid-delivery
/// may still receive the notification already being delivered, and one
/// registered mid-delivery also receives the notifications still queued.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: RefCell<Vec<(ObserverId, Rc<dyn EntityObserver>)>>,
    next_id: Cell<u64>,
    queue: RefCell<Vec<Notification>>,
    delivering: Cell<bool>,
}

impl ObserverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer for all three channels. Returns the token
    /// that deregisters it.
    pub fn register(&self, observer: Rc<dyn EntityObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.observers.borrow_mut().push((id, observer));
        id
    }

    /// Deregisters by token. Returns false if the token is unknown,
    /// including tokens that were already deregistered.
    pub fn deregister(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id);
        observers.len() != before
    }

    /// Returns the number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Returns whether no observers are registered.
    pub fn is_empty(&self) -> bool {
        self.observers.borrow().is_empty()
    }

    /// Emits an added-notification to every observer in registration order.
    ///
    /// Delivery completes before this returns unless the call came from
    /// inside a callback, in which case the notification is queued behind
    /// the one in flight.
    pub fn emit_added(&self, entity: EntityId, mask: &ComponentMask) {
        self.queue
            .borrow_mut()
            .push(Notification::Added(entity, mask.clone()));
        self.deliver();
    }

    /// Emits a removed-notification. Queued and delivered like
    /// [`emit_added`](Self::emit_added).
    pub fn emit_removed(&self, entity: EntityId) {
        self.queue.borrow_mut().push(Notification::Removed(entity));
        self.deliver();
    }

    /// Emits a changed-notification. Queued and delivered like
    /// [`emit_added`](Self::emit_added).
    pub fn emit_changed(&self, entity: EntityId) {
        self.queue.borrow_mut().push(Notification::Changed(entity));
        self.deliver();
    }

    /// Drains queued notifications in emission order, supporting cascades.
    ///
    /// A callback that mutates the source queues new notifications; the
    /// loop keeps draining until none remain. Nested calls return
    /// immediately and leave the drain to the outermost one.
    ///
    /// # Panics
    ///
    /// Panics if cascading exceeds 100 rounds (likely an infinite loop).
    fn deliver(&self) {
        const MAX_ITERATIONS: u32 = 100;

        if self.delivering.get() {
            return;
        }
        self.delivering.set(true);

        for iteration in 0..MAX_ITERATIONS {
            let batch = std::mem::take(&mut *self.queue.borrow_mut());
            if batch.is_empty() {
                break;
            }

            for notification in &batch {
                let observers = self.snapshot();
                match notification {
                    Notification::Added(entity, mask) => {
                        for observer in &observers {
                            observer.entity_added(*entity, mask);
                        }
                    }
                    Notification::Removed(entity) => {
                        for observer in &observers {
                            observer.entity_removed(*entity);
                        }
                    }
                    Notification::Changed(entity) => {
                        for observer in &observers {
                            observer.entity_changed(*entity);
                        }
                    }
                }
            }

            if iteration == MAX_ITERATIONS - 1 {
                self.delivering.set(false);
                panic!(
                    "Notification cascade exceeded {MAX_ITERATIONS} rounds. \
                     This likely indicates an infinite loop where observer \
                     callbacks keep mutating the source."
                );
            }
        }

        self.delivering.set(false);
    }

    /// Clones the observer list out so delivery holds no borrow on the
    /// registry.
    fn snapshot(&self) -> Vec<Rc<dyn EntityObserver>> {
        self.observers
            .borrow()
            .iter()
            .map(|(_, observer)| Rc::clone(observer))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentTypeId;

    /// Appends a tagged line to a shared log for every notification.
    struct Recorder {
        tag: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl EntityObserver for Recorder {
        fn entity_added(&self, entity: EntityId, mask: &ComponentMask) {
            self.log
                .borrow_mut()
                .push(format!("{}: added {} {:?}", self.tag, entity, mask));
        }

        fn entity_removed(&self, entity: EntityId) {
            self.log
                .borrow_mut()
                .push(format!("{}: removed {}", self.tag, entity));
        }

        fn entity_changed(&self, entity: EntityId) {
            self.log
                .borrow_mut()
                .push(format!("{}: changed {}", self.tag, entity));
        }
    }

    #[test]
    fn emits_to_observers_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let registry = ObserverRegistry::new();
        registry.register(Rc::new(Recorder {
            tag: "first",
            log: Rc::clone(&log),
        }));
        registry.register(Rc::new(Recorder {
            tag: "second",
            log: Rc::clone(&log),
        }));

        registry.emit_removed(EntityId::new(4));

        assert_eq!(
            *log.borrow(),
            vec!["first: removed Entity(4)", "second: removed Entity(4)"]
        );
    }

    #[test]
    fn each_channel_reaches_its_method() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let registry = ObserverRegistry::new();
        registry.register(Rc::new(Recorder {
            tag: "r",
            log: Rc::clone(&log),
        }));

        let mut mask = ComponentMask::new();
        mask.insert(ComponentTypeId::new(0));

        registry.emit_added(EntityId::new(1), &mask);
        registry.emit_changed(EntityId::new(1));
        registry.emit_removed(EntityId::new(1));

        assert_eq!(
            *log.borrow(),
            vec![
                "r: added Entity(1) ComponentMask{0}",
                "r: changed Entity(1)",
                "r: removed Entity(1)",
            ]
        );
    }

    #[test]
    fn deregister_stops_delivery() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let registry = ObserverRegistry::new();
        let id = registry.register(Rc::new(Recorder {
            tag: "r",
            log: Rc::clone(&log),
        }));

        registry.emit_changed(EntityId::new(0));
        assert!(registry.deregister(id));
        registry.emit_changed(EntityId::new(0));

        assert_eq!(log.borrow().len(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn deregister_unknown_token_returns_false() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let registry = ObserverRegistry::new();
        let id = registry.register(Rc::new(Recorder {
            tag: "r",
            log,
        }));

        assert!(registry.deregister(id));
        assert!(!registry.deregister(id)); // Second time
    }

    #[test]
    fn tokens_are_never_reused() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let registry = ObserverRegistry::new();

        let first = registry.register(Rc::new(Recorder {
            tag: "a",
            log: Rc::clone(&log),
        }));
        registry.deregister(first);
        let second = registry.register(Rc::new(Recorder {
            tag: "b",
            log,
        }));

        assert_ne!(first, second);
    }

    /// Deregisters itself on the first notification it receives.
    struct SelfRemover {
        registry: Rc<ObserverRegistry>,
        id: Cell<Option<ObserverId>>,
        notifications: Cell<u32>,
    }

    impl EntityObserver for SelfRemover {
        fn entity_added(&self, _entity: EntityId, _mask: &ComponentMask) {}

        fn entity_removed(&self, _entity: EntityId) {}

        fn entity_changed(&self, _entity: EntityId) {
            self.notifications.set(self.notifications.get() + 1);
            if let Some(id) = self.id.take() {
                self.registry.deregister(id);
            }
        }
    }

    #[test]
    fn observer_may_deregister_itself_during_delivery() {
        let registry = Rc::new(ObserverRegistry::new());
        let remover = Rc::new(SelfRemover {
            registry: Rc::clone(&registry),
            id: Cell::new(None),
            notifications: Cell::new(0),
        });
        let id = registry.register(Rc::clone(&remover) as Rc<dyn EntityObserver>);
        remover.id.set(Some(id));

        registry.emit_changed(EntityId::new(0));
        registry.emit_changed(EntityId::new(0));

        assert_eq!(remover.notifications.get(), 1);
        assert!(registry.is_empty());
    }

    /// Emits a removed-notification for every entity it sees appear.
    struct Canceller {
        registry: Rc<ObserverRegistry>,
    }

    impl EntityObserver for Canceller {
        fn entity_added(&self, entity: EntityId, _mask: &ComponentMask) {
            self.registry.emit_removed(entity);
        }

        fn entity_removed(&self, _entity: EntityId) {}

        fn entity_changed(&self, _entity: EntityId) {}
    }

    #[test]
    fn nested_emission_is_delivered_after_the_one_in_flight() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let registry = Rc::new(ObserverRegistry::new());
        registry.register(Rc::new(Canceller {
            registry: Rc::clone(&registry),
        }));
        registry.register(Rc::new(Recorder {
            tag: "late",
            log: Rc::clone(&log),
        }));

        registry.emit_added(EntityId::new(7), &ComponentMask::new());

        // The canceller fires first, but its removed-notification queues
        // behind the added-notification still being delivered.
        assert_eq!(
            *log.borrow(),
            vec![
                "late: added Entity(7) ComponentMask{}",
                "late: removed Entity(7)",
            ]
        );
    }

    /// Re-emits a changed-notification for every one it receives.
    struct Echo {
        registry: Rc<ObserverRegistry>,
    }

    impl EntityObserver for Echo {
        fn entity_added(&self, _entity: EntityId, _mask: &ComponentMask) {}

        fn entity_removed(&self, _entity: EntityId) {}

        fn entity_changed(&self, entity: EntityId) {
            self.registry.emit_changed(entity);
        }
    }

    #[test]
    #[should_panic(expected = "Notification cascade exceeded")]
    fn runaway_cascade_panics() {
        let registry = Rc::new(ObserverRegistry::new());
        registry.register(Rc::new(Echo {
            registry: Rc::clone(&registry),
        }));

        registry.emit_changed(EntityId::new(0));
    }
}
