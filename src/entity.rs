use crate::component::ComponentMask;

/// An entity identifier: a plain slot index, unique while the entity is
/// alive and reusable after destruction.
///
/// There is no generation counter. A removal notification is emitted
/// before the slot can be reused, so consumers that track membership by
/// id always see "old entity removed" before "new entity added" and
/// stale handles cannot be confused with their successors.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(u32);

impl EntityId {
    /// Creates an id from a raw slot index.
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the slot index of this id.
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl std::fmt::Debug for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Allocates and recycles entity slots, storing one component mask per slot.
///
/// Released slots go on a free list and are reused LIFO. Masks are cleared
/// on release and again on reuse, so a recycled slot always starts empty.
pub(crate) struct EntityStore {
    /// Component mask per slot. Index = entity index.
    masks: Vec<ComponentMask>,
    /// Alive flag per slot.
    alive: Vec<bool>,
    /// Free list of recyclable indices (LIFO stack).
    free_list: Vec<u32>,
    /// Total number of currently alive entities.
    count: u32,
    /// Sizing hint from construction; reported even before slots exist.
    capacity_hint: usize,
}

impl EntityStore {
    /// Creates a store pre-sized for `capacity` entities. The store grows
    /// past the hint on demand.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            masks: Vec::with_capacity(capacity),
            alive: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            count: 0,
            capacity_hint: capacity,
        }
    }

    /// Allocates a new entity with an empty mask, reusing a recycled slot
    /// if available.
    pub fn allocate(&mut self) -> EntityId {
        self.count += 1;

        if let Some(index) = self.free_list.pop() {
            let idx = index as usize;
            self.alive[idx] = true;
            self.masks[idx].clear();
            EntityId::new(index)
        } else {
            let index = self.masks.len() as u32;
            self.masks.push(ComponentMask::new());
            self.alive.push(true);
            EntityId::new(index)
        }
    }

    /// Releases an entity, clearing its mask and recycling the slot.
    /// Returns false if the entity was already dead.
    pub fn release(&mut self, entity: EntityId) -> bool {
        let idx = entity.index() as usize;
        if idx >= self.alive.len() || !self.alive[idx] {
            return false;
        }

        self.alive[idx] = false;
        self.masks[idx].clear();
        self.free_list.push(entity.index());
        self.count -= 1;
        true
    }

    /// Returns whether the entity is currently alive.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        let idx = entity.index() as usize;
        idx < self.alive.len() && self.alive[idx]
    }

    /// Returns the mask of a live entity, or `None` if it is dead.
    pub fn mask(&self, entity: EntityId) -> Option<&ComponentMask> {
        let idx = entity.index() as usize;
        if idx < self.alive.len() && self.alive[idx] {
            Some(&self.masks[idx])
        } else {
            None
        }
    }

    /// Mutable variant of [`mask`](Self::mask).
    pub fn mask_mut(&mut self, entity: EntityId) -> Option<&mut ComponentMask> {
        let idx = entity.index() as usize;
        if idx < self.alive.len() && self.alive[idx] {
            Some(&mut self.masks[idx])
        } else {
            None
        }
    }

    /// Returns the number of alive entities.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Returns the larger of the construction hint and the slot count.
    pub fn capacity(&self) -> usize {
        self.capacity_hint.max(self.masks.len())
    }

    /// Iterates over all currently alive entity ids.
    pub fn iter_alive(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(idx, _)| EntityId::new(idx as u32))
    }
}
