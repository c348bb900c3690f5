use crate::entity::EntityId;

/// A duplicate-free set of entity ids with O(1) insert, remove, and
/// membership tests, iterable as a dense slice.
///
/// Uses a sparse array (entity index -> dense index) and a dense array of
/// ids. Removal swap-removes, so dense order is insertion order only until
/// the first removal. Subscriptions use one bag for the active set and one
/// for the pending-change queue.
#[derive(Default)]
pub struct EntityBag {
    /// Sparse array: `entity_index -> dense_index`. `None` means the id is
    /// not in the bag.
    sparse: Vec<Option<u32>>,
    /// Entity ids in dense order.
    dense: Vec<EntityId>,
}

impl EntityBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty bag pre-sized for `capacity` ids. The bag grows
    /// past the hint on demand.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sparse: Vec::with_capacity(capacity),
            dense: Vec::with_capacity(capacity),
        }
    }

    /// Inserts an id. Returns false if it was already present.
    pub fn insert(&mut self, entity: EntityId) -> bool {
        let idx = entity.index() as usize;

        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, None);
        }

        if self.sparse[idx].is_some() {
            return false;
        }

        self.sparse[idx] = Some(self.dense.len() as u32);
        self.dense.push(entity);
        true
    }

    /// Removes an id by swapping the last dense element into its slot.
    /// Returns false if the id was not present.
    pub fn remove(&mut self, entity: EntityId) -> bool {
        let idx = entity.index() as usize;
        if idx >= self.sparse.len() {
            return false;
        }

        let Some(dense_idx) = self.sparse[idx] else {
            return false;
        };
        self.sparse[idx] = None;

        let dense_idx = dense_idx as usize;
        let last_dense = self.dense.len() - 1;

        if dense_idx != last_dense {
            let swapped = self.dense[last_dense];
            self.sparse[swapped.index() as usize] = Some(dense_idx as u32);
        }

        self.dense.swap_remove(dense_idx);
        true
    }

    /// Returns whether the id is in the bag.
    pub fn contains(&self, entity: EntityId) -> bool {
        let idx = entity.index() as usize;
        idx < self.sparse.len() && self.sparse[idx].is_some()
    }

    /// Returns the number of ids in the bag.
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Returns whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Removes every id, keeping the allocations.
    pub fn clear(&mut self) {
        for entity in self.dense.drain(..) {
            self.sparse[entity.index() as usize] = None;
        }
    }

    /// Returns the ids as a dense slice.
    pub fn as_slice(&self) -> &[EntityId] {
        &self.dense
    }

    /// Iterates over the ids in dense order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.dense.iter().copied()
    }
}
