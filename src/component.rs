use std::any::TypeId;
use std::collections::HashMap;

use fixedbitset::FixedBitSet;
use thiserror::Error;

/// A dense bit index identifying a registered component type.
///
/// Ids minted by a [`ComponentTypeRegistry`] are assigned sequentially from
/// zero, so they double as bit positions in a [`ComponentMask`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentTypeId(usize);

impl ComponentTypeId {
    /// Creates a type id from a raw bit index.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the bit index of this type id.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Error returned when a component type has not been registered.
///
/// This happens when naming a type in an aspect or a mask edit before
/// passing it to `register_component`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Component type `{type_name}` has never been registered. Call register_component() first.")]
pub struct UnregisteredComponent {
    /// The name of the unregistered component type.
    pub type_name: &'static str,
}

/// Assigns each Rust component type a stable bit index.
///
/// Registration is explicit and idempotent: the first
/// [`register`](Self::register) call for a type assigns the next free
/// index, later calls return the same id. Lookups for never-registered
/// types fail with [`UnregisteredComponent`].
#[derive(Default)]
pub struct ComponentTypeRegistry {
    indices: HashMap<TypeId, ComponentTypeId>,
    /// Type names by bit index, for diagnostics.
    names: Vec<&'static str>,
}

impl ComponentTypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T`, assigning the next bit index. Idempotent.
    pub fn register<T: 'static>(&mut self) -> ComponentTypeId {
        let type_id = TypeId::of::<T>();
        if let Some(&id) = self.indices.get(&type_id) {
            return id;
        }
        let id = ComponentTypeId::new(self.names.len());
        self.indices.insert(type_id, id);
        self.names.push(std::any::type_name::<T>());
        id
    }

    /// Returns the id assigned to `T`, if registered.
    pub fn get<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.indices.get(&TypeId::of::<T>()).copied()
    }

    /// Like [`get`](Self::get), but a failing lookup carries the type name.
    pub fn lookup<T: 'static>(&self) -> Result<ComponentTypeId, UnregisteredComponent> {
        self.get::<T>().ok_or(UnregisteredComponent {
            type_name: std::any::type_name::<T>(),
        })
    }

    /// Returns the name of a registered type, for diagnostics.
    pub fn name(&self, id: ComponentTypeId) -> Option<&'static str> {
        self.names.get(id.index()).copied()
    }

    /// Returns the number of registered component types.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns whether no types have been registered.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// The component composition of an entity: a growable set of
/// [`ComponentTypeId`] bits.
///
/// Subscriptions treat masks as opaque values; only an
/// [`Aspect`](crate::Aspect) ever interprets one. Set algebra between masks
/// of different allocated widths behaves as if the shorter one were
/// zero-extended, and equality compares the set of bits, not the width.
#[derive(Clone, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentMask {
    bits: FixedBitSet,
}

impl ComponentMask {
    /// Creates an empty mask.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty mask pre-sized for `component_types` bits.
    pub fn with_capacity(component_types: usize) -> Self {
        Self {
            bits: FixedBitSet::with_capacity(component_types),
        }
    }

    /// Sets the bit for a component type, growing the mask if needed.
    /// Returns true if the bit was newly set.
    pub fn insert(&mut self, id: ComponentTypeId) -> bool {
        self.bits.grow(id.index() + 1);
        !self.bits.put(id.index())
    }

    /// Clears the bit for a component type. Returns true if it was set.
    pub fn remove(&mut self, id: ComponentTypeId) -> bool {
        if id.index() < self.bits.len() {
            let was_set = self.bits.contains(id.index());
            self.bits.set(id.index(), false);
            was_set
        } else {
            false
        }
    }

    /// Returns whether the bit for a component type is set.
    pub fn contains(&self, id: ComponentTypeId) -> bool {
        self.bits.contains(id.index())
    }

    /// Returns whether every bit of `other` is also set in `self`.
    pub fn contains_all(&self, other: &ComponentMask) -> bool {
        other.bits.is_subset(&self.bits)
    }

    /// Returns whether `self` and `other` share at least one bit.
    pub fn intersects(&self, other: &ComponentMask) -> bool {
        !self.bits.is_disjoint(&other.bits)
    }

    /// Returns whether no bits are set.
    pub fn is_empty(&self) -> bool {
        self.bits.is_clear()
    }

    /// Returns the number of set bits.
    pub fn len(&self) -> usize {
        self.bits.count_ones(..)
    }

    /// Clears all bits, keeping the allocated width.
    pub fn clear(&mut self) {
        self.bits.clear();
    }

    /// Iterates over the set bits as [`ComponentTypeId`]s.
    pub fn iter(&self) -> impl Iterator<Item = ComponentTypeId> + '_ {
        self.bits.ones().map(ComponentTypeId::new)
    }
}

impl PartialEq for ComponentMask {
    fn eq(&self, other: &Self) -> bool {
        self.bits.is_subset(&other.bits) && other.bits.is_subset(&self.bits)
    }
}

impl Eq for ComponentMask {}

impl std::fmt::Debug for ComponentMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ComponentMask")?;
        f.debug_set().entries(self.bits.ones()).finish()
    }
}
