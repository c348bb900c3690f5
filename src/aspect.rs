use crate::component::{
    ComponentMask, ComponentTypeId, ComponentTypeRegistry, UnregisteredComponent,
};

type Resolve = fn(&ComponentTypeRegistry) -> Result<ComponentTypeId, UnregisteredComponent>;

fn resolve<T: 'static>(
    registry: &ComponentTypeRegistry,
) -> Result<ComponentTypeId, UnregisteredComponent> {
    registry.lookup::<T>()
}

/// A pure predicate over component masks: "is this composition interesting?"
///
/// An aspect holds three mask sets:
///
/// - **all**: every bit must be present
/// - **one**: at least one bit must be present (ignored when empty)
/// - **exclude**: no bit may be present
///
/// The default aspect is empty on all three and matches every mask.
/// Matching is total, side-effect-free, and a handful of bitwise tests.
///
/// # Example
///
/// ```
/// use sift_ecs::{Aspect, ComponentTypeRegistry};
///
/// struct Position;
/// struct Velocity;
/// struct Frozen;
///
/// let mut registry = ComponentTypeRegistry::new();
/// registry.register::<Position>();
/// registry.register::<Velocity>();
/// registry.register::<Frozen>();
///
/// let movable = Aspect::builder()
///     .all::<Position>()
///     .all::<Velocity>()
///     .exclude::<Frozen>()
///     .build(&registry)?;
/// # Ok::<(), sift_ecs::UnregisteredComponent>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Aspect {
    all: ComponentMask,
    one: ComponentMask,
    exclude: ComponentMask,
}

impl Aspect {
    /// Starts building an aspect from component types.
    pub fn builder() -> AspectBuilder {
        AspectBuilder::default()
    }

    /// Builds an aspect directly from raw mask sets, bypassing the type
    /// registry. For sources that manage their own bit assignment.
    pub fn from_masks(all: ComponentMask, one: ComponentMask, exclude: ComponentMask) -> Self {
        Self { all, one, exclude }
    }

    /// Returns true if the mask satisfies this aspect.
    pub fn matches(&self, mask: &ComponentMask) -> bool {
        mask.contains_all(&self.all)
            && (self.one.is_empty() || mask.intersects(&self.one))
            && !mask.intersects(&self.exclude)
    }

    /// The bits every matching mask must contain.
    pub fn all(&self) -> &ComponentMask {
        &self.all
    }

    /// The bits a matching mask must share at least one of, when non-empty.
    pub fn one(&self) -> &ComponentMask {
        &self.one
    }

    /// The bits no matching mask may contain.
    pub fn exclude(&self) -> &ComponentMask {
        &self.exclude
    }
}

/// Collects component type requirements and resolves them against a
/// [`ComponentTypeRegistry`] into an [`Aspect`].
///
/// Types are recorded at the call site and looked up only in
/// [`build`](Self::build), so a builder can be assembled before the types
/// it names are registered.
#[derive(Default)]
pub struct AspectBuilder {
    all: Vec<Resolve>,
    one: Vec<Resolve>,
    exclude: Vec<Resolve>,
}

impl AspectBuilder {
    /// Requires `T` to be present.
    pub fn all<T: 'static>(mut self) -> Self {
        self.all.push(resolve::<T>);
        self
    }

    /// Requires at least one of the types named via `one` to be present.
    pub fn one<T: 'static>(mut self) -> Self {
        self.one.push(resolve::<T>);
        self
    }

    /// Requires `T` to be absent.
    pub fn exclude<T: 'static>(mut self) -> Self {
        self.exclude.push(resolve::<T>);
        self
    }

    /// Resolves the recorded types into an [`Aspect`].
    ///
    /// # Errors
    ///
    /// Returns [`UnregisteredComponent`] if any named type has never been
    /// registered.
    pub fn build(self, registry: &ComponentTypeRegistry) -> Result<Aspect, UnregisteredComponent> {
        let mut aspect = Aspect::default();
        for resolve in self.all {
            aspect.all.insert(resolve(registry)?);
        }
        for resolve in self.one {
            aspect.one.insert(resolve(registry)?);
        }
        for resolve in self.exclude {
            aspect.exclude.insert(resolve(registry)?);
        }
        Ok(aspect)
    }
}
