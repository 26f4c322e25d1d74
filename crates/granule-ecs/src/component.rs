use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::BitOr;

use crate::entity::Entity;
use crate::error::EcsError;

/// Maximum number of kinds the table can hold: one per bit of [`ComponentMask`].
pub const MAX_COMPONENT_KINDS: usize = u32::BITS as usize;

/// Trait for types that can be attached to an [`Entity`].
///
/// A component may also count as one or more broader kinds. A system that
/// requires such a kind runs on every entity owning a component that lists it,
/// whatever its concrete type.
pub trait Component: Any + Send + Sync {
    /// Broader kinds this component satisfies besides its own type.
    fn satisfies() -> Vec<ComponentKind>
    where
        Self: Sized,
    {
        Vec::new()
    }
}

/// Runtime identity of a component type (or of a marker type used as a
/// broader kind).
#[derive(Clone, Copy)]
pub struct ComponentKind {
    id: TypeId,
    name: &'static str,
}

impl ComponentKind {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without the module path.
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl PartialEq for ComponentKind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentKind {}

impl Hash for ComponentKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentKind({})", self.short_name())
    }
}

/// A set of component kinds, one bit per position in the [`ComponentKinds`] table.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ComponentMask(u32);

impl ComponentMask {
    pub const EMPTY: ComponentMask = ComponentMask(0);

    /// Mask with only the bit for table index `index` set.
    pub fn bit(index: usize) -> Self {
        debug_assert!(index < MAX_COMPONENT_KINDS);
        Self(1 << index)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains_all(&self, other: ComponentMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether an entity carrying `self` should be handed to a system that
    /// requires `required`: every required bit must be present, and an empty
    /// requirement matches nothing.
    pub fn matches(&self, required: ComponentMask) -> bool {
        !required.is_empty() && self.contains_all(required)
    }

    /// Table indices of the set bits, lowest first.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        let bits = self.0;
        (0..MAX_COMPONENT_KINDS).filter(move |i| bits & (1 << i) != 0)
    }
}

impl BitOr for ComponentMask {
    type Output = ComponentMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        ComponentMask(self.0 | rhs.0)
    }
}

impl fmt::Debug for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentMask({:#b})", self.0)
    }
}

/// Ordered table of registered kinds. A kind's position is its bit index.
#[derive(Debug, Default)]
pub struct ComponentKinds {
    kinds: Vec<ComponentKind>,
}

impl ComponentKinds {
    pub fn new() -> Self {
        Self { kinds: Vec::new() }
    }

    /// Append a kind, returning its single-bit flag.
    pub fn register(&mut self, kind: ComponentKind) -> Result<ComponentMask, EcsError> {
        if self.index_of(kind).is_some() {
            return Err(EcsError::DuplicateKind(kind.name()));
        }
        if self.kinds.len() >= MAX_COMPONENT_KINDS {
            return Err(EcsError::KindCapacity {
                name: kind.name(),
                capacity: MAX_COMPONENT_KINDS,
            });
        }
        self.kinds.push(kind);
        Ok(ComponentMask::bit(self.kinds.len() - 1))
    }

    pub fn index_of(&self, kind: ComponentKind) -> Option<usize> {
        self.kinds.iter().position(|k| *k == kind)
    }

    /// Single-bit flag for `kind`, or `None` if it was never registered.
    pub fn flag_of(&self, kind: ComponentKind) -> Option<ComponentMask> {
        self.index_of(kind).map(ComponentMask::bit)
    }

    pub fn mask_of<T: 'static>(&self) -> Option<ComponentMask> {
        self.flag_of(ComponentKind::of::<T>())
    }

    /// Compile a list of kinds (a system's requirements) into a mask.
    /// Kinds missing from the table contribute no bits.
    pub fn compile(&self, kinds: &[ComponentKind]) -> ComponentMask {
        kinds
            .iter()
            .filter_map(|kind| self.flag_of(*kind))
            .fold(ComponentMask::EMPTY, BitOr::bitor)
    }

    /// Compile the kinds satisfied by an entity's components into a mask.
    /// Components of unregistered kinds contribute no bits.
    pub fn compile_entity(&self, entity: &Entity) -> ComponentMask {
        self.compile_iter(entity.kinds())
    }

    fn compile_iter<'a>(&self, kinds: impl Iterator<Item = &'a ComponentKind>) -> ComponentMask {
        kinds
            .filter_map(|kind| self.flag_of(*kind))
            .fold(ComponentMask::EMPTY, BitOr::bitor)
    }

    /// The entries of `kinds` that are not in the table.
    pub fn unknown(&self, kinds: &[ComponentKind]) -> Vec<ComponentKind> {
        kinds
            .iter()
            .copied()
            .filter(|kind| self.index_of(*kind).is_none())
            .collect()
    }

    pub fn get(&self, index: usize) -> Option<ComponentKind> {
        self.kinds.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentKind> {
        self.kinds.iter()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position;
    struct Velocity;
    struct Health;
    struct Heavy;
    enum Solid {}

    impl Component for Position {}
    impl Component for Velocity {}
    impl Component for Health {}
    impl Component for Heavy {
        fn satisfies() -> Vec<ComponentKind> {
            vec![ComponentKind::of::<Solid>()]
        }
    }

    fn table() -> ComponentKinds {
        let mut kinds = ComponentKinds::new();
        kinds.register(ComponentKind::of::<Position>()).unwrap();
        kinds.register(ComponentKind::of::<Velocity>()).unwrap();
        kinds.register(ComponentKind::of::<Health>()).unwrap();
        kinds
    }

    #[test]
    fn register_assigns_bits_in_order() {
        let mut kinds = ComponentKinds::new();
        let a = kinds.register(ComponentKind::of::<Position>()).unwrap();
        let b = kinds.register(ComponentKind::of::<Velocity>()).unwrap();
        assert_eq!(a.bits(), 0b01);
        assert_eq!(b.bits(), 0b10);
        assert_eq!(kinds.index_of(ComponentKind::of::<Velocity>()), Some(1));
    }

    #[test]
    fn duplicate_kind_rejected() {
        let mut kinds = table();
        let err = kinds.register(ComponentKind::of::<Position>()).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateKind(_)));
        assert_eq!(kinds.len(), 3);
    }

    #[test]
    fn capacity_is_a_hard_limit() {
        macro_rules! register_markers {
            ($kinds:expr, $($name:ident),*) => {
                $(
                    struct $name;
                    $kinds.register(ComponentKind::of::<$name>()).unwrap();
                )*
            };
        }

        let mut kinds = ComponentKinds::new();
        register_markers!(
            kinds, K0, K1, K2, K3, K4, K5, K6, K7, K8, K9, K10, K11, K12, K13, K14, K15, K16,
            K17, K18, K19, K20, K21, K22, K23, K24, K25, K26, K27, K28, K29, K30, K31
        );
        assert_eq!(kinds.len(), MAX_COMPONENT_KINDS);

        struct Overflow;
        let err = kinds.register(ComponentKind::of::<Overflow>()).unwrap_err();
        assert!(matches!(err, EcsError::KindCapacity { capacity: 32, .. }));
        assert_eq!(kinds.len(), MAX_COMPONENT_KINDS);
    }

    #[test]
    fn compiled_bits_are_exactly_the_subset() {
        let kinds = table();
        let all = [
            ComponentKind::of::<Position>(),
            ComponentKind::of::<Velocity>(),
            ComponentKind::of::<Health>(),
        ];
        for subset in 0u32..(1 << all.len()) {
            let chosen: Vec<_> = all
                .iter()
                .enumerate()
                .filter(|(i, _)| subset & (1 << i) != 0)
                .map(|(_, k)| *k)
                .collect();
            let mask = kinds.compile(&chosen);
            assert_eq!(mask.bits(), subset);
            let expected: Vec<_> = chosen.iter().map(|k| kinds.index_of(*k).unwrap()).collect();
            assert_eq!(mask.indices().collect::<Vec<_>>(), expected);
        }
    }

    #[test]
    fn entity_and_list_shapes_compile_identically() {
        let kinds = table();
        let entity = Entity::new().with(Position).with(Health);
        let listed = kinds.compile(&[ComponentKind::of::<Position>(), ComponentKind::of::<Health>()]);
        assert_eq!(kinds.compile_entity(&entity), listed);
        assert_eq!(listed.bits(), 0b101);
    }

    #[test]
    fn unknown_kinds_contribute_nothing() {
        struct Unregistered;
        let kinds = table();
        let mask = kinds.compile(&[ComponentKind::of::<Unregistered>(), ComponentKind::of::<Velocity>()]);
        assert_eq!(mask.bits(), 0b10);
        assert_eq!(
            kinds.unknown(&[ComponentKind::of::<Unregistered>(), ComponentKind::of::<Velocity>()]),
            vec![ComponentKind::of::<Unregistered>()]
        );
    }

    #[test]
    fn broader_kind_matches_satisfying_component() {
        let mut kinds = table();
        let solid = kinds.register(ComponentKind::of::<Solid>()).unwrap();
        let entity = Entity::new().with(Heavy);
        assert_eq!(kinds.compile_entity(&entity), solid);
    }

    #[test]
    fn matching_requires_every_bit() {
        let pos = ComponentMask::bit(0);
        let vel = ComponentMask::bit(1);
        let both = pos | vel;
        assert!(both.matches(pos));
        assert!(both.matches(both));
        assert!(!pos.matches(both));
        assert!(!both.matches(ComponentMask::EMPTY));
        assert!(!ComponentMask::EMPTY.matches(ComponentMask::EMPTY));
    }
}
