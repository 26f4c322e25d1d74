use crate::entity::EntityId;

/// Configuration errors raised while setting up a [`Universe`](crate::Universe).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    #[error("component kind `{0}` is already registered")]
    DuplicateKind(&'static str),

    #[error("cannot register component kind `{name}`: the kind table is full ({capacity} kinds)")]
    KindCapacity { name: &'static str, capacity: usize },

    #[error("system `{0}` is already registered")]
    DuplicateSystem(&'static str),

    #[error("resource `{0}` is already registered")]
    DuplicateResource(&'static str),

    #[error("entity {0} is not registered")]
    UnknownEntity(EntityId),
}
