//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Reference data (medicines, suppliers) is compared by identity, not by value.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
