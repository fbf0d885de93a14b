//! Entity trait: identity that survives state changes.

/// Entity marker + minimal interface.
///
/// Implemented by records owned by an aggregate (invoices inside a booking)
/// that still need a stable identity of their own.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
