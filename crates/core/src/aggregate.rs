//! Aggregate traits for the booking and client lifecycles.

/// Aggregate root marker + minimal interface.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Number of events applied so far.
    fn version(&self) -> u64;
}

/// Decide/evolve split for a lifecycle aggregate.
///
/// - `handle(&self, cmd)` checks preconditions against the current state and
///   returns the events describing the transition. It never mutates.
/// - `apply(&mut self, event)` evolves state and bumps `version()` by one.
///
/// A rejected command therefore leaves the aggregate exactly as it was.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    fn apply(&mut self, event: &Self::Event);

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
