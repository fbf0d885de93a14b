//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Rates, quote lines and totals are compared by their attributes only; two
/// quote items with the same description, quantity and price are the same
/// item. To "change" one, build a new value.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
