//! `eventrent-core` — shared domain building blocks.
//!
//! Pure domain primitives only: identifiers, the error model and the
//! aggregate/entity traits every lifecycle crate builds on.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::AggregateId;
pub use value_object::ValueObject;
