//! Quote editing workflow.
//!
//! Holds an editable copy of a booking's quote lines, keeps the totals in
//! step with every edit and drives the booking-side actions a quote screen
//! offers.

pub mod builder;

pub use builder::{ItemUpdate, QuoteBuilder};
