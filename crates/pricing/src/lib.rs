//! Quote pricing.
//!
//! Derives subtotal, tax, total and deposit from an ordered list of quote
//! items. Pure arithmetic on integer cents; no IO, no errors.

pub mod item;
pub mod rate;
pub mod totals;

pub use item::{ProductId, QuoteItem};
pub use rate::{DEFAULT_DEPOSIT_RATE, DEFAULT_TAX_RATE, Rate};
pub use totals::{PricingPolicy, QuoteTotals, compute_totals};
