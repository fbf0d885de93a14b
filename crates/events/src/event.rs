use chrono::{DateTime, Utc};

/// A lifecycle event: an immutable fact about one aggregate.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "bookings.booking.quote_sent").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the transition happened (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
