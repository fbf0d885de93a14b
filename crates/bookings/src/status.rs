//! Booking status and its display labels.
//!
//! Transitions match on [`BookingStatus`]; the French labels shown to staff
//! and clients live only in [`BOOKING_STATUS_LABELS`].

use serde::{Deserialize, Serialize};

/// Booking status lifecycle.
///
/// Quoted → Confirmed → AwaitingFinalPayment → FullyPaid → Completed, with
/// Canceled reachable from any status before the balance is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Quoted,
    Confirmed,
    AwaitingFinalPayment,
    FullyPaid,
    Completed,
    Canceled,
}

/// Display label per status.
pub const BOOKING_STATUS_LABELS: [(BookingStatus, &str); 6] = [
    (BookingStatus::Quoted, "Devis"),
    (BookingStatus::Confirmed, "Confirmé"),
    (BookingStatus::AwaitingFinalPayment, "En attente de paiement final"),
    (BookingStatus::FullyPaid, "Payé en totalité"),
    (BookingStatus::Completed, "Terminé"),
    (BookingStatus::Canceled, "Annulé"),
];

impl BookingStatus {
    pub const ALL: [BookingStatus; 6] = [
        BookingStatus::Quoted,
        BookingStatus::Confirmed,
        BookingStatus::AwaitingFinalPayment,
        BookingStatus::FullyPaid,
        BookingStatus::Completed,
        BookingStatus::Canceled,
    ];

    pub fn label(self) -> &'static str {
        BOOKING_STATUS_LABELS
            .iter()
            .find(|(status, _)| *status == self)
            .map(|(_, label)| *label)
            .unwrap_or("")
    }

    pub fn from_label(label: &str) -> Option<Self> {
        BOOKING_STATUS_LABELS
            .iter()
            .find(|(_, l)| *l == label)
            .map(|(status, _)| *status)
    }

    /// No further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Canceled)
    }

    pub fn can_be_canceled(self) -> bool {
        matches!(
            self,
            BookingStatus::Quoted | BookingStatus::Confirmed | BookingStatus::AwaitingFinalPayment
        )
    }
}

impl core::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}
