use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eventrent_core::{AggregateId, Entity};

use crate::booking::BookingId;

/// Invoice identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub AggregateId);

impl InvoiceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceKind {
    Deposit,
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
}

/// Payment document owned by a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    id: InvoiceId,
    booking_id: BookingId,
    kind: InvoiceKind,
    status: InvoiceStatus,
    /// Amount in smallest currency unit (e.g., cents).
    amount: u64,
    due_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Deposit collected at signature time: created already paid.
    pub(crate) fn paid_deposit(
        id: InvoiceId,
        booking_id: BookingId,
        amount: u64,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            booking_id,
            kind: InvoiceKind::Deposit,
            status: InvoiceStatus::Paid,
            amount,
            due_date: at,
            created_at: at,
            paid_at: Some(at),
        }
    }

    pub(crate) fn draft_final(
        id: InvoiceId,
        booking_id: BookingId,
        amount: u64,
        due_date: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            booking_id,
            kind: InvoiceKind::Final,
            status: InvoiceStatus::Draft,
            amount,
            due_date,
            created_at: at,
            paid_at: None,
        }
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn booking_id(&self) -> BookingId {
        self.booking_id
    }

    pub fn kind(&self) -> InvoiceKind {
        self.kind
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }

    /// Waiting on the client: sent, possibly already past due.
    pub fn is_awaiting_payment(&self) -> bool {
        matches!(self.status, InvoiceStatus::Sent | InvoiceStatus::Overdue)
    }

    pub fn is_past_due(&self, as_of: DateTime<Utc>) -> bool {
        self.status == InvoiceStatus::Sent && self.due_date < as_of
    }

    pub(crate) fn mark_sent(&mut self) {
        self.status = InvoiceStatus::Sent;
    }

    pub(crate) fn mark_overdue(&mut self) {
        self.status = InvoiceStatus::Overdue;
    }

    pub(crate) fn mark_paid(&mut self, at: DateTime<Utc>) {
        self.status = InvoiceStatus::Paid;
        self.paid_at = Some(at);
    }
}

impl Entity for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
