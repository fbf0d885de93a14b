use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eventrent_core::AggregateId;
use eventrent_pricing::{PricingPolicy, QuoteItem, QuoteTotals, Rate, compute_totals};

/// Quote identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteId(pub AggregateId);

impl QuoteId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for QuoteId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Quote status lifecycle (independent of the booking status).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuoteStatus {
    Draft,
    Sent,
    Signed,
    DepositPaid,
    FullyPaid,
    Canceled,
}

/// Who signed the quote through the portal, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub signed_at: DateTime<Utc>,
}

/// Priced proposal attached to a booking.
///
/// Totals are always derived from the items with the pricing calculator;
/// there is no way to set them directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    id: QuoteId,
    items: Vec<QuoteItem>,
    totals: QuoteTotals,
    policy: PricingPolicy,
    status: QuoteStatus,
    signature: Option<Signature>,
}

impl Quote {
    /// A fresh Draft quote priced with `policy`.
    pub fn draft(id: QuoteId, items: Vec<QuoteItem>, policy: &PricingPolicy) -> Self {
        let totals = compute_totals(&items, policy);
        Self {
            id,
            items,
            totals,
            policy: *policy,
            status: QuoteStatus::Draft,
            signature: None,
        }
    }

    pub fn id(&self) -> QuoteId {
        self.id
    }

    pub fn items(&self) -> &[QuoteItem] {
        &self.items
    }

    pub fn totals(&self) -> QuoteTotals {
        self.totals
    }

    pub fn subtotal(&self) -> u64 {
        self.totals.subtotal
    }

    pub fn tax_amount(&self) -> u64 {
        self.totals.tax_amount
    }

    pub fn total(&self) -> u64 {
        self.totals.total
    }

    pub fn deposit_amount(&self) -> u64 {
        self.totals.deposit_amount
    }

    pub fn tax_rate(&self) -> Rate {
        self.policy.tax_rate
    }

    pub fn deposit_rate(&self) -> Rate {
        self.policy.deposit_rate
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    pub fn status(&self) -> QuoteStatus {
        self.status
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Replacement for `previous`: new items and totals, but the status and
    /// signature already reached by `previous` are kept.
    pub(crate) fn superseding(mut self, previous: Option<&Quote>) -> Self {
        match previous {
            Some(prev) => {
                self.status = prev.status;
                self.signature = prev.signature.clone();
            }
            None => {
                self.status = QuoteStatus::Draft;
                self.signature = None;
            }
        }
        self
    }

    pub(crate) fn set_status(&mut self, status: QuoteStatus) {
        self.status = status;
    }

    pub(crate) fn sign(&mut self, signature: Signature) {
        self.status = QuoteStatus::Signed;
        self.signature = Some(signature);
    }
}
