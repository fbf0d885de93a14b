//! Booking lifecycle (event-sourced).
//!
//! A booking moves from a priced quote through signature, deposit, final
//! invoice and balance payment to completion. Every transition is a command
//! checked against the current status; accepted commands become events.
//! No IO here: the store in `eventrent-infra` owns the aggregates.

pub mod booking;
pub mod invoice;
pub mod opportunity;
pub mod quote;
pub mod status;
pub mod token;

pub use booking::{
    Booking, BookingCanceled, BookingCommand, BookingCompleted, BookingEvent, BookingId,
    BookingOpened, CancelBooking, ClientRenamed, CompleteBooking, DepositPaid, FinalBalancePaid,
    FinalInvoiceIssued, FinalInvoiceSent, FlagOverdueInvoices, InvoicesOverdue,
    IssueFinalInvoice, OpenBooking, PayDeposit, PayFinalBalance, QuoteSaved, QuoteSent,
    QuoteSigned, RenameClient, SaveQuote, SendFinalInvoice, SendQuote, SignQuote,
};
pub use invoice::{Invoice, InvoiceId, InvoiceKind, InvoiceStatus};
pub use opportunity::{ClientRef, EventDetails, EventKind, Opportunity};
pub use quote::{Quote, QuoteId, QuoteStatus, Signature};
pub use status::{BOOKING_STATUS_LABELS, BookingStatus};
pub use token::PortalToken;
