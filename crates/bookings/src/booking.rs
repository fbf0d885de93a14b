use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use eventrent_clients::ClientId;
use eventrent_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use eventrent_events::Event;

use crate::invoice::{Invoice, InvoiceId, InvoiceKind};
use crate::opportunity::EventDetails;
use crate::quote::{Quote, QuoteStatus, Signature};
use crate::status::BookingStatus;
use crate::token::PortalToken;

/// Booking identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(pub AggregateId);

impl BookingId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for BookingId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Booking.
///
/// Owns its quote, its invoices and the portal token handed to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Booking {
    id: BookingId,
    client_id: Option<ClientId>,
    client_name: String,
    event: EventDetails,
    status: BookingStatus,
    /// Mirrors the quote total, in cents.
    amount: u64,
    quote: Option<Quote>,
    invoices: Vec<Invoice>,
    #[serde(skip)]
    portal_token: Option<PortalToken>,
    created_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    version: u64,
    #[serde(skip)]
    created: bool,
}

impl Booking {
    /// Create an empty, not-yet-opened aggregate instance.
    pub fn empty(id: BookingId) -> Self {
        Self {
            id,
            client_id: None,
            client_name: String::new(),
            event: EventDetails::default(),
            status: BookingStatus::Quoted,
            amount: 0,
            quote: None,
            invoices: Vec::new(),
            portal_token: None,
            created_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> BookingId {
        self.id
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn event(&self) -> &EventDetails {
        &self.event
    }

    pub fn event_name(&self) -> &str {
        &self.event.name
    }

    pub fn event_date(&self) -> DateTime<Utc> {
        self.event.date
    }

    pub fn status(&self) -> BookingStatus {
        self.status
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn quote(&self) -> Option<&Quote> {
        self.quote.as_ref()
    }

    pub fn invoices(&self) -> &[Invoice] {
        &self.invoices
    }

    pub fn portal_token(&self) -> Option<&PortalToken> {
        self.portal_token.as_ref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn deposit_invoice(&self) -> Option<&Invoice> {
        self.invoices
            .iter()
            .find(|inv| inv.kind() == InvoiceKind::Deposit)
    }

    pub fn final_invoice(&self) -> Option<&Invoice> {
        self.invoices
            .iter()
            .find(|inv| inv.kind() == InvoiceKind::Final)
    }

    pub fn invoice(&self, invoice_id: InvoiceId) -> Option<&Invoice> {
        self.invoices.iter().find(|inv| inv.id_typed() == invoice_id)
    }

    /// Whether `presented` opens this booking in the client portal.
    pub fn grants_portal_access(&self, presented: &str) -> bool {
        self.portal_token
            .as_ref()
            .is_some_and(|token| token.matches(presented))
    }

    pub fn is_upcoming(&self, as_of: DateTime<Utc>) -> bool {
        self.event.date > as_of
    }
}

impl AggregateRoot for Booking {
    type Id = BookingId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenBooking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenBooking {
    pub booking_id: BookingId,
    pub client_id: ClientId,
    pub client_name: String,
    pub event: EventDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SaveQuote. Replaces items and totals, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveQuote {
    pub booking_id: BookingId,
    pub quote: Quote,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SendQuote. `portal_token` is the freshly generated credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendQuote {
    pub booking_id: BookingId,
    pub portal_token: PortalToken,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SignQuote (client portal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignQuote {
    pub booking_id: BookingId,
    pub presented_token: String,
    pub signer_name: String,
    pub signer_email: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PayDeposit (client portal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayDeposit {
    pub booking_id: BookingId,
    pub presented_token: String,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: IssueFinalInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFinalInvoice {
    pub booking_id: BookingId,
    pub invoice_id: InvoiceId,
    /// Days between the balance due date and the event.
    pub lead_days: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SendFinalInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendFinalInvoice {
    pub booking_id: BookingId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PayFinalBalance (client portal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayFinalBalance {
    pub booking_id: BookingId,
    pub presented_token: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompleteBooking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteBooking {
    pub booking_id: BookingId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelBooking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelBooking {
    pub booking_id: BookingId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: FlagOverdueInvoices. Emits nothing when no invoice is past due.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagOverdueInvoices {
    pub booking_id: BookingId,
    pub as_of: DateTime<Utc>,
}

/// Command: RenameClient. Keeps the denormalised client name in sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameClient {
    pub booking_id: BookingId,
    pub client_name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingCommand {
    OpenBooking(OpenBooking),
    SaveQuote(SaveQuote),
    SendQuote(SendQuote),
    SignQuote(SignQuote),
    PayDeposit(PayDeposit),
    IssueFinalInvoice(IssueFinalInvoice),
    SendFinalInvoice(SendFinalInvoice),
    PayFinalBalance(PayFinalBalance),
    CompleteBooking(CompleteBooking),
    CancelBooking(CancelBooking),
    FlagOverdueInvoices(FlagOverdueInvoices),
    RenameClient(RenameClient),
}

/// Event: BookingOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingOpened {
    pub booking_id: BookingId,
    pub client_id: ClientId,
    pub client_name: String,
    pub event: EventDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuoteSaved. `quote` already carries the status it keeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSaved {
    pub booking_id: BookingId,
    pub quote: Quote,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuoteSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSent {
    pub booking_id: BookingId,
    pub portal_token: PortalToken,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuoteSigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSigned {
    pub booking_id: BookingId,
    pub signature: Signature,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DepositPaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositPaid {
    pub booking_id: BookingId,
    pub invoice: Invoice,
    pub occurred_at: DateTime<Utc>,
}

/// Event: FinalInvoiceIssued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalInvoiceIssued {
    pub booking_id: BookingId,
    pub invoice: Invoice,
    pub occurred_at: DateTime<Utc>,
}

/// Event: FinalInvoiceSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalInvoiceSent {
    pub booking_id: BookingId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: FinalBalancePaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalBalancePaid {
    pub booking_id: BookingId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BookingCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingCompleted {
    pub booking_id: BookingId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BookingCanceled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingCanceled {
    pub booking_id: BookingId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoicesOverdue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicesOverdue {
    pub booking_id: BookingId,
    pub invoice_ids: Vec<InvoiceId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ClientRenamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRenamed {
    pub booking_id: BookingId,
    pub client_name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingEvent {
    BookingOpened(BookingOpened),
    QuoteSaved(QuoteSaved),
    QuoteSent(QuoteSent),
    QuoteSigned(QuoteSigned),
    DepositPaid(DepositPaid),
    FinalInvoiceIssued(FinalInvoiceIssued),
    FinalInvoiceSent(FinalInvoiceSent),
    FinalBalancePaid(FinalBalancePaid),
    BookingCompleted(BookingCompleted),
    BookingCanceled(BookingCanceled),
    InvoicesOverdue(InvoicesOverdue),
    ClientRenamed(ClientRenamed),
}

impl Event for BookingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BookingEvent::BookingOpened(_) => "bookings.booking.opened",
            BookingEvent::QuoteSaved(_) => "bookings.booking.quote_saved",
            BookingEvent::QuoteSent(_) => "bookings.booking.quote_sent",
            BookingEvent::QuoteSigned(_) => "bookings.booking.quote_signed",
            BookingEvent::DepositPaid(_) => "bookings.booking.deposit_paid",
            BookingEvent::FinalInvoiceIssued(_) => "bookings.booking.final_invoice_issued",
            BookingEvent::FinalInvoiceSent(_) => "bookings.booking.final_invoice_sent",
            BookingEvent::FinalBalancePaid(_) => "bookings.booking.final_balance_paid",
            BookingEvent::BookingCompleted(_) => "bookings.booking.completed",
            BookingEvent::BookingCanceled(_) => "bookings.booking.canceled",
            BookingEvent::InvoicesOverdue(_) => "bookings.booking.invoices_overdue",
            BookingEvent::ClientRenamed(_) => "bookings.booking.client_renamed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BookingEvent::BookingOpened(e) => e.occurred_at,
            BookingEvent::QuoteSaved(e) => e.occurred_at,
            BookingEvent::QuoteSent(e) => e.occurred_at,
            BookingEvent::QuoteSigned(e) => e.occurred_at,
            BookingEvent::DepositPaid(e) => e.occurred_at,
            BookingEvent::FinalInvoiceIssued(e) => e.occurred_at,
            BookingEvent::FinalInvoiceSent(e) => e.occurred_at,
            BookingEvent::FinalBalancePaid(e) => e.occurred_at,
            BookingEvent::BookingCompleted(e) => e.occurred_at,
            BookingEvent::BookingCanceled(e) => e.occurred_at,
            BookingEvent::InvoicesOverdue(e) => e.occurred_at,
            BookingEvent::ClientRenamed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Booking {
    type Command = BookingCommand;
    type Event = BookingEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            BookingEvent::BookingOpened(e) => {
                self.id = e.booking_id;
                self.client_id = Some(e.client_id);
                self.client_name = e.client_name.clone();
                self.event = e.event.clone();
                self.status = BookingStatus::Quoted;
                self.amount = 0;
                self.quote = None;
                self.invoices.clear();
                self.portal_token = None;
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            BookingEvent::QuoteSaved(e) => {
                self.amount = e.quote.total();
                self.quote = Some(e.quote.clone());
            }
            BookingEvent::QuoteSent(e) => {
                if let Some(quote) = self.quote.as_mut() {
                    quote.set_status(QuoteStatus::Sent);
                }
                self.portal_token = Some(e.portal_token.clone());
            }
            BookingEvent::QuoteSigned(e) => {
                if let Some(quote) = self.quote.as_mut() {
                    quote.sign(e.signature.clone());
                }
            }
            BookingEvent::DepositPaid(e) => {
                if let Some(quote) = self.quote.as_mut() {
                    quote.set_status(QuoteStatus::DepositPaid);
                }
                self.invoices.push(e.invoice.clone());
                self.status = BookingStatus::Confirmed;
            }
            BookingEvent::FinalInvoiceIssued(e) => {
                self.invoices.push(e.invoice.clone());
            }
            BookingEvent::FinalInvoiceSent(e) => {
                if let Some(inv) = self.invoice_mut(e.invoice_id) {
                    inv.mark_sent();
                }
                self.status = BookingStatus::AwaitingFinalPayment;
            }
            BookingEvent::FinalBalancePaid(e) => {
                if let Some(quote) = self.quote.as_mut() {
                    quote.set_status(QuoteStatus::FullyPaid);
                }
                if let Some(inv) = self.invoice_mut(e.invoice_id) {
                    inv.mark_paid(e.occurred_at);
                }
                self.status = BookingStatus::FullyPaid;
            }
            BookingEvent::BookingCompleted(_) => {
                self.status = BookingStatus::Completed;
            }
            BookingEvent::BookingCanceled(_) => {
                if let Some(quote) = self.quote.as_mut() {
                    quote.set_status(QuoteStatus::Canceled);
                }
                self.portal_token = None;
                self.status = BookingStatus::Canceled;
            }
            BookingEvent::InvoicesOverdue(e) => {
                for id in &e.invoice_ids {
                    if let Some(inv) = self.invoice_mut(*id) {
                        inv.mark_overdue();
                    }
                }
            }
            BookingEvent::ClientRenamed(e) => {
                self.client_name = e.client_name.clone();
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            BookingCommand::OpenBooking(cmd) => self.handle_open(cmd),
            BookingCommand::SaveQuote(cmd) => self.handle_save_quote(cmd),
            BookingCommand::SendQuote(cmd) => self.handle_send_quote(cmd),
            BookingCommand::SignQuote(cmd) => self.handle_sign_quote(cmd),
            BookingCommand::PayDeposit(cmd) => self.handle_pay_deposit(cmd),
            BookingCommand::IssueFinalInvoice(cmd) => self.handle_issue_final_invoice(cmd),
            BookingCommand::SendFinalInvoice(cmd) => self.handle_send_final_invoice(cmd),
            BookingCommand::PayFinalBalance(cmd) => self.handle_pay_final_balance(cmd),
            BookingCommand::CompleteBooking(cmd) => self.handle_complete(cmd),
            BookingCommand::CancelBooking(cmd) => self.handle_cancel(cmd),
            BookingCommand::FlagOverdueInvoices(cmd) => self.handle_flag_overdue(cmd),
            BookingCommand::RenameClient(cmd) => self.handle_rename_client(cmd),
        }
    }
}

impl Booking {
    fn invoice_mut(&mut self, invoice_id: InvoiceId) -> Option<&mut Invoice> {
        self.invoices
            .iter_mut()
            .find(|inv| inv.id_typed() == invoice_id)
    }

    fn ensure_opened(&self, booking_id: BookingId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != booking_id {
            return Err(DomainError::invalid_state("booking_id mismatch"));
        }
        Ok(())
    }

    /// A missing or wrong token looks exactly like an unknown booking.
    fn ensure_portal_access(&self, presented: &str) -> Result<(), DomainError> {
        if self.grants_portal_access(presented) {
            Ok(())
        } else {
            Err(DomainError::not_found())
        }
    }

    /// Completed and Canceled bookings accept no further lifecycle step.
    fn ensure_active(&self) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_state(format!(
                "booking is {:?}",
                self.status
            )));
        }
        Ok(())
    }

    fn require_quote(&self) -> Result<&Quote, DomainError> {
        self.quote
            .as_ref()
            .ok_or_else(|| DomainError::invalid_state("booking has no quote"))
    }

    fn handle_open(&self, cmd: &OpenBooking) -> Result<Vec<BookingEvent>, DomainError> {
        if self.created {
            return Err(DomainError::invalid_state("booking already exists"));
        }
        if cmd.event.name.trim().is_empty() {
            return Err(DomainError::validation("event name cannot be empty"));
        }

        Ok(vec![BookingEvent::BookingOpened(BookingOpened {
            booking_id: cmd.booking_id,
            client_id: cmd.client_id,
            client_name: cmd.client_name.clone(),
            event: cmd.event.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_save_quote(&self, cmd: &SaveQuote) -> Result<Vec<BookingEvent>, DomainError> {
        self.ensure_opened(cmd.booking_id)?;
        self.ensure_active()?;

        let quote = cmd.quote.clone().superseding(self.quote.as_ref());

        Ok(vec![BookingEvent::QuoteSaved(QuoteSaved {
            booking_id: cmd.booking_id,
            quote,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_send_quote(&self, cmd: &SendQuote) -> Result<Vec<BookingEvent>, DomainError> {
        self.ensure_opened(cmd.booking_id)?;
        self.ensure_active()?;

        let quote = self.require_quote()?;
        if !matches!(quote.status(), QuoteStatus::Draft | QuoteStatus::Sent) {
            return Err(DomainError::invalid_state(
                "only draft or sent quotes can be sent for signature",
            ));
        }

        Ok(vec![BookingEvent::QuoteSent(QuoteSent {
            booking_id: cmd.booking_id,
            portal_token: cmd.portal_token.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_sign_quote(&self, cmd: &SignQuote) -> Result<Vec<BookingEvent>, DomainError> {
        self.ensure_opened(cmd.booking_id)?;
        self.ensure_portal_access(&cmd.presented_token)?;
        self.ensure_active()?;

        let quote = self.require_quote()?;
        if quote.status() != QuoteStatus::Sent {
            return Err(DomainError::invalid_state("quote is not awaiting signature"));
        }

        let name = cmd.signer_name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("signer name cannot be empty"));
        }

        Ok(vec![BookingEvent::QuoteSigned(QuoteSigned {
            booking_id: cmd.booking_id,
            signature: Signature {
                name: name.to_string(),
                email: cmd.signer_email.clone(),
                signed_at: cmd.occurred_at,
            },
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_pay_deposit(&self, cmd: &PayDeposit) -> Result<Vec<BookingEvent>, DomainError> {
        self.ensure_opened(cmd.booking_id)?;
        self.ensure_portal_access(&cmd.presented_token)?;
        self.ensure_active()?;

        let quote = self.require_quote()?;
        if quote.status() != QuoteStatus::Signed {
            return Err(DomainError::invalid_state(
                "deposit can only be paid on a signed quote",
            ));
        }

        let invoice = Invoice::paid_deposit(
            cmd.invoice_id,
            cmd.booking_id,
            quote.deposit_amount(),
            cmd.occurred_at,
        );

        Ok(vec![BookingEvent::DepositPaid(DepositPaid {
            booking_id: cmd.booking_id,
            invoice,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_issue_final_invoice(
        &self,
        cmd: &IssueFinalInvoice,
    ) -> Result<Vec<BookingEvent>, DomainError> {
        self.ensure_opened(cmd.booking_id)?;
        self.ensure_active()?;

        if self.status != BookingStatus::Confirmed {
            return Err(DomainError::invalid_state(
                "final invoice requires a confirmed booking",
            ));
        }
        let quote = self.require_quote()?;
        if self.final_invoice().is_some() {
            return Err(DomainError::invalid_state("booking already has a final invoice"));
        }

        let deposit_paid = self
            .invoices
            .iter()
            .find(|inv| inv.kind() == InvoiceKind::Deposit && inv.is_paid())
            .map(Invoice::amount)
            .unwrap_or_else(|| quote.deposit_amount());
        let amount = quote.total().saturating_sub(deposit_paid);

        let due_date = self
            .event
            .date
            .checked_sub_signed(Duration::days(i64::from(cmd.lead_days)))
            .ok_or_else(|| DomainError::validation("final invoice due date out of range"))?;

        let invoice = Invoice::draft_final(
            cmd.invoice_id,
            cmd.booking_id,
            amount,
            due_date,
            cmd.occurred_at,
        );

        Ok(vec![BookingEvent::FinalInvoiceIssued(FinalInvoiceIssued {
            booking_id: cmd.booking_id,
            invoice,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_send_final_invoice(
        &self,
        cmd: &SendFinalInvoice,
    ) -> Result<Vec<BookingEvent>, DomainError> {
        self.ensure_opened(cmd.booking_id)?;
        self.ensure_active()?;

        let invoice = self.invoice(cmd.invoice_id).ok_or_else(DomainError::not_found)?;
        if invoice.kind() != InvoiceKind::Final {
            return Err(DomainError::invalid_state("only the final invoice can be sent"));
        }
        if !matches!(
            invoice.status(),
            crate::invoice::InvoiceStatus::Draft | crate::invoice::InvoiceStatus::Sent
        ) {
            return Err(DomainError::invalid_state("invoice is no longer sendable"));
        }
        if !matches!(
            self.status,
            BookingStatus::Confirmed | BookingStatus::AwaitingFinalPayment
        ) {
            return Err(DomainError::invalid_state(
                "final invoice can only be sent on a confirmed booking",
            ));
        }

        Ok(vec![BookingEvent::FinalInvoiceSent(FinalInvoiceSent {
            booking_id: cmd.booking_id,
            invoice_id: cmd.invoice_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_pay_final_balance(
        &self,
        cmd: &PayFinalBalance,
    ) -> Result<Vec<BookingEvent>, DomainError> {
        self.ensure_opened(cmd.booking_id)?;
        self.ensure_portal_access(&cmd.presented_token)?;
        self.ensure_active()?;

        if self.status != BookingStatus::AwaitingFinalPayment {
            return Err(DomainError::invalid_state(
                "booking is not awaiting its final payment",
            ));
        }
        let invoice = self
            .final_invoice()
            .filter(|inv| inv.is_awaiting_payment())
            .ok_or_else(|| DomainError::invalid_state("no final invoice awaiting payment"))?;

        Ok(vec![BookingEvent::FinalBalancePaid(FinalBalancePaid {
            booking_id: cmd.booking_id,
            invoice_id: invoice.id_typed(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(&self, cmd: &CompleteBooking) -> Result<Vec<BookingEvent>, DomainError> {
        self.ensure_opened(cmd.booking_id)?;

        if self.status != BookingStatus::FullyPaid {
            return Err(DomainError::invalid_state(
                "only fully paid bookings can be completed",
            ));
        }

        Ok(vec![BookingEvent::BookingCompleted(BookingCompleted {
            booking_id: cmd.booking_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelBooking) -> Result<Vec<BookingEvent>, DomainError> {
        self.ensure_opened(cmd.booking_id)?;

        if !self.status.can_be_canceled() {
            return Err(DomainError::invalid_state(format!(
                "booking cannot be canceled once {:?}",
                self.status
            )));
        }

        Ok(vec![BookingEvent::BookingCanceled(BookingCanceled {
            booking_id: cmd.booking_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_flag_overdue(
        &self,
        cmd: &FlagOverdueInvoices,
    ) -> Result<Vec<BookingEvent>, DomainError> {
        self.ensure_opened(cmd.booking_id)?;

        let invoice_ids: Vec<InvoiceId> = self
            .invoices
            .iter()
            .filter(|inv| inv.is_past_due(cmd.as_of))
            .map(Invoice::id_typed)
            .collect();
        if invoice_ids.is_empty() {
            return Ok(vec![]);
        }

        Ok(vec![BookingEvent::InvoicesOverdue(InvoicesOverdue {
            booking_id: cmd.booking_id,
            invoice_ids,
            occurred_at: cmd.as_of,
        })])
    }

    fn handle_rename_client(&self, cmd: &RenameClient) -> Result<Vec<BookingEvent>, DomainError> {
        self.ensure_opened(cmd.booking_id)?;

        if cmd.client_name.trim().is_empty() {
            return Err(DomainError::validation("client name cannot be empty"));
        }
        if cmd.client_name == self.client_name {
            return Ok(vec![]);
        }

        Ok(vec![BookingEvent::ClientRenamed(ClientRenamed {
            booking_id: cmd.booking_id,
            client_name: cmd.client_name.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use eventrent_core::AggregateId;
    use eventrent_events::execute;
    use eventrent_pricing::{PricingPolicy, QuoteItem};

    use crate::invoice::InvoiceStatus;
    use crate::opportunity::EventKind;
    use crate::quote::QuoteId;

    const TOKEN: &str = "tok_k3v9x0q2m7a1z";

    fn test_booking_id() -> BookingId {
        BookingId::new(AggregateId::new())
    }

    fn test_invoice_id() -> InvoiceId {
        InvoiceId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn event_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2031, 6, 21, 15, 0, 0).unwrap()
    }

    fn two_photobooths(booking_id: BookingId) -> SaveQuote {
        SaveQuote {
            booking_id,
            quote: Quote::draft(
                QuoteId::new(AggregateId::new()),
                vec![QuoteItem::custom("Photobooth", 2, 100_00)],
                &PricingPolicy::default(),
            ),
            occurred_at: test_time(),
        }
    }

    fn opened(booking_id: BookingId) -> Booking {
        let mut booking = Booking::empty(booking_id);
        execute(
            &mut booking,
            &BookingCommand::OpenBooking(OpenBooking {
                booking_id,
                client_id: ClientId::new(AggregateId::new()),
                client_name: "Jane Doe".to_string(),
                event: EventDetails {
                    name: "Mariage Doe".to_string(),
                    date: event_date(),
                    kind: EventKind::Wedding,
                    location: "Lyon".to_string(),
                },
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        booking
    }

    fn sent(booking_id: BookingId) -> Booking {
        let mut booking = opened(booking_id);
        execute(&mut booking, &BookingCommand::SaveQuote(two_photobooths(booking_id))).unwrap();
        execute(
            &mut booking,
            &BookingCommand::SendQuote(SendQuote {
                booking_id,
                portal_token: PortalToken::new(TOKEN),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        booking
    }

    fn sign_cmd(booking_id: BookingId, token: &str) -> BookingCommand {
        BookingCommand::SignQuote(SignQuote {
            booking_id,
            presented_token: token.to_string(),
            signer_name: "Jane Doe".to_string(),
            signer_email: "jane@example.com".to_string(),
            occurred_at: test_time(),
        })
    }

    fn pay_deposit_cmd(booking_id: BookingId, token: &str) -> BookingCommand {
        BookingCommand::PayDeposit(PayDeposit {
            booking_id,
            presented_token: token.to_string(),
            invoice_id: test_invoice_id(),
            occurred_at: test_time(),
        })
    }

    fn confirmed(booking_id: BookingId) -> Booking {
        let mut booking = sent(booking_id);
        execute(&mut booking, &sign_cmd(booking_id, TOKEN)).unwrap();
        execute(&mut booking, &pay_deposit_cmd(booking_id, TOKEN)).unwrap();
        booking
    }

    fn issue_final(booking: &mut Booking) -> InvoiceId {
        let invoice_id = test_invoice_id();
        execute(
            booking,
            &BookingCommand::IssueFinalInvoice(IssueFinalInvoice {
                booking_id: booking.id_typed(),
                invoice_id,
                lead_days: 14,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        invoice_id
    }

    fn send_final(booking: &mut Booking, invoice_id: InvoiceId) {
        execute(
            booking,
            &BookingCommand::SendFinalInvoice(SendFinalInvoice {
                booking_id: booking.id_typed(),
                invoice_id,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
    }

    #[test]
    fn open_booking_starts_as_quoted_with_zero_amount() {
        let booking = opened(test_booking_id());

        assert_eq!(booking.status(), BookingStatus::Quoted);
        assert_eq!(booking.amount(), 0);
        assert!(booking.quote().is_none());
        assert!(booking.invoices().is_empty());
        assert_eq!(booking.version(), 1);
    }

    #[test]
    fn save_quote_mirrors_total_into_amount() {
        let booking_id = test_booking_id();
        let mut booking = opened(booking_id);

        execute(&mut booking, &BookingCommand::SaveQuote(two_photobooths(booking_id))).unwrap();

        assert_eq!(booking.amount(), 240_00);
        assert_eq!(booking.quote().unwrap().status(), QuoteStatus::Draft);
    }

    #[test]
    fn save_quote_on_unopened_booking_is_not_found() {
        let booking_id = test_booking_id();
        let booking = Booking::empty(booking_id);

        let err = booking
            .handle(&BookingCommand::SaveQuote(two_photobooths(booking_id)))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn send_without_quote_is_invalid_state() {
        let booking_id = test_booking_id();
        let booking = opened(booking_id);

        let err = booking
            .handle(&BookingCommand::SendQuote(SendQuote {
                booking_id,
                portal_token: PortalToken::new(TOKEN),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn resending_keeps_quote_sent_and_rotates_token() {
        let booking_id = test_booking_id();
        let mut booking = sent(booking_id);

        execute(
            &mut booking,
            &BookingCommand::SendQuote(SendQuote {
                booking_id,
                portal_token: PortalToken::new("tok_second"),
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert_eq!(booking.quote().unwrap().status(), QuoteStatus::Sent);
        assert!(booking.grants_portal_access("tok_second"));
        assert!(!booking.grants_portal_access(TOKEN));
    }

    #[test]
    fn sign_with_wrong_token_is_not_found() {
        let booking_id = test_booking_id();
        let booking = sent(booking_id);

        let err = booking.handle(&sign_cmd(booking_id, "tok_wrong")).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn sign_records_signature() {
        let booking_id = test_booking_id();
        let mut booking = sent(booking_id);

        execute(&mut booking, &sign_cmd(booking_id, TOKEN)).unwrap();

        let quote = booking.quote().unwrap();
        assert_eq!(quote.status(), QuoteStatus::Signed);
        let signature = quote.signature().unwrap();
        assert_eq!(signature.name, "Jane Doe");
        assert_eq!(signature.email, "jane@example.com");
    }

    #[test]
    fn sign_rejects_blank_signer() {
        let booking_id = test_booking_id();
        let booking = sent(booking_id);

        let err = booking
            .handle(&BookingCommand::SignQuote(SignQuote {
                booking_id,
                presented_token: TOKEN.to_string(),
                signer_name: "   ".to_string(),
                signer_email: String::new(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn deposit_requires_signed_quote() {
        let booking_id = test_booking_id();
        let booking = sent(booking_id);

        let err = booking.handle(&pay_deposit_cmd(booking_id, TOKEN)).unwrap_err();
        match err {
            DomainError::InvalidState(msg) if msg.contains("signed quote") => {}
            _ => panic!("Expected InvalidState for unsigned quote"),
        }
    }

    #[test]
    fn deposit_confirms_booking_with_one_paid_deposit_invoice() {
        let booking = confirmed(test_booking_id());

        assert_eq!(booking.status(), BookingStatus::Confirmed);
        assert_eq!(booking.quote().unwrap().status(), QuoteStatus::DepositPaid);

        let deposits: Vec<&Invoice> = booking
            .invoices()
            .iter()
            .filter(|inv| inv.kind() == InvoiceKind::Deposit)
            .collect();
        assert_eq!(deposits.len(), 1);
        assert_eq!(deposits[0].status(), InvoiceStatus::Paid);
        assert_eq!(deposits[0].amount(), 72_00);
        assert!(deposits[0].paid_at().is_some());
    }

    #[test]
    fn second_deposit_payment_is_rejected() {
        let booking_id = test_booking_id();
        let booking = confirmed(booking_id);

        let err = booking.handle(&pay_deposit_cmd(booking_id, TOKEN)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn final_invoice_is_total_minus_deposit_due_two_weeks_before_event() {
        let mut booking = confirmed(test_booking_id());
        let invoice_id = issue_final(&mut booking);

        let invoice = booking.invoice(invoice_id).unwrap();
        assert_eq!(invoice.kind(), InvoiceKind::Final);
        assert_eq!(invoice.status(), InvoiceStatus::Draft);
        assert_eq!(invoice.amount(), 240_00 - 72_00);
        assert_eq!(invoice.due_date(), event_date() - Duration::days(14));
        assert_eq!(booking.status(), BookingStatus::Confirmed);
    }

    #[test]
    fn final_invoice_requires_confirmed_booking() {
        let booking_id = test_booking_id();
        let booking = sent(booking_id);

        let err = booking
            .handle(&BookingCommand::IssueFinalInvoice(IssueFinalInvoice {
                booking_id,
                invoice_id: test_invoice_id(),
                lead_days: 14,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn only_one_final_invoice_per_booking() {
        let mut booking = confirmed(test_booking_id());
        issue_final(&mut booking);

        let err = booking
            .handle(&BookingCommand::IssueFinalInvoice(IssueFinalInvoice {
                booking_id: booking.id_typed(),
                invoice_id: test_invoice_id(),
                lead_days: 14,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn sending_unknown_invoice_is_not_found() {
        let booking_id = test_booking_id();
        let booking = confirmed(booking_id);

        let err = booking
            .handle(&BookingCommand::SendFinalInvoice(SendFinalInvoice {
                booking_id,
                invoice_id: test_invoice_id(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn deposit_invoice_cannot_be_sent_as_final() {
        let booking_id = test_booking_id();
        let booking = confirmed(booking_id);
        let deposit_id = booking.deposit_invoice().unwrap().id_typed();

        let err = booking
            .handle(&BookingCommand::SendFinalInvoice(SendFinalInvoice {
                booking_id,
                invoice_id: deposit_id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn full_lifecycle_quoted_to_completed() {
        let booking_id = test_booking_id();
        let mut booking = confirmed(booking_id);
        let invoice_id = issue_final(&mut booking);

        send_final(&mut booking, invoice_id);
        assert_eq!(booking.status(), BookingStatus::AwaitingFinalPayment);
        assert_eq!(booking.invoice(invoice_id).unwrap().status(), InvoiceStatus::Sent);

        execute(
            &mut booking,
            &BookingCommand::PayFinalBalance(PayFinalBalance {
                booking_id,
                presented_token: TOKEN.to_string(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(booking.status(), BookingStatus::FullyPaid);
        assert_eq!(booking.quote().unwrap().status(), QuoteStatus::FullyPaid);
        let final_invoice = booking.invoice(invoice_id).unwrap();
        assert_eq!(final_invoice.status(), InvoiceStatus::Paid);
        assert!(final_invoice.paid_at().is_some());

        execute(
            &mut booking,
            &BookingCommand::CompleteBooking(CompleteBooking {
                booking_id,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(booking.status(), BookingStatus::Completed);
    }

    #[test]
    fn final_payment_with_wrong_token_is_not_found() {
        let booking_id = test_booking_id();
        let mut booking = confirmed(booking_id);
        let invoice_id = issue_final(&mut booking);
        send_final(&mut booking, invoice_id);

        let err = booking
            .handle(&BookingCommand::PayFinalBalance(PayFinalBalance {
                booking_id,
                presented_token: "tok_guess".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn final_payment_before_invoice_is_sent_is_invalid_state() {
        let booking_id = test_booking_id();
        let mut booking = confirmed(booking_id);
        issue_final(&mut booking);

        let err = booking
            .handle(&BookingCommand::PayFinalBalance(PayFinalBalance {
                booking_id,
                presented_token: TOKEN.to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn complete_requires_fully_paid() {
        let booking_id = test_booking_id();
        let booking = confirmed(booking_id);

        let err = booking
            .handle(&BookingCommand::CompleteBooking(CompleteBooking {
                booking_id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn cancel_revokes_portal_access_and_cancels_quote() {
        let booking_id = test_booking_id();
        let mut booking = sent(booking_id);

        execute(
            &mut booking,
            &BookingCommand::CancelBooking(CancelBooking {
                booking_id,
                reason: Some("Event postponed".to_string()),
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert_eq!(booking.status(), BookingStatus::Canceled);
        assert_eq!(booking.quote().unwrap().status(), QuoteStatus::Canceled);
        assert!(!booking.grants_portal_access(TOKEN));

        let err = booking
            .handle(&BookingCommand::CancelBooking(CancelBooking {
                booking_id,
                reason: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn canceled_booking_rejects_further_lifecycle_steps() {
        let booking_id = test_booking_id();
        let mut booking = opened(booking_id);
        execute(
            &mut booking,
            &BookingCommand::CancelBooking(CancelBooking {
                booking_id,
                reason: None,
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        let save = booking
            .handle(&BookingCommand::SaveQuote(two_photobooths(booking_id)))
            .unwrap_err();
        assert!(matches!(save, DomainError::InvalidState(_)));

        let send = booking
            .handle(&BookingCommand::SendQuote(SendQuote {
                booking_id,
                portal_token: PortalToken::new(TOKEN),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(send, DomainError::InvalidState(_)));
        assert!(booking.quote().is_none());
    }

    #[test]
    fn canceled_confirmed_booking_cannot_issue_final_invoice() {
        let booking_id = test_booking_id();
        let mut booking = confirmed(booking_id);
        execute(
            &mut booking,
            &BookingCommand::CancelBooking(CancelBooking {
                booking_id,
                reason: None,
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        let err = booking
            .handle(&BookingCommand::IssueFinalInvoice(IssueFinalInvoice {
                booking_id,
                invoice_id: test_invoice_id(),
                lead_days: 14,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        assert_eq!(booking.status(), BookingStatus::Canceled);
    }

    #[test]
    fn overdue_flagging_only_touches_past_due_sent_invoices() {
        let booking_id = test_booking_id();
        let mut booking = confirmed(booking_id);
        let invoice_id = issue_final(&mut booking);

        let well_after_due = event_date();
        let none = booking
            .handle(&BookingCommand::FlagOverdueInvoices(FlagOverdueInvoices {
                booking_id,
                as_of: well_after_due,
            }))
            .unwrap();
        assert!(none.is_empty(), "draft invoices are never overdue");

        send_final(&mut booking, invoice_id);
        execute(
            &mut booking,
            &BookingCommand::FlagOverdueInvoices(FlagOverdueInvoices {
                booking_id,
                as_of: well_after_due,
            }),
        )
        .unwrap();
        assert_eq!(booking.invoice(invoice_id).unwrap().status(), InvoiceStatus::Overdue);

        // An overdue balance can still be paid.
        execute(
            &mut booking,
            &BookingCommand::PayFinalBalance(PayFinalBalance {
                booking_id,
                presented_token: TOKEN.to_string(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(booking.status(), BookingStatus::FullyPaid);
    }

    #[test]
    fn renaming_to_the_same_name_emits_nothing() {
        let booking_id = test_booking_id();
        let booking = opened(booking_id);

        let events = booking
            .handle(&BookingCommand::RenameClient(RenameClient {
                booking_id,
                client_name: "Jane Doe".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let booking_id = test_booking_id();
        let booking = sent(booking_id);
        let before = booking.clone();

        let events1 = booking.handle(&sign_cmd(booking_id, TOKEN)).unwrap();
        let _ = booking.handle(&pay_deposit_cmd(booking_id, TOKEN));

        assert_eq!(booking, before);
        assert_eq!(events1.len(), 1);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: amount mirrors the total of whatever quote was saved last.
            #[test]
            fn amount_tracks_latest_quote_total(
                edits in prop::collection::vec(
                    prop::collection::vec((0u32..20, 0u64..100_000), 0..6),
                    1..5,
                )
            ) {
                let booking_id = test_booking_id();
                let mut booking = opened(booking_id);
                let policy = PricingPolicy::default();

                for lines in edits {
                    let items = lines
                        .into_iter()
                        .map(|(q, p)| QuoteItem::custom("line", q, p))
                        .collect();
                    let quote = Quote::draft(QuoteId::new(AggregateId::new()), items, &policy);
                    let expected = quote.total();
                    execute(&mut booking, &BookingCommand::SaveQuote(SaveQuote {
                        booking_id,
                        quote,
                        occurred_at: test_time(),
                    })).unwrap();
                    prop_assert_eq!(booking.amount(), expected);
                }
            }

            /// Property: a wrong token is indistinguishable from an unknown booking.
            #[test]
            fn wrong_token_never_reveals_booking(token in "[a-z0-9_]{0,20}") {
                prop_assume!(token != TOKEN);
                let booking_id = test_booking_id();
                let booking = sent(booking_id);

                let with_booking = booking.handle(&sign_cmd(booking_id, &token)).unwrap_err();
                let without_booking = Booking::empty(booking_id)
                    .handle(&sign_cmd(booking_id, &token))
                    .unwrap_err();

                prop_assert_eq!(with_booking, without_booking);
            }
        }
    }
}
