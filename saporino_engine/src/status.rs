//! # Order status rules
//!
//! ```text
//!  pending ──► in_process ──► approved ──► shipped ──► delivered
//!     │            │             │            │            │
//!     ├──► rejected ◄┘           └──────┬─────┴────────────┘
//!     │                                 ▼
//!     └──────────────────────────►  refunded        (any non-terminal state) ──► cancelled
//! ```
//!
//! Two kinds of writer change an order's status:
//!
//! * **Gateway signals** (the payment webhook and the shopper's return page) are only allowed to move an order
//!   *forward*. They race each other and can arrive late or out of order, so [`OrderStatusType::gateway_sources`]
//!   lists, for every target status, which current statuses may be overwritten. The database applies that list as a
//!   single conditional update, so two racing signals can never produce a downgrade.
//! * **Admin** writes are unrestricted. Staff are trusted to correct orders by hand.
//!
//! The return page is driven by the shopper's browser, so its word is never final. Every order records whether its
//! current status was confirmed by a trusted writer (the webhook or an admin). On top of the forward-only rule, the
//! webhook may overwrite what the return page claimed; see [`OrderStatusType::webhook_corrections`].
use crate::db_types::OrderStatusType;

/// The condition under which a webhook correction applies to the stored order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// The current status was never confirmed by the webhook or an admin.
    Unconfirmed,
    /// As `Unconfirmed`, or the stored payment is the one being reported.
    UnconfirmedOrSamePayment,
    /// Always applies.
    Always,
}

impl Correction {
    pub fn applies(&self, confirmed: bool, same_payment: bool) -> bool {
        match self {
            Correction::Unconfirmed => !confirmed,
            Correction::UnconfirmedOrSamePayment => !confirmed || same_payment,
            Correction::Always => true,
        }
    }
}

impl OrderStatusType {
    /// Position on the happy path. Off-path statuses (`rejected`, `refunded`, `cancelled`) have no rank.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::InProcess => Some(1),
            Self::Approved => Some(2),
            Self::Shipped => Some(3),
            Self::Delivered => Some(4),
            Self::Rejected | Self::Refunded | Self::Cancelled => None,
        }
    }

    /// Terminal statuses admit no further automatic transition. `delivered` still admits a refund.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Delivered | Self::Refunded | Self::Cancelled)
    }

    /// The lifecycle graph. Admin writes are not checked against this; it documents the intended flow and drives the
    /// gateway rule.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        match (self, next) {
            (Pending, Approved | InProcess | Rejected) => true,
            (InProcess, Approved | Rejected) => true,
            (Approved, Shipped) => true,
            (Shipped, Delivered) => true,
            (Approved | Shipped | Delivered, Refunded) => true,
            (current, Cancelled) => !current.is_terminal(),
            _ => false,
        }
    }

    /// The statuses that a gateway signal carrying `self` is allowed to overwrite.
    ///
    /// An empty slice means the signal never changes the order (a gateway can't move an order back to `pending`).
    /// A signal whose status equals the current status is a no-op and is absent from the list. Refunds are accepted
    /// from `pending` and `in_process` too, since the refund notification may be delivered before the approval.
    pub fn gateway_sources(&self) -> &'static [OrderStatusType] {
        use OrderStatusType::*;
        match self {
            Pending => &[],
            InProcess => &[Pending],
            Approved => &[Pending, InProcess],
            Rejected => &[Pending, InProcess],
            Refunded => &[Pending, InProcess, Approved, Shipped, Delivered],
            Shipped | Delivered | Cancelled => &[],
        }
    }

    /// True if a gateway signal carrying `next` may overwrite `self`.
    pub fn gateway_accepts(&self, next: OrderStatusType) -> bool {
        next.gateway_sources().contains(self)
    }

    /// The extra statuses a webhook carrying `self` may overwrite, and when.
    ///
    /// * An `approved` claimed by the return page is confirmed by the webhook's own `approved`, or undone by its
    ///   `rejected`. A confirmed approval is only undone by a rejection of that same payment.
    /// * A rejected order is approved when the shopper retries with another payment and it goes through.
    pub fn webhook_corrections(&self) -> &'static [(OrderStatusType, Correction)] {
        use OrderStatusType::*;
        match self {
            Approved => &[(Rejected, Correction::Always), (Approved, Correction::Unconfirmed)],
            Rejected => &[(Approved, Correction::UnconfirmedOrSamePayment)],
            _ => &[],
        }
    }

    /// True if a webhook carrying `next` may overwrite `self`. `confirmed` is the stored order's confirmation flag and
    /// `same_payment` is true when the webhook reports the payment already stored on the order.
    pub fn webhook_accepts(&self, next: OrderStatusType, confirmed: bool, same_payment: bool) -> bool {
        self.gateway_accepts(next) ||
            next.webhook_corrections()
                .iter()
                .any(|(current, rule)| current == self && rule.applies(confirmed, same_payment))
    }
}

/// The customer-facing (Portuguese) label for a status. Display only.
pub fn status_label(status: OrderStatusType) -> &'static str {
    match status {
        OrderStatusType::Pending => "Aguardando pagamento",
        OrderStatusType::Approved => "Pagamento aprovado",
        OrderStatusType::InProcess => "Pagamento em análise",
        OrderStatusType::Rejected => "Pagamento recusado",
        OrderStatusType::Refunded => "Reembolsado",
        OrderStatusType::Shipped => "Enviado",
        OrderStatusType::Delivered => "Entregue",
        OrderStatusType::Cancelled => "Cancelado",
    }
}
