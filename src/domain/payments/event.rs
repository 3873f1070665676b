//! Payment processor events.
//!
//! The reconciliation engine receives an already-verified event as
//! `(event id, event type, raw payload)`. This module maps the payload to the
//! ledger action it implies. Only the fields the ledger needs are read;
//! everything else in the processor's schema is ignored.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::foundation::{EventId, ProductId, SessionId};

use super::ReconciliationError;

/// Processor event types the engine acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEventType {
    /// Checkout finished and the payment was captured.
    CheckoutSessionCompleted,
    /// Checkout session timed out without payment.
    CheckoutSessionExpired,
    /// Delayed payment method failed after checkout.
    CheckoutSessionAsyncPaymentFailed,
    /// A charge was refunded.
    ChargeRefunded,
    /// Anything else. Recorded for audit only.
    Unknown,
}

impl PaymentEventType {
    /// Parse event type from string.
    pub fn parse(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "checkout.session.expired" => Self::CheckoutSessionExpired,
            "checkout.session.async_payment_failed" => Self::CheckoutSessionAsyncPaymentFailed,
            "charge.refunded" => Self::ChargeRefunded,
            _ => Self::Unknown,
        }
    }

    /// Convert to the processor's event type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::CheckoutSessionExpired => "checkout.session.expired",
            Self::CheckoutSessionAsyncPaymentFailed => "checkout.session.async_payment_failed",
            Self::ChargeRefunded => "charge.refunded",
            Self::Unknown => "unknown",
        }
    }
}

/// An inbound processor event, signature already verified by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    pub id: EventId,
    pub event_type: String,
    pub payload: Vec<u8>,
}

impl PaymentEvent {
    pub fn new(id: EventId, event_type: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            event_type: event_type.into(),
            payload: payload.into(),
        }
    }

    /// Parse the event type into a known enum variant.
    pub fn parsed_type(&self) -> PaymentEventType {
        PaymentEventType::parse(&self.event_type)
    }

    /// Decodes the payload into the ledger action it requests.
    ///
    /// Unknown event types never touch the payload.
    pub fn action(&self) -> Result<PaymentAction, ReconciliationError> {
        match self.parsed_type() {
            PaymentEventType::CheckoutSessionCompleted => {
                let session: CheckoutSessionObject = self.object()?;
                Ok(PaymentAction::CompleteCheckout(session.into_completion()?))
            }
            PaymentEventType::CheckoutSessionExpired
            | PaymentEventType::CheckoutSessionAsyncPaymentFailed => {
                let session: CheckoutSessionObject = self.object()?;
                Ok(PaymentAction::CancelCheckout {
                    session_id: session_id(session.id)?,
                })
            }
            PaymentEventType::ChargeRefunded => {
                let charge: ChargeObject = self.object()?;
                Ok(PaymentAction::Refund(charge.into_reference()?))
            }
            PaymentEventType::Unknown => Ok(PaymentAction::Ignore),
        }
    }

    /// Deserializes the business object: `data.object` when the payload is a
    /// full event envelope, otherwise the payload root.
    fn object<T: serde::de::DeserializeOwned>(&self) -> Result<T, ReconciliationError> {
        let mut value: serde_json::Value = serde_json::from_slice(&self.payload)
            .map_err(|e| ReconciliationError::MalformedPayload(e.to_string()))?;

        let object = match value.pointer_mut("/data/object") {
            Some(inner) => inner.take(),
            None => value,
        };

        serde_json::from_value(object)
            .map_err(|e| ReconciliationError::MalformedPayload(e.to_string()))
    }
}

/// What an event asks the ledger to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentAction {
    CompleteCheckout(CheckoutCompletion),
    CancelCheckout { session_id: SessionId },
    Refund(RefundReference),
    Ignore,
}

/// Everything needed to record and complete a paid checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCompletion {
    pub session_id: SessionId,
    pub payment_intent_id: String,
    pub buyer_email: String,
    pub product_id: ProductId,
}

/// Identifies the order a refund applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundReference {
    pub session_id: Option<SessionId>,
    pub payment_intent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    id: String,
    payment_intent: Option<String>,
    customer_email: Option<String>,
    customer_details: Option<CustomerDetails>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CustomerDetails {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChargeObject {
    payment_intent: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl CheckoutSessionObject {
    fn into_completion(self) -> Result<CheckoutCompletion, ReconciliationError> {
        let buyer_email = self
            .customer_details
            .and_then(|details| details.email)
            .or(self.customer_email)
            .filter(|email| !email.trim().is_empty())
            .ok_or(ReconciliationError::MissingField("customer_details.email"))?;

        let product_id = self
            .metadata
            .get("product_id")
            .and_then(|id| ProductId::new(id.clone()).ok())
            .ok_or(ReconciliationError::MissingField("metadata.product_id"))?;

        // Zero-amount checkouts carry no payment intent; the session stands in.
        let payment_intent_id = self
            .payment_intent
            .filter(|intent| !intent.is_empty())
            .unwrap_or_else(|| self.id.clone());

        Ok(CheckoutCompletion {
            session_id: session_id(self.id)?,
            payment_intent_id,
            buyer_email,
            product_id,
        })
    }
}

impl ChargeObject {
    fn into_reference(self) -> Result<RefundReference, ReconciliationError> {
        let session_id = self
            .metadata
            .get("checkout_session_id")
            .and_then(|id| SessionId::new(id.clone()).ok());
        let payment_intent_id = self.payment_intent.filter(|intent| !intent.is_empty());

        if session_id.is_none() && payment_intent_id.is_none() {
            return Err(ReconciliationError::MissingField("payment_intent"));
        }

        Ok(RefundReference {
            session_id,
            payment_intent_id,
        })
    }
}

fn session_id(id: String) -> Result<SessionId, ReconciliationError> {
    SessionId::new(id).map_err(|_| ReconciliationError::MissingField("id"))
}
