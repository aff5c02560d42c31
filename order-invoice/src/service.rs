//! The order-to-mail pipeline behind the HTTP endpoint.

use std::{fmt::Display, str::FromStr, sync::Arc};

use bigdecimal::BigDecimal;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    error::{AddContext, Error},
    invoice::Invoice,
    mail::{DeliveryReceipt, MailAttachment, Mailer, OutgoingMail},
    money::round2,
    order::OrderRequest,
    render::{Document, Renderer},
    validate::{ValidatedOrder, ValidationError, validate},
};

/// What to do when the client's `total_price` disagrees with the computed gross total
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalPolicy {
    /// Log the difference and invoice the computed total
    #[default]
    Warn,
    /// Reject the order as invalid
    Reject,
}

impl Display for TotalPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TotalPolicy::Warn => write!(f, "warn"),
            TotalPolicy::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for TotalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(TotalPolicy::Warn),
            "reject" => Ok(TotalPolicy::Reject),
            other => Err(format!("unknown total policy '{other}', expected warn or reject")),
        }
    }
}

/// Largest accepted difference between the submitted and computed totals, one cent
fn total_tolerance() -> BigDecimal {
    BigDecimal::new(1.into(), 2)
}

/// Subject line of the confirmation mail
pub fn subject(payment_reference: &str) -> String {
    format!("Jūsų užsakymas {payment_reference} patvirtintas!")
}

/// Name of the attached invoice file
pub fn attachment_filename(invoice: &Invoice) -> String {
    format!("invoice-{}.pdf", invoice.number())
}

pub struct InvoiceService {
    renderer: Renderer,
    mailer: Arc<dyn Mailer>,
    total_policy: TotalPolicy,
}

impl InvoiceService {
    pub fn new(renderer: Renderer, mailer: Arc<dyn Mailer>, total_policy: TotalPolicy) -> Self {
        Self {
            renderer,
            mailer,
            total_policy,
        }
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    fn check_total(&self, order: &ValidatedOrder, invoice: &Invoice) -> Result<(), Error> {
        let Some(submitted) = &order.submitted_total else {
            return Ok(());
        };
        let computed = round2(&invoice.gross_total());
        if (submitted - &computed).abs() <= total_tolerance() {
            return Ok(());
        }
        match self.total_policy {
            TotalPolicy::Warn => {
                warn!(%submitted, %computed, "client total differs, invoicing computed total");
                Ok(())
            }
            TotalPolicy::Reject => Err(Error::from(ValidationError::TotalMismatch {
                submitted: submitted.clone(),
                computed,
            })),
        }
    }

    /// Put the rendered document into a mail for `recipient`
    ///
    /// A PDF is attached below a short confirmation body. An HTML invoice is the body itself.
    ///
    /// # Errors
    /// [`crate::Error`] if the confirmation body cannot be rendered
    pub fn compose(
        &self,
        invoice: &Invoice,
        recipient: &str,
        document: Document,
    ) -> Result<OutgoingMail, Error> {
        let (html, attachment) = match document {
            Document::Pdf(bytes) => (
                self.renderer.email_body(invoice)?,
                Some(MailAttachment {
                    filename: attachment_filename(invoice),
                    content_type: String::from("application/pdf"),
                    bytes,
                }),
            ),
            Document::Html(html) => (html, None),
        };
        Ok(OutgoingMail {
            to: recipient.to_string(),
            subject: subject(invoice.payment_reference()),
            html,
            attachment,
        })
    }

    /// Validate the order, derive its invoice, render it and mail it to the customer.
    ///
    /// Nothing is rendered for an invalid order and nothing is sent when rendering fails. The
    /// mail is handed to the transport exactly once.
    ///
    /// # Errors
    /// [`crate::Error`] whose [`crate::error::Category`] tells which step failed
    #[instrument(skip_all, fields(payment_reference, invoice_number))]
    pub async fn process(&self, order: OrderRequest) -> Result<DeliveryReceipt, Error> {
        let validated = validate(&order)
            .map_err(Error::from)
            .add_context("validating order")?;
        let span = tracing::Span::current();
        span.record("payment_reference", validated.payment_reference.as_str());

        let invoice = Invoice::from_order(&validated, Local::now().date_naive())?;
        span.record("invoice_number", invoice.number().as_str());
        self.check_total(&validated, &invoice)
            .add_context("checking total")?;

        let document = self
            .renderer
            .render(&invoice)
            .await
            .add_context("rendering invoice")?;
        let mail = self
            .compose(&invoice, &validated.recipient, document)
            .add_context("composing mail")?;
        let receipt = self
            .mailer
            .send(&mail)
            .await
            .add_context("delivering invoice")?;

        info!(
            message_id = %receipt.message_id,
            gross = %round2(&invoice.gross_total()),
            items = invoice.line_items().len(),
            "invoice delivered"
        );
        Ok(receipt)
    }
}
