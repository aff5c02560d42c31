//! Validation of an [`OrderRequest`] before any rendering or mailing cost is incurred.

use std::fmt::Display;

use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use lettre::Address as EmailAddress;

use crate::{
    invoice::{LineItem, LineItemBuilder},
    order::{OrderRequest, PostalAddress, ProductEntry},
};

/// Why an order was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Neither `to` nor `customer_email` was given
    MissingRecipient,
    /// Required fields that were absent or blank
    MissingRequiredFields(Vec<&'static str>),
    InvalidRecipient(String),
    /// No product survived filtering
    NoValidProducts,
    /// The client's total disagrees with the total computed from the products
    TotalMismatch {
        submitted: BigDecimal,
        computed: BigDecimal,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingRecipient => write!(f, "Missing recipient email (to)"),
            ValidationError::MissingRequiredFields(fields) => {
                write!(f, "Missing required fields: {}", fields.join(", "))
            }
            ValidationError::InvalidRecipient(address) => {
                write!(f, "Invalid recipient email: {address}")
            }
            ValidationError::NoValidProducts => write!(f, "No valid products"),
            ValidationError::TotalMismatch {
                submitted,
                computed,
            } => write!(
                f,
                "total_price {submitted} does not match the products total {computed}"
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// An order that passed validation. Strings are trimmed and blank optionals are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOrder {
    /// Where the invoice is mailed: `to`, falling back to `customer_email`
    pub recipient: String,
    pub customer_name: String,
    pub customer_email: String,
    pub phone: Option<String>,
    pub shipping_address: Option<PostalAddress>,
    pub delivery_method: Option<String>,
    pub payment_reference: String,
    /// Sequence value without the prefix
    pub invoice_number: String,
    pub products: Vec<LineItem>,
    pub submitted_total: Option<BigDecimal>,
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Turn a raw product entry into a [`LineItem`] if it has a name, a positive whole quantity and
/// a non-negative price.
fn accept_product(entry: &ProductEntry) -> Option<LineItem> {
    let name = trimmed(&entry.name)?;
    let quantity = entry.quantity.as_ref()?;
    if !quantity.is_integer() || *quantity <= BigDecimal::zero() {
        return None;
    }
    let quantity = quantity.to_u32()?;
    let price = entry.price.as_ref()?;
    if *price < BigDecimal::zero() {
        return None;
    }
    LineItemBuilder::default()
        .name(name)
        .quantity(quantity)
        .unit_price(price.clone())
        .build()
        .ok()
}

/// Validate and normalize an order.
///
/// Checks run in this order: recipient present, required fields present, recipient is an
/// email address, at least one valid product. The first failing check is reported.
///
/// # Errors
/// A [`ValidationError`] naming the first failed check.
pub fn validate(order: &OrderRequest) -> Result<ValidatedOrder, ValidationError> {
    let recipient = trimmed(&order.to)
        .or_else(|| trimmed(&order.customer_email))
        .ok_or(ValidationError::MissingRecipient)?;

    let customer_name = trimmed(&order.customer_name);
    let customer_email = trimmed(&order.customer_email);
    let payment_reference = trimmed(&order.payment_reference);
    let invoice_number = trimmed(&order.invoice_number);

    let missing: Vec<&'static str> = [
        ("customer_name", customer_name.is_none()),
        ("customer_email", customer_email.is_none()),
        ("payment_reference", payment_reference.is_none()),
        ("invoice_number", invoice_number.is_none()),
    ]
    .into_iter()
    .filter_map(|(field, absent)| absent.then_some(field))
    .collect();

    let (
        Some(customer_name),
        Some(customer_email),
        Some(payment_reference),
        Some(invoice_number),
    ) = (customer_name, customer_email, payment_reference, invoice_number)
    else {
        return Err(ValidationError::MissingRequiredFields(missing));
    };

    if recipient.parse::<EmailAddress>().is_err() {
        return Err(ValidationError::InvalidRecipient(recipient));
    }

    let products: Vec<LineItem> = order.products.iter().filter_map(accept_product).collect();
    if products.is_empty() {
        return Err(ValidationError::NoValidProducts);
    }

    let shipping_address = match &order.shipping_address {
        Some(PostalAddress::Freeform(text)) => {
            Some(text.trim()).filter(|t| !t.is_empty()).map(|t| PostalAddress::Freeform(t.to_string()))
        }
        Some(address) if address.is_blank() => None,
        other => other.clone(),
    };

    Ok(ValidatedOrder {
        recipient,
        customer_name,
        customer_email,
        phone: trimmed(&order.phone),
        shipping_address,
        delivery_method: trimmed(&order.delivery_method),
        payment_reference,
        invoice_number,
        products,
        submitted_total: order.total_price.clone(),
    })
}
