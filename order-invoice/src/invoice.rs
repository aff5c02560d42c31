//! Invoice domain types and the VAT arithmetic.
//!
//! This module defines the invoice, its parties and line items. Unit prices are net (VAT
//! excluded) and every derived amount is computed with arbitrary precision decimals; rounding
//! is left to [`crate::money`] at display time. Builders are derived for constructing
//! instances.

use std::fmt::Display;

use bigdecimal::{BigDecimal, num_bigint::BigInt};
use chrono::{Local, NaiveDate};
use derive_builder::Builder;

use crate::{
    error::{AddContext, Error},
    order::{Address, PostalAddress},
    validate::ValidatedOrder,
};

/// Literal tag every displayed invoice number starts with
pub const INVOICE_PREFIX: &str = "EVA";

/// VAT rate in percent, as shown on documents
pub const VAT_PERCENT: u32 = 21;

/// The fixed VAT rate, `0.21`
pub fn vat_rate() -> BigDecimal {
    BigDecimal::new(BigInt::from(VAT_PERCENT), 2)
}

/// An invoice number as displayed and stored: always the [`INVOICE_PREFIX`] followed by the
/// sequence value supplied with the order. There is no way to get at the bare suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
    pub fn new(sequence: &str) -> Self {
        Self(format!("{INVOICE_PREFIX}{}", sequence.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for InvoiceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single invoice line: product name, quantity and unit price excluding VAT.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(setter(into), pattern = "owned")]
pub struct LineItem {
    name: String,
    quantity: u32,
    unit_price: BigDecimal,
}

impl LineItem {
    /// Return the product name for this line item.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the quantity for this line item.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Return the unit price for this line item, VAT excluded.
    pub fn unit_price(&self) -> &BigDecimal {
        &self.unit_price
    }

    /// `quantity * unit_price`
    pub fn net(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }

    /// `net * VAT rate`
    pub fn vat(&self) -> BigDecimal {
        self.net() * vat_rate()
    }

    /// `net + vat`, equivalently `net * 1.21`
    pub fn gross(&self) -> BigDecimal {
        let net = self.net();
        let vat = &net * vat_rate();
        net + vat
    }
}

/// A party involved in the invoice (seller or buyer)
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(setter(strip_option, into), pattern = "owned")]
pub struct Party {
    name: String,
    #[builder(default)]
    company_code: Option<String>,
    #[builder(default)]
    vat_code: Option<String>,
    #[builder(default)]
    address: Option<PostalAddress>,
    #[builder(default)]
    email: Option<String>,
    #[builder(default)]
    phone: Option<String>,
}

impl Party {
    /// The business issuing every invoice
    pub fn seller() -> Party {
        Party {
            name: String::from("Stiklų keitimas automobiliams, MB"),
            company_code: Some(String::from("305232614")),
            vat_code: Some(String::from("LT100017540118")),
            address: Some(PostalAddress::Structured(Address {
                line1: String::from("Giraitės g. 60A-2"),
                line2: None,
                city: String::from("Trakų r."),
                postal_code: None,
                country: None,
            })),
            email: None,
            phone: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Printable lines below the party's name, in document order
    pub fn detail_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(code) = &self.company_code {
            lines.push(format!("Įmonės kodas: {code}"));
        }
        if let Some(code) = &self.vat_code {
            lines.push(format!("PVM kodas: {code}"));
        }
        if let Some(address) = &self.address {
            lines.extend(address.lines());
        }
        if let Some(email) = &self.email {
            lines.push(email.to_string());
        }
        if let Some(phone) = &self.phone {
            lines.push(phone.to_string());
        }
        lines
    }
}

/// Aggregate amounts of an invoice, unrounded
#[derive(Debug, Clone, PartialEq)]
pub struct Totals {
    pub net: BigDecimal,
    pub vat: BigDecimal,
    pub gross: BigDecimal,
}

/// Invoice top level model
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(setter(strip_option, into), pattern = "owned")]
pub struct Invoice {
    number: InvoiceNumber,
    payment_reference: String,
    #[builder(default = Local::now().date_naive())]
    issued_on: NaiveDate,
    #[builder(default = Party::seller())]
    seller: Party,
    buyer: Party,
    #[builder(default = Vec::new())]
    line_items: Vec<LineItem>,
    #[builder(default)]
    delivery_method: Option<String>,
}

impl Invoice {
    /// Derive the invoice for a validated order, issued on `issued_on`.
    ///
    /// This is a pure function of its inputs: calling it twice with the same order yields equal
    /// invoices.
    ///
    /// # Errors
    /// Only if the builder is missing a required field, which a [`ValidatedOrder`] always
    /// provides.
    pub fn from_order(order: &ValidatedOrder, issued_on: NaiveDate) -> Result<Invoice, Error> {
        let mut buyer = PartyBuilder::default()
            .name(order.customer_name.as_str())
            .email(order.customer_email.as_str());
        if let Some(address) = &order.shipping_address {
            buyer = buyer.address(address.clone());
        }
        if let Some(phone) = &order.phone {
            buyer = buyer.phone(phone.as_str());
        }
        let buyer = buyer
            .build()
            .map_err(|e| Error::from(e.to_string()))
            .add_context("building buyer")?;

        let mut builder = InvoiceBuilder::default()
            .number(InvoiceNumber::new(&order.invoice_number))
            .payment_reference(order.payment_reference.as_str())
            .issued_on(issued_on)
            .buyer(buyer);
        if let Some(method) = &order.delivery_method {
            builder = builder.delivery_method(method.as_str());
        }
        for line in &order.products {
            builder = builder.add_line(line.clone());
        }
        builder
            .build()
            .map_err(|e| Error::from(e.to_string()))
            .add_context("building invoice")
    }

    pub fn number(&self) -> &InvoiceNumber {
        &self.number
    }

    pub fn payment_reference(&self) -> &str {
        &self.payment_reference
    }

    pub fn issued_on(&self) -> NaiveDate {
        self.issued_on
    }

    pub fn seller(&self) -> &Party {
        &self.seller
    }

    pub fn buyer(&self) -> &Party {
        &self.buyer
    }

    pub fn delivery_method(&self) -> Option<&str> {
        self.delivery_method.as_deref()
    }

    /// Return a reference to the invoice's line items.
    pub fn line_items(&self) -> &Vec<LineItem> {
        &self.line_items
    }

    /// Compute the net total as `sum(quantity * unit_price)`
    pub fn net_total(&self) -> BigDecimal {
        self.line_items.iter().map(LineItem::net).sum()
    }

    /// Compute VAT on the net total
    pub fn vat_total(&self) -> BigDecimal {
        self.net_total() * vat_rate()
    }

    /// Compute the amount payable, `net + vat`
    ///
    /// # Example
    /// ```rust
    /// use std::str::FromStr;
    ///
    /// use bigdecimal::BigDecimal;
    /// use order_invoice::{InvoiceBuilder, InvoiceNumber, LineItemBuilder, PartyBuilder};
    ///
    /// let inv = InvoiceBuilder::default()
    ///     .number(InvoiceNumber::new("1"))
    ///     .payment_reference("ORD-1")
    ///     .buyer(PartyBuilder::default().name("A").build().unwrap())
    ///     .add_line(
    ///         LineItemBuilder::default()
    ///             .name("Kremas")
    ///             .quantity(1u32)
    ///             .unit_price(BigDecimal::from(10))
    ///             .build().unwrap()
    ///     )
    ///     .build().unwrap();
    /// assert_eq!(inv.gross_total(), BigDecimal::from_str("12.1").unwrap());
    /// ```
    pub fn gross_total(&self) -> BigDecimal {
        let net = self.net_total();
        let vat = &net * vat_rate();
        net + vat
    }

    pub fn totals(&self) -> Totals {
        let net = self.net_total();
        let vat = &net * vat_rate();
        let gross = &net + &vat;
        Totals { net, vat, gross }
    }
}

impl InvoiceBuilder {
    /// Add a [`LineItem`] to the builder's internal list.
    ///
    /// # Arguments
    /// * `line` - The [`LineItem`] to append.
    ///
    /// # Returns
    /// The updated [`InvoiceBuilder`].
    pub fn add_line(self, line: LineItem) -> Self {
        match self.line_items {
            Some(mut l) => {
                l.push(line);
                Self {
                    line_items: Some(l),
                    ..self
                }
            }
            None => Self {
                line_items: Some(vec![line]),
                ..self
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::money::round2;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn line(name: &str, quantity: u32, price: &str) -> LineItem {
        LineItemBuilder::default()
            .name(name)
            .quantity(quantity)
            .unit_price(dec(price))
            .build()
            .unwrap()
    }

    fn make_invoice(lines: Vec<LineItem>) -> Invoice {
        let mut builder = InvoiceBuilder::default()
            .number(InvoiceNumber::new("100"))
            .payment_reference("ORD-1")
            .buyer(PartyBuilder::default().name("Jonas Jonaitis").build().unwrap());
        for l in lines {
            builder = builder.add_line(l);
        }
        builder.build().unwrap()
    }

    #[test]
    fn line_amounts_follow_vat_rate() {
        let item = line("Kremas", 3, "2.50");
        assert_eq!(item.net(), dec("7.50"));
        assert_eq!(item.vat(), dec("1.575"));
        assert_eq!(item.gross(), dec("9.075"));
        assert_eq!(item.gross(), item.net() * dec("1.21"));
        assert_eq!(item.vat(), item.gross() - item.net());
    }

    #[test]
    fn reference_scenario_totals() {
        let inv = make_invoice(vec![line("Kremas", 2, "10")]);
        let totals = inv.totals();
        assert_eq!(round2(&totals.net).to_string(), "20.00");
        assert_eq!(round2(&totals.vat).to_string(), "4.20");
        assert_eq!(round2(&totals.gross).to_string(), "24.20");
        assert_eq!(inv.number().as_str(), "EVA100");
    }

    #[test]
    fn totals_are_rounded_once_not_per_line() {
        let inv = make_invoice(vec![
            line("A", 1, "0.05"),
            line("B", 1, "0.05"),
            line("C", 1, "0.05"),
        ]);
        assert_eq!(inv.vat_total(), dec("0.0315"));
        assert_eq!(round2(&inv.gross_total()).to_string(), "0.18");

        // per-line gross 0.0847 would round to 0.08 and sum to 0.56
        let inv = make_invoice((0..7).map(|_| line("D", 1, "0.07")).collect());
        assert_eq!(round2(&inv.gross_total()).to_string(), "0.59");
    }

    #[test]
    fn aggregate_equals_sum_of_lines() {
        let inv = make_invoice(vec![line("A", 1, "10.99"), line("B", 4, "3.333")]);
        let line_gross: BigDecimal = inv.line_items().iter().map(LineItem::gross).sum();
        let line_vat: BigDecimal = inv.line_items().iter().map(LineItem::vat).sum();
        assert_eq!(inv.gross_total(), line_gross);
        assert_eq!(inv.vat_total(), line_vat);
        assert_eq!(inv.gross_total(), inv.net_total() * dec("1.21"));
    }

    #[test]
    fn calculation_is_idempotent() {
        let inv = make_invoice(vec![line("A", 2, "19.99"), line("B", 1, "0.01")]);
        assert_eq!(inv.totals(), inv.totals());
        assert_eq!(inv.clone().totals(), inv.totals());
    }

    #[test]
    fn invoice_number_is_always_prefixed() {
        assert_eq!(InvoiceNumber::new("12345").to_string(), "EVA12345");
        assert_eq!(InvoiceNumber::new(" 7 ").as_str(), "EVA7");
        assert_eq!(InvoiceNumber::new("EVA1").as_str(), "EVAEVA1");
        assert_eq!(InvoiceNumber::new("abc-01").as_str(), "EVAabc-01");
    }

    #[test]
    fn seller_details_are_fixed() {
        let lines = Party::seller().detail_lines();
        assert!(lines.contains(&String::from("Įmonės kodas: 305232614")));
        assert!(lines.contains(&String::from("PVM kodas: LT100017540118")));
        assert!(lines.contains(&String::from("Giraitės g. 60A-2")));
    }

    #[test]
    fn invoice_builder_missing_required_fields_fails() {
        // missing number
        let _ = InvoiceBuilder::default()
            .payment_reference("ORD-1")
            .buyer(PartyBuilder::default().name("B").build().unwrap())
            .build()
            .unwrap_err();

        // missing buyer
        let _ = InvoiceBuilder::default()
            .number(InvoiceNumber::new("1"))
            .payment_reference("ORD-1")
            .build()
            .unwrap_err();
    }

    #[test]
    fn empty_invoice_totals_zero() {
        let inv = make_invoice(Vec::new());
        assert_eq!(inv.gross_total(), BigDecimal::from(0));
        assert_eq!(inv.issued_on(), Local::now().date_naive());
    }
}
