//! The order payload as it arrives from the storefront.
//!
//! Nothing in here is trusted. Strings are kept as sent and numbers are parsed leniently so
//! that a single malformed product entry is filtered out by validation instead of failing the
//! whole request at deserialization time.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Longest numeric text that is parsed at all
const MAX_NUMBER_LEN: usize = 40;
/// Digits allowed left of the decimal point
const MAX_INTEGER_DIGITS: i64 = 15;
/// Digits allowed right of the decimal point
const MAX_FRACTION_DIGITS: i64 = 12;

/// Parse an amount or count, refusing values whose magnitude or precision no order can have.
///
/// `BigDecimal` keeps the exponent of `"1e400000000"` as written, so the number parses
/// instantly but every later rescale to cents has to materialize all of its digits.
pub fn parse_bounded_decimal(text: &str) -> Option<BigDecimal> {
    let text = text.trim();
    if text.is_empty() || text.len() > MAX_NUMBER_LEN {
        return None;
    }
    let value = BigDecimal::from_str(text).ok()?;
    let (_, scale) = value.as_bigint_and_exponent();
    let integer_digits = value.digits() as i64 - scale;
    (scale <= MAX_FRACTION_DIGITS && integer_digits <= MAX_INTEGER_DIGITS).then_some(value)
}

/// Parse a decimal that may arrive as a JSON number or as a numeric string. Anything else,
/// including unparsable or out of range values, becomes `None`.
fn deserialize_lenient_decimal<'de, D>(deserializer: D) -> Result<Option<BigDecimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => parse_bounded_decimal(&n.to_string()),
        Some(serde_json::Value::String(s)) => parse_bounded_decimal(&s),
        _ => None,
    })
}

/// A structured postal address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// A shipping address is either a free-form line typed by the customer or a structured
/// address. Both shapes are accepted as-is; a string is never parsed for structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostalAddress {
    Structured(Address),
    Freeform(String),
}

impl PostalAddress {
    /// Printable lines of the address, trimmed and without empty entries
    pub fn lines(&self) -> Vec<String> {
        match self {
            PostalAddress::Freeform(text) => text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            PostalAddress::Structured(address) => {
                let city_line = match address.postal_code.as_deref().map(str::trim) {
                    Some(code) if !code.is_empty() => {
                        format!("{} {}", code, address.city.trim())
                    }
                    _ => address.city.trim().to_string(),
                };
                [
                    Some(address.line1.as_str()),
                    address.line2.as_deref(),
                    Some(city_line.as_str()),
                    address.country.as_deref(),
                ]
                .into_iter()
                .flatten()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()
            }
        }
    }

    /// `true` when there is nothing printable in the address
    pub fn is_blank(&self) -> bool {
        self.lines().is_empty()
    }
}

/// One product entry of the order, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "qty", deserialize_with = "deserialize_lenient_decimal")]
    pub quantity: Option<BigDecimal>,
    /// Unit price excluding VAT
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub price: Option<BigDecimal>,
}

/// The JSON body posted by the order form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderRequest {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<PostalAddress>,
    #[serde(default)]
    pub delivery_method: Option<String>,
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub products: Vec<ProductEntry>,
    /// Gross total computed by the client. Only ever compared against the server's own total
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub total_price: Option<BigDecimal>,
}
