//! Presentation of amounts. Arithmetic elsewhere keeps full precision; rounding happens here,
//! once, right before an amount is shown.

use bigdecimal::{BigDecimal, RoundingMode};

pub const CURRENCY_SYMBOL: &str = "€";

/// Round to exactly two decimal places, half away from zero.
pub fn round2(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(2, RoundingMode::HalfUp)
}

/// Format an amount the way the storefront shows it: currency symbol first, comma as the
/// decimal separator, no digit grouping. `12.345` becomes `€12,35`.
pub fn format_eur(value: &BigDecimal) -> String {
    format!("{CURRENCY_SYMBOL}{}", round2(value).to_string().replace('.', ","))
}
