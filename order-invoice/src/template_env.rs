use minijinja::context;
use serde::Serialize;

use crate::{
    invoice::{Invoice, Party, VAT_PERCENT},
    layout::TITLE,
    money::format_eur,
};

/// Products shown per printed page of the HTML invoice
pub const ROWS_PER_PAGE: usize = 21;

#[derive(Debug, Serialize)]
struct PartyView {
    name: String,
    lines: Vec<String>,
}

impl From<&Party> for PartyView {
    fn from(party: &Party) -> Self {
        PartyView {
            name: party.name().to_string(),
            lines: party.detail_lines(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RowView {
    name: String,
    quantity: u32,
    unit_price: String,
    vat: String,
    gross: String,
}

/// The invoice with every amount already formatted, so templates never do arithmetic
#[derive(Debug, Serialize)]
struct InvoiceView {
    title: &'static str,
    number: String,
    payment_reference: String,
    date: String,
    seller: PartyView,
    buyer: PartyView,
    delivery_method: Option<String>,
    vat_percent: u32,
    net_total: String,
    vat_total: String,
    gross_total: String,
}

impl From<&Invoice> for InvoiceView {
    fn from(invoice: &Invoice) -> Self {
        let totals = invoice.totals();
        InvoiceView {
            title: TITLE,
            number: invoice.number().to_string(),
            payment_reference: invoice.payment_reference().to_string(),
            date: invoice.issued_on().format("%Y-%m-%d").to_string(),
            seller: invoice.seller().into(),
            buyer: invoice.buyer().into(),
            delivery_method: invoice.delivery_method().map(str::to_string),
            vat_percent: VAT_PERCENT,
            net_total: format_eur(&totals.net),
            vat_total: format_eur(&totals.vat),
            gross_total: format_eur(&totals.gross),
        }
    }
}

fn rows(invoice: &Invoice) -> Vec<RowView> {
    invoice
        .line_items()
        .iter()
        .map(|item| RowView {
            name: item.name().to_string(),
            quantity: item.quantity(),
            unit_price: format_eur(item.unit_price()),
            vat: format_eur(&item.vat()),
            gross: format_eur(&item.gross()),
        })
        .collect()
}

pub fn setup_template_env() -> Result<minijinja::Environment<'static>, minijinja::Error> {
    let mut env = minijinja::Environment::new();
    env.add_template("invoice.html", include_str!("../templates/invoice.html"))?;
    env.add_template("email.html", include_str!("../templates/email.html"))?;
    Ok(env)
}

/// Render the invoice document. `logo_src` is placed in an `img` tag as given, any URL or
/// `data:` URL works.
pub fn render_template(
    env: &minijinja::Environment<'static>,
    invoice: &Invoice,
    logo_src: Option<&str>,
) -> Result<String, minijinja::Error> {
    let template = env.get_template("invoice.html")?;
    let rows = rows(invoice);
    let pages: Vec<_> = rows.chunks(ROWS_PER_PAGE).collect();
    template.render(context! {
        pages => pages,
        invoice => InvoiceView::from(invoice),
        logo_src => logo_src,
    })
}

/// Render the confirmation mail body that accompanies an attached invoice
pub fn render_email(
    env: &minijinja::Environment<'static>,
    invoice: &Invoice,
    logo_src: Option<&str>,
) -> Result<String, minijinja::Error> {
    let template = env.get_template("email.html")?;
    template.render(context! {
        invoice => InvoiceView::from(invoice),
        rows => rows(invoice),
        logo_src => logo_src,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    use super::*;
    use crate::invoice::{InvoiceBuilder, InvoiceNumber, LineItemBuilder, PartyBuilder};

    fn invoice(lines: usize, buyer: &str) -> Invoice {
        let mut builder = InvoiceBuilder::default()
            .number(InvoiceNumber::new("100"))
            .payment_reference("ORD-1")
            .issued_on(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())
            .delivery_method("Omniva paštomatas")
            .buyer(PartyBuilder::default().name(buyer).build().unwrap());
        for i in 0..lines {
            builder = builder.add_line(
                LineItemBuilder::default()
                    .name(format!("Kremas {i}"))
                    .quantity(2u32)
                    .unit_price(BigDecimal::from_str("10").unwrap())
                    .build()
                    .unwrap(),
            );
        }
        builder.build().unwrap()
    }

    #[test]
    fn invoice_contains_labels_and_totals() {
        let env = setup_template_env().unwrap();
        let html = render_template(&env, &invoice(1, "Jonas"), None).unwrap();
        for expected in [
            "PVM sąskaita faktūra",
            "EVA100",
            "ORD-1",
            "2026-10-16",
            "Pardavėjas",
            "Pirkėjas",
            "Tarpinė suma (be PVM)",
            "PVM (21%)",
            "Bendra suma (su PVM)",
            "€20,00",
            "€4,20",
            "€24,20",
            "Omniva paštomatas",
        ] {
            assert!(html.contains(expected), "missing {expected}");
        }
        assert!(!html.contains("<img"));
    }

    #[test]
    fn logo_is_embedded_when_given() {
        let env = setup_template_env().unwrap();
        let html =
            render_template(&env, &invoice(1, "Jonas"), Some("data:image/png;base64,AAAA")).unwrap();
        assert!(html.contains(r#"src="data:image/png;base64,AAAA""#));
    }

    #[test]
    fn rows_are_split_into_pages() {
        let env = setup_template_env().unwrap();
        let html = render_template(&env, &invoice(ROWS_PER_PAGE + 1, "Jonas"), None).unwrap();
        assert_eq!(html.matches(r#"class="page""#).count(), 2);
    }

    #[test]
    fn customer_input_is_escaped() {
        let env = setup_template_env().unwrap();
        let html = render_template(&env, &invoice(1, "<script>x</script>"), None).unwrap();
        assert!(!html.contains("<script>x"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn email_thanks_the_customer() {
        let env = setup_template_env().unwrap();
        let html = render_email(&env, &invoice(2, "Jonas"), None).unwrap();
        assert!(html.contains("Ačiū, Jonas!"));
        assert!(html.contains("ORD-1"));
        assert!(html.contains("Kremas 1"));
        assert!(html.contains("€48,40"));
    }
}
