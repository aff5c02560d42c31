//! Turning an [`Invoice`] into the document that is mailed.

use std::{fmt::Display, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    assets::Assets,
    browser::print_html,
    error::{AddContext, Error},
    invoice::Invoice,
    layout::{simple_text_layout, table_layout},
    metrics::Typeface,
    pdf,
    template_env::{render_email, render_template, setup_template_env},
};

/// How invoices are presented
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    /// Drawn PDF of plain flowing lines
    SimpleText,
    /// Drawn PDF with a product table
    #[default]
    Table,
    /// HTML invoice printed to PDF by a headless browser
    BrowserPdf,
    /// HTML invoice as the mail body, nothing attached
    InlineHtml,
}

impl Layout {
    pub const ALL: [Layout; 4] = [
        Layout::SimpleText,
        Layout::Table,
        Layout::BrowserPdf,
        Layout::InlineHtml,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::SimpleText => "simple-text",
            Layout::Table => "table",
            Layout::BrowserPdf => "browser-pdf",
            Layout::InlineHtml => "inline-html",
        }
    }
}

impl Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Layout::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let known: Vec<&str> = Layout::ALL.iter().map(Layout::as_str).collect();
                format!("unknown layout '{s}', expected one of {}", known.join(", "))
            })
    }
}

/// A rendered invoice
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Pdf(Vec<u8>),
    Html(String),
}

pub struct Renderer {
    layout: Layout,
    assets: Arc<Assets>,
    typeface: Typeface,
    templates: minijinja::Environment<'static>,
    webdriver_url: String,
}

impl Renderer {
    /// The drawn layouts use the assets' font when it parses, the bundled DejaVu Sans otherwise.
    ///
    /// # Errors
    /// [`crate::Error`] if the embedded templates or the bundled font fail to parse
    pub fn new(
        layout: Layout,
        assets: Arc<Assets>,
        webdriver_url: impl Into<String>,
    ) -> Result<Renderer, Error> {
        let templates = setup_template_env()
            .map_err(Error::from)
            .add_context("setting up templating environment")?;
        let typeface = Typeface::with_override(assets.font()).add_context("loading typeface")?;
        Ok(Renderer {
            layout,
            assets,
            typeface,
            templates,
            webdriver_url: webdriver_url.into(),
        })
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Logo for documents rendered here, always inline
    fn document_logo_src(&self) -> Option<String> {
        self.assets.logo().map(|l| l.data_url())
    }

    /// Logo for HTML that goes out as a mail body
    fn mail_logo_src(&self) -> Option<String> {
        self.assets.logo().map(|l| l.mail_src())
    }

    fn draw(&self, invoice: &Invoice) -> Result<Vec<u8>, Error> {
        let logo = self.assets.logo();
        let size = logo.map(|l| l.size());
        let layout = match self.layout {
            Layout::SimpleText => simple_text_layout(invoice, size, &self.typeface),
            _ => table_layout(invoice, size, &self.typeface),
        };
        debug!(pages = layout.pages.len(), "invoice laid out");
        pdf::draw(
            &layout,
            invoice.number().as_str(),
            &self.typeface,
            logo.map(|l| l.image()),
        )
    }

    fn html(&self, invoice: &Invoice, logo_src: Option<String>) -> Result<String, Error> {
        render_template(&self.templates, invoice, logo_src.as_deref())
            .map_err(Error::from)
            .add_context("rendering html template")
    }

    /// Render the invoice in the configured layout
    ///
    /// # Errors
    /// [`crate::Error`] if the document cannot be produced
    pub async fn render(&self, invoice: &Invoice) -> Result<Document, Error> {
        let document = match self.layout {
            Layout::SimpleText | Layout::Table => Document::Pdf(self.draw(invoice)?),
            Layout::BrowserPdf => {
                let html = self.html(invoice, self.document_logo_src())?;
                Document::Pdf(print_html(&self.webdriver_url, &html).await?)
            }
            Layout::InlineHtml => Document::Html(self.html(invoice, self.mail_logo_src())?),
        };
        Ok(document)
    }

    /// The mail body sent alongside an attached invoice
    ///
    /// # Errors
    /// [`crate::Error`] if the template fails to render
    pub fn email_body(&self, invoice: &Invoice) -> Result<String, Error> {
        render_email(&self.templates, invoice, self.mail_logo_src().as_deref())
            .map_err(Error::from)
            .add_context("rendering email body")
    }
}
