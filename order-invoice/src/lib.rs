//! Turning storefront orders into VAT invoices and mailing them to the customer
//!
//! An incoming [`OrderRequest`] is validated, priced with 21% VAT, rendered in one of several
//! [`Layout`]s (a drawn PDF, an HTML page printed by a headless browser, or inline HTML) and
//! delivered through a [`Mailer`]. [`InvoiceService`] ties these steps together.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use order_invoice::{Assets, InvoiceService, Layout, MockMailer, OrderRequest, Renderer, TotalPolicy};
//!
//! let order: OrderRequest = serde_json::from_str(r#"{
//!     "customer_name": "Jonas Jonaitis",
//!     "customer_email": "jonas@example.com",
//!     "payment_reference": "ORD-1",
//!     "invoice_number": "100",
//!     "products": [{ "name": "Kremas", "quantity": 2, "price": "10" }]
//! }"#).unwrap();
//!
//! let renderer = Renderer::new(Layout::Table, Arc::new(Assets::none()), "http://localhost:4444").unwrap();
//! let mailer = Arc::new(MockMailer::new());
//! let service = InvoiceService::new(renderer, mailer.clone(), TotalPolicy::Warn);
//!
//! let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! let receipt = runtime.block_on(service.process(order)).unwrap();
//! assert_eq!(mailer.send_count(), 1);
//! assert!(!receipt.message_id.is_empty());
//! ```

pub mod assets;
pub mod browser;
pub mod error;
pub mod invoice;
pub mod layout;
pub mod mail;
pub mod metrics;
pub mod money;
pub mod order;
pub mod pdf;
pub mod render;
pub mod service;
pub mod template_env;
pub mod validate;

pub use assets::{AssetSource, Assets, Logo};
pub use error::{AddContext, Category, Error};
pub use invoice::{
    Invoice, InvoiceBuilder, InvoiceBuilderError, InvoiceNumber, LineItem, LineItemBuilder,
    LineItemBuilderError, Party, PartyBuilder, PartyBuilderError, Totals,
};
pub use mail::{
    DeliveryReceipt, MailAttachment, Mailer, MockMailer, OutgoingMail, SmtpMailer, SmtpSettings,
};
pub use metrics::Typeface;
pub use order::{Address, OrderRequest, PostalAddress, ProductEntry};
pub use render::{Document, Layout, Renderer};
pub use service::{InvoiceService, TotalPolicy};
pub use validate::{ValidatedOrder, ValidationError, validate};
