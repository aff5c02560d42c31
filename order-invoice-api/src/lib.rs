//! HTTP front of the order invoice service
//!
//! Accepts the storefront's order JSON on `POST /api/send-email`, hands it to an
//! [`InvoiceService`] and reports the message id of the sent mail.

use std::sync::Arc;

use order_invoice::InvoiceService;

pub mod cli;
pub mod error;
pub mod routes;
pub mod telemetry;

pub use routes::build_router;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<InvoiceService>,
}

impl AppState {
    pub fn new(service: InvoiceService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
