//! Printing rendered HTML to PDF through a WebDriver session (chromedriver or similar).

use base64::{Engine, engine::general_purpose};
use fantoccini::{
    Client, ClientBuilder,
    wd::{PrintConfigurationBuilder, PrintMargins, PrintSize},
};
use serde_json::Map;
use tracing::debug;

use crate::error::{AddContext, Error};

async fn connect_to_client(webdriver_url: &str) -> Result<Client, fantoccini::error::NewSessionError> {
    let mut caps = Map::new();
    caps.insert(
        "goog:chromeOptions".to_string(),
        serde_json::json!({
            "args": ["--headless", "--no-sandbox", "--disable-gpu"]
        }),
    );
    ClientBuilder::native()
        .capabilities(caps)
        .connect(webdriver_url)
        .await
}

async fn print_page(client: &Client, html: &str) -> Result<Vec<u8>, Error> {
    let encoded = general_purpose::STANDARD.encode(html.as_bytes());
    let data_url = format!("data:text/html;base64,{encoded}");
    client
        .goto(&data_url)
        .await
        .map_err(Error::from)
        .add_context("navigating to document")?;
    let config = PrintConfigurationBuilder::default()
        .margins(PrintMargins {
            top: 0.0,
            left: 0.0,
            right: 0.0,
            bottom: 0.0,
        })
        .size(PrintSize::A4)
        .background(true)
        .build()
        .map_err(Error::from)
        .add_context("configuring printer")?;
    client
        .print(config)
        .await
        .map_err(Error::from)
        .add_context("printing page")
}

/// Print an HTML document to A4 PDF bytes
///
/// Opens a new browser session at `webdriver_url`, loads `html` from a `data:` URL, prints it
/// and closes the session again, also when printing failed. Page margins come from the
/// document's own `@page` rule.
///
/// # Errors
/// [`crate::Error`] if the session cannot be created, or navigating or printing fails
pub async fn print_html(webdriver_url: &str, html: &str) -> Result<Vec<u8>, Error> {
    let client = connect_to_client(webdriver_url)
        .await
        .map_err(Error::from)
        .add_context("connecting to webdriver")
        .add_context("printing html")?;
    let printed = print_page(&client, html).await.add_context("printing html");
    if let Err(e) = client.close().await {
        debug!(error = ?e, "closing webdriver session");
    }
    printed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "needs chromedriver listening on localhost:4444"]
    async fn prints_html_to_pdf() {
        let pdf = print_html(
            "http://localhost:4444",
            "<html><body><h1>PVM sąskaita faktūra</h1></body></html>",
        )
        .await
        .unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn unreachable_webdriver_is_an_error() {
        let err = print_html("http://127.0.0.1:9", "<html></html>")
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("printing html -> connecting to webdriver"));
    }
}
