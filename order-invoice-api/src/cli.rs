use std::net::SocketAddr;

use clap::{Parser, ValueEnum};
use order_invoice::{AssetSource, Error, Layout, SmtpSettings, TotalPolicy};
use secrecy::SecretString;

fn parse_secret(value: &str) -> Result<SecretString, String> {
    Ok(SecretString::new(value.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// HTTP service that turns storefront orders into invoices and mails them to the customer.
///
/// Every option can also be set through the environment variable named next to it. A `.env`
/// file in the working directory is read first.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// Address and port to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// How invoices are rendered: simple-text, table, browser-pdf or inline-html
    #[arg(long, env = "INVOICE_LAYOUT", default_value_t = Layout::Table)]
    pub layout: Layout,

    /// WebDriver endpoint used by the browser-pdf layout
    #[arg(long, env = "WEBDRIVER_URL", default_value = "http://localhost:4444")]
    pub webdriver_url: String,

    /// Logo shown on invoices, a file path or an http(s) URL
    #[arg(long, env = "INVOICE_LOGO")]
    pub logo: Option<String>,

    /// TrueType font embedded into drawn invoices, a file path or an http(s) URL
    #[arg(long, env = "INVOICE_FONT")]
    pub font: Option<String>,

    #[arg(long, env = "SMTP_HOST", default_value = "smtp.hostinger.com")]
    pub smtp_host: String,

    /// SMTP port, implicit TLS
    #[arg(long, env = "SMTP_PORT", default_value_t = 465)]
    pub smtp_port: u16,

    /// SMTP login. Defaults to the sender address
    #[arg(long, env = "SMTP_USER")]
    pub smtp_user: Option<String>,

    /// SMTP password. Required unless mails are only logged
    #[arg(long, env = "SMTP_PASS", hide_env_values = true, value_parser = parse_secret)]
    pub smtp_pass: Option<SecretString>,

    #[arg(long, env = "SMTP_FROM_EMAIL", default_value = "info@beautybyella.lt")]
    pub from_email: String,

    #[arg(long, env = "SMTP_FROM_NAME", default_value = "Beauty by Ella")]
    pub from_name: String,

    /// Log mails instead of sending them
    #[arg(long, env = "MAIL_DRY_RUN")]
    pub dry_run: bool,

    /// What to do when the client's total_price differs from the computed total: warn or reject
    #[arg(long, env = "TOTAL_MISMATCH", default_value_t = TotalPolicy::Warn)]
    pub total_mismatch: TotalPolicy,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    pub fn logo_source(&self) -> Option<AssetSource> {
        self.logo.as_deref().map(AssetSource::from)
    }

    pub fn font_source(&self) -> Option<AssetSource> {
        self.font.as_deref().map(AssetSource::from)
    }

    /// SMTP settings, or `None` for a dry run
    ///
    /// # Errors
    /// [`order_invoice::Error`] if mails are to be sent but no password is configured
    pub fn smtp_settings(&self) -> Result<Option<SmtpSettings>, Error> {
        if self.dry_run {
            return Ok(None);
        }
        let password = self.smtp_pass.clone().ok_or_else(|| {
            Error::from(String::from(
                "SMTP_PASS is required unless MAIL_DRY_RUN is set",
            ))
            .add_context("reading smtp settings")
        })?;
        Ok(Some(SmtpSettings {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            username: self
                .smtp_user
                .clone()
                .unwrap_or_else(|| self.from_email.clone()),
            password,
            from_email: self.from_email.clone(),
            from_name: self.from_name.clone(),
        }))
    }
}
