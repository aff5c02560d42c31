use std::sync::Arc;

use clap::Parser;
use order_invoice::{
    AddContext, Assets, Error, InvoiceService, Mailer, MockMailer, Renderer, SmtpMailer,
};
use order_invoice_api::{AppState, build_router, cli::Cli, telemetry::init_tracing};
use tokio::{net::TcpListener, signal};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let assets = Assets::load(cli.logo_source(), cli.font_source()).await;
    let renderer = Renderer::new(cli.layout, Arc::new(assets), cli.webdriver_url.as_str())
        .add_context("starting service")?;

    let mailer: Arc<dyn Mailer> = match cli.smtp_settings().add_context("starting service")? {
        Some(settings) => {
            tracing::info!(host = %settings.host, port = settings.port, "SMTP mailer initialized");
            Arc::new(SmtpMailer::new(&settings).add_context("starting service")?)
        }
        None => {
            tracing::warn!("dry run, mails are logged and not sent");
            Arc::new(MockMailer::new())
        }
    };

    let state = AppState::new(InvoiceService::new(renderer, mailer, cli.total_mismatch));
    let app = build_router(state);

    let listener = TcpListener::bind(cli.bind)
        .await
        .map_err(Error::from)
        .add_context("binding listener")?;
    tracing::info!(address = %cli.bind, layout = %cli.layout, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(Error::from)
        .add_context("serving http")?;

    tracing::info!("Service shutdown complete");
    Ok(())
}
