use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;

use channel_scraper::config::ScraperConfig;
use channel_scraper::input;
use channel_scraper::notify::SmtpMailer;
use channel_scraper::pipeline::{self, RunContext, RunInputs};
use channel_scraper::sheets::GoogleSheets;
use channel_scraper::sources::TelegramSource;

#[tokio::main]
async fn main() -> ExitCode {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "Scrape run aborted");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = ScraperConfig::from_env().context("invalid configuration")?;

    eprintln!("📥 Channel Scraper v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Channels: {}", config.channels_path.display());
    eprintln!("   Spreadsheet: {}", config.spreadsheet_name);
    eprintln!("   Window: last {} days\n", config.window_days);

    // ── Inputs ───────────────────────────────────────────────────────────
    let channels = input::read_channels(&config.channels_path)?;
    let email_creds = input::read_email_creds(&config.email_creds_path)?;
    let inputs = RunInputs {
        channels,
        spreadsheet_name: config.spreadsheet_name.clone(),
        email_creds,
    };

    // ── Services ─────────────────────────────────────────────────────────
    let store = GoogleSheets::from_service_account(&config.service_account_path)?;
    let source = TelegramSource::connect(&config.telegram)
        .await
        .context("failed to start Telegram session")?;
    let mailer = SmtpMailer::new(config.smtp.clone());

    let ctx = RunContext::new(Utc::now(), config.window_days);
    let report = pipeline::run(&ctx, &inputs, &source, &store, &mailer).await?;

    eprintln!(
        "Done: {} of {} channels written, {} failed{}",
        report.written.len(),
        report.total(),
        report.failed.len(),
        if report.notified { "" } else { " (notification not sent)" }
    );
    Ok(())
}
