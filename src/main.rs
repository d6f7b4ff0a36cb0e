use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};

use stock_watcher::cli::{Cli, RunMode};
use stock_watcher::events::TracingEventSink;
use stock_watcher::extractor::AvailabilityExtractor;
use stock_watcher::fetcher::HttpFetcher;
use stock_watcher::logging;
use stock_watcher::plugins::notifiers::{EmailKind, EmailNotifier, SmtpMailTransport};
use stock_watcher::plugins::NotifierPlugin;
use stock_watcher::scheduler::StockMonitor;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    // A missing .env file is fine; the variables may come from the environment.
    dotenvy::dotenv().ok();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init_stdout();
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = match logging::init(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            logging::init_stdout();
            error!("Failed to open log directory {}: {}", config.logging.directory, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = config.email.login() {
        error!("Email settings are incomplete ({}). Check your .env file.", e);
        return ExitCode::FAILURE;
    }

    match run(&cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, config: &stock_watcher::AppConfig) -> anyhow::Result<()> {
    let mode = cli.mode();
    let kind = match mode {
        RunMode::Test => EmailKind::Test,
        _ => EmailKind::Restock,
    };
    let notifier = EmailNotifier::new(&config.email, SmtpMailTransport::new(&config.email), kind);

    if mode == RunMode::CheckSmtp {
        match notifier.test_connection().await {
            Ok(true) => info!(host = %config.email.smtp_host, "SMTP login succeeded"),
            Ok(false) => {
                warn!(host = %config.email.smtp_host, "SMTP server rejected the connection test")
            }
            Err(e) => error!(host = %config.email.smtp_host, "SMTP connection test failed: {}", e),
        }
        return Ok(());
    }

    let extractor =
        AvailabilityExtractor::new(&config.selectors).context("Invalid selector configuration")?;
    let fetcher = HttpFetcher::new(&config.monitor).context("Failed to build HTTP client")?;
    let monitor =
        StockMonitor::new(&config.monitor, &extractor, fetcher, notifier, TracingEventSink);

    match mode {
        RunMode::Test => {
            monitor.run_test_notification().await;
            info!("Test complete");
        }
        _ => {
            monitor
                .run(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for shutdown signal: {}", e);
                        std::future::pending::<()>().await;
                    }
                })
                .await;
        }
    }

    Ok(())
}
