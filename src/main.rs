mod briefing;
mod config;
mod error;
mod indicator;
mod market;
mod model;
mod notifier;
mod status;

use std::path::Path;

use clap::Parser;
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

use briefing::Briefing;
use config::AppConfig;
use indicator::rsi::Rsi;
use market::yahoo::YahooFinance;
use notifier::Notifier;
use notifier::telegram::TelegramNotifier;
use notifier::terminal::TerminalNotifier;

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("runtime error")]
    Runtime,
}

#[derive(Parser)]
#[command(
    name = "portfolio-briefing",
    about = "Sends an RSI briefing for each portfolio symbol to a chat"
)]
struct Cli {
    /// Path to a TOML configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<String>,

    /// Log messages to the terminal instead of sending them to Telegram
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Report<AppError>> {
    let cli = Cli::parse();

    // A missing .env file is fine; the variables may already be set.
    let _ = dotenvy::dotenv();

    let mut config =
        config::load(cli.config.as_deref().map(Path::new)).change_context(AppError::Config)?;
    config.apply_env(|key| std::env::var(key).ok());
    config::validate(&config, !cli.dry_run).change_context(AppError::Config)?;

    init_tracing(&config);

    let period = config.history_period().change_context(AppError::Config)?;
    let rsi = Rsi::new(config.general.rsi_window).change_context(AppError::Config)?;

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .user_agent(concat!(
            "Mozilla/5.0 (compatible; portfolio-briefing/",
            env!("CARGO_PKG_VERSION"),
            ")"
        ))
        .build()
        .change_context(AppError::Runtime)?;

    let market = YahooFinance::new(
        client.clone(),
        &config.market.base_url,
        config.market.requests_per_second,
    );
    let notifier = build_notifier(&config, client, cli.dry_run)?;

    let entries = config.entries();
    info!(
        entries = entries.len(),
        period = %period,
        rsi_window = rsi.window(),
        dry_run = cli.dry_run,
        "configuration loaded"
    );

    let briefing = Briefing::new(
        &market,
        notifier.as_ref(),
        rsi,
        period,
        config.send_interval(),
    );
    briefing.run(&entries, chrono::Local::now()).await;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.general.log_level);
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}

fn build_notifier(
    config: &AppConfig,
    client: reqwest::Client,
    dry_run: bool,
) -> Result<Box<dyn Notifier>, Report<AppError>> {
    if dry_run {
        return Ok(Box::new(TerminalNotifier));
    }

    let (token, chat_id) = config.telegram_credentials().ok_or_else(|| {
        Report::new(AppError::Config).attach("telegram credentials are missing")
    })?;
    Ok(Box::new(TelegramNotifier::new(
        client,
        &config.telegram.base_url,
        token,
        chat_id,
    )))
}
