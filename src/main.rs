use clap::{Parser, Subcommand};
use std::process::ExitCode;
use trend_ideas::{
    format_digest, AppConfig, DailyIdeaService, DigestLimits, SourceRegistry, TrendCollector,
    TrendError,
};

#[derive(Parser)]
#[command(name = "trend-ideas", version, about = "Daily project ideas from tech trends")]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Also write daily-rotated log files into this directory
    #[arg(long, global = true)]
    log_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Collect, generate and deliver once
    Run {
        /// Collect and print the digest without calling the model
        #[arg(long)]
        dry_run: bool,
    },
    /// Deliver ideas every day at DAILY_SCHEDULE_TIME and answer chat commands until Ctrl+C
    Schedule,
    /// List known and enabled sources
    Sources,
}

#[cfg(feature = "logging")]
fn init_logging(cli: &Cli) {
    let mut config = trend_ideas::LogConfig {
        log_level: cli.log_level.clone(),
        ..Default::default()
    };
    if let Some(dir) = &cli.log_dir {
        config.log_dir = dir.clone();
        config.file_output = true;
    }
    trend_ideas::setup_logging(config);
}

#[cfg(not(feature = "logging"))]
fn init_logging(_cli: &Cli) {}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(&cli);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.log();
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), TrendError> {
    match command {
        Command::Sources => {
            let registry = SourceRegistry::with_builtin_sources();
            let collector = TrendCollector::new(AppConfig::collector_from_env()?, &registry);
            println!("available: {}", registry.available().join(", "));
            println!("enabled:   {}", collector.enabled_sources().join(", "));
            collector.close();
        }
        Command::Run { dry_run: true } => {
            let registry = SourceRegistry::with_builtin_sources();
            let collector = TrendCollector::new(AppConfig::collector_from_env()?, &registry);
            let trends = collector.collect().await;
            collector.close();
            if trends.is_empty() {
                return Err(TrendError::NothingCollected);
            }
            println!("{}", format_digest(&trends, &DigestLimits::default()));
        }
        Command::Run { dry_run: false } => {
            let service = DailyIdeaService::from_config(AppConfig::from_env()?)?;
            let outcome = service.run_round().await;
            if let Ok(result) = &outcome {
                #[cfg(feature = "logging")]
                trend_ideas::log_idea_card(result);
                #[cfg(not(feature = "logging"))]
                let _ = result;
            }
            service.shutdown();
            outcome?;
        }
        Command::Schedule => {
            let service = DailyIdeaService::from_config(AppConfig::from_env()?)?;
            if let Err(e) = service.send_startup_notice().await {
                tracing::warn!(error = %e, "Could not send startup notice");
            }
            service
                .run_daily(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await;
            service.shutdown();
        }
    }
    Ok(())
}
