use crate::utils::truncate_str;
use crate::AnalysisResult;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt as subscriber_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

#[derive(Debug)]
pub struct LogConfig {
    pub log_dir: PathBuf,
    pub log_level: String,
    pub console_output: bool,
    pub file_output: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".into(),
            log_level: "info".into(),
            console_output: true,
            file_output: false,
        }
    }
}

/// Boxed summary of a generation result at info level.
pub fn log_idea_card(result: &AnalysisResult) {
    const CARD_WIDTH: usize = 72;
    const CONTENT_WIDTH: usize = CARD_WIDTH - 4;

    let horizontal_line = "═".repeat(CARD_WIDTH - 2);
    let mut body = format!(
        "Summary: {}",
        truncate_str(&result.trend_summary, CONTENT_WIDTH - 9)
    );
    for (i, idea) in result.ideas.iter().enumerate() {
        let line = format!("{}. [{}] {}", i + 1, idea.difficulty, idea.title);
        body.push('\n');
        body.push_str(&truncate_str(&line, CONTENT_WIDTH));
    }

    info!("\n╔{horizontal_line}╗\n{body}\n╚{horizontal_line}╝");
}

/// Install the global subscriber. A second call keeps the first subscriber.
pub fn setup_logging(config: LogConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let mut layers = Vec::new();

    if config.console_output {
        let console_layer = subscriber_fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_writer(std::io::stderr);
        layers.push(console_layer.boxed());
    }

    let mut file_error = None;
    if config.file_output {
        match std::fs::create_dir_all(&config.log_dir) {
            Ok(()) => {
                let file_appender =
                    RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "trend-ideas.log");

                let file_layer = subscriber_fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_writer(file_appender);

                layers.push(file_layer.boxed());
            }
            Err(e) => file_error = Some(e),
        }
    }

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .is_err()
    {
        return;
    }

    if let Some(e) = file_error {
        warn!(error = %e, log_dir = %config.log_dir.display(), "File logging disabled");
    }
    debug!("Logging system initialized with config: {:?}", config);
}
