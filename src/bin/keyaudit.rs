use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use keygraph_core::source::JsonFileSource;
use keygraph_core::{run, AuditConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Check declared calculation levels and contexts of fund keys against
/// their formula references.
#[derive(Debug, Parser)]
#[command(name = "keyaudit", version)]
struct Cli {
    /// JSON array of key records.
    #[arg(long)]
    records: PathBuf,

    /// TOML audit configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only audit this fund.
    #[arg(long)]
    fund: Option<String>,

    /// Audit each fund as an independent parallel run.
    #[arg(long)]
    parallel: bool,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Also print violations hidden by `suppressed_dependencies`.
    #[arg(long)]
    show_suppressed: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keygraph_core=info,keyaudit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = AuditConfig::load(cli.config.as_deref()).context("Failed to load audit configuration")?;
    if let Some(fund) = cli.fund {
        config.fund_id = Some(fund);
    }
    config.parallel |= cli.parallel;

    let source = JsonFileSource::new(&cli.records);
    let reports = run(&source, &config)
        .with_context(|| format!("Audit of {} failed", cli.records.display()))?;

    match cli.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        Format::Text => {
            for report in &reports {
                print!("{}", report.render_text(&config, cli.show_suppressed));
            }
        }
    }
    Ok(())
}
