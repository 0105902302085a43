//! omni-post - Cross-post content to connected social platforms

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use libomnicast::accounts::AccountResolver;
use libomnicast::composer::Composer;
use libomnicast::graph::GraphClient;
use libomnicast::orchestrator::Orchestrator;
use libomnicast::platforms::HttpPublisherFactory;
use libomnicast::store::{CredentialStore, FileStorage};
use libomnicast::types::{AggregateStatus, PlatformSelection, PublishStatus};
use libomnicast::{Config, OmnicastError, PlatformId, Result};

#[derive(Parser, Debug)]
#[command(name = "omni-post")]
#[command(version)]
#[command(about = "Cross-post content to connected social platforms", long_about = None)]
struct Cli {
    /// Content to post (reads from stdin if not provided)
    content: Option<String>,

    /// Target platform(s), comma-separated (e.g. facebook,instagram)
    #[arg(short, long)]
    platform: String,

    /// Attach a media file (image or video)
    #[arg(short, long, value_name = "FILE")]
    media: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    libomnicast::logging::config_from_env(cli.verbose).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let selection = parse_selection(&cli.platform)?;

    if cli.format != "text" && cli.format != "json" {
        return Err(OmnicastError::InvalidInput(format!(
            "Invalid format: '{}'. Valid options: text, json",
            cli.format
        )));
    }

    let content = match cli.content {
        Some(content) => content,
        None => read_stdin()?,
    };

    let config = Config::load()?;
    let backend = FileStorage::open(config.expand_storage_path())?;
    let store = CredentialStore::new(Arc::new(backend));
    let graph = Arc::new(GraphClient::new(&config));
    let resolver = AccountResolver::new(graph.clone(), store.clone());
    let factory = Arc::new(HttpPublisherFactory::new(&config, graph));
    let orchestrator = Orchestrator::new(store, resolver, factory);

    let mut composer = Composer::new();
    composer.set_text(content);
    if let Some(path) = &cli.media {
        composer.attach_path(path)?;
    }

    let report = orchestrator.submit(&mut composer, &selection).await?;

    if cli.format == "json" {
        println!(
            "{}",
            serde_json::to_string_pretty(&report)
                .map_err(|e| OmnicastError::InvalidInput(e.to_string()))?
        );
    } else {
        for outcome in &report.outcomes {
            match outcome.status {
                PublishStatus::Success => {
                    println!("{}: ok", outcome.platform.display_name());
                }
                PublishStatus::Failed => {
                    println!(
                        "{}: failed ({})",
                        outcome.platform.display_name(),
                        outcome.detail.as_deref().unwrap_or("unknown error")
                    );
                }
            }
        }
        println!("{}", report.summary());
    }

    match report.status {
        AggregateStatus::Success => Ok(()),
        _ => std::process::exit(1),
    }
}

fn parse_selection(raw: &str) -> Result<PlatformSelection> {
    let mut selection = PlatformSelection::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let platform: PlatformId = part
            .parse()
            .map_err(OmnicastError::InvalidInput)?;
        selection.select(platform);
    }
    if selection.is_empty() {
        return Err(OmnicastError::InvalidInput(
            "no platform specified".to_string(),
        ));
    }
    Ok(selection)
}

fn read_stdin() -> Result<String> {
    let mut content = String::new();
    std::io::stdin()
        .read_to_string(&mut content)
        .map_err(|e| OmnicastError::InvalidInput(format!("failed to read stdin: {}", e)))?;
    let content = content.trim_end().to_string();
    if content.is_empty() {
        return Err(OmnicastError::InvalidInput(
            "no content provided".to_string(),
        ));
    }
    Ok(content)
}
