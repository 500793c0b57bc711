//! Filing-Watch main entry point
//!
//! This is the command-line interface for the Filing-Watch filing indexer.

use anyhow::Context;
use clap::Parser;
use filing_watch::config::{load_config_with_hash, resolve_secrets, Config, Secrets};
use filing_watch::storage::open_index_store;
use filing_watch::Pipeline;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Filing-Watch: an incremental index of disclosure filings
///
/// Filing-Watch crawls the latest-filings listing back to the newest filing it
/// already knows, optionally classifies each new filing's materiality, and
/// merges the new records into a Markdown index kept in a GitHub repository.
#[derive(Parser, Debug)]
#[command(name = "filing-watch")]
#[command(version = "1.0.0")]
#[command(about = "An incremental index of disclosure filings", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate the configuration, print the resolved settings, and exit
    #[arg(long, conflicts_with_all = ["dry_run", "show_index"])]
    check_config: bool,

    /// Read the stored index, print its records and watermark, and exit
    #[arg(long, conflicts_with_all = ["dry_run", "check_config"])]
    show_index: bool,

    /// Crawl and merge, print the document that would be written, but don't write it
    #[arg(long, conflicts_with_all = ["check_config", "show_index"])]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.check_config {
        handle_check_config(&config);
        return Ok(());
    }

    let secrets = resolve_secrets(&config).context("Failed to resolve secrets")?;

    if cli.show_index {
        handle_show_index(&config, &secrets).await
    } else if cli.dry_run {
        handle_dry_run(&config, &secrets).await
    } else {
        handle_run(&config, &secrets).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("filing_watch=info,warn"),
            1 => EnvFilter::new("filing_watch=debug,info"),
            2 => EnvFilter::new("filing_watch=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --check-config mode: prints the resolved settings
fn handle_check_config(config: &Config) {
    println!("=== Filing-Watch Configuration ===\n");

    println!("Listing:");
    println!("  Base URL: {}", config.listing.base_url);
    println!("  Item code: {}", config.listing.item_code);
    println!("  Form type: {}", config.listing.form_type);
    println!("  Marker phrase: {}", config.listing.marker_phrase);
    println!("  Page size: {}", config.listing.page_size);
    println!("  Timeout: {}s", config.listing.timeout_secs);
    println!(
        "  Retries: {} attempts, backoff {}ms..{}ms",
        config.listing.max_attempts, config.listing.initial_backoff_ms, config.listing.max_backoff_ms
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nStore:");
    println!(
        "  Document: {}/{}/{}",
        config.store.owner, config.store.repo, config.store.path
    );
    println!("  API: {}", config.store.api_url);
    if let Some(branch) = &config.store.branch {
        println!("  Branch: {}", branch);
    }
    println!("  Token from: ${}", config.store.token_env);
    println!("  Write attempts: {}", config.store.write_attempts);
    if config.store.notify {
        println!("  Notifications: on (labels: {:?})", config.store.issue_labels);
    } else {
        println!("  Notifications: off");
    }

    match &config.classifier {
        Some(classifier) => {
            println!("\nClassifier:");
            println!("  Endpoint: {}", classifier.endpoint);
            println!("  Model: {}", classifier.model);
            println!("  Key from: ${}", classifier.api_key_env);
            println!("  Max text: {} bytes", classifier.max_text_bytes);
        }
        None => println!("\nClassifier: disabled"),
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --show-index mode: prints the stored records
async fn handle_show_index(config: &Config, secrets: &Secrets) -> anyhow::Result<()> {
    let store = open_index_store(config, secrets)?;
    let snapshot = store.read().await;

    println!("=== Stored Index ===\n");
    println!("Records: {}", snapshot.len());
    println!("Watermark: {}", snapshot.watermark);
    match snapshot.schema {
        Some(version) => println!("Schema: {}", version),
        None => println!("Schema: legacy"),
    }
    println!();

    for record in snapshot.records.iter().flatten() {
        println!(
            "{}  {:<6} {:<2} {}  {}",
            record.timestamp,
            record.form_type,
            record.materiality.symbol(),
            record.company,
            record.link
        );
    }

    Ok(())
}

/// Handles the --dry-run mode: prints the document a run would write
async fn handle_dry_run(config: &Config, secrets: &Secrets) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(config, secrets)?;
    let (report, document) = pipeline.preview().await.context("Dry run failed")?;

    println!("{}", document);
    println!(
        "✓ Would write {} records ({} new)",
        report.total_records, report.new_records
    );
    Ok(())
}

/// Handles the main run
async fn handle_run(config: &Config, secrets: &Secrets) -> anyhow::Result<()> {
    tracing::info!(
        "Tracking item {} in {}/{}/{}",
        config.listing.item_code,
        config.store.owner,
        config.store.repo,
        config.store.path
    );

    let pipeline = Pipeline::from_config(config, secrets)?;
    match pipeline.run().await {
        Ok(report) => {
            tracing::info!(
                "Indexed {} new filings ({} total, written: {}, notified: {})",
                report.new_records,
                report.total_records,
                report.written,
                report.notified
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}
