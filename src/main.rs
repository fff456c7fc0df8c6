//! esigen - static pages and ESI fragments from a CMS host.

mod cli;
mod config;
mod error;
mod esi;
mod generator;
mod host;
mod init;
mod logger;
mod paths;
mod utils;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use generator::{BulkOrchestrator, CancelFlag, NodeQuery, RunReport};
use host::CommandHost;
use init::new_config;
use std::path::Path;

fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    let config: &'static SiteConfig = Box::leak(Box::new(load_config(cli)?));
    logger::set_verbose(config.generator.verbose);

    if cli.is_init() {
        new_config(config)?;
        log!("init"; "wrote {}", config.config_path.display());
        return Ok(());
    }

    if cli.is_destructive() && !cli.yes && !confirm(cli, config)? {
        log!("abort"; "nothing changed");
        return Ok(());
    }

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            cancel.cancel();
            log!("cancel"; "stopping after the current pages...");
        })
        .context("Failed to install Ctrl-C handler")?;
    }

    let host = CommandHost::new(&config.host);
    let bulk = BulkOrchestrator::new(config, &host, cancel)?;
    let report = run(cli, &bulk)?;

    log!("done"; "{}s", report.secs());
    if !report.is_success() {
        bail!(
            "{} items failed{}",
            report.failed,
            if report.sync_failed { ", file sync failed" } else { "" }
        );
    }
    Ok(())
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &'static Cli) -> Result<SiteConfig> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    let mut config = if config_path.exists() {
        SiteConfig::from_path(&config_path)?
    } else {
        SiteConfig::default()
    };
    config.update_with_cli(cli);

    // Validate config state based on command
    let config_exists = config.config_path.exists();
    match (cli.is_init(), config_exists) {
        (true, true) => {
            bail!("Config file already exists. Remove it manually or init in a different path.")
        }
        (false, false) => bail!("Config file not found."),
        _ => {}
    }

    if !cli.is_init() {
        config.validate()?;
    }

    Ok(config)
}

/// Ask before removing generated output.
fn confirm(cli: &Cli, config: &SiteConfig) -> Result<bool> {
    let scope = match &cli.command {
        Commands::Delete { pages: true, .. } => "generated pages",
        Commands::Delete { esi: true, .. } => "all fragments",
        Commands::Delete { code: true, .. } => "mirrored code",
        _ => "all generated output",
    };
    let message = format!(
        "Delete {scope} under {}?",
        config.generator.directory.display()
    );
    inquire::Confirm::new(&message)
        .with_default(false)
        .with_help_message("pass --yes to skip this prompt")
        .prompt()
        .context("Confirmation prompt failed")
}

/// Dispatch one subcommand.
fn run(cli: &Cli, bulk: &BulkOrchestrator<'_>) -> Result<RunReport> {
    let report = match &cli.command {
        Commands::Init => RunReport::default(),
        Commands::GenerateAll => bulk.generate_all()?,
        Commands::GeneratePages { path: Some(path) } => bulk
            .generate_page(path)
            .with_context(|| format!("Failed to generate `{path}`"))?,
        Commands::GeneratePages { path: None } => bulk.generate_pages()?,
        Commands::GenerateNodes {
            bundle,
            start,
            length,
            fragments_only,
        } => bulk.generate_nodes(&NodeQuery {
            bundle: Some(bundle.clone()),
            start: start.unwrap_or(0),
            length: *length,
            fragments_only: *fragments_only,
            overwrite_fragments: *fragments_only,
        })?,
        Commands::GeneratePaths => bulk.generate_paths()?,
        Commands::GenerateBlocks {
            block_id: Some(block_id),
            ..
        } => bulk
            .generate_block(block_id)
            .with_context(|| format!("Failed to generate fragment `{block_id}`"))?,
        Commands::GenerateBlocks {
            block_id: None,
            frequent,
        } => bulk.generate_blocks(*frequent)?,
        Commands::GenerateRedirects => bulk.generate_redirects()?,
        Commands::GenerateFiles => bulk.generate_files()?,
        Commands::Delete { pages: true, .. } => bulk.delete_pages()?,
        Commands::Delete { esi: true, .. } => bulk.delete_blocks()?,
        Commands::Delete { code: true, .. } => bulk.delete_drupal()?,
        Commands::Delete { .. } => bulk.delete_all()?,
        Commands::DeletePage { path } => bulk.delete_page(path)?,
        Commands::BlockIds { pattern } => {
            let ids = bulk.block_ids(pattern.as_deref())?;
            for id in &ids {
                println!("{id}");
            }
            log!("esi"; "{} fragments", ids.len());
            RunReport::default()
        }
        Commands::Info { path } => {
            println!("{}", bulk.generation_info(path)?);
            RunReport::default()
        }
    };
    Ok(report)
}
