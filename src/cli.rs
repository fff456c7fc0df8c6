//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// esigen static generator CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file name (default: esigen.toml)
    #[arg(short = 'C', long, default_value = "esigen.toml")]
    pub config: PathBuf,

    /// Log every generated page
    #[arg(short, long)]
    pub verbose: bool,

    /// Skip confirmation prompts for destructive commands
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Write a default esigen.toml into the project root
    Init,

    /// Delete everything, then regenerate pages and mirror files
    #[command(visible_alias = "sga")]
    GenerateAll,

    /// Regenerate all pages, or a single page when PATH is given
    #[command(visible_alias = "sgp")]
    GeneratePages {
        /// Logical path of a single page, e.g. `/node/42`
        path: Option<String>,
    },

    /// Generate published items of one content type
    #[command(visible_alias = "sgpt")]
    GenerateNodes {
        /// Content type (bundle)
        bundle: String,

        /// Offset of the first item
        start: Option<u64>,

        /// Maximum number of items
        length: Option<u64>,

        /// Only refresh fragments, do not write pages
        #[arg(long)]
        fragments_only: bool,
    },

    /// Generate the front page and the configured literal paths
    GeneratePaths,

    /// Regenerate fragments
    #[command(visible_alias = "sgb")]
    GenerateBlocks {
        /// Single fragment to regenerate
        block_id: Option<String>,

        /// Only regenerate the configured frequently changing fragments
        #[arg(short, long, conflicts_with = "block_id")]
        frequent: bool,
    },

    /// Write meta-refresh pages for configured redirects
    GenerateRedirects,

    /// Mirror code, assets and public files into the output root
    #[command(visible_alias = "gf")]
    GenerateFiles,

    /// Delete generated output (everything except preserved entries by default)
    #[command(visible_alias = "sgd")]
    Delete {
        /// Only delete generated pages
        #[arg(long, group = "scope")]
        pages: bool,

        /// Only delete fragments
        #[arg(long, group = "scope")]
        esi: bool,

        /// Only delete mirrored code
        #[arg(long, group = "scope")]
        code: bool,
    },

    /// Delete the generated file of a single page
    DeletePage {
        /// Logical path of the page
        path: String,
    },

    /// List stored fragment ids
    BlockIds {
        /// Regular expression filter
        pattern: Option<String>,
    },

    /// Show generation status of a page
    Info {
        /// Logical path of the page
        path: String,
    },
}

impl Cli {
    pub fn is_init(&self) -> bool {
        matches!(self.command, Commands::Init)
    }

    /// Commands that remove output and should be confirmed.
    pub fn is_destructive(&self) -> bool {
        matches!(
            self.command,
            Commands::GenerateAll
                | Commands::GeneratePages { path: None }
                | Commands::Delete { .. }
        )
    }
}
