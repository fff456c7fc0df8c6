//! Generator configuration management for `esigen.toml`.
//!
//! # Sections
//!
//! | Section       | Purpose                                            |
//! |---------------|----------------------------------------------------|
//! | `[generator]` | Output root, path lists, bundles, batching         |
//! | `[esi]`       | Fragment marker, id prefix, do-not-fragment list   |
//! | `[sweep]`     | Entries preserved by delete operations             |
//! | `[files]`     | File mirroring command and sources                 |
//! | `[host]`      | Commands used to render and query the CMS          |
//!
//! # Example
//!
//! ```toml
//! [generator]
//! directory = "static"
//! paths_do_not_generate = ["/admin/*", "/user/*"]
//! bundles = ["page", "article"]
//!
//! [esi]
//! blocks_no_esi = ["system_main_block"]
//!
//! [sweep]
//! non_drupal = ["robots.txt"]
//!
//! [host]
//! render = ["drush", "sg:render", "{path}"]
//! ```

pub mod defaults;
mod error;
mod esi;
mod files;
mod generator;
mod host;
mod list;
mod sweep;

pub use error::ConfigError;
pub use esi::EsiConfig;
pub use files::{FilesConfig, SyncSource};
pub use generator::GeneratorConfig;
pub use host::HostConfig;
pub use sweep::SweepConfig;

use crate::cli::Cli;
use anyhow::Result;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing esigen.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Absolute project root (set after loading)
    #[serde(skip)]
    #[educe(Default = PathBuf::from("./"))]
    pub root: PathBuf,

    #[serde(default)]
    pub generator: GeneratorConfig,

    #[serde(default)]
    pub esi: EsiConfig,

    #[serde(default)]
    pub sweep: SweepConfig,

    #[serde(default)]
    pub files: FilesConfig,

    #[serde(default)]
    pub host: HostConfig,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Fragment directory inside the output root.
    pub fn esi_dir(&self) -> PathBuf {
        self.generator.directory.join(self.esi.directory.trim_matches('/'))
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli.root.clone().unwrap_or_else(|| PathBuf::from("./"));
        let root = Self::normalize_path(&root);

        self.config_path = Self::normalize_path(&root.join(&cli.config));

        if let Some(output) = &cli.output {
            self.generator.directory = output.clone();
        }
        if cli.verbose {
            self.generator.verbose = true;
        }

        self.update_path_with_root(&root);
    }

    /// Normalize all configured paths to absolute paths under `root`
    pub fn update_path_with_root(&mut self, root: &Path) {
        self.root = root.to_path_buf();

        // An empty output directory stays empty so validation can reject it.
        if !self.generator.directory.as_os_str().is_empty() {
            self.generator.directory = Self::resolve(root, &self.generator.directory);
        }

        if let Some(dir) = &self.host.working_dir {
            self.host.working_dir = Some(Self::resolve(root, dir));
        }

        for source in &mut self.files.sources {
            source.from = Self::resolve(root, &source.from);
        }
    }

    /// Expand `~` and make a path absolute relative to `root`.
    fn resolve(root: &Path, path: &Path) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
        if expanded.is_relative() {
            Self::normalize_path(&root.join(expanded))
        } else {
            Self::normalize_path(&expanded)
        }
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration before any command touches the output root
    pub fn validate(&self) -> Result<(), ConfigError> {
        let directory = &self.generator.directory;

        if directory.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "[generator.directory] must be set".into(),
            ));
        }

        if directory.parent().is_none() {
            return Err(ConfigError::Validation(
                "[generator.directory] must not be the filesystem root".into(),
            ));
        }

        if Self::normalize_path(directory) == Self::normalize_path(&self.root) {
            return Err(ConfigError::Validation(
                "[generator.directory] must not be the project root".into(),
            ));
        }

        if self.generator.batch_size == 0 {
            return Err(ConfigError::Validation(
                "[generator.batch_size] must be greater than 0".into(),
            ));
        }

        if self.generator.workers == 0 {
            return Err(ConfigError::Validation(
                "[generator.workers] must be greater than 0".into(),
            ));
        }

        if self.host.render.is_empty() {
            return Err(ConfigError::Validation(
                "[host.render] must have at least one element".into(),
            ));
        }

        if self.esi.marker_class.trim().is_empty() {
            return Err(ConfigError::Validation(
                "[esi.marker_class] must not be empty".into(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
