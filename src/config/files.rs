//! `[files]` section configuration.

use super::{defaults, list};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[files]` section - mirroring of code, assets and public files into the
/// output root.
///
/// # Example
/// ```toml
/// [files]
/// command = ["rsync", "-a", "--exclude-from={exclude_from}", "{source}/", "{dest}"]
/// exclude = ["*.php", "/sites/default/settings*"]
///
/// [[files.sources]]
/// from = "/var/www/html/core"
/// to = "core"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct FilesConfig {
    /// Sync command template.
    ///
    /// Placeholders: `{source}`, `{dest}`, `{exclude_from}`.
    #[serde(default = "defaults::files::command")]
    #[educe(Default = defaults::files::command())]
    pub command: Vec<String>,

    /// Extra exclude patterns written to the exclude file.
    #[serde(default, deserialize_with = "list::string_list")]
    pub exclude: Vec<String>,

    /// Public files directory inside the output root. Unpublished media
    /// URIs (`public://...`) are excluded relative to it.
    #[serde(default = "defaults::files::public_files")]
    #[educe(Default = defaults::files::public_files())]
    pub public_files: String,

    /// Directories mirrored into the output root.
    #[serde(default)]
    pub sources: Vec<SyncSource>,
}

/// One mirrored directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncSource {
    /// Source directory on the CMS host.
    pub from: PathBuf,
    /// Destination, relative to the output root.
    #[serde(default)]
    pub to: String,
}
