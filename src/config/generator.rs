//! `[generator]` section configuration.
//!
//! Output location, which paths are generated, and how bulk runs are batched.

use super::{defaults, list};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[generator]` section in esigen.toml - page generation policy.
///
/// # Example
/// ```toml
/// [generator]
/// directory = "/var/www/sg/static"
/// paths_generate = ["/search", "/contact"]
/// paths_do_not_generate = "/admin/*,/user/*"
/// bundles = ["page", "article"]
/// batch_size = 500
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Output root. Every sweep operates on this directory.
    #[serde(default = "defaults::generator::directory")]
    #[educe(Default = defaults::generator::directory())]
    pub directory: PathBuf,

    /// Path of the front page; its alias is written as `index.html`.
    #[serde(default = "defaults::generator::front_page")]
    #[educe(Default = defaults::generator::front_page())]
    pub front_page: String,

    /// Write `index.html` for the front page.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub generate_index: bool,

    /// Template turning a content id into its logical path.
    #[serde(default = "defaults::generator::node_path")]
    #[educe(Default = defaults::generator::node_path())]
    pub node_path: String,

    /// Literal paths generated by `generate-paths`.
    #[serde(default, deserialize_with = "list::string_list")]
    pub paths_generate: Vec<String>,

    /// Paths never generated (literal, or prefix with a trailing `*`).
    #[serde(default, deserialize_with = "list::string_list")]
    pub paths_do_not_generate: Vec<String>,

    /// Content types included in bulk node generation.
    #[serde(
        default = "defaults::generator::bundles",
        deserialize_with = "list::string_list"
    )]
    #[educe(Default = defaults::generator::bundles())]
    pub bundles: Vec<String>,

    /// Number of items fetched per query window.
    #[serde(default = "defaults::generator::batch_size")]
    #[educe(Default = defaults::generator::batch_size())]
    pub batch_size: u64,

    /// Concurrent renders during bulk runs.
    #[serde(default = "defaults::generator::workers")]
    #[educe(Default = defaults::generator::workers())]
    pub workers: usize,

    /// Include `paths_generate` in `generate-pages`.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub generate_paths: bool,

    /// Include redirect pages in `generate-pages`.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub generate_redirects: bool,

    /// Element ids removed from every generated page.
    #[serde(
        default = "defaults::generator::strip_ids",
        deserialize_with = "list::string_list"
    )]
    #[educe(Default = defaults::generator::strip_ids())]
    pub strip_ids: Vec<String>,

    /// Minify page markup (include directives are kept).
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub minify: bool,

    /// Log every generated page.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub verbose: bool,
}

impl GeneratorConfig {
    /// Logical path of a content item.
    pub fn path_for_id(&self, id: &str) -> String {
        self.node_path.replace("{id}", id)
    }
}
