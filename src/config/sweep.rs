//! `[sweep]` section configuration.

use super::{defaults, list};
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[sweep]` section - entries of the output root that delete operations
/// leave alone.
///
/// # Example
/// ```toml
/// [sweep]
/// drupal = ["core", "modules", "themes", "libraries", "sites"]
/// non_drupal = ["robots.txt", ".well-known"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    /// Mirrored platform code. Preserved by page and full wipes, removed
    /// only by `delete --code`.
    #[serde(
        default = "defaults::sweep::drupal",
        deserialize_with = "list::string_list"
    )]
    #[educe(Default = defaults::sweep::drupal())]
    pub drupal: Vec<String>,

    /// Entries no sweep ever touches.
    #[serde(default, deserialize_with = "list::string_list")]
    pub non_drupal: Vec<String>,
}
