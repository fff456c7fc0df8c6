//! `[esi]` section configuration.

use super::{defaults, list};
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[esi]` section - fragment extraction settings.
///
/// # Example
/// ```toml
/// [esi]
/// blocks_no_esi = ["system_main_block", "views_block__*"]
/// frequent_blocks = ["views_block__content_recent_block_1"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct EsiConfig {
    /// Fragment directory, relative to the output root.
    #[serde(default = "defaults::esi::directory")]
    #[educe(Default = defaults::esi::directory())]
    pub directory: String,

    /// Class token identifying fragment elements.
    #[serde(default = "defaults::esi::marker_class")]
    #[educe(Default = defaults::esi::marker_class())]
    pub marker_class: String,

    /// Id namespace prefix stripped from fragment element ids.
    #[serde(default = "defaults::esi::id_prefix")]
    #[educe(Default = defaults::esi::id_prefix())]
    pub id_prefix: String,

    /// Fragment ids kept inline (literal, or prefix with a trailing `*`).
    #[serde(default, deserialize_with = "list::string_list")]
    pub blocks_no_esi: Vec<String>,

    /// Fragments refreshed by `generate-blocks --frequent`.
    #[serde(default, deserialize_with = "list::string_list")]
    pub frequent_blocks: Vec<String>,
}

impl EsiConfig {
    /// Public URL of a fragment.
    pub fn url_for(&self, fragment_id: &str) -> String {
        format!("/{}/{}", self.directory.trim_matches('/'), fragment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for() {
        let config = EsiConfig::default();
        assert_eq!(config.url_for("alpha"), "/esi/block/alpha");

        let config = EsiConfig {
            directory: "/fragments/".into(),
            ..EsiConfig::default()
        };
        assert_eq!(config.url_for("alpha"), "/fragments/alpha");
    }
}
