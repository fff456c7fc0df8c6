//! Project initialization.
//!
//! Writes a default `esigen.toml` with every setting spelled out.

use crate::config::SiteConfig;
use anyhow::{Context, Result, bail};
use std::{fs, path::PathBuf};

/// Output directory written into a fresh config
const DEFAULT_OUTPUT: &str = "static";

const HEADER: &str = "\
# esigen configuration
#
# Host commands are argument lists. Placeholders: {path}, {block}, {user},
# {bundle}, {offset}, {limit}. Render commands print the HTML an anonymous
# visitor gets, list commands print JSON.

";

/// Write the default configuration to `config.config_path`.
pub fn new_config(config: &SiteConfig) -> Result<()> {
    let path = &config.config_path;
    if path.exists() {
        bail!("Config file `{}` already exists.", path.display());
    }

    let content = default_config_content()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn default_config_content() -> Result<String> {
    let mut config = SiteConfig::default();
    config.generator.directory = PathBuf::from(DEFAULT_OUTPUT);
    config.host.render = ["drush", "esigen:render", "--user={user}", "{path}"].map(String::from).to_vec();
    config.host.render_block = ["drush", "esigen:render-block", "--user={user}", "{block}"].map(String::from).to_vec();
    config.host.alias = ["drush", "esigen:alias", "{path}"].map(String::from).to_vec();
    config.host.count = ["drush", "esigen:count", "{bundle}"].map(String::from).to_vec();
    config.host.ids = ["drush", "esigen:ids", "{bundle}", "{offset}", "{limit}"]
        .map(String::from)
        .to_vec();

    let body = toml::to_string_pretty(&config).context("Failed to serialize default config")?;
    Ok(format!("{HEADER}{body}"))
}
