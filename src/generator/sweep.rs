//! Top-level sweeps of the output root.
//!
//! | Scope        | Removes                                   | Keeps                          |
//! |--------------|-------------------------------------------|--------------------------------|
//! | `Pages`      | directories and `*.html` files            | `drupal`, `non_drupal`, `esi/` |
//! | `Everything` | every entry                               | `drupal`, `non_drupal`         |
//! | `Code`       | `drupal` entries                          | everything else                |
//!
//! Keep-list entries are compared on their first path component, so
//! `sites/default` protects `sites`.

use crate::config::SiteConfig;
use crate::error::{GenerateError, Result};
use crate::log;
use crate::utils::fs::remove_entry;
use std::{
    collections::HashSet,
    ffi::OsString,
    fs, io,
    path::{Component, Path},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepScope {
    Pages,
    Everything,
    Code,
}

/// Fail unless `root` is a usable output root for a destructive sweep.
pub fn ensure_safe_root(root: &Path) -> Result<()> {
    if root.as_os_str().is_empty() {
        return Err(GenerateError::ConfigurationMissing(
            "generator.directory is empty".into(),
        ));
    }
    if !root.is_absolute() {
        return Err(GenerateError::ConfigurationMissing(format!(
            "generator.directory `{}` is not absolute",
            root.display()
        )));
    }
    if root.parent().is_none() {
        return Err(GenerateError::ConfigurationMissing(
            "generator.directory points at the filesystem root".into(),
        ));
    }
    Ok(())
}

/// First normal component of each keep-list entry.
fn heads(entries: &[String]) -> HashSet<OsString> {
    entries
        .iter()
        .filter_map(|entry| {
            Path::new(entry.trim_matches('/'))
                .components()
                .find_map(|c| match c {
                    Component::Normal(name) => Some(name.to_os_string()),
                    _ => None,
                })
        })
        .collect()
}

/// Sweep the output root. Returns the number of removed entries.
pub fn sweep(config: &SiteConfig, scope: SweepScope) -> Result<usize> {
    let root = &config.generator.directory;
    ensure_safe_root(root)?;

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(GenerateError::io(root, err)),
    };

    let drupal = heads(&config.sweep.drupal);
    let non_drupal = heads(&config.sweep.non_drupal);
    let esi = heads(std::slice::from_ref(&config.esi.directory));

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|err| GenerateError::io(root, err))?;
        let name = entry.file_name();
        let path = entry.path();
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());

        let remove = match scope {
            SweepScope::Code => drupal.contains(&name),
            _ if drupal.contains(&name) || non_drupal.contains(&name) => false,
            SweepScope::Everything => true,
            SweepScope::Pages => {
                !esi.contains(&name)
                    && (is_dir || path.extension().is_some_and(|ext| ext == "html"))
            }
        };
        if remove {
            remove_entry(&path).map_err(|err| GenerateError::io(&path, err))?;
            removed += 1;
        }
    }

    log!("delete"; "{scope:?}: {removed} entries removed from {}", root.display());
    Ok(removed)
}
