//! Mapping from logical content paths to files in the output root.
//!
//! ```text
//! /node/42 ──alias──▶ /blog/2024/hello ──▶ <root>/blog/2024/hello.html
//! /front   ──alias──▶ /                ──▶ <root>/index.html
//! /about   ──alias──▶ /about           ──▶ <root>/about.html
//! ```
//!
//! Directory and file name are pure functions of the alias and the output
//! root, so regenerating a path always lands on the same file.

use crate::config::SiteConfig;
use crate::host::{AliasResolver, HostError};
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

/// Alias of the front page.
pub const FRONT_ALIAS: &str = "/";

/// Index file written for the front page.
pub const INDEX_FILE: &str = "index.html";

// ============================================================================
// Patterns
// ============================================================================

/// Literal or trailing-wildcard match list.
///
/// `"/bar/*"` matches every value starting with `"/bar/"`; any other entry
/// must match exactly. An empty list matches nothing.
#[derive(Debug, Clone, Default)]
pub struct PathPatterns(Vec<String>);

impl PathPatterns {
    pub fn new(patterns: &[String]) -> Self {
        Self(patterns.to_vec())
    }

    pub fn matches(&self, value: &str) -> bool {
        if self.0.is_empty() {
            return false;
        }
        self.0.iter().any(|pattern| match pattern.strip_suffix('*') {
            Some(prefix) => value.starts_with(prefix),
            None => value == pattern,
        })
    }
}

/// Slug of a page path: leading slash removed, remaining slashes as dashes.
pub fn slug_for_path(path: &str) -> String {
    path.trim_start_matches('/').replace('/', "-")
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolves aliases and derives output locations.
pub struct PathResolver<'a> {
    aliases: &'a dyn AliasResolver,
    front_page: String,
    output_root: PathBuf,
    excluded: PathPatterns,
    /// Memoised aliases, per resolver instance.
    cache: RwLock<HashMap<String, String>>,
}

impl<'a> PathResolver<'a> {
    pub fn new(config: &SiteConfig, aliases: &'a dyn AliasResolver) -> Self {
        Self {
            aliases,
            front_page: normalize_alias(&config.generator.front_page).to_owned(),
            output_root: config.generator.directory.clone(),
            excluded: PathPatterns::new(&config.generator.paths_do_not_generate),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Canonical alias of `path`. The front page always resolves to `/`.
    pub fn resolve_alias(&self, path: &str) -> Result<String, HostError> {
        if self.is_front(path) {
            return Ok(FRONT_ALIAS.to_owned());
        }
        if let Some(alias) = self.cache.read().get(path) {
            return Ok(alias.clone());
        }

        let alias = self.aliases.alias(path)?;
        let alias = normalize_alias(&alias).to_owned();
        self.cache.write().insert(path.to_owned(), alias.clone());
        Ok(alias)
    }

    /// Forget memoised aliases. Bulk runs call this after each window.
    pub fn clear_aliases(&self) {
        self.cache.write().clear();
    }

    /// Whether `alias` names the front page.
    pub fn is_front(&self, alias: &str) -> bool {
        let alias = normalize_alias(alias);
        alias == FRONT_ALIAS || alias == self.front_page
    }

    /// Output directory of `alias`, relative to the output root.
    ///
    /// Empty for the front page and for single-segment aliases.
    pub fn directory_for(&self, alias: &str) -> String {
        if self.is_front(alias) {
            return String::new();
        }
        let alias = normalize_alias(alias);
        match alias.rfind('/') {
            Some(index) if alias.matches('/').count() > 1 => {
                alias[..index].trim_start_matches('/').to_owned()
            }
            _ => String::new(),
        }
    }

    /// Output file name of `alias`.
    pub fn filename_for(&self, alias: &str) -> String {
        if self.is_front(alias) {
            return INDEX_FILE.to_owned();
        }
        let alias = normalize_alias(alias);
        let segment = alias.rsplit('/').next().unwrap_or(alias);
        format!("{segment}.html")
    }

    /// Absolute output file of `alias`. `.` and `..` segments are dropped.
    pub fn output_path(&self, alias: &str) -> PathBuf {
        let mut path = self.output_root.clone();
        for segment in self.directory_for(alias).split('/') {
            if !matches!(segment, "" | "." | "..") {
                path.push(segment);
            }
        }
        path.push(self.filename_for(alias));
        path
    }

    /// Whether `path` is listed in `paths_do_not_generate`.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded.matches(path)
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }
}

/// Trim trailing slashes; an empty alias is the front alias.
fn normalize_alias(alias: &str) -> &str {
    let trimmed = alias.trim().trim_end_matches('/');
    if trimmed.is_empty() { FRONT_ALIAS } else { trimmed }
}

// ============================================================================
// Tests
// ============================================================================
