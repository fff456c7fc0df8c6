//! Single page generation.
//!
//! ```text
//! path ─▶ alias ─▶ excluded? ─▶ render (anonymous) ─▶ fragments ─▶ minify ─▶ file
//!                     │                                                 │
//!                     └─ Excluded               index.html disabled ────┴─ FrontPageSuppressed
//! ```

use crate::config::SiteConfig;
use crate::error::{GenerateError, Result};
use crate::esi::{FragmentExtractor, FragmentStore, PutOutcome, id::is_safe};
use crate::host::{Host, HostError, render_anonymous, render_block_anonymous};
use crate::paths::{INDEX_FILE, PathResolver};
use crate::utils::{fs::write_atomic, minify::minify};
use crate::{log, vlog};
use std::{fs, io, path::PathBuf};

#[derive(Debug, Clone, Copy, Default)]
pub struct PageOptions {
    /// Refresh fragments but do not write the page.
    pub fragments_only: bool,
    /// Replace existing fragment files.
    pub overwrite_fragments: bool,
    /// Log the written file even when not verbose.
    pub log: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus {
    Written(PathBuf),
    FragmentsOnly,
    Excluded,
    FrontPageSuppressed,
}

impl PageStatus {
    /// Whether the page was rendered (written or fragments refreshed).
    pub const fn is_generated(&self) -> bool {
        matches!(self, Self::Written(_) | Self::FragmentsOnly)
    }
}

pub struct PageGenerator<'a> {
    config: &'a SiteConfig,
    host: &'a dyn Host,
    resolver: PathResolver<'a>,
    store: FragmentStore,
    extractor: FragmentExtractor,
}

impl<'a> PageGenerator<'a> {
    pub fn new(config: &'a SiteConfig, host: &'a dyn Host) -> Self {
        Self {
            config,
            host,
            resolver: PathResolver::new(config, host),
            store: FragmentStore::new(config),
            extractor: FragmentExtractor::new(config),
        }
    }

    pub fn config(&self) -> &'a SiteConfig {
        self.config
    }

    pub fn host(&self) -> &'a dyn Host {
        self.host
    }

    pub fn resolver(&self) -> &PathResolver<'a> {
        &self.resolver
    }

    pub fn store(&self) -> &FragmentStore {
        &self.store
    }

    pub fn resolve_alias(&self, path: &str) -> Result<String> {
        self.resolver
            .resolve_alias(path)
            .map_err(|source| GenerateError::Host {
                what: "alias",
                source,
            })
    }

    /// Generate one page. Render errors propagate to the caller.
    pub fn generate_page(&self, path: &str, options: PageOptions) -> Result<PageStatus> {
        let alias = self.resolve_alias(path)?;
        if self.resolver.is_excluded(path) || self.resolver.is_excluded(&alias) {
            vlog!("skip"; "{path} (excluded)");
            return Ok(PageStatus::Excluded);
        }

        let html = render_anonymous(self.host, path).map_err(|source| GenerateError::Render {
            path: path.to_owned(),
            source,
        })?;
        let markup = self
            .extractor
            .inject(&html, path, &self.store, options.overwrite_fragments)?;

        if self.resolver.filename_for(&alias) == INDEX_FILE && !self.config.generator.generate_index {
            vlog!("skip"; "{path} (index.html disabled)");
            return Ok(PageStatus::FrontPageSuppressed);
        }
        if options.fragments_only {
            return Ok(PageStatus::FragmentsOnly);
        }

        let file = self.resolver.output_path(&alias);
        let markup = minify(markup.as_bytes(), self.config.generator.minify);
        write_atomic(&file, &markup).map_err(|err| GenerateError::io(&file, err))?;

        if options.log {
            log!("page"; "{path} -> {}", file.display());
        } else {
            vlog!("page"; "{path} -> {}", file.display());
        }
        Ok(PageStatus::Written(file))
    }

    /// Output file of `path`.
    pub fn page_file(&self, path: &str) -> Result<PathBuf> {
        let alias = self.resolve_alias(path)?;
        Ok(self.resolver.output_path(&alias))
    }

    /// Remove the generated file of `path`. Returns whether a file was removed.
    pub fn delete_page(&self, path: &str) -> Result<bool> {
        let file = self.page_file(path)?;
        match fs::remove_file(&file) {
            Ok(()) => {
                log!("delete"; "{}", file.display());
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(GenerateError::io(&file, err)),
        }
    }

    /// Render a single fragment directly and store it.
    pub fn generate_fragment(&self, fragment_id: &str, overwrite: bool) -> Result<PutOutcome> {
        if !is_safe(fragment_id) {
            return Err(GenerateError::Render {
                path: fragment_id.to_owned(),
                source: HostError::Message("invalid fragment id".into()),
            });
        }
        let markup = render_block_anonymous(self.host, fragment_id).map_err(|source| {
            GenerateError::Render {
                path: fragment_id.to_owned(),
                source,
            }
        })?;
        let outcome = self.store.put(fragment_id, &markup, overwrite)?;
        vlog!("esi"; "{fragment_id}");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;
    use tempfile::TempDir;

    const PAGE: &str = r#"<html><body><div class="block" id="block-alpha"><p>A</p></div><main>body</main></body></html>"#;

    fn config(dir: &TempDir) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.generator.directory = dir.path().to_path_buf();
        config
    }

    #[test]
    fn test_generate_page_writes_alias_file() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let host = MemoryHost::new()
            .with_page("/node/42", PAGE)
            .with_alias("/node/42", "/blog/hello");
        let pages = PageGenerator::new(&config, &host);

        let status = pages.generate_page("/node/42", PageOptions::default()).unwrap();
        let file = dir.path().join("blog/hello.html");
        assert_eq!(status, PageStatus::Written(file.clone()));

        let html = fs::read_to_string(&file).unwrap();
        assert!(html.contains(r#"<!--#include virtual="/esi/block/alpha" -->"#));
        assert!(html.contains("<main>body</main>"));
        assert!(dir.path().join("esi/block/alpha").is_file());
    }

    #[test]
    fn test_generate_page_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let host = MemoryHost::new().with_page("/about", PAGE);
        let pages = PageGenerator::new(&config, &host);

        pages.generate_page("/about", PageOptions::default()).unwrap();
        let first = fs::read(dir.path().join("about.html")).unwrap();
        pages.generate_page("/about", PageOptions::default()).unwrap();
        let second = fs::read(dir.path().join("about.html")).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_excluded_by_path_or_alias() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.generator.paths_do_not_generate = vec!["/admin/*".into(), "/secret".into()];
        let host = MemoryHost::new()
            .with_default_pages()
            .with_alias("/node/5", "/secret");
        let pages = PageGenerator::new(&config, &host);

        assert_eq!(
            pages.generate_page("/admin/config", PageOptions::default()).unwrap(),
            PageStatus::Excluded
        );
        assert_eq!(
            pages.generate_page("/node/5", PageOptions::default()).unwrap(),
            PageStatus::Excluded
        );
        assert!(host.rendered().is_empty());
    }

    #[test]
    fn test_front_page_suppressed() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.generator.generate_index = false;
        let host = MemoryHost::new().with_page("/front", PAGE);
        let pages = PageGenerator::new(&config, &host);

        let status = pages.generate_page("/front", PageOptions::default()).unwrap();
        assert_eq!(status, PageStatus::FrontPageSuppressed);
        assert!(!dir.path().join("index.html").exists());
    }

    #[test]
    fn test_front_page_written_as_index() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let host = MemoryHost::new().with_page("/front", PAGE);
        let pages = PageGenerator::new(&config, &host);

        pages.generate_page("/front", PageOptions::default()).unwrap();
        assert!(dir.path().join("index.html").is_file());
    }

    #[test]
    fn test_fragments_only() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let host = MemoryHost::new().with_page("/about", PAGE);
        let pages = PageGenerator::new(&config, &host);

        let options = PageOptions {
            fragments_only: true,
            ..PageOptions::default()
        };
        assert_eq!(pages.generate_page("/about", options).unwrap(), PageStatus::FragmentsOnly);
        assert!(!dir.path().join("about.html").exists());
        assert!(pages.store().has("alpha"));
    }

    #[test]
    fn test_overwrite_fragments() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let host = MemoryHost::new().with_page("/about", PAGE);
        let pages = PageGenerator::new(&config, &host);
        pages.store().put("alpha", "stale", false).unwrap();

        pages.generate_page("/about", PageOptions::default()).unwrap();
        assert_eq!(pages.store().get("alpha").unwrap().as_deref(), Some("stale"));

        let options = PageOptions {
            overwrite_fragments: true,
            ..PageOptions::default()
        };
        pages.generate_page("/about", options).unwrap();
        assert_eq!(
            pages.store().get("alpha").unwrap().as_deref(),
            Some(r#"<div class="block" id="block-alpha"><p>A</p></div>"#)
        );
    }

    #[test]
    fn test_render_error_propagates() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let host = MemoryHost::new().with_failure("/broken");
        let pages = PageGenerator::new(&config, &host);

        let err = pages.generate_page("/broken", PageOptions::default()).unwrap_err();
        assert!(matches!(err, GenerateError::Render { ref path, .. } if path == "/broken"));
        assert_eq!(host.identity(), "admin");
    }

    #[test]
    fn test_minified_page_keeps_directive() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.generator.minify = true;
        let host = MemoryHost::new().with_page("/about", PAGE);
        let pages = PageGenerator::new(&config, &host);

        pages.generate_page("/about", PageOptions::default()).unwrap();
        let html = fs::read_to_string(dir.path().join("about.html")).unwrap();
        assert!(html.contains("<!--#include virtual=\"/esi/block/alpha\" -->"));
    }

    #[test]
    fn test_delete_page() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let host = MemoryHost::new()
            .with_page("/node/1", PAGE)
            .with_alias("/node/1", "/docs/intro");
        let pages = PageGenerator::new(&config, &host);

        pages.generate_page("/node/1", PageOptions::default()).unwrap();
        assert!(pages.delete_page("/node/1").unwrap());
        assert!(!dir.path().join("docs/intro.html").exists());
        assert!(!pages.delete_page("/node/1").unwrap());
    }

    #[test]
    fn test_generate_fragment() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let host = MemoryHost::new().with_block("recent", "<ul><li>new</li></ul>");
        let pages = PageGenerator::new(&config, &host);

        assert_eq!(pages.generate_fragment("recent", true).unwrap(), PutOutcome::Written);
        assert_eq!(
            pages.store().get("recent").unwrap().as_deref(),
            Some("<ul><li>new</li></ul>")
        );
        assert_eq!(host.render_identities(), vec!["anonymous"]);
        assert!(pages.generate_fragment("../x", true).is_err());
    }
}
