//! In-memory host for tests.

use super::{AccountSwitcher, AliasResolver, ContentSource, HostError, Redirect, Renderer};
use parking_lot::Mutex;
use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicUsize, Ordering},
};

#[derive(Default)]
pub struct MemoryHost {
    pages: HashMap<String, String>,
    blocks: HashMap<String, String>,
    aliases: HashMap<String, String>,
    failures: HashSet<String>,
    failing_windows: HashSet<(String, u64)>,
    bundles: HashMap<String, Vec<String>>,
    media: Vec<String>,
    redirects: Vec<Redirect>,
    /// Render unknown paths as a small generated page instead of failing.
    default_pages: bool,

    identities: Mutex<Vec<&'static str>>,
    renders: Mutex<Vec<(String, &'static str)>>,
    windows: Mutex<Vec<(String, u64, u64)>>,
    alias_calls: AtomicUsize,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            identities: Mutex::new(vec!["admin"]),
            ..Self::default()
        }
    }

    pub fn with_page(mut self, path: &str, html: &str) -> Self {
        self.pages.insert(path.to_owned(), html.to_owned());
        self
    }

    pub fn with_block(mut self, block_id: &str, html: &str) -> Self {
        self.blocks.insert(block_id.to_owned(), html.to_owned());
        self
    }

    pub fn with_alias(mut self, path: &str, alias: &str) -> Self {
        self.aliases.insert(path.to_owned(), alias.to_owned());
        self
    }

    pub fn with_failure(mut self, path: &str) -> Self {
        self.failures.insert(path.to_owned());
        self
    }

    /// Fail the id query of `bundle` starting at `offset`.
    pub fn with_failing_window(mut self, bundle: &str, offset: u64) -> Self {
        self.failing_windows.insert((bundle.to_owned(), offset));
        self
    }

    /// Publish ids `1..=count` in `bundle`.
    pub fn with_nodes(mut self, bundle: &str, count: u64) -> Self {
        let ids = (1..=count).map(|id| id.to_string()).collect();
        self.bundles.insert(bundle.to_owned(), ids);
        self
    }

    pub fn with_media(mut self, uri: &str) -> Self {
        self.media.push(uri.to_owned());
        self
    }

    pub fn with_redirect(mut self, source: &str, target: &str) -> Self {
        self.redirects.push(Redirect {
            source: source.to_owned(),
            target: target.to_owned(),
        });
        self
    }

    pub fn with_default_pages(mut self) -> Self {
        self.default_pages = true;
        self
    }

    /// Identity currently active.
    pub fn identity(&self) -> &'static str {
        self.identities.lock().last().copied().unwrap_or("none")
    }

    /// Identity active during each render, in call order.
    pub fn render_identities(&self) -> Vec<&'static str> {
        self.renders.lock().iter().map(|(_, who)| *who).collect()
    }

    /// Rendered paths, in call order.
    pub fn rendered(&self) -> Vec<String> {
        self.renders.lock().iter().map(|(path, _)| path.clone()).collect()
    }

    /// `(bundle, offset, limit)` of every id query.
    pub fn windows(&self) -> Vec<(String, u64, u64)> {
        self.windows.lock().clone()
    }

    pub fn alias_calls(&self) -> usize {
        self.alias_calls.load(Ordering::SeqCst)
    }

    fn record(&self, path: &str) {
        let who = self.identity();
        self.renders.lock().push((path.to_owned(), who));
    }
}

impl Renderer for MemoryHost {
    fn render(&self, path: &str) -> Result<String, HostError> {
        self.record(path);
        if self.failures.contains(path) {
            return Err(HostError::Command(format!("render of `{path}` failed")));
        }
        match self.pages.get(path) {
            Some(html) => Ok(html.clone()),
            None if self.default_pages => Ok(format!(
                "<html><body><main><p>{path}</p></main></body></html>"
            )),
            None => Err(HostError::Message(format!("no page at `{path}`"))),
        }
    }

    fn render_block(&self, block_id: &str) -> Result<String, HostError> {
        self.record(block_id);
        self.blocks
            .get(block_id)
            .cloned()
            .ok_or_else(|| HostError::Message(format!("no block `{block_id}`")))
    }
}

impl AliasResolver for MemoryHost {
    fn alias(&self, path: &str) -> Result<String, HostError> {
        self.alias_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.aliases.get(path).cloned().unwrap_or_else(|| path.to_owned()))
    }
}

impl ContentSource for MemoryHost {
    fn published_count(&self, bundle: &str) -> Result<u64, HostError> {
        Ok(self.bundles.get(bundle).map_or(0, |ids| ids.len() as u64))
    }

    fn published_ids(
        &self,
        bundle: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<String>, HostError> {
        self.windows.lock().push((bundle.to_owned(), offset, limit));
        if self.failing_windows.contains(&(bundle.to_owned(), offset)) {
            return Err(HostError::Command(format!("ids of `{bundle}` at {offset} failed")));
        }
        let ids = self.bundles.get(bundle).map(Vec::as_slice).unwrap_or_default();
        Ok(ids
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    fn unpublished_media_uris(&self) -> Result<Vec<String>, HostError> {
        Ok(self.media.clone())
    }

    fn redirects(&self) -> Result<Vec<Redirect>, HostError> {
        Ok(self.redirects.clone())
    }
}

impl AccountSwitcher for MemoryHost {
    fn switch_to_anonymous(&self) -> Result<(), HostError> {
        self.identities.lock().push("anonymous");
        Ok(())
    }

    fn switch_back(&self) {
        let mut identities = self.identities.lock();
        if identities.len() > 1 {
            identities.pop();
        }
    }
}
