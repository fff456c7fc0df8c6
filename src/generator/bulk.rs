//! Bulk generation and deletion across the whole site.
//!
//! # Full run
//!
//! ```text
//! generate_all()
//!     │
//!     ├── delete_all()          sweep everything but preserved entries
//!     │
//!     ├── generate_pages()
//!     │       ├── delete_pages() + delete_blocks()
//!     │       ├── generate_nodes()      per bundle, per window, rayon pool
//!     │       ├── generate_paths()      front page + [generator].paths_generate
//!     │       └── generate_redirects()  when enabled
//!     │
//!     └── generate_files()      sync phase, failure sets `sync_failed`
//! ```
//!
//! Every delete finishes before the first render starts. Per-item render and
//! IO failures are logged and counted in the [`RunReport`]; they never abort
//! the run. Cancellation is checked between items.

use super::{
    files::sync_files,
    info,
    page::{PageGenerator, PageOptions},
    redirect::write_redirect,
    sweep::{SweepScope, ensure_safe_root, sweep},
};
use crate::config::SiteConfig;
use crate::error::{GenerateError, Result, describe};
use crate::esi::PutOutcome;
use crate::host::{Host, HostError};
use crate::logger::ProgressBar;
use crate::{log, vlog};
use rayon::prelude::*;
use regex::Regex;
use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

// ============================================================================
// Cancellation
// ============================================================================

/// Shared flag set by the Ctrl-C handler.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(GenerateError::Cancelled)
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub elapsed: Duration,
    pub generated: u64,
    /// Excluded paths and suppressed front pages.
    pub skipped: u64,
    pub failed: u64,
    pub sync_failed: bool,
}

impl RunReport {
    fn timed(start: Instant) -> Self {
        Self {
            elapsed: start.elapsed(),
            ..Self::default()
        }
    }

    /// Add the counters of `other`. Elapsed time is not summed; callers time
    /// the enclosing operation themselves.
    pub fn merge(&mut self, other: Self) {
        self.generated += other.generated;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.sync_failed |= other.sync_failed;
    }

    pub fn secs(&self) -> u64 {
        self.elapsed.as_secs()
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && !self.sync_failed
    }
}

/// Node selection for [`BulkOrchestrator::generate_nodes`].
#[derive(Debug, Clone, Default)]
pub struct NodeQuery {
    /// Single bundle, or every configured bundle when `None`.
    pub bundle: Option<String>,
    pub start: u64,
    /// Number of items from `start`; the rest of the bundle when `None`.
    pub length: Option<u64>,
    pub fragments_only: bool,
    pub overwrite_fragments: bool,
}

/// `(offset, limit)` windows covering `[start, start + length)` of `total`
/// items in steps of `batch`.
pub fn window_ranges(total: u64, start: u64, length: Option<u64>, batch: u64) -> Vec<(u64, u64)> {
    let batch = batch.max(1);
    let end = length.map_or(total, |len| start.saturating_add(len).min(total));

    let mut windows = Vec::new();
    let mut offset = start;
    while offset < end {
        let limit = batch.min(end - offset);
        windows.push((offset, limit));
        offset += limit;
    }
    windows
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct BulkOrchestrator<'a> {
    config: &'a SiteConfig,
    host: &'a dyn Host,
    pages: PageGenerator<'a>,
    pool: rayon::ThreadPool,
    cancel: CancelFlag,
}

#[derive(Default)]
struct Counters {
    generated: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn report(&self, start: Instant) -> RunReport {
        RunReport {
            generated: self.generated.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            ..RunReport::timed(start)
        }
    }
}

impl<'a> BulkOrchestrator<'a> {
    pub fn new(config: &'a SiteConfig, host: &'a dyn Host, cancel: CancelFlag) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.generator.workers.max(1))
            .thread_name(|i| format!("esigen-render-{i}"))
            .build()?;
        Ok(Self {
            config,
            host,
            pages: PageGenerator::new(config, host),
            pool,
            cancel,
        })
    }

    pub fn pages(&self) -> &PageGenerator<'a> {
        &self.pages
    }

    // ------------------------------------------------------------------------
    // Full runs
    // ------------------------------------------------------------------------

    /// Wipe the output, rebuild every page, then mirror files.
    pub fn generate_all(&self) -> Result<RunReport> {
        let start = Instant::now();
        log!("generate"; "full run started");

        self.delete_all()?;
        let mut report = self.generate_pages()?;

        match self.generate_files() {
            Ok(files) => report.merge(RunReport {
                generated: 0,
                ..files
            }),
            Err(err @ (GenerateError::Sync(_) | GenerateError::Host { .. })) => {
                log!("error"; "{}", describe(&err));
                report.sync_failed = true;
            }
            Err(err) => return Err(err),
        }

        report.elapsed = start.elapsed();
        log!(
            "generate";
            "full run done in {}s: {} generated, {} skipped, {} failed",
            report.secs(), report.generated, report.skipped, report.failed
        );
        Ok(report)
    }

    /// Delete pages and fragments, then regenerate nodes, paths and
    /// (when enabled) redirects.
    pub fn generate_pages(&self) -> Result<RunReport> {
        let start = Instant::now();

        self.delete_pages()?;
        self.delete_blocks()?;

        let mut report = self.generate_nodes(&NodeQuery::default())?;
        if self.config.generator.generate_paths {
            report.merge(self.generate_paths()?);
        }
        if self.config.generator.generate_redirects {
            report.merge(self.generate_redirects()?);
        }

        report.elapsed = start.elapsed();
        log!("pages"; "done in {}s", report.secs());
        Ok(report)
    }

    /// Generate one page. Errors propagate.
    pub fn generate_page(&self, path: &str) -> Result<RunReport> {
        let start = Instant::now();
        let options = PageOptions {
            log: true,
            ..PageOptions::default()
        };
        let status = self.pages.generate_page(path, options)?;

        let mut report = RunReport::timed(start);
        if status.is_generated() {
            report.generated = 1;
        } else {
            log!("skip"; "{path}: {status:?}");
            report.skipped = 1;
        }
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Nodes and paths
    // ------------------------------------------------------------------------

    /// Generate published nodes bundle by bundle, one window at a time.
    pub fn generate_nodes(&self, query: &NodeQuery) -> Result<RunReport> {
        let start = Instant::now();
        let bundles = match &query.bundle {
            Some(bundle) => vec![bundle.clone()],
            None => self.config.generator.bundles.clone(),
        };
        let options = PageOptions {
            fragments_only: query.fragments_only,
            overwrite_fragments: query.overwrite_fragments,
            log: false,
        };

        let mut report = RunReport::default();
        for bundle in &bundles {
            self.cancel.check()?;
            match self.generate_bundle(bundle, query, options) {
                Ok(bundle_report) => report.merge(bundle_report),
                Err(err @ GenerateError::Host { .. }) => {
                    log!("error"; "{bundle}: {}", describe(&err));
                    report.failed += 1;
                }
                Err(err) => return Err(err),
            }
        }

        report.elapsed = start.elapsed();
        Ok(report)
    }

    fn generate_bundle(&self, bundle: &str, query: &NodeQuery, options: PageOptions) -> Result<RunReport> {
        let start = Instant::now();
        let total = self
            .host
            .published_count(bundle)
            .map_err(|source| GenerateError::Host { what: "count", source })?;
        let windows = window_ranges(total, query.start, query.length, self.config.generator.batch_size);
        let planned: u64 = windows.iter().map(|(_, limit)| limit).sum();
        log!("nodes"; "{bundle}: {planned} of {total} published");

        let progress = ProgressBar::new(bundle, planned as usize);
        let counters = Counters::default();
        for (offset, limit) in windows {
            self.cancel.check()?;
            let ids = match self.host.published_ids(bundle, offset, limit) {
                Ok(ids) => ids,
                Err(source) => {
                    let err = GenerateError::Host { what: "ids", source };
                    log!("error"; "{bundle}: window {offset}+{limit}: {}", describe(&err));
                    counters.failed.fetch_add(limit, Ordering::Relaxed);
                    continue;
                }
            };
            let paths: Vec<String> = ids.iter().map(|id| self.config.generator.path_for_id(id)).collect();
            vlog!("nodes"; "{bundle}: window {offset}+{limit}, {} ids", paths.len());
            self.generate_each(&paths, options, progress.as_ref(), &counters);
            self.pages.resolver().clear_aliases();
            self.cancel.check()?;
        }
        drop(progress);

        let report = counters.report(start);
        log_rate(bundle, &report);
        Ok(report)
    }

    /// Front page and `[generator].paths_generate`, in order, deduplicated.
    pub fn generate_paths(&self) -> Result<RunReport> {
        let start = Instant::now();
        let mut seen = HashSet::new();
        let paths: Vec<String> = std::iter::once(&self.config.generator.front_page)
            .chain(&self.config.generator.paths_generate)
            .filter(|path| seen.insert(path.as_str()))
            .cloned()
            .collect();

        let counters = Counters::default();
        let options = PageOptions {
            log: true,
            ..PageOptions::default()
        };
        self.generate_each(&paths, options, None, &counters);
        self.cancel.check()?;

        let report = counters.report(start);
        log_rate("paths", &report);
        Ok(report)
    }

    /// Render `paths` on the pool, counting outcomes.
    fn generate_each(
        &self,
        paths: &[String],
        options: PageOptions,
        progress: Option<&ProgressBar>,
        counters: &Counters,
    ) {
        self.pool.install(|| {
            paths.par_iter().for_each(|path| {
                if self.cancel.is_cancelled() {
                    return;
                }
                match self.pages.generate_page(path, options) {
                    Ok(status) if status.is_generated() => {
                        counters.generated.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(_) => {
                        counters.skipped.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(err) => {
                        log!("error"; "{path}: {}", describe(&err));
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
                if let Some(progress) = progress {
                    progress.inc();
                }
            });
        });
    }

    // ------------------------------------------------------------------------
    // Fragments
    // ------------------------------------------------------------------------

    /// Refresh fragments. `frequent` renders only `[esi].frequent_blocks`
    /// directly; otherwise every node is rendered for its fragments.
    pub fn generate_blocks(&self, frequent: bool) -> Result<RunReport> {
        let start = Instant::now();
        if !frequent {
            let mut report = self.generate_nodes(&NodeQuery {
                fragments_only: true,
                overwrite_fragments: true,
                ..NodeQuery::default()
            })?;
            report.elapsed = start.elapsed();
            log!("esi"; "fragments refreshed in {}s", report.secs());
            return Ok(report);
        }

        let mut report = RunReport::default();
        for block_id in &self.config.esi.frequent_blocks {
            self.cancel.check()?;
            match self.pages.generate_fragment(block_id, true) {
                Ok(_) => report.generated += 1,
                Err(err) => {
                    log!("error"; "{block_id}: {}", describe(&err));
                    report.failed += 1;
                }
            }
        }
        report.elapsed = start.elapsed();
        log!("esi"; "{} frequent fragments in {}s", report.generated, report.secs());
        Ok(report)
    }

    /// Render one fragment directly. Errors propagate.
    pub fn generate_block(&self, block_id: &str) -> Result<RunReport> {
        let start = Instant::now();
        let outcome = self.pages.generate_fragment(block_id, true)?;
        log!("esi"; "{block_id}: {outcome:?}");
        Ok(RunReport {
            generated: u64::from(outcome == PutOutcome::Written),
            ..RunReport::timed(start)
        })
    }

    pub fn block_ids(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        let pattern = pattern.map(Regex::new).transpose()?;
        self.pages.store().ids(pattern.as_ref())
    }

    // ------------------------------------------------------------------------
    // Redirects and files
    // ------------------------------------------------------------------------

    pub fn generate_redirects(&self) -> Result<RunReport> {
        let start = Instant::now();
        let redirects = match self.host.redirects() {
            Ok(redirects) => redirects,
            Err(HostError::NotConfigured(what)) => {
                log!("redirect"; "`[host.{what}]` not configured, skipped");
                return Ok(RunReport::timed(start));
            }
            Err(source) => {
                return Err(GenerateError::Host {
                    what: "redirects",
                    source,
                });
            }
        };

        let mut report = RunReport::default();
        for redirect in &redirects {
            self.cancel.check()?;
            match write_redirect(self.pages.resolver(), redirect) {
                Ok(_) => report.generated += 1,
                Err(err) => {
                    log!("error"; "{}: {}", redirect.source, describe(&err));
                    report.failed += 1;
                }
            }
        }
        report.elapsed = start.elapsed();
        log!("redirect"; "{} redirects in {}s", report.generated, report.secs());
        Ok(report)
    }

    /// Mirror files into the output root.
    pub fn generate_files(&self) -> Result<RunReport> {
        let start = Instant::now();
        let synced = sync_files(self.config, self.host)?;
        Ok(RunReport {
            generated: synced as u64,
            ..RunReport::timed(start)
        })
    }

    // ------------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------------

    /// Everything except `drupal` and `non_drupal` entries.
    pub fn delete_all(&self) -> Result<RunReport> {
        self.timed_sweep(SweepScope::Everything)
    }

    pub fn delete_pages(&self) -> Result<RunReport> {
        self.timed_sweep(SweepScope::Pages)
    }

    /// Mirrored code (`drupal` entries).
    pub fn delete_drupal(&self) -> Result<RunReport> {
        self.timed_sweep(SweepScope::Code)
    }

    pub fn delete_blocks(&self) -> Result<RunReport> {
        let start = Instant::now();
        ensure_safe_root(&self.config.generator.directory)?;
        let secs = self.pages.store().delete_all()?;
        log!("delete"; "fragments removed in {secs}s");
        Ok(RunReport::timed(start))
    }

    pub fn delete_page(&self, path: &str) -> Result<RunReport> {
        let start = Instant::now();
        if !self.pages.delete_page(path)? {
            log!("delete"; "{path}: nothing to delete");
        }
        Ok(RunReport::timed(start))
    }

    fn timed_sweep(&self, scope: SweepScope) -> Result<RunReport> {
        let start = Instant::now();
        sweep(self.config, scope)?;
        Ok(RunReport::timed(start))
    }

    pub fn generation_info(&self, path: &str) -> Result<String> {
        info::generation_info(&self.pages, path)
    }
}

fn log_rate(label: &str, report: &RunReport) {
    let secs = report.elapsed.as_secs_f64();
    let rate = if report.generated > 0 {
        secs / report.generated as f64
    } else {
        0.0
    };
    log!(
        "nodes";
        "{label}: {} generated, {} skipped, {} failed in {:.1}s ({rate:.3} s/page)",
        report.generated, report.skipped, report.failed, secs
    );
}
