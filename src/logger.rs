//! Terminal output: prefixed log lines and the per-bundle progress bar.
//!
//! ```text
//! [nodes] article: 1200 of 1200 published
//! [article] [██████████░░░░░░░░░░] 600/1200     <- redrawn in place
//! ```
//!
//! `log!` always prints, `vlog!` only with `--verbose`. A log line printed
//! while a bar is on screen takes over the bar's line; the bar is redrawn
//! below it on the next increment.

use colored::{ColoredString, Colorize};
use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType, size},
};
use parking_lot::Mutex;
use std::{
    io::{IsTerminal, Write, stdout},
    sync::{
        OnceLock,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

static TERMINAL_WIDTH: OnceLock<usize> = OnceLock::new();

/// Whether a progress bar currently owns the last terminal line.
static BAR_ACTIVE: AtomicBool = AtomicBool::new(false);

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Bar width bounds, in cells.
const BAR_WIDTH: (usize, usize) = (10, 40);

/// Enable or disable `vlog!` output.
pub fn set_verbose(enabled: bool) {
    VERBOSE.store(enabled, Ordering::Relaxed);
}

#[inline]
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

fn terminal_width() -> usize {
    *TERMINAL_WIDTH.get_or_init(|| size().map_or(120, |(w, _)| w as usize))
}

// ============================================================================
// Macros
// ============================================================================

/// Log a message with a colored module prefix.
///
/// ```ignore
/// log!("nodes"; "{bundle}: {count} published");
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Like `log!`, but only with verbose output. Arguments are not formatted
/// otherwise.
#[macro_export]
macro_rules! vlog {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// Print one log line, cut to the terminal width unless it spans lines.
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module);
    let max = terminal_width().saturating_sub(module.len() + 3);
    let message = if message.contains('\n') {
        message
    } else {
        truncate(message, max)
    };

    let mut stdout = stdout().lock();
    if BAR_ACTIVE.load(Ordering::SeqCst) {
        execute!(stdout, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
    }
    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

fn colorize_prefix(module: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module.to_ascii_lowercase().as_str() {
        "delete" | "sweep" => prefix.bright_magenta().bold(),
        "sync" | "files" => prefix.bright_blue().bold(),
        "skip" | "abort" | "cancel" => prefix.bright_black().bold(),
        "done" => prefix.bright_green().bold(),
        "error" => prefix.bright_red().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}

/// Longest prefix of `s` within `max` bytes, on a char boundary.
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let end = (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0);
    &s[..end]
}

// ============================================================================
// Progress Bar
// ============================================================================

/// Progress of one bundle, drawn on the last terminal line.
///
/// Incremented from the render pool; drawing is serialized. The line is
/// cleared on drop.
pub struct ProgressBar {
    label: ColoredString,
    label_len: usize,
    total: usize,
    current: AtomicUsize,
    draw: Mutex<()>,
}

impl ProgressBar {
    /// Bar for `total` items of `label`.
    ///
    /// `None` when stdout is not a terminal or there is at most one item.
    pub fn new(label: &str, total: usize) -> Option<Self> {
        Self::for_output(label, total, stdout().is_terminal())
    }

    fn for_output(label: &str, total: usize, terminal: bool) -> Option<Self> {
        if !terminal || total <= 1 {
            return None;
        }
        BAR_ACTIVE.store(true, Ordering::SeqCst);
        Some(Self {
            label: colorize_prefix(label),
            label_len: label.len() + 2,
            total,
            current: AtomicUsize::new(0),
            draw: Mutex::new(()),
        })
    }

    /// Count one finished item and redraw. Never passes `total`.
    pub fn inc(&self) {
        let current = self.advance();
        let line = format!("{} {}", self.label, self.render(current, terminal_width()));

        let _guard = self.draw.lock();
        let mut stdout = stdout().lock();
        execute!(stdout, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
        write!(stdout, "{line}").ok();
        stdout.flush().ok();
    }

    fn advance(&self) -> usize {
        self.current
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| (n < self.total).then_some(n + 1))
            .map_or(self.total, |previous| previous + 1)
    }

    /// `[████░░░░] 3/8`, sized to fit `width` after the label.
    fn render(&self, current: usize, width: usize) -> String {
        let count = format!("{current}/{}", self.total);
        let room = width.saturating_sub(self.label_len + count.len() + 4);
        let cells = room.clamp(BAR_WIDTH.0, BAR_WIDTH.1);
        let filled = current * cells / self.total.max(1);
        format!("[{}{}] {count}", "█".repeat(filled), "░".repeat(cells - filled))
    }
}

impl Drop for ProgressBar {
    fn drop(&mut self) {
        BAR_ACTIVE.store(false, Ordering::SeqCst);
        let mut stdout = stdout().lock();
        execute!(stdout, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
        stdout.flush().ok();
    }
}
