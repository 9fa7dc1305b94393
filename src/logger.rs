//! Terminal logging with colored module prefixes.
//!
//! - `log!` / `debug!` macros print `[module] message` lines
//! - `WatchStatus` keeps a single overwritable status block for the preview
//!   loop, so repeated rebuilds don't scroll the terminal
//!
//! ```ignore
//! log!("serve"; "listening on http://{}", addr);
//! debug!("sync"; "published v{}", version);
//! logger::status_success("rebuilt notes.md");
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::{AnsiColors, OwoColorize};
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::LazyLock,
    sync::atomic::{AtomicBool, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macros
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// Print `[module] message`.
///
/// Shares the status lock so log lines never interleave with a status
/// block being redrawn.
pub fn log(module: &str, message: &str) {
    let tag = colorize_prefix(module);

    let mut status = WATCH_STATUS.lock();
    let mut out = stdout().lock();
    execute!(out, Clear(ClearType::UntilNewLine)).ok();
    writeln!(out, "{tag} {message}").ok();
    out.flush().ok();

    // Redraws must not climb over this line
    status.last_lines = 0;
}

fn colorize_prefix(module: &str) -> String {
    let color = match module {
        "serve" | "poll" => AnsiColors::BrightBlue,
        "watch" | "sync" => AnsiColors::BrightGreen,
        "render" => AnsiColors::BrightCyan,
        "error" => AnsiColors::BrightRed,
        _ => AnsiColors::BrightYellow,
    };
    format!("[{module}]").color(color).bold().to_string()
}

// ============================================================================
// rebuild status
// ============================================================================

/// Current UTC time as HH:MM:SS.
fn now() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    clock_time(secs)
}

fn clock_time(unix_secs: u64) -> String {
    let hours = (unix_secs / 3600) % 24;
    let minutes = (unix_secs / 60) % 60;
    let seconds = unix_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Lines a message occupies on the terminal.
fn line_count(message: &str) -> usize {
    message.matches('\n').count() + 1
}

/// Rebuild status block that redraws in place.
///
/// Counts consecutive failures so a run of broken saves reads as one
/// streak, and says so when the next build recovers.
///
/// ```ignore
/// let mut status = WatchStatus::new();
/// status.success("rebuilt notes.md (v3)");
/// status.error("read failed: notes.md", "No such file or directory");
/// ```
pub struct WatchStatus {
    /// Height of the block currently on screen
    last_lines: usize,
    /// Failed rebuilds since the last success
    failures: u32,
}

static WATCH_STATUS: LazyLock<Mutex<WatchStatus>> =
    LazyLock::new(|| Mutex::new(WatchStatus::new()));

impl WatchStatus {
    pub const fn new() -> Self {
        Self {
            last_lines: 0,
            failures: 0,
        }
    }

    pub fn success(&mut self, message: &str) {
        let message = match std::mem::take(&mut self.failures) {
            0 => message.to_string(),
            n => format!("{message} (recovered after {n} failed build(s))"),
        };
        self.redraw(&"✓".green().to_string(), &message);
    }

    /// `summary` on the status line, `detail` below it.
    pub fn error(&mut self, summary: &str, detail: &str) {
        self.failures = self.failures.saturating_add(1);
        let mut block = summary.to_string();
        if self.failures > 1 {
            block.push_str(&format!(" ({} in a row)", self.failures));
        }
        if !detail.is_empty() {
            block.push('\n');
            block.push_str(detail);
        }
        self.redraw(&"✗".red().to_string(), &block);
    }

    fn redraw(&mut self, symbol: &str, block: &str) {
        let mut out = stdout().lock();
        if self.last_lines > 0 {
            let height = u16::try_from(self.last_lines).unwrap_or(u16::MAX);
            execute!(out, cursor::MoveUp(height), Clear(ClearType::FromCursorDown)).ok();
        }
        let stamp = format!("[{}]", now()).dimmed().to_string();
        writeln!(out, "{stamp} {symbol} {block}").ok();
        out.flush().ok();
        self.last_lines = line_count(block);
    }
}

pub fn status_success(message: &str) {
    WATCH_STATUS.lock().success(message);
}

pub fn status_error(summary: &str, detail: &str) {
    WATCH_STATUS.lock().error(summary, detail);
}
