//! Terminal output for the CLI: colored status lines, progress bars and
//! report rendering.
//!
//! Reports go to stdout; progress and status lines go to stderr so the
//! reports can be piped.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::models::{RunSummary, TermResults, Tweet};

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
}

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
    }
}

/// Print a styled status line to stderr.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => eprintln!("{} {}", icon.green().bold(), msg),
        Status::Error => eprintln!("{} {}", icon.red().bold(), msg),
        Status::Warning => eprintln!("{} {}", icon.yellow().bold(), msg),
        Status::Info => eprintln!("{} {}", icon.cyan().bold(), msg),
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    if is_terminal() {
        println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
    } else {
        println!("{}", title);
    }
}

/// Progress bar over table rows; hidden when `quiet`.
pub fn row_progress(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Spinner for a single long request; hidden when `quiet`.
pub fn spinner(msg: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Print the end-of-run journal report.
pub fn print_summary(summary: &RunSummary) {
    print_section("Journal lookup");
    println!("{}", summary);
}

/// Print UMLS results, one term per line.
pub fn print_term_results(results: &[TermResults]) {
    for result in results {
        if result.fell_back() && is_terminal() {
            println!("{}", result.to_string().yellow());
        } else {
            println!("{}", result);
        }
    }
}

/// One-line description of a tweet batch from `searched` search terms.
pub fn tweet_batch_line(tweets: &[Tweet], searched: usize) -> String {
    format!("{} tweets for {} search terms", tweets.len(), searched)
}
