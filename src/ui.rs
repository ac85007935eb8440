//! User-facing output on stderr.
//!
//! Warnings always print. Notices are suppressed by `--quiet`; debug lines
//! only appear with `--debug`. Spinners are drawn only when output is
//! interactive and not quiet.

use std::io::IsTerminal;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Debug, Clone, Copy, Default)]
pub struct Ui {
    quiet: bool,
    debug: bool,
    ansi: bool,
}

impl Ui {
    pub fn new(quiet: bool, debug: bool, no_ansi: bool) -> Self {
        if no_ansi {
            colored::control::set_override(false);
        }
        Self {
            quiet,
            debug,
            ansi: !no_ansi && std::io::stderr().is_terminal(),
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        eprintln!("{} {}", "WARNING".yellow().bold(), message.as_ref());
    }

    /// Warn about an error together with its chain of causes.
    pub fn warn_error(&self, err: &(dyn std::error::Error + 'static)) {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        self.warn(message);
    }

    pub fn notice(&self, message: impl AsRef<str>) {
        if !self.quiet {
            eprintln!("  {} {}", "→".cyan(), message.as_ref());
        }
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        if self.debug {
            eprintln!("{} {}", "DEBUG".dimmed(), message.as_ref());
        }
    }

    /// A spinner with `message`, or `None` when output is quiet or plain.
    pub fn spinner(&self, message: impl Into<String>) -> Option<ProgressBar> {
        if self.quiet || !self.ansi {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.into());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }

    /// A progress bar over `len` items, or `None` when output is quiet or plain.
    pub fn progress(&self, len: usize) -> Option<ProgressBar> {
        if self.quiet || !self.ansi {
            return None;
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    }
}
