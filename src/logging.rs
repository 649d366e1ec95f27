// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Logging and progress reporting.
//!
//! Standard output only ever carries the final test directive, so every log
//! line and progress spinner is written to standard error. JSON output turns
//! logging off entirely, such that tools reading the JSON document never have
//! to filter anything out.

use indicatif::{ProgressBar, ProgressStyle};
use std::{io::stderr, time::Duration};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log filter applied when verbose output is requested.
pub const VERBOSE_FILTER: &str = concat!("info,", env!("CARGO_CRATE_NAME"), "=debug");

/// Log filter applied by default.
pub const DEFAULT_FILTER: &str = "info";

/// Logging settings of a run.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    /// Final directive is printed as JSON.
    pub json_output: bool,

    /// Show debug logs, e.g., every dependency match.
    pub verbose: bool,
}

impl LogSettings {
    /// Determine log filter.
    ///
    /// `RUST_LOG` takes precedence over the verbosity flag, but never over
    /// JSON output.
    pub fn filter(&self) -> EnvFilter {
        if self.json_output {
            return EnvFilter::new("off");
        }

        let fallback = if self.verbose {
            VERBOSE_FILTER
        } else {
            DEFAULT_FILTER
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
    }

    /// Install global subscriber.
    ///
    /// # Errors
    ///
    /// - Return [`LoggingError::Init`] if a global subscriber is already set.
    pub fn init(&self) -> Result<()> {
        let layer = fmt::layer()
            .compact()
            .with_target(false)
            .without_time()
            .with_writer(stderr);
        tracing_subscriber::registry()
            .with(layer)
            .with(self.filter())
            .try_init()?;

        Ok(())
    }

    /// Progress spinners are drawn.
    pub fn show_progress(&self) -> bool {
        !self.json_output
    }

    /// Construct ticking spinner for a long-running step.
    ///
    /// Spinner is hidden if progress is not shown.
    ///
    /// # Errors
    ///
    /// - Return [`LoggingError::ProgressStyle`] if spinner template is invalid.
    pub fn spinner(&self, message: impl Into<String>) -> Result<ProgressBar> {
        if !self.show_progress() {
            return Ok(ProgressBar::hidden());
        }

        let style = ProgressStyle::with_template("{elapsed_precise:.green}  {spinner:.yellow} {msg}")?
            .tick_chars("-\\|/ ");
        let bar = ProgressBar::new_spinner();
        bar.set_style(style);
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(100));

        Ok(bar)
    }
}

/// Logging error types.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Global subscriber cannot be installed.
    #[error(transparent)]
    Init(#[from] tracing_subscriber::util::TryInitError),

    /// Style template cannot be set for progress spinner.
    #[error(transparent)]
    ProgressStyle(#[from] indicatif::style::TemplateError),
}

/// Friendly result alias :3
pub type Result<T, E = LoggingError> = std::result::Result<T, E>;
