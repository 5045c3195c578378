//! Output channel for status banners and failure reports

use std::error::Error as _;
use std::sync::Mutex;

use console::style;
use tracing::{debug, info};

use crate::error::LiftoffError;

/// Sink for user-facing banners and error reports
pub trait Output: Send + Sync {
    /// Announce a status message
    fn banner(&self, message: &str);

    /// Report a failure
    fn error(&self, err: &LiftoffError);
}

/// Console output: banners to stdout, errors to stderr
#[derive(Debug, Default)]
pub struct ConsoleOutput {
    quiet: bool,
}

impl ConsoleOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress banners; errors are always printed
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}

impl Output for ConsoleOutput {
    fn banner(&self, message: &str) {
        info!(message, "banner");
        if !self.quiet {
            println!("{} {}", style("→").blue(), style(message).bold());
        }
    }

    fn error(&self, err: &LiftoffError) {
        // already printed below; keep it off the default console filter
        debug!(error = %err, "operation failed");
        eprintln!("{} {}", style("✗").red().bold(), err);

        let mut source = err.source();
        while let Some(cause) = source {
            eprintln!("  {} {}", style("caused by:").dim(), cause);
            source = cause.source();
        }
    }
}

/// Event recorded by [`CollectingOutput`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    Banner(String),
    Error(String),
}

/// Output that collects events for later inspection (useful for testing)
#[derive(Debug, Default)]
pub struct CollectingOutput {
    events: Mutex<Vec<OutputEvent>>,
}

impl CollectingOutput {
    /// Get all collected events
    pub fn events(&self) -> Vec<OutputEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Collected error messages only
    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                OutputEvent::Error(msg) => Some(msg),
                OutputEvent::Banner(_) => None,
            })
            .collect()
    }
}

impl Output for CollectingOutput {
    fn banner(&self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(OutputEvent::Banner(message.to_string()));
    }

    fn error(&self, err: &LiftoffError) {
        self.events
            .lock()
            .unwrap()
            .push(OutputEvent::Error(err.to_string()));
    }
}
