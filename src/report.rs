//! Operator-facing output
//!
//! All human-readable progress and plan text goes through a `Reporter` handed
//! to each component at startup, so nothing writes to stdout behind the
//! driver's back and tests can capture exactly what the operator would see.
//! Diagnostics still go through `tracing` and stay out of the way unless
//! `RUST_LOG` asks for them.

use std::sync::{Arc, Mutex};

#[derive(Debug)]
enum Sink {
    Stdout,
    Capture(Mutex<Vec<String>>),
}

/// Line-oriented reporter for operator output.
///
/// Cheap to clone; clones share the same sink.
#[derive(Clone, Debug)]
pub struct Reporter {
    sink: Arc<Sink>,
}

impl Reporter {
    /// A reporter that prints to stdout.
    pub fn stdout() -> Self {
        Self {
            sink: Arc::new(Sink::Stdout),
        }
    }

    /// A reporter that collects lines in memory.
    #[cfg(test)]
    pub fn capture() -> Self {
        Self {
            sink: Arc::new(Sink::Capture(Mutex::new(Vec::new()))),
        }
    }

    /// Emit one line of operator output.
    pub fn line(&self, message: impl AsRef<str>) {
        match self.sink.as_ref() {
            Sink::Stdout => println!("{}", message.as_ref()),
            Sink::Capture(lines) => {
                if let Ok(mut lines) = lines.lock() {
                    lines.push(message.as_ref().to_string());
                }
            }
        }
    }

    /// Emit an empty line.
    pub fn blank(&self) {
        self.line("");
    }

    /// All lines emitted so far (capture sink only).
    #[cfg(test)]
    pub fn lines(&self) -> Vec<String> {
        match self.sink.as_ref() {
            Sink::Stdout => Vec::new(),
            Sink::Capture(lines) => lines.lock().map(|l| l.clone()).unwrap_or_default(),
        }
    }

    /// True when any emitted line contains `needle` (capture sink only).
    #[cfg(test)]
    pub fn saw(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

/// Print the irreversibility warning once, before any region is processed.
pub fn warning_banner(reporter: &Reporter) {
    let rule = "*".repeat(100);
    reporter.line(&rule);
    reporter.blank();
    reporter.line(
        "*** DELETING A DEFAULT VPC IS IRREVERSIBLE. \
         RESTORING ONE REQUIRES A SUPPORT CASE WITH THE PROVIDER. ***",
    );
    reporter.blank();
    reporter.line(&rule);
    reporter.blank();
}
