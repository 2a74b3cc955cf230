//! Progress sinks
//!
//! The executor streams one START and exactly one terminal event per node.
//! The text sink renders per-node lines under an indicatif bar; the JSON
//! sink emits one object per line for machine consumption.

use indicatif::{ProgressBar, ProgressStyle};
use lea_core::TableRef;
use std::time::Duration;

/// Node phase reported alongside an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Write,
    Publish,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Phase::Write => "write",
            Phase::Publish => "publish",
        }
    }
}

/// One progress event.
#[derive(Debug, Clone)]
pub enum Event {
    Started {
        table_ref: TableRef,
        phase: Phase,
    },
    Done {
        table_ref: TableRef,
        phase: Phase,
        duration: Duration,
        n_rows: Option<u64>,
    },
    Skipped {
        table_ref: TableRef,
        reason: &'static str,
    },
    Errored {
        table_ref: TableRef,
        phase: Phase,
        duration: Duration,
        error: String,
    },
}

/// Receives progress events from the executor.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: Event);
    /// Called once when the run is over.
    fn finish(&self) {}
}

/// Silent sink for dry runs and tests.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: Event) {}
}

/// Terminal renderer.
pub struct TextSink {
    bar: Option<ProgressBar>,
}

impl TextSink {
    /// A sink over `total` runnable nodes; `quiet` suppresses the bar.
    pub fn new(total: usize, quiet: bool) -> Self {
        let bar = if quiet {
            None
        } else {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .expect("static progress bar template is valid")
                    .progress_chars("#>-"),
            );
            Some(bar)
        };
        Self { bar }
    }

    fn println(&self, line: String) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => println!("{line}"),
        }
    }
}

impl ProgressSink for TextSink {
    fn emit(&self, event: Event) {
        match event {
            Event::Started { table_ref, .. } => {
                if let Some(bar) = &self.bar {
                    bar.set_message(format!("{table_ref}"));
                }
            }
            Event::Done {
                table_ref,
                duration,
                n_rows,
                ..
            } => {
                let rows = match n_rows {
                    Some(n) => format!(", {n} rows"),
                    None => String::new(),
                };
                self.println(format!(
                    "  \u{2713} {} [{}ms{}]",
                    table_ref,
                    duration.as_millis(),
                    rows
                ));
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                }
            }
            Event::Skipped { table_ref, reason } => {
                self.println(format!("  - {table_ref} ({reason})"));
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                }
            }
            Event::Errored {
                table_ref,
                duration,
                error,
                ..
            } => {
                self.println(format!(
                    "  \u{2717} {} - {} [{}ms]",
                    table_ref,
                    error,
                    duration.as_millis()
                ));
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                }
            }
        }
    }

    fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

/// JSON-lines sink.
pub struct JsonSink;

impl ProgressSink for JsonSink {
    fn emit(&self, event: Event) {
        let value = match event {
            Event::Started { table_ref, phase } => serde_json::json!({
                "node": table_ref.to_string(),
                "phase": phase.label(),
                "status": "started",
            }),
            Event::Done {
                table_ref,
                phase,
                duration,
                n_rows,
            } => serde_json::json!({
                "node": table_ref.to_string(),
                "phase": phase.label(),
                "status": "done",
                "duration_ms": duration.as_millis() as u64,
                "rows": n_rows,
            }),
            Event::Skipped { table_ref, reason } => serde_json::json!({
                "node": table_ref.to_string(),
                "status": "skipped",
                "reason": reason,
            }),
            Event::Errored {
                table_ref,
                phase,
                duration,
                error,
            } => serde_json::json!({
                "node": table_ref.to_string(),
                "phase": phase.label(),
                "status": "errored",
                "duration_ms": duration.as_millis() as u64,
                "error": error,
            }),
        };
        println!("{value}");
    }
}
