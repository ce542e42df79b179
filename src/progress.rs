//! Ingest progress reporting.
//!
//! Progress goes to **stderr** so stdout stays parseable for scripts:
//! human lines such as `thumbs  1,200 / 5,000 done`, or one JSON object
//! per line.

use std::io::Write;

/// A single progress event emitted while rebuilding a catalog.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// The source directory is being scanned. Total unknown.
    Scanning { source: String },
    /// `done` of `total` thumbnail jobs reached a terminal state.
    Thumbnails { done: u64, total: u64 },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Scanning { source } => format!("scan {}  ...\n", source),
            ProgressEvent::Thumbnails { done, total } => format!(
                "thumbs  {} / {} done\n",
                format_number(*done),
                format_number(*total)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Scanning { source } => serde_json::json!({
                "event": "progress",
                "phase": "scanning",
                "source": source,
            }),
            ProgressEvent::Thumbnails { done, total } => serde_json::json!({
                "event": "progress",
                "phase": "thumbnails",
                "done": done,
                "total": total,
            }),
        };
        let _ = writeln!(std::io::stderr().lock(), "{}", obj);
    }
}

pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
