//! Import and assistant progress reporting.
//!
//! Progress is emitted on **stderr** so stdout remains parseable for
//! scripts. `bdesk import` reports each stage of an upload; `bdesk ask`
//! and `bdesk chat` report when the assistant is "typing".

use std::io::Write;

use clap::ValueEnum;

/// A single progress event.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// Reading and validating the CSV file.
    Validating { file: String },
    /// Writing `rows` jobs from `file` into a new batch.
    Importing { file: String, rows: u64 },
    /// The assistant is preparing a reply.
    Typing,
}

/// Reports progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "import jobs.csv  storing  1,234 rows".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Validating { file } => format!("import {}  validating...\n", file),
            ProgressEvent::Importing { file, rows } => {
                format!("import {}  storing  {} rows\n", file, format_number(*rows))
            }
            ProgressEvent::Typing => "assistant is typing...\n".to_string(),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Validating { file } => serde_json::json!({
                "event": "progress",
                "phase": "validating",
                "file": file
            }),
            ProgressEvent::Importing { file, rows } => serde_json::json!({
                "event": "progress",
                "phase": "importing",
                "file": file,
                "rows": rows
            }),
            ProgressEvent::Typing => serde_json::json!({
                "event": "progress",
                "phase": "typing"
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_groups_thousands() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}
