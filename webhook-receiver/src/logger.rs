use chrono::{SecondsFormat, Utc};
use std::borrow::Cow;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Info => "INFO",
            Level::Success => "SUCCESS",
            Level::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Operator-facing event log: every line goes to stdout and is appended to a file.
///
/// Writes never fail the caller. A line that cannot be written is dropped and
/// reported through `tracing` instead.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: Arc<PathBuf>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(Level::Info, message);
    }

    pub fn success(&self, message: impl AsRef<str>) {
        self.log(Level::Success, message);
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(Level::Error, message);
    }

    /// Runs synchronously on the caller's thread, so lines land in call order.
    /// Each line is a short blocking write, the same cost as the stdout print.
    pub fn log(&self, level: Level, message: impl AsRef<str>) {
        let line = format_line(level, message.as_ref());

        {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let _ = writeln!(out, "{line}");
            let _ = out.flush();
        }

        if let Err(e) = self.append(&line) {
            tracing::warn!(path = %self.path.display(), error = %e, "dropped event log line");
        }
    }

    // One write_all on an O_APPEND handle keeps concurrent lines whole.
    fn append(&self, line: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_ref())?;
        file.write_all(format!("{line}\n").as_bytes())
    }
}

fn format_line(level: Level, message: &str) -> String {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    format!("[{timestamp}] [{level}] {}", escape_controls(message))
}

/// Payload text can carry line breaks; escape them so one call stays one line.
fn escape_controls(message: &str) -> Cow<'_, str> {
    if !message.chars().any(char::is_control) {
        return Cow::Borrowed(message);
    }
    let mut escaped = String::with_capacity(message.len() + 8);
    for c in message.chars() {
        if c.is_control() {
            escaped.extend(c.escape_default());
        } else {
            escaped.push(c);
        }
    }
    Cow::Owned(escaped)
}
