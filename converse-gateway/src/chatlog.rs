//! Append-only chat log.
//!
//! One CSV-ish line per qualifying turn. Fields are sanitized so a record
//! always stays on one line and keeps its separators.

use converse_common::config::RecordingMode;
use converse_remote::RuntimeEntity;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Writes turn records according to a [`RecordingMode`].
pub struct ChatLogger {
    mode: RecordingMode,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ChatLogger {
    /// Open the log at `path`.
    ///
    /// The file is created (or opened for append) immediately unless the mode
    /// is `none`, so an unwritable location fails at startup.
    pub fn open(mode: RecordingMode, path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if mode != RecordingMode::None {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            tracing::info!(path = %path.display(), mode = %mode, "Chat log enabled");
        }
        Ok(Self {
            mode,
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// A logger that never writes.
    pub fn disabled() -> Self {
        Self {
            mode: RecordingMode::None,
            path: PathBuf::new(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn mode(&self) -> RecordingMode {
        self.mode
    }

    /// Record one turn. Returns whether a line was written.
    pub async fn record(
        &self,
        input: &str,
        reply: &str,
        entities: &[RuntimeEntity],
    ) -> std::io::Result<bool> {
        let Some(line) = format_record(self.mode, input, reply, entities) else {
            return Ok(false);
        };

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{line}\n").as_bytes()).await?;
        file.flush().await?;
        Ok(true)
    }
}

/// Build the record line for a turn, or `None` if the mode skips it.
pub fn format_record(
    mode: RecordingMode,
    input: &str,
    reply: &str,
    entities: &[RuntimeEntity],
) -> Option<String> {
    match mode {
        RecordingMode::None => None,
        RecordingMode::UnmatchedOnly => entities.is_empty().then(|| sanitize_field(input)),
        RecordingMode::All => {
            // The reply is written even with no entities (`hi,hello`), so the
            // line differs from an unmatched-only record of the same turn.
            let mut fields = vec![sanitize_field(input), sanitize_field(reply)];
            fields.extend(entities.iter().map(|e| {
                sanitize_field(&format!("{}:{}:{}", e.entity, e.value, e.confidence))
            }));
            Some(fields.join(","))
        }
    }
}

/// Newlines and carriage returns become spaces; commas become `|`.
fn sanitize_field(field: &str) -> String {
    field
        .chars()
        .map(|c| match c {
            '\n' | '\r' => ' ',
            ',' => '|',
            other => other,
        })
        .collect()
}
