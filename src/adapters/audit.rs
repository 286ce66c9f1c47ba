use crate::domain::model::AuditRecord;
use crate::domain::ports::AuditSink;
use crate::utils::error::{Result, TriageError};
use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Append-only JSON Lines audit log, one record per line.
#[derive(Debug, Clone)]
pub struct JsonlAuditSink {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl JsonlAuditSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        tracing::info!("📝 Audit log: {}", path.display());

        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record in append order.
    pub async fn read_all(&self) -> Result<Vec<AuditRecord>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let records = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(i, line)| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Skipping unreadable audit line {} in {}: {}",
                        i + 1,
                        self.path.display(),
                        e
                    );
                    None
                }
            })
            .collect();
        Ok(records)
    }

    /// Records written at or after `since`, in append order.
    pub async fn read_since(&self, since: DateTime<Utc>) -> Result<Vec<AuditRecord>> {
        let records = self.read_all().await?;
        Ok(records
            .into_iter()
            .filter(|record| record.recorded_at >= since)
            .collect())
    }
}

impl AuditSink for JsonlAuditSink {
    async fn append(&self, record: &AuditRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let file = Arc::clone(&self.file);
        // The blocking write runs to completion even if the caller is dropped,
        // so a record is never left half-written.
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut file = file
                .lock()
                .map_err(|_| TriageError::IoError(io::Error::other("audit log lock poisoned")))?;
            write_line(&mut file, &line)?;
            Ok(())
        })
        .await
        .map_err(|e| TriageError::IoError(io::Error::other(e)))??;

        tracing::debug!(
            correlation_id = %record.correlation_id,
            outcome = %record.outcome,
            "Audit record appended"
        );
        Ok(())
    }
}

/// Appends one newline-terminated line. A fragment left by an earlier crash is
/// closed off first; a failed write is truncated away so the file only ever
/// holds whole lines.
fn write_line(file: &mut File, line: &[u8]) -> io::Result<()> {
    let len = file.metadata()?.len();

    let mut buf = Vec::with_capacity(line.len() + 1);
    if len > 0 && !ends_with_newline(file, len)? {
        buf.push(b'\n');
    }
    buf.extend_from_slice(line);

    let written = file
        .write_all(&buf)
        .and_then(|_| file.flush())
        .and_then(|_| file.sync_data());

    if let Err(e) = written {
        if let Err(truncate_err) = file.set_len(len) {
            tracing::error!("❌ Could not roll back partial audit write: {}", truncate_err);
        }
        return Err(e);
    }
    Ok(())
}

fn ends_with_newline(file: &mut File, len: u64) -> io::Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
