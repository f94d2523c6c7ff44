//! Background writer persisting validated rounds to disk.
//!
//! The timing thread only enqueues; a dedicated thread formats and writes the
//! files so persistence never adds jitter to the tick loop.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use crate::config::{TrainingDay, TrainingMode};
use crate::error::{log_session_error, SessionError};
use crate::scheduler::RoundExport;

use super::{LiveRow, MetricSink};

/// `{pseudonym}-{unix_ms}-{round}.out`
///
/// The pseudonym is reduced to a single path component via
/// [`file_safe_pseudonym`].
pub fn round_file_name(export: &RoundExport) -> String {
    format!(
        "{}-{}-{}.out",
        file_safe_pseudonym(&export.pseudonym),
        export.started_unix_ms,
        export.round
    )
}

/// Replace everything but ASCII alphanumerics, `-` and `_` with `_`.
///
/// Separators and dots never reach the file name, so a pseudonym cannot
/// escape the output directory. An empty pseudonym becomes `anonymous`.
pub fn file_safe_pseudonym(pseudonym: &str) -> String {
    if pseudonym.is_empty() {
        return "anonymous".to_string();
    }
    pseudonym
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn round_directory(base: &Path, export: &RoundExport) -> PathBuf {
    match export.mode {
        TrainingMode::Training => base.to_path_buf(),
        TrainingMode::Evaluation => match export.day {
            TrainingDay::One => base.join("day_1"),
            TrainingDay::Two => base.join("day_2"),
        },
    }
}

/// Write one round synchronously: comma-delimited, one row per line.
///
/// # Returns
/// Path of the written file
pub fn write_round_file(base: &Path, export: &RoundExport) -> Result<PathBuf, SessionError> {
    let dir = round_directory(base, export);
    fs::create_dir_all(&dir)?;
    let path = dir.join(round_file_name(export));

    let mut out = BufWriter::new(fs::File::create(&path)?);
    for row in &export.rows {
        let line = row
            .values()
            .iter()
            .map(|value| format!("{:.18e}", value))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(out, "{}", line)?;
    }
    out.flush()?;
    Ok(path)
}

/// Sink that hands rounds to a writer thread.
pub struct RoundFileWriter {
    tx: Option<mpsc::UnboundedSender<RoundExport>>,
    handle: Option<JoinHandle<()>>,
    written: Arc<AtomicU64>,
    output_dir: PathBuf,
}

impl RoundFileWriter {
    /// Spawn the writer thread for `output_dir`.
    pub fn spawn(output_dir: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let output_dir = output_dir.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<RoundExport>();
        let written = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&written);
        let base = output_dir.clone();

        let handle = std::thread::Builder::new()
            .name("round-writer".to_string())
            .spawn(move || {
                while let Some(export) = rx.blocking_recv() {
                    match write_round_file(&base, &export) {
                        Ok(path) => {
                            counter.fetch_add(1, Ordering::SeqCst);
                            log::info!(
                                "[RoundFileWriter] Round {} written to {:?} ({} rows)",
                                export.round,
                                path,
                                export.rows.len()
                            );
                        }
                        Err(err) => log_session_error(&err, "RoundFileWriter::write"),
                    }
                }
            })?;

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            written,
            output_dir,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Rounds written so far.
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::SeqCst)
    }

    /// Drain the queue and stop the writer thread.
    pub fn close(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("[RoundFileWriter] Writer thread panicked");
            }
        }
    }
}

impl MetricSink for RoundFileWriter {
    fn publish_row(&mut self, _row: LiveRow) {}

    fn persist_round(&mut self, export: RoundExport) -> Result<(), SessionError> {
        let tx = self.tx.as_ref().ok_or_else(|| SessionError::ChannelClosed {
            channel: "round_writer".to_string(),
        })?;
        tx.send(export).map_err(|_| SessionError::ChannelClosed {
            channel: "round_writer".to_string(),
        })
    }
}

impl Drop for RoundFileWriter {
    fn drop(&mut self) {
        self.close();
    }
}
