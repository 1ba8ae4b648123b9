//! Batch runner: walks every row, skipping checkpointed ones.
//!
//! Retry scope: only errors escaping the row processor are retried. Handled
//! service failures come back as entries with `error` set and are attempted
//! once per run; the rows stay out of the checkpoint and are picked up again
//! by the next run.

use crate::checkpoint::CheckpointManager;
use crate::models::{Result, RunConfig, TranslationEntry, WordEntry};
use crate::pipeline::RowProcessor;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Options for a batch run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Attempts per row when the processor raises (at least one is made)
    pub max_retries: u32,
    pub show_progress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            show_progress: false,
        }
    }
}

impl From<&RunConfig> for RunOptions {
    fn from(config: &RunConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            show_progress: config.progress,
        }
    }
}

/// Delay before the attempt following failed attempt number `attempt`.
pub fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt))
}

/// Drives a [`RowProcessor`] over a whole sheet.
pub struct BatchRunner<P: RowProcessor> {
    processor: P,
    checkpoint: CheckpointManager,
    options: RunOptions,
}

impl<P: RowProcessor> BatchRunner<P> {
    pub fn new(processor: P, checkpoint: CheckpointManager, options: RunOptions) -> Self {
        Self {
            processor,
            checkpoint,
            options,
        }
    }

    pub fn checkpoint(&self) -> &CheckpointManager {
        &self.checkpoint
    }

    /// Process every row not already in the checkpoint.
    ///
    /// Returns one entry per attempted row, in row order. Only checkpoint
    /// storage failures abort the run.
    pub async fn run(&mut self, rows: &[WordEntry]) -> Result<Vec<TranslationEntry>> {
        let start = Instant::now();
        self.checkpoint.load()?;

        let total = rows.len();
        let already_done = (0..total).filter(|i| self.checkpoint.contains(*i)).count();

        info!(
            total_rows = total,
            pending = total - already_done,
            already_done,
            max_retries = self.options.max_retries,
            "Starting batch run"
        );

        let pb = self.progress_bar(total as u64);
        let mut results = Vec::with_capacity(total - already_done);
        let mut added = 0usize;
        let mut failed = 0usize;

        for (row_index, entry) in rows.iter().enumerate() {
            if self.checkpoint.contains(row_index) {
                info!(row = row_index, "Skipping already processed row");
                pb.inc(1);
                continue;
            }

            let result = self.process_with_retries(row_index, entry).await?;
            if result.anki_added {
                added += 1;
            } else {
                failed += 1;
                warn!(
                    row = row_index,
                    error = result.error.as_deref().unwrap_or("unknown error"),
                    "Row failed"
                );
            }
            results.push(result);

            pb.inc(1);
            pb.set_message(format!("added: {added}, failed: {failed}"));
        }

        pb.finish_with_message(format!("Done! {added} added, {failed} failed"));

        info!(
            added,
            failed,
            skipped = already_done,
            runtime_secs = start.elapsed().as_secs_f64(),
            "Batch run complete"
        );

        Ok(results)
    }

    async fn process_with_retries(
        &mut self,
        row_index: usize,
        entry: &WordEntry,
    ) -> Result<TranslationEntry> {
        let max_attempts = self.options.max_retries.max(1);
        let mut attempt = 0u32;

        loop {
            let err = match self
                .processor
                .process(&mut self.checkpoint, row_index, entry)
                .await
            {
                Ok(result) => return Ok(result),
                Err(e) => e,
            };

            if err.is_fatal() {
                error!(row = row_index, error = %err, "Checkpoint storage failed, aborting run");
                return Err(err);
            }

            if !err.is_retryable() {
                error!(row = row_index, error = %err, "Row cannot be processed");
                return Ok(TranslationEntry::failed(
                    row_index,
                    entry.clone(),
                    err.to_string(),
                ));
            }

            attempt += 1;
            if attempt >= max_attempts {
                error!(row = row_index, error = %err, "Max retries reached");
                return Ok(TranslationEntry::failed(
                    row_index,
                    entry.clone(),
                    format!("Max retries reached: {err}"),
                ));
            }

            let delay = backoff(attempt);
            info!(
                row = row_index,
                attempt = attempt + 1,
                max_attempts,
                backoff_secs = delay.as_secs(),
                error = %err,
                "Retrying row"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        pb
    }
}
