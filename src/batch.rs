//! Batch classification of an email table against one model.
//!
//! Each row becomes an independent single-turn prompt. Requests run with a
//! bounded number in flight and results come back in row order, so the
//! output always has exactly one entry per input row.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::classify::{extract, prompt};
use crate::config::Config;
use crate::providers::{LlmProvider, ProviderError};
use crate::table::{ClassifiedTable, EmailRecord, EmailTable, TableError};

/// Completed-row interval between `info` progress events.
const PROGRESS_EVERY: usize = 25;

/// Runs the prompt → model → extract pipeline over many rows.
#[derive(Clone)]
pub struct BatchClassifier {
    provider: Arc<dyn LlmProvider>,
    concurrency: usize,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl BatchClassifier {
    /// Create a classifier with at most `concurrency` requests in flight.
    ///
    /// A concurrency of zero is treated as one.
    pub fn new(provider: Arc<dyn LlmProvider>, concurrency: usize) -> Self {
        Self {
            provider,
            concurrency: concurrency.max(1),
            max_tokens: None,
            temperature: None,
        }
    }

    /// Create a classifier using the `[model]` and `[batch]` settings.
    pub fn from_config(provider: Arc<dyn LlmProvider>, config: &Config) -> Self {
        Self::new(provider, config.batch.concurrency)
            .with_generation(Some(config.model.max_tokens), config.model.temperature)
    }

    /// Set generation limits passed on every request.
    pub fn with_generation(mut self, max_tokens: Option<u32>, temperature: Option<f32>) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    /// Effective in-flight request cap.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Prompt the model once per record and collect raw replies in order.
    ///
    /// A failed call is returned in place; it never aborts the other rows.
    pub async fn invoke(&self, records: &[EmailRecord]) -> Vec<Result<String, ProviderError>> {
        let total = records.len();
        info!(
            rows = total,
            model = %self.provider.model_id(),
            concurrency = self.concurrency,
            "processing emails"
        );

        let finished = AtomicUsize::new(0);
        let finished = &finished;

        stream::iter(records.iter().enumerate())
            .map(|(row, record)| async move {
                let prompt = prompt::build(&record.subject, &record.sender);
                let result = self
                    .provider
                    .generate(&prompt, self.max_tokens, self.temperature)
                    .await;
                if let Err(e) = &result {
                    warn!(row, error = %e, "model call failed");
                }
                let done = finished.fetch_add(1, Ordering::Relaxed).saturating_add(1);
                debug!(row, done, total, "row classified");
                if done == total || done.checked_rem(PROGRESS_EVERY) == Some(0) {
                    info!(done, total, "progress");
                }
                result
            })
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await
    }

    /// Classify every row and merge the results into the table.
    ///
    /// Rows whose model call failed or whose reply did not parse get `None`.
    /// With `keep_raw`, each reply text is kept alongside its result.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::LengthMismatch`] only if the result count drifts
    /// from the row count, which would be a bug.
    pub async fn run(
        &self,
        table: EmailTable,
        keep_raw: bool,
    ) -> Result<ClassifiedTable, TableError> {
        let replies = self.invoke(table.records()).await;

        let mut failed = 0_usize;
        let raw: Vec<Option<String>> = replies
            .into_iter()
            .map(|reply| match reply {
                Ok(text) => Some(text),
                Err(_) => {
                    failed = failed.saturating_add(1);
                    None
                }
            })
            .collect();

        let results = raw
            .iter()
            .map(|text| text.as_deref().and_then(extract))
            .collect();

        let classified = table.with_results(results, keep_raw.then_some(raw))?;

        let rows = classified.table().len();
        let parsed = classified.parsed_count();
        info!(
            rows,
            parsed,
            unparsed = rows.saturating_sub(parsed).saturating_sub(failed),
            failed,
            "batch complete"
        );
        Ok(classified)
    }
}
