/*!
 * Drives a translation job from source text to merged output.
 *
 * Chunks are translated strictly in order because each one receives the
 * digest of the previous translation. The first chunk that cannot be
 * translated aborts the job; nothing partial is ever merged.
 */

use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::errors::{PipelineError, ProviderError, TranslationError};
use crate::translation::job::{JobState, TranslationJob};
use crate::translation::merger;
use crate::translation::segmenter::{Segmenter, SegmenterConfig};
use crate::translation::step::{ChunkTranslator, StepOutput};

/// How often a failed model call is repeated before the job is abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each further retry
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
        }
    }

    /// Abort on the first failure
    pub fn fail_fast() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn from_config(config: &crate::app_config::TranslationConfig) -> Self {
        Self::new(
            config.retry_count,
            Duration::from_millis(config.retry_backoff_ms),
        )
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fail_fast()
    }
}

/// Shared flag asking a running job to stop before its next chunk
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress notification sent after each chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerProgress {
    /// Chunks translated so far
    pub completed: usize,
    /// Total number of chunks in the job
    pub total: usize,
    /// State the job moved to
    pub state: JobState,
}

/// Observer invoked with every progress update
pub type ProgressCallback = Arc<dyn Fn(&SequencerProgress) + Send + Sync>;

/// Token usage statistics for a job
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenUsageStats {
    /// Number of prompt tokens
    pub prompt_tokens: u64,

    /// Number of completion tokens
    pub completion_tokens: u64,

    /// Total number of tokens
    pub total_tokens: u64,

    /// Number of model calls, retries included
    pub requests: u64,

    /// Total time spent waiting on the model
    pub api_duration: Duration,
}

impl TokenUsageStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the token numbers reported for one call
    pub fn add_token_usage(&mut self, prompt_tokens: Option<u64>, completion_tokens: Option<u64>) {
        if let Some(pt) = prompt_tokens {
            self.prompt_tokens += pt;
            self.total_tokens += pt;
        }

        if let Some(ct) = completion_tokens {
            self.completion_tokens += ct;
            self.total_tokens += ct;
        }
    }

    /// Calculate tokens per minute of model time
    pub fn tokens_per_minute(&self) -> f64 {
        let minutes = self.api_duration.as_secs_f64() / 60.0;
        if minutes > 0.0 {
            self.total_tokens as f64 / minutes
        } else {
            0.0
        }
    }

    /// Generate a summary of token usage
    pub fn summary(&self) -> String {
        format!(
            "Token Usage Summary:\n\
             Requests: {}\n\
             Prompt tokens: {}\n\
             Completion tokens: {}\n\
             Total tokens: {}\n\
             API request time: {:.2} minutes\n\
             Tokens per minute: {:.2}",
            self.requests,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
            self.api_duration.as_secs_f64() / 60.0,
            self.tokens_per_minute()
        )
    }
}

/// Summary of a finished job
#[derive(Debug, Clone)]
pub struct JobReport {
    /// Number of chunks translated
    pub chunks: usize,
    /// Number of words split by character to fit the budget
    pub oversized_units: usize,
    /// Wall time of the whole run
    pub duration: Duration,
    /// Token accounting
    pub usage: TokenUsageStats,
}

/// Runs the split, translate and merge stages of a job.
pub struct Sequencer<T: ChunkTranslator> {
    segmenter: Segmenter,
    translator: T,
    retry: RetryPolicy,
    cancellation: CancellationFlag,
    progress: Option<ProgressCallback>,
}

impl<T: ChunkTranslator> Sequencer<T> {
    pub fn new(segmenter: Segmenter, translator: T) -> Self {
        Self {
            segmenter,
            translator,
            retry: RetryPolicy::default(),
            cancellation: CancellationFlag::new(),
            progress: None,
        }
    }

    /// Create a sequencer with the chunking and retry settings of `config`.
    pub fn from_config(config: &Config, translator: T) -> Self {
        Self::new(
            Segmenter::new(SegmenterConfig::from(&config.chunking)),
            translator,
        )
        .with_retry_policy(RetryPolicy::from_config(&config.translation))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn with_progress<F>(self, callback: F) -> Self
    where
        F: Fn(&SequencerProgress) + Send + Sync + 'static,
    {
        self.with_progress_callback(Arc::new(callback))
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Run a fresh job to completion.
    ///
    /// On success the job is `Done` and holds the merged output. On failure it
    /// is `Errored` or `Cancelled` and has no output. A job that has already
    /// been run is rejected and left untouched.
    pub async fn run(&self, job: &mut TranslationJob) -> Result<JobReport, PipelineError> {
        if job.state() != JobState::Uninitialized {
            error!("Job {}: refusing to run, state is {}", job.id(), job.state());
            return Err(PipelineError::JobAlreadyStarted {
                id: job.id(),
                state: job.state(),
            });
        }
        let started = Instant::now();
        let mut usage = TokenUsageStats::new();

        job.begin_splitting();
        let segmentation = match self.segmenter.split(job.source_text()) {
            Ok(segmentation) => segmentation,
            Err(e) => {
                error!("Job {}: splitting failed: {}", job.id(), e);
                job.fail();
                return Err(e.into());
            }
        };
        job.set_segmentation(segmentation);

        let total = job.chunks().len();
        info!(
            "Job {}: {} bytes split into {} chunk(s)",
            job.id(),
            job.source_text().len(),
            total
        );
        self.notify(job);

        while let JobState::Translating { index } = job.state() {
            if self.cancellation.is_cancelled() {
                warn!("Job {}: cancelled before chunk {}/{}", job.id(), index + 1, total);
                job.cancel();
                self.notify(job);
                return Err(TranslationError::Cancelled {
                    chunk_index: index,
                    total,
                }
                .into());
            }

            let chunk_text = job.chunks()[index].text.clone();
            let digest = job.context_digest().to_string();

            match self.translate_with_retry(&chunk_text, &digest, &mut usage).await {
                Ok(output) => {
                    debug!(
                        "Job {}: chunk {}/{} translated ({} chars)",
                        job.id(),
                        index + 1,
                        total,
                        output.text.chars().count()
                    );
                    job.record_translation(output.text);
                    self.notify(job);
                }
                Err(source) => {
                    error!(
                        "Job {}: chunk {}/{} failed: {}",
                        job.id(),
                        index + 1,
                        total,
                        source
                    );
                    job.fail();
                    self.notify(job);
                    return Err(TranslationError::Provider {
                        chunk_index: index,
                        total,
                        source,
                    }
                    .into());
                }
            }
        }

        let output = merger::merge(job.translated_chunks());
        job.finish(output);
        self.notify(job);

        let report = JobReport {
            chunks: total,
            oversized_units: job.oversized_units().len(),
            duration: started.elapsed(),
            usage,
        };
        info!(
            "Job {}: done in {:.2}s ({} tokens)",
            job.id(),
            report.duration.as_secs_f64(),
            report.usage.total_tokens
        );

        Ok(report)
    }

    async fn translate_with_retry(
        &self,
        chunk: &str,
        digest: &str,
        usage: &mut TokenUsageStats,
    ) -> Result<StepOutput, ProviderError> {
        let mut attempt = 0;

        loop {
            let call_started = Instant::now();
            let result = self.translator.translate_chunk(chunk, digest).await;
            usage.requests += 1;
            usage.api_duration += call_started.elapsed();

            match result {
                Ok(output) => {
                    usage.add_token_usage(output.prompt_tokens, output.completion_tokens);
                    return Ok(output);
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "Model call failed ({}), retry {}/{} in {}ms",
                        e,
                        attempt,
                        self.retry.max_retries,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn notify(&self, job: &TranslationJob) {
        if let Some(callback) = &self.progress {
            callback(&SequencerProgress {
                completed: job.current_index(),
                total: job.chunks().len(),
                state: job.state(),
            });
        }
    }
}
