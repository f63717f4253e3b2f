/*!
 * Error types for the doctrans pipeline.
 *
 * This module contains custom error types for the different stages of a
 * translation job, using the thiserror crate for ergonomic error definitions.
 * Only the tool facade turns these into plain text.
 */

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::translation::JobState;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The model call did not finish within the configured timeout
    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    /// Whether repeating the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_)
            | Self::ConnectionError(_)
            | Self::RateLimitExceeded(_)
            | Self::Timeout(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500 || *status_code == 429,
            Self::ParseError(_) | Self::AuthenticationError(_) => false,
        }
    }
}

/// Errors raised while splitting the source text into chunks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SegmentationError {
    /// The chunk budget itself is unusable
    #[error("Invalid chunk budget: chunk_size={chunk_size}, chunk_overlap={chunk_overlap} (overlap must be smaller than a non-zero chunk size)")]
    InvalidBudget {
        chunk_size: usize,
        chunk_overlap: usize,
    },

    /// A unit that may not be split further is larger than the budget
    #[error("Text unit at byte {offset} needs {tokens} tokens but the chunk size is {chunk_size}: {preview:?}")]
    UnitExceedsBudget {
        offset: usize,
        tokens: usize,
        chunk_size: usize,
        preview: String,
    },
}

/// Errors that can occur while translating the chunks of a job
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The model call for one chunk failed
    #[error("Chunk {} of {total} could not be translated: {source}", .chunk_index + 1)]
    Provider {
        chunk_index: usize,
        total: usize,
        #[source]
        source: ProviderError,
    },

    /// The job was cancelled between two chunks
    #[error("Translation cancelled before chunk {} of {total}", .chunk_index + 1)]
    Cancelled { chunk_index: usize, total: usize },
}

/// Top-level error of a translation job, one variant per pipeline stage
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The source file could not be read as text
    #[error("Cannot read input file {path:?}: {message}")]
    Input { path: PathBuf, message: String },

    /// The source text could not be split within the configured budget
    #[error("Cannot split the document: {0}")]
    Segmentation(#[from] SegmentationError),

    /// A chunk failed to translate, so the whole job was abandoned
    #[error("{0}. No output file was written")]
    Translation(#[from] TranslationError),

    /// The job was already started or finished; a job runs at most once
    #[error("Job {id} cannot be run: it is already {state}")]
    JobAlreadyStarted { id: Uuid, state: JobState },

    /// Translation succeeded but the result could not be saved
    #[error("Translation finished but the result could not be saved to {path:?}: {message}")]
    Persistence { path: PathBuf, message: String },
}

impl PipelineError {
    /// Short stage name used in log lines
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Input { .. } => "input",
            Self::Segmentation(_) => "segmentation",
            Self::Translation(_) => "translation",
            Self::JobAlreadyStarted { .. } => "job",
            Self::Persistence { .. } => "persistence",
        }
    }
}
