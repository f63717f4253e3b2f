/*!
 * Tests for error types and conversions
 */

use std::path::PathBuf;
use std::time::Duration;

use doctrans::errors::{PipelineError, ProviderError, SegmentationError, TranslationError};
use doctrans::translation::JobState;

#[test]
fn test_providerError_apiError_shouldDisplayStatusAndMessage() {
    let error = ProviderError::ApiError {
        status_code: 503,
        message: "Service unavailable".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("503"));
    assert!(display.contains("Service unavailable"));
}

#[test]
fn test_providerError_isRetryable_shouldSeparateTransientFromPermanent() {
    assert!(ProviderError::Timeout(Duration::from_secs(1)).is_retryable());
    assert!(ProviderError::ConnectionError("reset".to_string()).is_retryable());
    assert!(ProviderError::RateLimitExceeded("slow down".to_string()).is_retryable());
    assert!(ProviderError::ApiError { status_code: 502, message: String::new() }.is_retryable());

    assert!(!ProviderError::AuthenticationError("bad key".to_string()).is_retryable());
    assert!(!ProviderError::ParseError("empty".to_string()).is_retryable());
    assert!(!ProviderError::ApiError { status_code: 400, message: String::new() }.is_retryable());
}

#[test]
fn test_translationError_provider_shouldUseOneBasedChunkNumber() {
    let error = TranslationError::Provider {
        chunk_index: 1,
        total: 3,
        source: ProviderError::Timeout(Duration::from_secs(120)),
    };
    let display = error.to_string();
    assert!(display.starts_with("Chunk 2 of 3 could not be translated"));
    assert!(display.contains("timed out"));
}

#[test]
fn test_pipelineError_fromTranslationError_shouldMentionNoOutput() {
    let error: PipelineError = TranslationError::Cancelled { chunk_index: 0, total: 2 }.into();

    assert_eq!(error.stage(), "translation");
    assert!(error.to_string().ends_with("No output file was written"));
}

#[test]
fn test_pipelineError_fromSegmentationError_shouldKeepDetails() {
    let error: PipelineError = SegmentationError::InvalidBudget {
        chunk_size: 10,
        chunk_overlap: 10,
    }
    .into();

    assert_eq!(error.stage(), "segmentation");
    assert!(error.to_string().contains("chunk_overlap=10"));
}

#[test]
fn test_pipelineError_input_shouldIncludePath() {
    let error = PipelineError::Input {
        path: PathBuf::from("missing.txt"),
        message: "File does not exist".to_string(),
    };
    assert_eq!(error.stage(), "input");
    assert!(error.to_string().contains("missing.txt"));
}

#[test]
fn test_pipelineError_jobAlreadyStarted_shouldNameState() {
    let error = PipelineError::JobAlreadyStarted {
        id: uuid::Uuid::nil(),
        state: JobState::Translating { index: 1 },
    };
    assert_eq!(error.stage(), "job");
    assert!(error.to_string().contains("already translating chunk 2"));
}
