/*!
 * # doctrans - long document translation with LLMs
 *
 * A Rust library that translates documents too long for a single model call.
 *
 * ## Features
 *
 * - Lossless, token-bounded splitting along paragraph, line, sentence and
 *   word boundaries
 * - Sequential chunk translation with a rolling excerpt of the previous
 *   translation as context
 * - Fail-fast jobs: a document is either translated completely or not at all
 * - Optional retry with exponential backoff for transient provider errors
 * - Any OpenAI-compatible chat-completions endpoint (DeepSeek, OpenAI, LM Studio)
 * - A single string-in/string-out tool for agent dispatchers
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `translation`: The translation pipeline:
 *   - `translation::segmenter`: Token-bounded chunking
 *   - `translation::step`: One model call per chunk
 *   - `translation::sequencer`: Job state machine, retry and cancellation
 *   - `translation::merger`: Reassembly of translated chunks
 * - `tool`: The `document_translator` tool facade
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `providers`: Client implementations for LLM providers:
 *   - `providers::openai`: OpenAI-compatible API client
 *   - `providers::mock`: Deterministic provider for tests
 * - `errors`: Custom error types for the pipeline
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod tool;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{PipelineError, ProviderError, SegmentationError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use tool::{DocumentTranslatorTool, ToolOutcome};
pub use translation::{Segmenter, Sequencer, TranslationJob};
