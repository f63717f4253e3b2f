/*!
 * Document translation pipeline.
 *
 * A document goes through a fixed sequence of stages:
 *
 * - `segmenter`: splits the source into token-bounded chunks
 * - `step`: translates one chunk with the digest of the previous translation
 * - `context`: computes that digest
 * - `merger`: joins the translated chunks
 * - `sequencer`: drives a `job` through the stages and owns the retry policy
 * - `prompts`: system instruction and per-chunk payload
 * - `tokens`: token counting used for chunk budgets
 */

// Re-export main types for easier usage
pub use self::context::{next_digest, ContextTracker};
pub use self::job::{JobState, TranslationJob};
pub use self::merger::merge;
pub use self::prompts::{PromptTemplate, TranslationPromptBuilder};
pub use self::segmenter::{Chunk, OversizedUnit, Segmentation, Segmenter, SegmenterConfig};
pub use self::sequencer::{
    CancellationFlag, JobReport, ProgressCallback, RetryPolicy, Sequencer, SequencerProgress,
    TokenUsageStats,
};
pub use self::step::{ChunkTranslator, ModelTranslator, StepOutput};
pub use self::tokens::{ApproxTokenCounter, CharTokenCounter, Cl100kTokenCounter, TokenCounter};

// Submodules
pub mod context;
pub mod job;
pub mod merger;
pub mod prompts;
pub mod segmenter;
pub mod sequencer;
pub mod step;
pub mod tokens;
