/*!
 * The record of one translation job.
 *
 * A job is created for each tool invocation and owned by the sequencer while
 * it runs. Fields are read through accessors; only the sequencer mutates
 * them, and every mutation keeps the translated chunks in step with the
 * cursor.
 */

use std::fmt;
use uuid::Uuid;

use crate::translation::context::ContextTracker;
use crate::translation::segmenter::{Chunk, OversizedUnit, Segmentation};

/// Position of a job in the sequencer state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Uninitialized,
    Splitting,
    /// Translating the chunk at `index`
    Translating { index: usize },
    Merging,
    Done,
    Errored,
    Cancelled,
}

impl JobState {
    /// Whether the job can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Errored | Self::Cancelled)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Splitting => write!(f, "splitting"),
            Self::Translating { index } => write!(f, "translating chunk {}", index + 1),
            Self::Merging => write!(f, "merging"),
            Self::Done => write!(f, "done"),
            Self::Errored => write!(f, "errored"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One end-to-end translation request
#[derive(Debug, Clone)]
pub struct TranslationJob {
    id: Uuid,
    source_text: String,
    chunks: Vec<Chunk>,
    oversized_units: Vec<OversizedUnit>,
    current_index: usize,
    translated_chunks: Vec<String>,
    context: ContextTracker,
    final_output: Option<String>,
    state: JobState,
}

impl TranslationJob {
    /// Create a fresh job for `source_text`.
    pub fn new(source_text: impl Into<String>, context_chars: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_text: source_text.into(),
            chunks: Vec::new(),
            oversized_units: Vec::new(),
            current_index: 0,
            translated_chunks: Vec::new(),
            context: ContextTracker::new(context_chars),
            final_output: None,
            state: JobState::Uninitialized,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Words that were split below word level to fit the budget
    pub fn oversized_units(&self) -> &[OversizedUnit] {
        &self.oversized_units
    }

    /// Index of the next chunk to translate
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn translated_chunks(&self) -> &[String] {
        &self.translated_chunks
    }

    /// Digest handed to the next chunk
    pub fn context_digest(&self) -> &str {
        self.context.digest()
    }

    /// Merged translation, set once the job is done
    pub fn final_output(&self) -> Option<&str> {
        self.final_output.as_deref()
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Take the merged translation out of a finished job
    pub fn into_output(self) -> Option<String> {
        self.final_output
    }

    pub(crate) fn begin_splitting(&mut self) {
        self.state = JobState::Splitting;
    }

    /// Store the segmenter output. Chunks are set exactly once.
    pub(crate) fn set_segmentation(&mut self, segmentation: Segmentation) {
        debug_assert!(self.chunks.is_empty() && self.current_index == 0);
        self.chunks = segmentation.chunks;
        self.oversized_units = segmentation.oversized_units;
        self.state = if self.chunks.is_empty() {
            JobState::Merging
        } else {
            JobState::Translating { index: 0 }
        };
    }

    /// Append the translation of the current chunk and advance the cursor.
    ///
    /// A blank translation (whitespace-only chunk) keeps the current digest.
    pub(crate) fn record_translation(&mut self, translation: String) {
        debug_assert_eq!(self.translated_chunks.len(), self.current_index);
        if !translation.trim().is_empty() {
            self.context.update(&translation);
        }
        self.translated_chunks.push(translation);
        self.current_index += 1;
        self.state = if self.current_index < self.chunks.len() {
            JobState::Translating {
                index: self.current_index,
            }
        } else {
            JobState::Merging
        };
    }

    /// Set the merged output and mark the job done.
    pub(crate) fn finish(&mut self, output: String) {
        debug_assert!(self.final_output.is_none());
        debug_assert_eq!(self.current_index, self.chunks.len());
        self.final_output = Some(output);
        self.state = JobState::Done;
    }

    pub(crate) fn fail(&mut self) {
        self.state = JobState::Errored;
    }

    pub(crate) fn cancel(&mut self) {
        self.state = JobState::Cancelled;
    }
}
