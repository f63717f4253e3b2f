/*!
 * Splits a document into token-bounded chunks.
 *
 * The text is first cut into pieces along the coarsest boundary that keeps
 * every piece within the budget (paragraph, line, sentence, word, character).
 * Adjacent pieces are then packed greedily into chunks. Pieces are contiguous
 * slices of the source and keep their separators, so the chunks can always be
 * stitched back into the exact input.
 */

use log::{debug, warn};
use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::errors::SegmentationError;
use crate::translation::tokens::{Cl100kTokenCounter, TokenCounter};

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n(?:[ \t]*\r?\n)+").expect("paragraph regex"));

static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[.!?…]+["'”’)\]]*\s+|[。！？]+[”’」』）\]]*\s*"#).expect("sentence regex")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Number of characters kept in previews of flagged units
const PREVIEW_CHARS: usize = 40;

/// Budget settings for the segmenter.
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Maximum token units per chunk
    pub chunk_size: usize,
    /// Token units repeated at the start of the following chunk
    pub chunk_overlap: usize,
    /// Split words longer than the budget instead of failing
    pub split_long_words: bool,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 0,
            split_long_words: true,
        }
    }
}

impl From<&crate::app_config::ChunkingConfig> for SegmenterConfig {
    fn from(config: &crate::app_config::ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            split_long_words: config.split_long_words,
        }
    }
}

/// A contiguous slice of the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk text, including any leading overlap
    pub text: String,
    /// Byte offset of the chunk start in the source
    pub start: usize,
    /// Byte offset one past the chunk end in the source
    pub end: usize,
    /// Bytes at the start of `text` repeated from the previous chunk
    pub overlap_len: usize,
    /// Token units of `text`
    pub tokens: usize,
}

impl Chunk {
    /// The part of the chunk that no earlier chunk contains.
    pub fn fresh_text(&self) -> &str {
        &self.text[self.overlap_len..]
    }
}

/// A unit that had to be cut below word level to fit the budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OversizedUnit {
    /// Byte offset in the source
    pub offset: usize,
    /// Token units of the whole unit
    pub tokens: usize,
    /// Leading characters of the unit
    pub preview: String,
}

/// Result of splitting one document.
#[derive(Debug, Clone, Default)]
pub struct Segmentation {
    /// Chunks in document order
    pub chunks: Vec<Chunk>,
    /// Words that exceeded the budget and were split by character
    pub oversized_units: Vec<OversizedUnit>,
}

impl Segmentation {
    /// Rebuild the source by dropping every chunk's overlap prefix.
    pub fn reconstruct(&self) -> String {
        self.chunks.iter().map(Chunk::fresh_text).collect()
    }
}

/// Boundary levels, coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Paragraph,
    Line,
    Sentence,
    Word,
    Character,
}

impl Boundary {
    fn finer(self) -> Option<Boundary> {
        match self {
            Self::Paragraph => Some(Self::Line),
            Self::Line => Some(Self::Sentence),
            Self::Sentence => Some(Self::Word),
            Self::Word => Some(Self::Character),
            Self::Character => None,
        }
    }

    fn split(self, text: &str) -> Vec<&str> {
        match self {
            Self::Paragraph => cut_after(text, &PARAGRAPH_BREAK),
            Self::Line => text.split_inclusive('\n').collect(),
            Self::Sentence => cut_after(text, &SENTENCE_END),
            Self::Word => cut_around(text, &WHITESPACE_RUN),
            Self::Character => text
                .char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect(),
        }
    }
}

/// Cut `text` right after every match, keeping separators on the left piece.
fn cut_after<'t>(text: &'t str, re: &Regex) -> Vec<&'t str> {
    let mut parts = Vec::new();
    let mut last = 0;
    for m in re.find_iter(text) {
        if m.end() > last {
            parts.push(&text[last..m.end()]);
            last = m.end();
        }
    }
    if last < text.len() {
        parts.push(&text[last..]);
    }
    parts
}

/// Cut `text` before and after every match, so matches become pieces of their own.
fn cut_around<'t>(text: &'t str, re: &Regex) -> Vec<&'t str> {
    let mut parts = Vec::new();
    let mut last = 0;
    for m in re.find_iter(text) {
        if m.start() > last {
            parts.push(&text[last..m.start()]);
        }
        parts.push(m.as_str());
        last = m.end();
    }
    if last < text.len() {
        parts.push(&text[last..]);
    }
    parts
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// A budget-sized slice of the source, located by byte offsets.
#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
    tokens: usize,
}

/// Splits documents into chunks that respect a token budget.
#[derive(Clone)]
pub struct Segmenter {
    config: SegmenterConfig,
    counter: Arc<dyn TokenCounter>,
}

impl std::fmt::Debug for Segmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segmenter").field("config", &self.config).finish()
    }
}

impl Segmenter {
    /// Create a segmenter that counts cl100k tokens.
    pub fn new(config: SegmenterConfig) -> Self {
        Self::with_counter(config, Arc::new(Cl100kTokenCounter))
    }

    /// Create a segmenter with a custom token counter.
    pub fn with_counter(config: SegmenterConfig, counter: Arc<dyn TokenCounter>) -> Self {
        Self { config, counter }
    }

    /// Budget settings in use
    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Token units of `text` as seen by this segmenter
    pub fn count_tokens(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    /// Split `text` into chunks.
    pub fn split(&self, text: &str) -> Result<Segmentation, SegmentationError> {
        let chunk_size = self.config.chunk_size;
        let chunk_overlap = self.config.chunk_overlap;
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(SegmentationError::InvalidBudget {
                chunk_size,
                chunk_overlap,
            });
        }

        if text.is_empty() {
            return Ok(Segmentation::default());
        }

        let total_tokens = self.counter.count(text);
        if total_tokens <= chunk_size {
            return Ok(Segmentation {
                chunks: vec![Chunk {
                    text: text.to_string(),
                    start: 0,
                    end: text.len(),
                    overlap_len: 0,
                    tokens: total_tokens,
                }],
                oversized_units: Vec::new(),
            });
        }

        let mut pieces = Vec::new();
        let mut oversized_units = Vec::new();
        self.collect_pieces(text, 0, Boundary::Paragraph, &mut pieces, &mut oversized_units)?;

        let chunks = self.pack(text, &pieces);
        debug!(
            "Split {} tokens into {} chunks (chunk_size={}, chunk_overlap={})",
            total_tokens,
            chunks.len(),
            chunk_size,
            chunk_overlap
        );

        Ok(Segmentation {
            chunks,
            oversized_units,
        })
    }

    fn collect_pieces(
        &self,
        text: &str,
        base: usize,
        boundary: Boundary,
        pieces: &mut Vec<Piece>,
        oversized: &mut Vec<OversizedUnit>,
    ) -> Result<(), SegmentationError> {
        let chunk_size = self.config.chunk_size;
        let mut offset = base;

        for part in boundary.split(text) {
            let tokens = self.counter.count(part);

            if tokens <= chunk_size {
                pieces.push(Piece {
                    start: offset,
                    end: offset + part.len(),
                    tokens,
                });
            } else {
                match boundary.finer() {
                    Some(Boundary::Character) if !part.trim().is_empty() => {
                        if !self.config.split_long_words {
                            return Err(SegmentationError::UnitExceedsBudget {
                                offset,
                                tokens,
                                chunk_size,
                                preview: preview(part),
                            });
                        }
                        warn!(
                            "Word at byte {} needs {} tokens (chunk size {}), splitting it by character",
                            offset, tokens, chunk_size
                        );
                        oversized.push(OversizedUnit {
                            offset,
                            tokens,
                            preview: preview(part),
                        });
                        self.collect_pieces(part, offset, Boundary::Character, pieces, oversized)?;
                    }
                    Some(finer) => {
                        self.collect_pieces(part, offset, finer, pieces, oversized)?;
                    }
                    None => {
                        return Err(SegmentationError::UnitExceedsBudget {
                            offset,
                            tokens,
                            chunk_size,
                            preview: preview(part),
                        });
                    }
                }
            }

            offset += part.len();
        }

        Ok(())
    }

    /// Greedily pack pieces into chunks, carrying the overlap forward.
    fn pack(&self, text: &str, pieces: &[Piece]) -> Vec<Chunk> {
        let chunk_size = self.config.chunk_size;
        let chunk_overlap = self.config.chunk_overlap;

        let mut chunks = Vec::new();
        let mut lo = 0;
        let mut tokens = 0;
        let mut overlap_len = 0;

        for (i, piece) in pieces.iter().enumerate() {
            if i > lo && tokens + piece.tokens > chunk_size {
                // The running sum only bounds the count from above; recount before giving up
                let exact = self.counter.count(&text[pieces[lo].start..piece.end]);
                if exact <= chunk_size {
                    tokens = exact;
                    continue;
                }

                chunks.push(self.make_chunk(text, &pieces[lo..i], overlap_len));

                // Carry trailing pieces while they fit the overlap and leave room for `piece`
                let mut carried = 0;
                let mut next_lo = i;
                while next_lo > lo + 1 {
                    let candidate = pieces[next_lo - 1].tokens;
                    if carried + candidate > chunk_overlap
                        || carried + candidate + piece.tokens > chunk_size
                    {
                        break;
                    }
                    carried += candidate;
                    next_lo -= 1;
                }

                overlap_len = pieces[i].start - pieces[next_lo].start;
                lo = next_lo;
                tokens = carried;
            }
            tokens += piece.tokens;
        }

        if lo < pieces.len() {
            chunks.push(self.make_chunk(text, &pieces[lo..], overlap_len));
        }

        chunks
    }

    fn make_chunk(&self, text: &str, pieces: &[Piece], overlap_len: usize) -> Chunk {
        let start = pieces[0].start;
        let end = pieces[pieces.len() - 1].end;
        let chunk_text = &text[start..end];
        Chunk {
            text: chunk_text.to_string(),
            start,
            end,
            overlap_len,
            tokens: self.counter.count(chunk_text),
        }
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(SegmenterConfig::default())
    }
}
