/*!
 * Token counting for chunk budgets.
 *
 * Chunk sizes are expressed in model token units. The default counter runs
 * the cl100k BPE vocabulary, so a chunk of `chunk_size` tokens is exactly
 * that many tokens for cl100k models. `ApproxTokenCounter` is a cheaper
 * upper-bound estimate: four ASCII bytes per token and one and a half tokens
 * per non-ASCII character, which covers CJK text where cl100k spends one to
 * two tokens per character.
 */

use std::sync::LazyLock;

use tiktoken_rs::CoreBPE;

static CL100K: LazyLock<CoreBPE> =
    LazyLock::new(|| tiktoken_rs::cl100k_base().expect("embedded cl100k vocabulary"));

/// Pluggable token counting strategy.
///
/// Implementations should be subadditive (`count(a + b) <= count(a) + count(b)`):
/// the segmenter sums the counts of adjacent pieces to size a chunk.
pub trait TokenCounter: Send + Sync {
    /// Number of token units in `text`.
    fn count(&self, text: &str) -> usize;
}

/// Default counter: exact cl100k token count.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cl100kTokenCounter;

impl TokenCounter for Cl100kTokenCounter {
    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        CL100K.encode_ordinary(text).len()
    }
}

/// Tokenizer-free estimate that never undercounts cl100k by much.
///
/// ASCII costs 1 token per 4 bytes, each other character 1.5 tokens, both
/// rounded up.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxTokenCounter;

impl TokenCounter for ApproxTokenCounter {
    fn count(&self, text: &str) -> usize {
        let (ascii_bytes, other_chars) = text.chars().fold((0usize, 0usize), |(ascii, other), c| {
            if c.is_ascii() {
                (ascii + 1, other)
            } else {
                (ascii, other + 1)
            }
        });
        ascii_bytes.div_ceil(4) + (3 * other_chars).div_ceil(2)
    }
}

/// Counts Unicode scalar values. Handy in tests where budgets need to be exact.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharTokenCounter;

impl TokenCounter for CharTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.chars().count()
    }
}
