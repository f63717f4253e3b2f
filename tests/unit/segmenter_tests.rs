/*!
 * Tests for document chunking
 */

use std::sync::Arc;

use doctrans::errors::SegmentationError;
use doctrans::translation::{
    ApproxTokenCounter, CharTokenCounter, Cl100kTokenCounter, Segmentation, Segmenter,
    SegmenterConfig, TokenCounter,
};
use crate::common;

fn segmenter(chunk_size: usize, chunk_overlap: usize) -> Segmenter {
    Segmenter::with_counter(
        SegmenterConfig {
            chunk_size,
            chunk_overlap,
            split_long_words: true,
        },
        Arc::new(CharTokenCounter),
    )
}

fn assert_within_budget(segmentation: &Segmentation, chunk_size: usize) {
    for chunk in &segmentation.chunks {
        assert!(
            chunk.tokens <= chunk_size,
            "chunk {}..{} has {} tokens",
            chunk.start,
            chunk.end,
            chunk.tokens
        );
    }
}

const MIXED_DOCUMENT: &str = "# Title\n\nFirst paragraph. It has two sentences!\nAnd a second line?\n\n\
    \u{20}   Indented paragraph with trailing spaces   \n\n\n第二部分。这里是中文。还有一句！\n\n\
    Final words without a trailing newline";

/// Test that chunks always stitch back into the source
#[test]
fn test_split_variousBudgets_shouldReconstructSourceExactly() {
    for chunk_size in [8, 13, 25, 40, 100, 1000] {
        let segmentation = segmenter(chunk_size, 0).split(MIXED_DOCUMENT).unwrap();
        assert_eq!(segmentation.reconstruct(), MIXED_DOCUMENT, "chunk_size={}", chunk_size);
        assert_within_budget(&segmentation, chunk_size);
    }
}

#[test]
fn test_split_withOverlap_shouldReconstructAfterDroppingOverlap() {
    for (chunk_size, overlap) in [(20, 5), (30, 10), (50, 49)] {
        let segmentation = segmenter(chunk_size, overlap).split(MIXED_DOCUMENT).unwrap();

        assert_eq!(segmentation.reconstruct(), MIXED_DOCUMENT);
        assert_within_budget(&segmentation, chunk_size);
        assert_eq!(segmentation.chunks[0].overlap_len, 0);
        for pair in segmentation.chunks.windows(2) {
            assert_eq!(pair[1].start + pair[1].overlap_len, pair[0].end);
        }
    }
}

#[test]
fn test_split_chunksShouldBeContiguousByteRanges() {
    let segmentation = segmenter(16, 0).split(MIXED_DOCUMENT).unwrap();

    assert_eq!(segmentation.chunks.first().map(|c| c.start), Some(0));
    assert_eq!(segmentation.chunks.last().map(|c| c.end), Some(MIXED_DOCUMENT.len()));
    for chunk in &segmentation.chunks {
        assert_eq!(&MIXED_DOCUMENT[chunk.start..chunk.end], chunk.text);
    }
}

/// Three paragraphs of 1500 units each with a 2000-unit budget
#[test]
fn test_split_threeLargeParagraphs_shouldYieldOneChunkEach() {
    let document = common::paragraphs(3, 1500);

    let segmentation = segmenter(2000, 0).split(&document).unwrap();

    assert_eq!(segmentation.chunks.len(), 3);
    assert!(segmentation.chunks[0].text.starts_with("P1 "));
    assert!(segmentation.chunks[1].text.starts_with("P2 "));
    assert!(segmentation.chunks[2].text.starts_with("P3 "));
    assert!(segmentation.chunks[0].text.ends_with("\n\n"));
    assert_eq!(segmentation.reconstruct(), document);
}

#[test]
fn test_split_smallParagraphs_shouldBePackedTogether() {
    let document = common::paragraphs(10, 100);

    let segmentation = segmenter(450, 0).split(&document).unwrap();

    // 102 units per paragraph with its separator, so four fit in a chunk
    assert_eq!(segmentation.chunks.len(), 3);
    assert_within_budget(&segmentation, 450);
}

#[test]
fn test_split_defaultCounter_shouldCountCl100kTokens() {
    let document = common::paragraphs(3, 6000);
    let segmenter = Segmenter::new(SegmenterConfig::default());

    let segmentation = segmenter.split(&document).unwrap();

    assert_eq!(segmenter.count_tokens(&document), Cl100kTokenCounter.count(&document));
    assert_eq!(segmentation.chunks.len(), 3);
    for chunk in &segmentation.chunks {
        assert_eq!(chunk.tokens, Cl100kTokenCounter.count(&chunk.text));
    }
    assert_within_budget(&segmentation, 2000);
    assert_eq!(segmentation.reconstruct(), document);
}

fn chinese_document(count: usize) -> String {
    (0..count)
        .map(|i| format!("第{}段。机器翻译系统会把长文档切分成较小的片段，然后逐段发送给模型。", i + 1))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn assert_cl100k_within_budget(segmentation: &Segmentation, chunk_size: usize) {
    for chunk in &segmentation.chunks {
        let tokens = Cl100kTokenCounter.count(&chunk.text);
        assert!(
            tokens <= chunk_size,
            "chunk {}..{} has {} cl100k tokens",
            chunk.start,
            chunk.end,
            tokens
        );
    }
}

#[test]
fn test_split_chineseDocument_defaultCounter_shouldKeepChunksWithinBudget() {
    let document = chinese_document(200);
    let segmenter = Segmenter::new(SegmenterConfig::default());

    let segmentation = segmenter.split(&document).unwrap();

    assert!(segmentation.chunks.len() > 1);
    assert_cl100k_within_budget(&segmentation, 2000);
    assert_eq!(segmentation.reconstruct(), document);
}

#[test]
fn test_split_chineseDocument_approxCounter_shouldKeepChunksWithinBudget() {
    let document = chinese_document(200);
    let segmenter = Segmenter::with_counter(SegmenterConfig::default(), Arc::new(ApproxTokenCounter));

    let segmentation = segmenter.split(&document).unwrap();

    assert!(segmentation.chunks.len() > 1);
    assert_within_budget(&segmentation, 2000);
    assert_cl100k_within_budget(&segmentation, 2000);
    assert_eq!(segmentation.reconstruct(), document);
}

#[test]
fn test_split_whitespaceOnlyInput_shouldYieldOneChunk() {
    let segmentation = segmenter(10, 0).split("   \n\n  ").unwrap();

    assert_eq!(segmentation.chunks.len(), 1);
    assert_eq!(segmentation.chunks[0].text, "   \n\n  ");
}

#[test]
fn test_split_longWordWithSplittingDisabled_shouldReportOffsetAndPreview() {
    let segmenter = Segmenter::with_counter(
        SegmenterConfig {
            chunk_size: 8,
            chunk_overlap: 0,
            split_long_words: false,
        },
        Arc::new(CharTokenCounter),
    );

    let err = segmenter.split("ok antidisestablishmentarianism ok").unwrap_err();

    match err {
        SegmentationError::UnitExceedsBudget {
            offset,
            tokens,
            chunk_size,
            preview,
        } => {
            assert_eq!(offset, 3);
            assert_eq!(tokens, 28);
            assert_eq!(chunk_size, 8);
            assert!(preview.starts_with("antidis"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_split_longWord_shouldBeFlaggedWithItsOffset() {
    let text = "ok antidisestablishmentarianism ok";
    let segmentation = segmenter(8, 0).split(text).unwrap();

    assert_eq!(segmentation.oversized_units.len(), 1);
    assert_eq!(segmentation.oversized_units[0].offset, 3);
    assert_eq!(segmentation.oversized_units[0].tokens, 28);
    assert_within_budget(&segmentation, 8);
    assert_eq!(segmentation.reconstruct(), text);
}

/// Counter under which one specific character is heavier than any budget
struct HeavyStarCounter;

impl TokenCounter for HeavyStarCounter {
    fn count(&self, text: &str) -> usize {
        text.chars().map(|c| if c == '*' { 100 } else { 1 }).sum()
    }
}

#[test]
fn test_split_singleCharacterOverBudget_shouldAlwaysFail() {
    let segmenter = Segmenter::with_counter(
        SegmenterConfig {
            chunk_size: 10,
            chunk_overlap: 0,
            split_long_words: true,
        },
        Arc::new(HeavyStarCounter),
    );

    let err = segmenter.split("abc * def").unwrap_err();
    assert!(matches!(err, SegmentationError::UnitExceedsBudget { offset: 4, tokens: 100, .. }));
}
