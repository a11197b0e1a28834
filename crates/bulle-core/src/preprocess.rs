use bulle_types::{DetectedBlock, TextBlock};
use unicode_normalization::UnicodeNormalization;

/// NFKC-normalize and fold line breaks and runs of whitespace into single spaces
pub fn normalize_text(text: &str) -> String {
    let normalized: String = text.nfkc().collect();
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep only blocks worth translating: non-empty text with real geometry
pub fn usable_blocks(blocks: Vec<DetectedBlock>) -> Vec<TextBlock> {
    let total = blocks.len();
    let usable: Vec<TextBlock> = blocks
        .into_iter()
        .filter_map(|block| {
            let bounds = block.bounds?;
            TextBlock::new(normalize_text(&block.text), bounds)
        })
        .collect();

    if usable.len() < total {
        tracing::debug!("dropped {} of {} detected blocks", total - usable.len(), total);
    }
    usable
}
