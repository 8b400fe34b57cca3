//! Restore failed diagrams as code blocks.
//!
//! A block whose rendering failed must not leave a dangling image reference
//! in the document, so its placeholder is swapped back for the original
//! fenced block.

use crate::extract::DiagramBlock;

/// Replace the placeholders of failed blocks with their original text.
///
/// Blocks are processed in descending ordinal order and each placeholder is
/// replaced at most once. Ordinals that match no block are ignored, and
/// placeholders no longer present in `text` are left alone, so applying the
/// same failures twice yields the same text.
#[must_use]
pub fn restore_failed_blocks(text: &str, blocks: &[DiagramBlock], failed: &[usize]) -> String {
    let mut failed_blocks: Vec<&DiagramBlock> = blocks
        .iter()
        .filter(|block| failed.contains(&block.ordinal))
        .collect();
    if failed_blocks.is_empty() {
        return text.to_owned();
    }
    failed_blocks.sort_by(|a, b| b.ordinal.cmp(&a.ordinal));

    let mut restored = text.to_owned();
    for block in failed_blocks {
        if restored.contains(&block.placeholder) {
            restored = restored.replacen(&block.placeholder, &block.original_text, 1);
            tracing::info!(block = %block.id, "Restored failed diagram as code block");
        }
    }
    restored
}
