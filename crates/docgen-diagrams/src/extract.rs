//! Diagram block extraction.
//!
//! Finds fenced `mermaid` code blocks, keeps the ones whose first keyword is
//! a recognized [`DiagramKind`], and swaps each for an image placeholder
//! pointing at `images/<id>.png`.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use crate::consts::{IMAGES_DIR, PLACEHOLDER_ALT};
use crate::language::DiagramKind;

static MERMAID_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```mermaid\s*\n(.*?)\n```").unwrap());

/// Number of source characters shown in log messages.
const PREVIEW_CHARS: usize = 50;

/// A diagram block extracted from markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramBlock {
    /// Unique id within the request (`diagram-<n>-<suffix>`).
    pub id: String,
    /// Diagram kind detected from the leading keyword.
    pub kind: DiagramKind,
    /// Trimmed diagram source passed to the renderer.
    pub source: String,
    /// The fenced block exactly as it appeared in the input.
    pub original_text: String,
    /// Image filename derived from the id.
    pub image_filename: String,
    /// Image reference substituted for the block.
    pub placeholder: String,
    /// Zero-based position among extracted blocks.
    pub ordinal: usize,
}

impl DiagramBlock {
    fn new(ordinal: usize, kind: DiagramKind, source: &str, original_text: &str) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        let id = format!("diagram-{}-{}", ordinal + 1, &suffix[..8]);
        let image_filename = format!("{id}.png");
        let placeholder = format!("![{PLACEHOLDER_ALT}]({IMAGES_DIR}/{image_filename})");

        Self {
            id,
            kind,
            source: source.to_owned(),
            original_text: original_text.to_owned(),
            image_filename,
            placeholder,
            ordinal,
        }
    }
}

/// Result of scanning a markdown document for diagrams.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Markdown with every extracted block replaced by its placeholder.
    pub text: String,
    /// Extracted blocks in document order.
    pub blocks: Vec<DiagramBlock>,
    /// Number of `mermaid` blocks left in place because their syntax was not recognized.
    pub skipped: usize,
}

impl Extraction {
    /// Whether no diagram was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Extract diagram blocks from markdown.
///
/// The text is rebuilt in a single pass, so every block replaces exactly its
/// own occurrence, even when two blocks are byte-identical. Blocks with
/// unrecognized syntax stay in the text as ordinary code.
///
/// When nothing is extracted the returned text equals the input.
#[must_use]
pub fn extract_diagrams(markdown: &str) -> Extraction {
    let mut blocks: Vec<DiagramBlock> = Vec::new();
    let mut skipped = 0;
    let mut text = String::with_capacity(markdown.len());
    let mut copied_up_to = 0;

    for caps in MERMAID_FENCE.captures_iter(markdown) {
        let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let source = body.as_str().trim();

        let Some(kind) = DiagramKind::detect(source) else {
            skipped += 1;
            tracing::warn!(
                preview = %preview(source),
                "Unsupported diagram syntax, leaving block as code"
            );
            continue;
        };

        let block = DiagramBlock::new(blocks.len(), kind, source, whole.as_str());
        text.push_str(&markdown[copied_up_to..whole.start()]);
        text.push_str(&block.placeholder);
        copied_up_to = whole.end();

        tracing::info!(
            block = %block.id,
            kind = block.kind.keyword(),
            preview = %preview(source),
            "Extracted diagram block"
        );
        blocks.push(block);
    }

    if blocks.is_empty() {
        return Extraction {
            text: markdown.to_owned(),
            blocks,
            skipped,
        };
    }

    text.push_str(&markdown[copied_up_to..]);
    tracing::info!(count = blocks.len(), skipped, "Found diagram blocks");

    Extraction {
        text,
        blocks,
        skipped,
    }
}

fn preview(source: &str) -> String {
    source.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;

    use super::*;

    const SINGLE: &str = "# Title\n```mermaid\nflowchart TD; A-->B\n```\n";

    #[test]
    fn test_no_diagrams_returns_input() {
        let markdown = "# Title\n\nSome text.\n\n```rust\nfn main() {}\n```\n";
        let extraction = extract_diagrams(markdown);

        assert_eq!(extraction.text, markdown);
        assert!(extraction.is_empty());
        assert_eq!(extraction.skipped, 0);
    }

    #[test]
    fn test_single_block() {
        let extraction = extract_diagrams(SINGLE);

        assert_eq!(extraction.blocks.len(), 1);
        let block = &extraction.blocks[0];
        assert_eq!(block.ordinal, 0);
        assert_eq!(block.kind, DiagramKind::Flowchart);
        assert_eq!(block.source, "flowchart TD; A-->B");
        assert_eq!(block.original_text, "```mermaid\nflowchart TD; A-->B\n```");
        assert_eq!(block.image_filename, format!("{}.png", block.id));
        assert_eq!(
            block.placeholder,
            format!("![Mermaid diagram](images/{}.png)", block.id)
        );
        assert_eq!(extraction.text, format!("# Title\n{}\n", block.placeholder));
    }

    #[test]
    fn test_block_id_format() {
        let extraction = extract_diagrams(SINGLE);
        let id = &extraction.blocks[0].id;

        let suffix = id.strip_prefix("diagram-1-").unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_multiple_blocks_get_distinct_placeholders() {
        let markdown = "\
```mermaid
graph TD
  A --> B
```

text

```mermaid
sequenceDiagram
  A->>B: hi
```

```mermaid
pie title Pets
  \"Dogs\" : 3
```
";
        let extraction = extract_diagrams(markdown);

        assert_eq!(extraction.blocks.len(), 3);
        let filenames: HashSet<_> = extraction
            .blocks
            .iter()
            .map(|b| b.image_filename.as_str())
            .collect();
        assert_eq!(filenames.len(), 3);

        for (ordinal, block) in extraction.blocks.iter().enumerate() {
            assert_eq!(block.ordinal, ordinal);
            assert_eq!(extraction.text.matches(&block.placeholder).count(), 1);
        }
        assert_eq!(extraction.text.matches("![Mermaid diagram]").count(), 3);
        assert!(!extraction.text.contains("```mermaid"));
        assert!(extraction.text.contains("\n\ntext\n\n"));
    }

    #[test]
    fn test_identical_blocks_substituted_independently() {
        let block = "```mermaid\ngraph LR\n  A --> B\n```";
        let markdown = format!("{block}\n\nbetween\n\n{block}\n");
        let extraction = extract_diagrams(&markdown);

        assert_eq!(extraction.blocks.len(), 2);
        let (first, second) = (&extraction.blocks[0], &extraction.blocks[1]);
        assert_eq!(first.source, second.source);
        assert_ne!(first.id, second.id);
        assert_ne!(first.image_filename, second.image_filename);
        assert_eq!(
            extraction.text,
            format!("{}\n\nbetween\n\n{}\n", first.placeholder, second.placeholder)
        );
    }

    #[test]
    fn test_unsupported_syntax_left_untouched() {
        let markdown = "```mermaid\nmindmap\n  root\n```\n\n```mermaid\ngantt\n  title Plan\n```\n";
        let extraction = extract_diagrams(markdown);

        assert_eq!(extraction.skipped, 1);
        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(extraction.blocks[0].kind, DiagramKind::Gantt);
        // Ordinals count extracted blocks only
        assert_eq!(extraction.blocks[0].ordinal, 0);
        assert!(extraction.blocks[0].id.starts_with("diagram-1-"));
        assert!(extraction.text.starts_with("```mermaid\nmindmap\n  root\n```\n\n"));
    }

    #[test]
    fn test_only_unsupported_returns_input() {
        let markdown = "```mermaid\nnot a diagram\n```\n";
        let extraction = extract_diagrams(markdown);

        assert_eq!(extraction.text, markdown);
        assert!(extraction.is_empty());
        assert_eq!(extraction.skipped, 1);
    }

    #[test]
    fn test_fence_tag_case_insensitive() {
        let extraction = extract_diagrams("```Mermaid\nclassDiagram\n  A <|-- B\n```");

        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(extraction.blocks[0].kind, DiagramKind::Class);
        assert_eq!(extraction.text, extraction.blocks[0].placeholder);
    }

    #[test]
    fn test_source_is_trimmed_original_is_verbatim() {
        let markdown = "```mermaid  \n\n   erDiagram\n  A ||--o{ B : has\n\n```";
        let extraction = extract_diagrams(markdown);

        let block = &extraction.blocks[0];
        assert_eq!(block.source, "erDiagram\n  A ||--o{ B : has");
        assert_eq!(block.original_text, markdown);
    }

    #[test]
    fn test_other_fences_untouched() {
        let markdown = "```python\nprint('x')\n```\n```mermaid\njourney\n  title Day\n```\n";
        let extraction = extract_diagrams(markdown);

        assert_eq!(extraction.blocks.len(), 1);
        assert!(extraction.text.starts_with("```python\nprint('x')\n```\n"));
    }
}
