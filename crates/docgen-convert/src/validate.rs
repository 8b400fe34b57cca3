//! Validation of user-supplied filenames and uploads.

/// Maximum filename length in bytes.
const MAX_FILENAME_LEN: usize = 255;

/// Characters not allowed anywhere in a filename.
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\0'];

/// Number of leading bytes inspected for binary content.
const BINARY_SNIFF_LEN: usize = 512;

/// Check that a filename is a single, visible, portable path component.
///
/// Rejects empty names, `..`, path separators, leading dots, characters that
/// are illegal on common filesystems, and names longer than 255 bytes.
#[must_use]
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_FILENAME_LEN
        && !name.contains("..")
        && !name.contains(['/', '\\'])
        && !name.starts_with('.')
        && !name.contains(ILLEGAL_CHARS)
}

/// Check that a filename has a Markdown extension (`.md` or `.markdown`).
#[must_use]
pub fn is_markdown_filename(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".md") || lower.ends_with(".markdown")
}

/// Check whether content looks binary (a NUL byte within the first 512 bytes).
#[must_use]
pub fn looks_binary(content: &[u8]) -> bool {
    content.iter().take(BINARY_SNIFF_LEN).any(|&b| b == 0)
}
