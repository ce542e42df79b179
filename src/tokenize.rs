//! Filename tokenization.
//!
//! A filename such as `Star-Wars_A_New_Hope.gif` becomes the token list
//! `["star", "wars", "a", "new", "hope"]`. Consecutive delimiters yield
//! empty tokens, which are kept: the prefix matcher treats them like any
//! other token.

/// Extensions stripped before splitting. Matched case-insensitively.
pub const KNOWN_EXTENSIONS: &[&str] = &["gif", "jpg", "jpeg", "png", "webp", "bmp"];

const DELIMITERS: [char; 2] = ['-', '_'];

/// Derive the lowercase search tokens of a filename.
///
/// Never fails and never returns an empty list.
pub fn tokenize(filename: &str) -> Vec<String> {
    strip_known_extension(filename)
        .to_lowercase()
        .split(DELIMITERS)
        .map(str::to_string)
        .collect()
}

/// Remove a trailing known extension (`.gif`, `.PNG`, ...), if present.
pub fn strip_known_extension(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, ext))
            if KNOWN_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext)) =>
        {
            stem
        }
        _ => filename,
    }
}
