// splitter.rs: walk a layout's tokens over one plaintext line
use memchr::memmem;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

use crate::error::SplitError;
use crate::layout::Layout;
use crate::record::PartialRecord;

static MULTIPLE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

/// Collapse runs of two or more spaces to one. Lossy: spaces inside a JSON message
/// collapse too.
pub fn collapse_spaces(line: &str) -> Cow<'_, str> {
    MULTIPLE_SPACES.replace_all(line, " ")
}

/// Split `line` according to `layout`.
///
/// Each token but the last ends at the first occurrence of its separator at or after
/// the cursor; the last token takes the rest of the line. A missing separator fails
/// the whole line.
pub fn split_line(layout: &Layout, line: &str, line_number: u64) -> Result<PartialRecord, SplitError> {
    let text = collapse_spaces(line);
    let bytes = text.as_bytes();
    let tokens = layout.tokens();
    let last = tokens.len().saturating_sub(1);

    let mut cursor = 0usize;
    if !layout.prefix().is_empty() && text.starts_with(layout.prefix()) {
        cursor = layout.prefix().len();
    }

    let mut partial = PartialRecord::new();
    for (i, token) in tokens.iter().enumerate() {
        let separator = token.separator().unwrap_or("");
        let end = if i == last || token.separator().is_none() {
            text.len()
        } else {
            match memmem::find(&bytes[cursor..], separator.as_bytes()) {
                Some(pos) => cursor + pos,
                None => {
                    return Err(SplitError {
                        line_number,
                        token: token.name().to_string(),
                        line: text.to_string(),
                    })
                }
            }
        };

        partial.assign(token, text[cursor..end].trim().to_string());
        cursor = (end + separator.len()).min(text.len());
    }

    Ok(partial)
}
