// layout.rs: compile a `<name>separator` layout string into an ordered token list
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::field::FieldKind;

pub const DEFAULT_LAYOUT: &str = "<date> <time> <level> <thread> <class> ";

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([\w-]+)>").unwrap());

/// Role of a token once its name has been classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Known(FieldKind),
    Custom,
}

/// One named field slot in a [`Layout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    name: String,
    separator: Option<String>,
    kind: TokenKind,
}

impl Token {
    pub fn new(name: impl Into<String>, separator: Option<String>) -> Self {
        let name = name.into();
        let kind = match FieldKind::lookup(&name) {
            Some(k) => TokenKind::Known(k),
            None => TokenKind::Custom,
        };
        Self { name, separator, kind }
    }

    fn custom(name: impl Into<String>, separator: Option<String>) -> Self {
        Self { name: name.into(), separator, kind: TokenKind::Custom }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text terminating this token's value, `None` for the implicit message token.
    pub fn separator(&self) -> Option<&str> {
        self.separator.as_deref()
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn field_kind(&self) -> Option<FieldKind> {
        match self.kind {
            TokenKind::Known(k) => Some(k),
            TokenKind::Custom => None,
        }
    }

    pub fn is_message(&self) -> bool {
        self.kind == TokenKind::Known(FieldKind::Message)
    }
}

/// Compiled description of a log line. Immutable once built; reuse it for every line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    prefix: String,
    tokens: Vec<Token>,
    message_index: usize,
}

impl Layout {
    /// Compile a layout specification such as `"<date> <time> <level> [<thread>] <class> - "`.
    ///
    /// Never fails: text without any `<name>` marker yields a layout holding only the
    /// implicit message token. Literal text before the first marker is kept as a prefix
    /// the splitter skips when a line starts with it.
    pub fn compile(text: &str) -> Layout {
        let collapsed = WHITESPACE_RUN.replace_all(text, " ");
        let markers: Vec<_> = MARKER_RE.captures_iter(&collapsed).collect();
        let prefix = match markers.first().and_then(|caps| caps.get(0)) {
            Some(first) => collapsed[..first.start()].to_string(),
            None => String::new(),
        };

        let mut tokens: Vec<Token> = Vec::new();
        let mut message_index: Option<usize> = None;
        for (i, caps) in markers.iter().enumerate() {
            let name = &caps[1];
            // a separator runs up to the next marker, stray `<` included
            let start = caps.get(0).map_or(0, |m| m.end());
            let end = markers.get(i + 1).and_then(|next| next.get(0)).map_or(collapsed.len(), |m| m.start());
            let separator = Some(collapsed[start..end].to_string());
            let token = Token::new(name, separator.clone());
            if token.is_message() {
                if message_index.is_some() {
                    tracing::warn!(token = name, "layout has more than one message token; treating the extra one as a custom field");
                    tokens.push(Token::custom(name, separator));
                    continue;
                }
                message_index = Some(tokens.len());
            }
            tokens.push(token);
        }

        let message_index = match message_index {
            Some(i) => i,
            None => {
                tracing::debug!("did not find message token in layout, assuming it is at the end");
                tokens.push(Token::new(FieldKind::Message.as_str(), None));
                tokens.len() - 1
            }
        };

        Layout { prefix, tokens, message_index }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn message_index(&self) -> usize {
        self.message_index
    }

    pub fn message_token(&self) -> &Token {
        &self.tokens[self.message_index]
    }
}

impl Default for Layout {
    fn default() -> Self {
        Layout::compile(DEFAULT_LAYOUT)
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix)?;
        for t in &self.tokens {
            write!(f, "<{}>{}", t.name, t.separator().unwrap_or(""))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(layout: &Layout) -> Vec<(String, Option<String>, TokenKind)> {
        layout
            .tokens()
            .iter()
            .map(|t| (t.name().to_string(), t.separator().map(str::to_string), t.kind()))
            .collect()
    }

    fn known(k: FieldKind) -> TokenKind {
        TokenKind::Known(k)
    }

    #[test]
    fn test_compile_with_message_token() {
        let layout = Layout::compile("[<timestamp>] <thread> (<logger>)  -  <customField>: <message>");
        assert_eq!(layout.prefix(), "[");
        assert_eq!(
            pairs(&layout),
            vec![
                ("timestamp".to_string(), Some("] ".to_string()), known(FieldKind::Timestamp)),
                ("thread".to_string(), Some(" (".to_string()), known(FieldKind::Thread)),
                // extra whitespace collapses
                ("logger".to_string(), Some(") - ".to_string()), known(FieldKind::Logger)),
                ("customField".to_string(), Some(": ".to_string()), TokenKind::Custom),
                ("message".to_string(), Some(String::new()), known(FieldKind::Message)),
            ]
        );
        assert_eq!(layout.message_index(), 4);
    }

    #[test]
    fn test_compile_appends_implicit_message() {
        let layout = Layout::compile("<line> <level> [<date> <time>]   <class>  -  :  ");
        assert_eq!(
            pairs(&layout),
            vec![
                ("line".to_string(), Some(" ".to_string()), known(FieldKind::Line)),
                ("level".to_string(), Some(" [".to_string()), known(FieldKind::Level)),
                ("date".to_string(), Some(" ".to_string()), known(FieldKind::Date)),
                ("time".to_string(), Some("] ".to_string()), known(FieldKind::Time)),
                ("class".to_string(), Some(" - : ".to_string()), TokenKind::Custom),
                ("message".to_string(), None, known(FieldKind::Message)),
            ]
        );
        let last = layout.tokens().last().unwrap();
        assert!(last.is_message());
        assert_eq!(last.separator(), None);
    }

    #[test]
    fn test_compile_message_in_the_middle() {
        let layout = Layout::compile("[<timestamp>] <thread> (<logger>) [<message>] <customField>");
        assert_eq!(layout.message_index(), 3);
        assert_eq!(layout.tokens().len(), 5);
        assert_eq!(layout.message_token().separator(), Some("] "));
        assert_eq!(layout.tokens()[4].name(), "customField");
        assert_eq!(layout.tokens()[4].separator(), Some(""));
    }

    #[test]
    fn test_compile_without_markers() {
        let layout = Layout::compile("no markers here");
        assert_eq!(layout.tokens().len(), 1);
        assert!(layout.message_token().is_message());

        let empty = Layout::compile("");
        assert_eq!(empty.tokens().len(), 1);
        assert_eq!(empty.prefix(), "");
    }

    #[test]
    fn test_duplicate_message_token_is_demoted() {
        let layout = Layout::compile("<message> | <MESSAGE>");
        assert_eq!(layout.message_index(), 0);
        assert_eq!(layout.tokens()[1].kind(), TokenKind::Custom);
        assert_eq!(layout.tokens().iter().filter(|t| t.is_message()).count(), 1);
    }

    #[test]
    fn test_display_and_default() {
        let layout = Layout::default();
        assert_eq!(layout.to_string(), "<date> <time> <level> <thread> <class> <message>");
        assert_eq!(Layout::compile("[<level>]  <message>").to_string(), "[<level>] <message>");
    }

    #[test]
    fn test_stray_angle_bracket_stays_literal() {
        let layout = Layout::compile("a<b <date> <x <time> ");
        assert_eq!(layout.prefix(), "a<b ");
        assert_eq!(layout.tokens()[0].separator(), Some(" <x "));
        assert_eq!(layout.tokens()[1].name(), "time");
        assert_eq!(layout.to_string(), "a<b <date> <x <time> <message>");
    }

    #[test]
    fn test_hyphenated_level_alias() {
        let layout = Layout::compile("<log-level> ");
        assert_eq!(layout.tokens()[0].field_kind(), Some(FieldKind::Level));
    }
}
