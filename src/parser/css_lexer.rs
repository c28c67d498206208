//! Locates `url(...)` references in a stylesheet
//!
//! Tokenizing is left to `cssparser`. The scanner walks every token, descending into
//! blocks and functions, and records the byte span and unescaped value of each url.
//! Comments and strings are single tokens, so `url(` inside them is never reported.
//!
//! `cssparser` recovers from malformed input silently. The recoveries that matter here
//! (bad strings and urls, input ending inside a comment, string or url) are turned into
//! [`LexError`]s so that a broken stylesheet is kept exactly as fetched.

use cssparser::{ParseError, Parser, ParserInput, SourcePosition, Token};
use std::ops::Range;
use thiserror::Error;

/// A `url(...)` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRef {
    /// Byte range of the whole reference, `url(` through `)`
    pub span: Range<usize>,
    /// The unescaped link
    pub value: String,
}

/// Malformed stylesheet input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("stylesheet is not valid UTF-8")]
    InvalidUtf8,

    #[error("unterminated comment starting at byte {0}")]
    UnterminatedComment(usize),

    #[error("unterminated string starting at byte {0}")]
    UnterminatedString(usize),

    #[error("newline inside string starting at byte {0}")]
    NewlineInString(usize),

    #[error("malformed url starting at byte {0}")]
    BadUrl(usize),

    #[error("unterminated url starting at byte {0}")]
    UnterminatedUrl(usize),
}

/// Returns every url reference of `content` in source order
///
/// # Example
///
/// ```
/// use sumi_mirror::parser::css_lexer::scan;
///
/// let urls = scan(b"a { background: url('bg.png') }").unwrap();
/// assert_eq!(urls[0].value, "bg.png");
/// assert_eq!(urls[0].span, 16..29);
/// ```
pub fn scan(content: &[u8]) -> Result<Vec<UrlRef>, LexError> {
    let css = std::str::from_utf8(content).map_err(|_| LexError::InvalidUtf8)?;
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);

    let mut scanner = Scanner::default();
    scanner.block(&mut parser);
    match scanner.error {
        Some(error) => Err(error),
        None => Ok(scanner.urls),
    }
}

#[derive(Default)]
struct Scanner {
    urls: Vec<UrlRef>,
    error: Option<LexError>,
}

impl Scanner {
    /// Keeps the first error only
    fn fail(&mut self, error: LexError) {
        self.error.get_or_insert(error);
    }

    fn block<'i>(&mut self, parser: &mut Parser<'i, '_>) {
        while let Some((start, token, raw)) = next_token(parser) {
            let at = start.byte_index();
            match token {
                Token::Comment(_) if !is_closed_comment(raw) => {
                    self.fail(LexError::UnterminatedComment(at))
                }
                Token::QuotedString(_) if !is_closed_string(raw) => {
                    self.fail(LexError::UnterminatedString(at))
                }
                Token::BadString(_) => self.fail(LexError::NewlineInString(at)),
                Token::BadUrl(_) => self.fail(LexError::BadUrl(at)),
                Token::UnquotedUrl(value) => {
                    if raw.ends_with(')') {
                        self.urls.push(UrlRef {
                            span: at..at + raw.len(),
                            value: value.to_string(),
                        });
                    } else {
                        self.fail(LexError::UnterminatedUrl(at));
                    }
                }
                Token::Function(ref name) if name.eq_ignore_ascii_case("url") => {
                    self.quoted_url(parser, start)
                }
                Token::Function(_)
                | Token::ParenthesisBlock
                | Token::SquareBracketBlock
                | Token::CurlyBracketBlock => {
                    // The nested scan consumes the whole block, so this never fails
                    let _ = parser.parse_nested_block(|nested| {
                        self.block(nested);
                        Ok::<(), ParseError<'i, ()>>(())
                    });
                }
                _ => {}
            }
        }
    }

    /// Handles `url(` followed by a quoted string; the function token was just consumed
    fn quoted_url<'i>(&mut self, parser: &mut Parser<'i, '_>, start: SourcePosition) {
        let at = start.byte_index();
        let mut value = None;
        let mut malformed = false;

        let _ = parser.parse_nested_block(|nested| {
            while let Some((inner_start, token, raw)) = next_token(nested) {
                let inner_at = inner_start.byte_index();
                match token {
                    Token::WhiteSpace(_) => {}
                    Token::Comment(_) if !is_closed_comment(raw) => {
                        self.fail(LexError::UnterminatedComment(inner_at))
                    }
                    Token::Comment(_) => {}
                    Token::QuotedString(_) if !is_closed_string(raw) => {
                        self.fail(LexError::UnterminatedString(inner_at))
                    }
                    Token::QuotedString(text) if value.is_none() => value = Some(text.to_string()),
                    Token::BadString(_) => self.fail(LexError::NewlineInString(inner_at)),
                    _ => malformed = true,
                }
            }
            Ok::<(), ParseError<'i, ()>>(())
        });

        let raw = parser.slice_from(start);
        if !raw.ends_with(')') {
            return self.fail(LexError::UnterminatedUrl(at));
        }
        match value {
            Some(value) if !malformed => self.urls.push(UrlRef {
                span: at..at + raw.len(),
                value,
            }),
            _ => self.fail(LexError::BadUrl(at)),
        }
    }
}

/// Next token including whitespace and comments, with its start and source text
fn next_token<'i>(parser: &mut Parser<'i, '_>) -> Option<(SourcePosition, Token<'i>, &'i str)> {
    let start = parser.position();
    let token = parser.next_including_whitespace_and_comments().ok()?.clone();
    Some((start, token, parser.slice_from(start)))
}

fn is_closed_comment(raw: &str) -> bool {
    raw.len() >= 4 && raw.ends_with("*/")
}

/// True if the string token ends with its opening quote and that quote is not escaped
fn is_closed_string(raw: &str) -> bool {
    let Some(quote) = raw.chars().next() else {
        return false;
    };
    if raw.len() < 2 || !raw.ends_with(quote) {
        return false;
    }

    let body = &raw[..raw.len() - quote.len_utf8()];
    let backslashes = body.bytes().rev().take_while(|&b| b == b'\\').count();
    backslashes % 2 == 0
}
