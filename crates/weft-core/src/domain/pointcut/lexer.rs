//! Tokenizer for pointcut expressions.
//!
//! Every token remembers its byte span so parse errors can point at the
//! offending fragment.

use crate::domain::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// Identifier, type pattern, `*` or `..`.
    Word(String),
    At,
    LParen,
    RParen,
    Comma,
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn word(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Word(w) => Some(w),
            _ => None,
        }
    }
}

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '*' | '.' | '[' | ']')
}

pub(crate) fn tokenize(src: &str) -> Result<Vec<Token>, DomainError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let single = match c {
            '@' => Some(TokenKind::At),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            ',' => Some(TokenKind::Comma),
            '!' => Some(TokenKind::Not),
            _ => None,
        };
        if let Some(kind) = single {
            chars.next();
            tokens.push(Token {
                kind,
                start,
                end: start + 1,
            });
            continue;
        }

        if c == '&' || c == '|' {
            chars.next();
            match chars.next() {
                Some((_, next)) if next == c => {
                    let kind = if c == '&' { TokenKind::And } else { TokenKind::Or };
                    tokens.push(Token {
                        kind,
                        start,
                        end: start + 2,
                    });
                }
                _ => {
                    let op = if c == '&' { "&&" } else { "||" };
                    return Err(DomainError::syntax(
                        src,
                        start,
                        c.to_string(),
                        format!("expected '{op}'"),
                    ));
                }
            }
            continue;
        }

        if is_word_char(c) {
            let mut end = start;
            while let Some(&(i, ch)) = chars.peek() {
                if !is_word_char(ch) {
                    break;
                }
                end = i + ch.len_utf8();
                chars.next();
            }
            tokens.push(Token {
                kind: TokenKind::Word(src[start..end].to_owned()),
                start,
                end,
            });
            continue;
        }

        return Err(DomainError::syntax(
            src,
            start,
            c.to_string(),
            "unexpected character",
        ));
    }

    Ok(tokens)
}
