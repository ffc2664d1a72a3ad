//! Lexer: source text → token stream.
//!
//! Built on `winnow` 0.7. Match priority, highest first: whitespace and
//! `#` comments, arrow operators (longest first), string literals, color
//! literals, number literals, keywords, identifiers, punctuation.
//!
//! Keywords are classified *after* a full identifier run is taken, so
//! `rectangle1` is one identifier and never `rectangle` followed by `1`.
//! The lexer never fails: unmatched runs become [`LexError`]s and lexing
//! resumes at the next character.

use crate::ast::{ArrowType, SHAPE_KEYWORDS};
use crate::span::{LineIndex, Span};
use winnow::ascii::digit1;
use winnow::combinator::{alt, delimited, opt};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_till, take_while};

/// The closed set of token classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `group`
    Group,
    /// `arrow`
    FreeArrow,
    /// `@layout`
    Layout,
    /// One of [`SHAPE_KEYWORDS`].
    ShapeName,
    Arrow(ArrowType),
    StringLit,
    ColorLit,
    NumberLit,
    Identifier,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Colon,
    Comma,
    Dot,
}

impl TokenKind {
    /// Human-readable name used in diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Group => "'group'",
            Self::FreeArrow => "'arrow'",
            Self::Layout => "'@layout'",
            Self::ShapeName => "shape name",
            Self::Arrow(_) => "arrow operator",
            Self::StringLit => "string",
            Self::ColorLit => "color",
            Self::NumberLit => "number",
            Self::Identifier => "identifier",
            Self::LBrace => "'{'",
            Self::RBrace => "'}'",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::Colon => "':'",
            Self::Comma => "','",
            Self::Dot => "'.'",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    /// Raw source text, quotes included for strings.
    pub text: &'src str,
    pub span: Span,
}

impl<'src> Token<'src> {
    /// String contents between the quotes, verbatim (no escapes).
    pub fn unquoted(&self) -> &'src str {
        self.text
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(self.text)
    }
}

/// An unrecognized run of characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

/// Tokenize `source`. Always returns every token it could recognize.
pub fn tokenize(source: &str) -> (Vec<Token<'_>>, Vec<LexError>) {
    let index = LineIndex::new(source);
    let mut tokens: Vec<Token<'_>> = Vec::new();
    let mut errors = Vec::new();
    let mut unmatched: Option<usize> = None;
    let mut rest = source;

    while !rest.is_empty() {
        let start = source.len() - rest.len();

        if skip_whitespace(&mut rest) {
            flush_unmatched(&mut unmatched, start, source, &index, &mut errors);
            continue;
        }

        if rest.starts_with('#') {
            flush_unmatched(&mut unmatched, start, source, &index, &mut errors);
            let after_colon = tokens.last().is_some_and(|t| t.kind == TokenKind::Colon);
            let checkpoint = rest;
            if after_colon && color_literal.parse_next(&mut rest).is_ok() {
                let end = source.len() - rest.len();
                tokens.push(Token {
                    kind: TokenKind::ColorLit,
                    text: &source[start..end],
                    span: index.span(start, end),
                });
            } else {
                rest = checkpoint;
                skip_comment(&mut rest);
            }
            continue;
        }

        let checkpoint = rest;
        match token_kind.parse_next(&mut rest) {
            Ok(kind) => {
                flush_unmatched(&mut unmatched, start, source, &index, &mut errors);
                let end = source.len() - rest.len();
                tokens.push(Token {
                    kind,
                    text: &source[start..end],
                    span: index.span(start, end),
                });
            }
            Err(_) => {
                rest = checkpoint;
                let mut chars = rest.chars();
                chars.next();
                rest = chars.as_str();
                unmatched.get_or_insert(start);
            }
        }
    }

    flush_unmatched(&mut unmatched, source.len(), source, &index, &mut errors);
    log::debug!(
        "lexed {} tokens, {} lexical errors",
        tokens.len(),
        errors.len()
    );
    (tokens, errors)
}

fn flush_unmatched(
    unmatched: &mut Option<usize>,
    end: usize,
    source: &str,
    index: &LineIndex<'_>,
    errors: &mut Vec<LexError>,
) {
    if let Some(start) = unmatched.take() {
        let text = &source[start..end];
        errors.push(LexError {
            message: format!("unexpected character sequence `{text}`"),
            span: index.span(start, end),
        });
    }
}

// ─── Low-level lexers ───────────────────────────────────────────────────

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Returns `true` if anything was consumed.
fn skip_whitespace(input: &mut &str) -> bool {
    take_while::<_, _, ContextError>(1.., char::is_whitespace)
        .parse_next(input)
        .is_ok()
}

fn skip_comment(input: &mut &str) {
    let _ = take_till::<_, _, ContextError>(0.., '\n').parse_next(input);
}

fn token_kind(input: &mut &str) -> ModalResult<TokenKind> {
    alt((
        arrow_operator,
        string_literal.value(TokenKind::StringLit),
        number_literal.value(TokenKind::NumberLit),
        layout_keyword.value(TokenKind::Layout),
        word,
        punctuation,
    ))
    .parse_next(input)
}

fn arrow_operator(input: &mut &str) -> ModalResult<TokenKind> {
    alt((
        "<->".value(TokenKind::Arrow(ArrowType::Both)),
        "-->".value(TokenKind::Arrow(ArrowType::Dotted)),
        "==>".value(TokenKind::Arrow(ArrowType::Thick)),
        "<-".value(TokenKind::Arrow(ArrowType::Left)),
        "->".value(TokenKind::Arrow(ArrowType::Right)),
        "--".value(TokenKind::Arrow(ArrowType::Line)),
    ))
    .parse_next(input)
}

fn string_literal<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    delimited('"', take_till(0.., '"'), '"').parse_next(input)
}

/// `#` followed by 3–6 hex digits, not running into an identifier.
fn color_literal<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    let literal = ('#', take_while(3..=6, |c: char| c.is_ascii_hexdigit()))
        .take()
        .parse_next(input)?;
    if input.starts_with(is_ident_char) {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    Ok(literal)
}

fn number_literal<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    (opt('-'), digit1).take().parse_next(input)
}

fn identifier_run<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    (one_of(is_ident_start), take_while(0.., is_ident_char))
        .take()
        .parse_next(input)
}

fn layout_keyword<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    ('@', identifier_run)
        .take()
        .verify(|s: &str| s == "@layout")
        .parse_next(input)
}

/// A full identifier run, then keyword classification.
fn word(input: &mut &str) -> ModalResult<TokenKind> {
    identifier_run
        .map(|w: &str| match w {
            "group" => TokenKind::Group,
            "arrow" => TokenKind::FreeArrow,
            _ if SHAPE_KEYWORDS.contains(&w) => TokenKind::ShapeName,
            _ => TokenKind::Identifier,
        })
        .parse_next(input)
}

fn punctuation(input: &mut &str) -> ModalResult<TokenKind> {
    any.verify_map(|c: char| match c {
        '{' => Some(TokenKind::LBrace),
        '}' => Some(TokenKind::RBrace),
        '(' => Some(TokenKind::LParen),
        ')' => Some(TokenKind::RParen),
        ':' => Some(TokenKind::Colon),
        ',' => Some(TokenKind::Comma),
        '.' => Some(TokenKind::Dot),
        _ => None,
    })
    .parse_next(input)
}
