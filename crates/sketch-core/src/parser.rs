//! Parser for Sketch source → CST → Document AST.
//!
//! Built on `winnow` 0.7 over a `TokenSlice` of lexer tokens. Productions
//! are small combinator functions; the statement loop is hand-driven so a
//! syntax error in one statement is recorded and parsing resumes at the
//! next statement boundary instead of aborting.
//!
//! Grammar:
//!
//! ```text
//! Document     := Statement*
//! Statement    := GroupDef | LayoutDef | FreeArrowDef | EdgeOrNode
//! GroupDef     := 'group' Identifier StyleSpec? '{' Statement* '}'
//! LayoutDef    := '@layout' ':' (Identifier | ShapeName)
//! FreeArrowDef := 'arrow' '(' StyleProps ')'
//! EdgeOrNode   := NodeRef (Arrow NodeRef AnchorSpec? LabelSpec?)*
//! NodeRef      := Identifier ('.' Identifier)? ShapeSpec? LabelSpec?
//! ShapeSpec    := '(' ShapeType (',' StyleProps)? ')'
//! AnchorSpec   := '(' StyleProps ')'
//! StyleSpec    := '(' StyleProps ')'
//! StyleProps   := StyleProp (',' StyleProp)*
//! StyleProp    := Identifier ':' (ColorLiteral | NumberLiteral | Identifier)
//! LabelSpec    := ':' StringLiteral
//! ```

use crate::ast::{ArrowType, Document, ParseError, ShapeType};
use crate::builder::build_statements;
use crate::cst::{self, NodeRef, ShapeSpec, Spanned, StyleProp, StyleValue};
use crate::lexer::{Token, TokenKind, tokenize};
use crate::span::{LineIndex, Span};
use winnow::combinator::opt;
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::stream::{Stream, TokenSlice};
use winnow::token::any;

type Input<'t> = TokenSlice<'t, Token<'t>>;

/// A grammar violation at a token (or at end of input).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}

/// Parse a Sketch document into its AST.
///
/// Never fails: diagnostics are returned inside the [`Document`]. When any
/// lexical or syntax error occurs the statement list is empty, even though
/// the parser recovered past the error.
#[must_use = "parsing result should be used"]
pub fn parse_document(input: &str) -> Document {
    let (tree, errors) = parse_cst(input);
    if !errors.is_empty() {
        log::debug!("parse produced {} diagnostics", errors.len());
        return Document {
            statements: Vec::new(),
            errors,
        };
    }
    let statements = build_statements(&tree);
    log::debug!("parse produced {} top-level statements", statements.len());
    Document {
        statements,
        errors: Vec::new(),
    }
}

/// Lex and parse into a CST, collecting lexical and syntax diagnostics in
/// source order. The tree holds every statement that parsed cleanly.
pub fn parse_cst(input: &str) -> (cst::Document, Vec<ParseError>) {
    let index = LineIndex::new(input);
    let (tokens, lex_errors) = tokenize(input);
    let (tree, syntax_errors) = parse_tokens(&tokens, &index);

    let mut located: Vec<(Span, String)> = lex_errors
        .into_iter()
        .map(|e| (e.span, e.message))
        .chain(syntax_errors.into_iter().map(|e| (e.span, e.message)))
        .collect();
    located.sort_by_key(|(span, _)| span.start);

    let errors = located
        .into_iter()
        .map(|(span, message)| ParseError {
            message,
            location: Some(span.into()),
        })
        .collect();
    (tree, errors)
}

/// Parse an already-lexed token stream.
pub fn parse_tokens<'t>(
    tokens: &'t [Token<'t>],
    index: &LineIndex<'_>,
) -> (cst::Document, Vec<SyntaxError>) {
    let mut parser = StatementParser {
        tokens,
        eof: index.eof_span(),
        errors: Vec::new(),
    };
    let mut input = TokenSlice::new(tokens);
    let statements = parser.statements(&mut input, false);
    (cst::Document { statements }, parser.errors)
}

// ─── Statement loop with recovery ───────────────────────────────────────

struct StatementParser<'t> {
    tokens: &'t [Token<'t>],
    eof: Span,
    errors: Vec<SyntaxError>,
}

impl<'t> StatementParser<'t> {
    /// Parse statements until end of input, or until `}` when `nested`.
    fn statements(&mut self, input: &mut Input<'t>, nested: bool) -> Vec<cst::Statement> {
        let mut out = Vec::new();
        while let Some(next) = input.peek_token() {
            if nested && next.kind == TokenKind::RBrace {
                break;
            }
            let before = input.eof_offset();
            match self.statement(input) {
                Ok(statement) => out.push(statement),
                Err(err) => {
                    let span = self.report(&err, input);
                    self.synchronize(input, before, span.start_pos.line, nested);
                }
            }
        }
        out
    }

    fn statement(&mut self, input: &mut Input<'t>) -> ModalResult<cst::Statement> {
        match input.peek_token().map(|t| t.kind) {
            Some(TokenKind::Group) => self.group_def(input).map(cst::Statement::Group),
            Some(TokenKind::Layout) => self.layout_def(input).map(cst::Statement::Layout),
            Some(TokenKind::FreeArrow) => self.free_arrow_def(input).map(cst::Statement::FreeArrow),
            Some(TokenKind::Identifier) => self.edge_or_node(input).map(cst::Statement::EdgeOrNode),
            _ => {
                let mut err = ContextError::new();
                err.push(StrContext::Expected(StrContextValue::Description(
                    "statement",
                )));
                Err(ErrMode::Backtrack(err))
            }
        }
    }

    /// Record a diagnostic at the token the parser stopped on.
    fn report(&mut self, err: &ErrMode<ContextError>, input: &Input<'t>) -> Span {
        let (span, found) = match input.peek_token() {
            Some(token) => (token.span, format!("`{}`", token.text)),
            None => (self.eof, "end of input".to_string()),
        };
        let (expected, label) = describe(err);
        let mut message = format!("expected {}", expected.unwrap_or("statement"));
        if let Some(label) = label {
            message.push_str(&format!(" in {label}"));
        }
        message.push_str(&format!(", found {found}"));

        let duplicate = self.errors.last().is_some_and(|e| e.span == span);
        if !duplicate {
            self.errors.push(SyntaxError { message, span });
        }
        span
    }

    /// Skip to the next plausible statement start: a keyword, an
    /// identifier on a later line than the error, or a closing brace.
    fn synchronize(&self, input: &mut Input<'t>, before: usize, error_line: u32, nested: bool) {
        if input.eof_offset() == before {
            let _ = input.next_token();
        }
        while let Some(token) = input.peek_token() {
            let resume = match token.kind {
                TokenKind::Group | TokenKind::Layout | TokenKind::FreeArrow => true,
                TokenKind::Identifier => token.span.start_pos.line > error_line,
                TokenKind::RBrace => nested,
                _ => false,
            };
            if resume {
                break;
            }
            let _ = input.next_token();
        }
    }

    /// Span from the token at `start_remaining` to the last consumed token.
    fn span_since(&self, start_remaining: usize, input: &Input<'t>) -> Span {
        let first = self.tokens.len() - start_remaining;
        let last = self.tokens.len() - input.eof_offset();
        match (self.tokens.get(first), last.checked_sub(1).and_then(|i| self.tokens.get(i))) {
            (Some(a), Some(b)) => a.span.merge(b.span),
            (Some(a), None) => a.span,
            _ => self.eof,
        }
    }

    fn group_def(&mut self, input: &mut Input<'t>) -> ModalResult<cst::GroupDef> {
        let start = input.eof_offset();
        expect(TokenKind::Group).parse_next(input)?;
        let id = identifier
            .context(StrContext::Label("group"))
            .parse_next(input)?;
        let style = if peek_kind(input) == Some(TokenKind::LParen) {
            Some(paren_props.context(StrContext::Label("group style")).parse_next(input)?)
        } else {
            None
        };
        expect(TokenKind::LBrace)
            .context(StrContext::Label("group"))
            .parse_next(input)?;
        let body = self.statements(input, true);
        expect(TokenKind::RBrace)
            .context(StrContext::Label("group"))
            .parse_next(input)?;
        Ok(cst::GroupDef {
            id,
            style,
            body,
            span: self.span_since(start, input),
        })
    }

    fn layout_def(&mut self, input: &mut Input<'t>) -> ModalResult<cst::LayoutDef> {
        let start = input.eof_offset();
        expect(TokenKind::Layout).parse_next(input)?;
        expect(TokenKind::Colon)
            .context(StrContext::Label("layout directive"))
            .parse_next(input)?;
        let algorithm = algorithm_name
            .context(StrContext::Label("layout directive"))
            .parse_next(input)?;
        Ok(cst::LayoutDef {
            algorithm,
            span: self.span_since(start, input),
        })
    }

    fn free_arrow_def(&mut self, input: &mut Input<'t>) -> ModalResult<cst::FreeArrowDef> {
        let start = input.eof_offset();
        expect(TokenKind::FreeArrow).parse_next(input)?;
        let props = paren_props
            .context(StrContext::Label("arrow"))
            .parse_next(input)?;
        Ok(cst::FreeArrowDef {
            props,
            span: self.span_since(start, input),
        })
    }

    fn edge_or_node(&mut self, input: &mut Input<'t>) -> ModalResult<cst::EdgeOrNode> {
        let start = input.eof_offset();
        let head = node_ref(input, false)?;
        let mut links = Vec::new();

        while let Some(TokenKind::Arrow(_)) = peek_kind(input) {
            let arrow = arrow_op.parse_next(input)?;
            let target = (|i: &mut Input<'t>| node_ref(i, true))
                .context(StrContext::Label("edge"))
                .parse_next(input)?;
            let anchor = if peek_kind(input) == Some(TokenKind::LParen) {
                Some(paren_props.context(StrContext::Label("edge anchor")).parse_next(input)?)
            } else {
                None
            };
            let label = if peek_kind(input) == Some(TokenKind::Colon) {
                Some(label_spec.context(StrContext::Label("edge label")).parse_next(input)?)
            } else {
                None
            };
            links.push(cst::Link {
                arrow,
                target,
                anchor,
                label,
            });
        }

        Ok(cst::EdgeOrNode {
            head,
            links,
            span: self.span_since(start, input),
        })
    }
}

/// Pull the innermost expected-token description and production label.
fn describe(err: &ErrMode<ContextError>) -> (Option<&'static str>, Option<&'static str>) {
    let mut expected = None;
    let mut label = None;
    if let ErrMode::Backtrack(e) | ErrMode::Cut(e) = err {
        for ctx in e.context() {
            match ctx {
                StrContext::Expected(StrContextValue::Description(d)) => {
                    expected.get_or_insert(*d);
                }
                StrContext::Label(l) => {
                    label.get_or_insert(*l);
                }
                _ => {}
            }
        }
    }
    (expected, label)
}

// ─── Productions ────────────────────────────────────────────────────────

fn peek_kind(input: &Input<'_>) -> Option<TokenKind> {
    input.peek_token().map(|t| t.kind)
}

/// Match one token of `kind`.
fn expect<'t>(kind: TokenKind) -> impl Parser<Input<'t>, &'t Token<'t>, ErrMode<ContextError>> {
    any.verify(move |t: &Token<'t>| t.kind == kind)
        .context(StrContext::Expected(StrContextValue::Description(
            kind.describe(),
        )))
}

fn identifier(input: &mut Input<'_>) -> ModalResult<Spanned<String>> {
    expect(TokenKind::Identifier)
        .map(|t| Spanned::new(t.text.to_string(), t.span))
        .parse_next(input)
}

/// An identifier, or a shape keyword used as an algorithm name (`box`).
fn algorithm_name(input: &mut Input<'_>) -> ModalResult<Spanned<String>> {
    any.verify_map(|t: &Token<'_>| match t.kind {
        TokenKind::Identifier | TokenKind::ShapeName => {
            Some(Spanned::new(t.text.to_string(), t.span))
        }
        _ => None,
    })
    .context(StrContext::Expected(StrContextValue::Description(
        "layout algorithm",
    )))
    .parse_next(input)
}

fn arrow_op(input: &mut Input<'_>) -> ModalResult<Spanned<ArrowType>> {
    any.verify_map(|t: &Token<'_>| match t.kind {
        TokenKind::Arrow(arrow) => Some(Spanned::new(arrow, t.span)),
        _ => None,
    })
    .context(StrContext::Expected(StrContextValue::Description(
        "arrow operator",
    )))
    .parse_next(input)
}

/// `Identifier ('.' Identifier)? ShapeSpec? LabelSpec?`
///
/// As an edge target (`edge_target`), a label is only taken when a shape
/// spec is present; a bare `b: "text"` after an arrow labels the edge.
fn node_ref(input: &mut Input<'_>, edge_target: bool) -> ModalResult<NodeRef> {
    let mut id = identifier.parse_next(input)?;
    if peek_kind(input) == Some(TokenKind::Dot) {
        expect(TokenKind::Dot).parse_next(input)?;
        let member = identifier
            .context(StrContext::Label("dotted node id"))
            .parse_next(input)?;
        id = Spanned::new(format!("{}.{}", id.value, member.value), id.span.merge(member.span));
    }

    let shape = if starts_shape_spec(input) {
        Some(shape_spec.parse_next(input)?)
    } else {
        None
    };

    let takes_label = !edge_target || shape.is_some();
    let label = if takes_label && peek_kind(input) == Some(TokenKind::Colon) {
        Some(label_spec.context(StrContext::Label("node label")).parse_next(input)?)
    } else {
        None
    };

    Ok(NodeRef { id, shape, label })
}

/// `(` followed by a shape keyword.
fn starts_shape_spec(input: &mut Input<'_>) -> bool {
    let checkpoint = input.checkpoint();
    let matched = (expect(TokenKind::LParen), expect(TokenKind::ShapeName))
        .parse_next(input)
        .is_ok();
    input.reset(&checkpoint);
    matched
}

fn shape_spec(input: &mut Input<'_>) -> ModalResult<ShapeSpec> {
    expect(TokenKind::LParen).parse_next(input)?;
    let keyword = expect(TokenKind::ShapeName).parse_next(input)?;
    let shape = ShapeType::from_keyword(keyword.text)
        .ok_or_else(|| ErrMode::Backtrack(ContextError::new()))?;
    let props = if opt(expect(TokenKind::Comma)).parse_next(input)?.is_some() {
        style_props
            .context(StrContext::Label("shape style"))
            .parse_next(input)?
    } else {
        Vec::new()
    };
    expect(TokenKind::RParen)
        .context(StrContext::Label("shape spec"))
        .parse_next(input)?;
    Ok(ShapeSpec {
        shape: Spanned::new(shape, keyword.span),
        keyword: keyword.text.to_string(),
        props,
    })
}

/// `'(' StyleProps ')'` — shared by StyleSpec, AnchorSpec, and `arrow(...)`.
fn paren_props(input: &mut Input<'_>) -> ModalResult<Vec<StyleProp>> {
    expect(TokenKind::LParen).parse_next(input)?;
    let props = style_props.parse_next(input)?;
    expect(TokenKind::RParen).parse_next(input)?;
    Ok(props)
}

fn style_props(input: &mut Input<'_>) -> ModalResult<Vec<StyleProp>> {
    let mut props = vec![style_prop.parse_next(input)?];
    while opt(expect(TokenKind::Comma)).parse_next(input)?.is_some() {
        props.push(style_prop.parse_next(input)?);
    }
    Ok(props)
}

fn style_prop(input: &mut Input<'_>) -> ModalResult<StyleProp> {
    let key = identifier
        .context(StrContext::Label("style property"))
        .parse_next(input)?;
    expect(TokenKind::Colon)
        .context(StrContext::Label("style property"))
        .parse_next(input)?;
    let value = style_value
        .context(StrContext::Label("style property"))
        .parse_next(input)?;
    Ok(StyleProp { key, value })
}

fn style_value(input: &mut Input<'_>) -> ModalResult<Spanned<StyleValue>> {
    any.verify_map(|t: &Token<'_>| {
        let value = match t.kind {
            TokenKind::ColorLit => StyleValue::Color(t.text.to_string()),
            TokenKind::NumberLit => StyleValue::Number(t.text.parse().ok()?),
            TokenKind::Identifier => StyleValue::Ident(t.text.to_string()),
            _ => return None,
        };
        Some(Spanned::new(value, t.span))
    })
    .context(StrContext::Expected(StrContextValue::Description(
        "color, number, or name",
    )))
    .parse_next(input)
}

fn label_spec(input: &mut Input<'_>) -> ModalResult<Spanned<String>> {
    expect(TokenKind::Colon).parse_next(input)?;
    expect(TokenKind::StringLit)
        .map(|t| Spanned::new(t.unquoted().to_string(), t.span))
        .parse_next(input)
}
