//! Document formatting: parse → canonical emit.
//!
//! Consumed by the LSP `textDocument/formatting` handler and the `format`
//! command. The leading comment block of a file is kept as a header;
//! comments elsewhere do not survive (the AST does not carry them).

use crate::ast::ParseError;
use crate::emitter::emit_document;
use crate::parser::parse_document;

/// Parse a Sketch document and re-emit canonical text.
///
/// The output is idempotent: `format_document(format_document(s)?) == format_document(s)`.
///
/// # Errors
/// Returns the parse diagnostics if the input is not valid Sketch syntax.
pub fn format_document(text: &str) -> Result<String, Vec<ParseError>> {
    let doc = parse_document(text);
    if !doc.is_ok() {
        return Err(doc.errors);
    }

    let header = leading_comments(text);
    let body = emit_document(&doc);
    let mut out = String::with_capacity(header.len() + body.len() + 1);
    out.push_str(&header);
    if !header.is_empty() && !body.is_empty() {
        out.push('\n');
    }
    out.push_str(&body);
    Ok(out)
}

/// Comment lines before the first statement, blank lines dropped.
fn leading_comments(text: &str) -> String {
    let mut header = String::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !trimmed.starts_with('#') {
            break;
        }
        header.push_str(trimmed);
        header.push('\n');
    }
    header
}

// ─── Tests ────────────────────────────────────────────────────────────────
