//! Emitter: Document AST → canonical Sketch text.
//!
//! Output re-parses to the same statements. Statements of one kind are
//! kept together; a blank line separates runs of different kinds.

use crate::ast::{
    Document, Edge, FreeArrow, Group, Node, SHAPE_KEYWORDS, ShapeType, Statement, StyleProps,
};
use crate::lexer::{is_ident_char, is_ident_start};
use std::fmt::Write;

/// Emit a `Document` as Sketch text. Empty documents emit `""`.
#[must_use]
pub fn emit_document(doc: &Document) -> String {
    let mut out = String::with_capacity(256);
    emit_block(&mut out, &doc.statements, 0);
    out
}

fn emit_block(out: &mut String, statements: &[Statement], depth: usize) {
    let mut previous: Option<&'static str> = None;
    for statement in statements {
        let kind = statement.kind_name();
        if previous.is_some_and(|p| p != kind) {
            out.push('\n');
        }
        previous = Some(kind);
        emit_statement(out, statement, depth);
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn emit_statement(out: &mut String, statement: &Statement, depth: usize) {
    match statement {
        Statement::Node(node) => emit_node(out, node, depth),
        Statement::Edge(edge) => emit_edge(out, edge, depth),
        Statement::Group(group) => emit_group(out, group, depth),
        Statement::Layout(layout) => {
            indent(out, depth);
            let _ = writeln!(out, "@layout: {}", layout.algorithm);
        }
        Statement::FreeArrow(arrow) => emit_free_arrow(out, arrow, depth),
    }
}

fn emit_node(out: &mut String, node: &Node, depth: usize) {
    indent(out, depth);
    out.push_str(node.id.as_str());
    let props = style_list(&node.style);
    // Style needs a shape spec to hang on; `rect` is the default anyway.
    let shape = match (node.shape, props.is_empty()) {
        (Some(shape), _) => Some(shape),
        (None, false) => Some(ShapeType::Rect),
        (None, true) => None,
    };
    if let Some(shape) = shape {
        let _ = write!(out, "({}", shape.keyword());
        if !props.is_empty() {
            let _ = write!(out, ", {props}");
        }
        out.push(')');
    }
    emit_label(out, node.label.as_deref());
    out.push('\n');
}

fn emit_edge(out: &mut String, edge: &Edge, depth: usize) {
    indent(out, depth);
    let _ = write!(
        out,
        "{} {} {}",
        edge.from,
        edge.arrow_type.symbol(),
        edge.to
    );
    let props = style_list(&edge.style);
    if !props.is_empty() {
        let _ = write!(out, "({props})");
    }
    emit_label(out, edge.label.as_deref());
    out.push('\n');
}

fn emit_group(out: &mut String, group: &Group, depth: usize) {
    indent(out, depth);
    let _ = write!(out, "group {}", group.id);
    let props = style_list(&group.style);
    if !props.is_empty() {
        let _ = write!(out, "({props})");
    }
    out.push_str(" {\n");
    emit_block(out, &group.children, depth + 1);
    indent(out, depth);
    out.push_str("}\n");
}

fn emit_free_arrow(out: &mut String, arrow: &FreeArrow, depth: usize) {
    let props = style_list(&arrow.style);
    if props.is_empty() {
        log::debug!("free arrow without properties not emitted");
        return;
    }
    indent(out, depth);
    let _ = writeln!(out, "arrow({props})");
}

/// Labels cannot contain quotes; they are swapped for apostrophes.
fn emit_label(out: &mut String, label: Option<&str>) {
    if let Some(label) = label {
        let _ = write!(out, ": \"{}\"", label.replace('"', "'"));
    }
}

/// `key: value, …` for every set key whose value the lexer can read back.
fn style_list(style: &StyleProps) -> String {
    style
        .entries()
        .into_iter()
        .filter(|(key, value)| {
            let ok = is_literal_value(value);
            if !ok {
                log::debug!("dropping `{key}: {value}`: not expressible as a literal");
            }
            ok
        })
        .map(|(key, value)| format!("{key}: {value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A number, a `#` color of 3–6 hex digits, or a non-keyword identifier.
pub(crate) fn is_literal_value(value: &str) -> bool {
    if matches!(value, "group" | "arrow") || SHAPE_KEYWORDS.contains(&value) {
        return false;
    }
    if let Some(hex) = value.strip_prefix('#') {
        return (3..=6).contains(&hex.len()) && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    let digits = value.strip_prefix('-').unwrap_or(value);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    let mut chars = value.chars();
    chars.next().is_some_and(is_ident_start) && chars.all(is_ident_char)
}
