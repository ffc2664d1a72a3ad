//! Lint diagnostics for Sketch documents.
//!
//! Runs over the CST so every finding carries a source span, and never
//! changes what the parser produces. Results feed into
//! `textDocument/publishDiagnostics` in the LSP server.

use crate::ast::{ShapeType, is_numeric_key};
use crate::cst::{self, StyleProp, StyleValue};
use crate::layout::Algorithm;
use crate::parser::parse_cst;
use crate::span::Span;
use std::collections::HashMap;

// ─── Diagnostic types ────────────────────────────────────────────────────

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintSeverity {
    /// Likely a mistake; the document still compiles.
    Warning,
    /// Informational.
    Info,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LintDiagnostic {
    pub message: String,
    pub severity: LintSeverity,
    /// Short rule identifier (e.g. "conflicting-shape", "self-loop").
    pub rule: &'static str,
    pub span: Span,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Run all lint rules and return diagnostics in source order.
///
/// Syntax errors are not reported here; rules run over whatever the parser
/// recovered.
#[must_use]
pub fn lint_document(text: &str) -> Vec<LintDiagnostic> {
    let (doc, _) = parse_cst(text);
    let mut linter = Linter::default();
    cst::walk(&doc.statements, &mut |statement| linter.statement(statement));
    let mut diags = linter.diags;
    diags.sort_by_key(|d| d.span.start);
    diags
}

// ─── Rules ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Linter {
    /// First explicit shape per node id.
    shapes: HashMap<String, ShapeType>,
    diags: Vec<LintDiagnostic>,
}

impl Linter {
    fn push(&mut self, rule: &'static str, severity: LintSeverity, span: Span, message: String) {
        self.diags.push(LintDiagnostic {
            message,
            severity,
            rule,
            span,
        });
    }

    fn statement(&mut self, statement: &cst::Statement) {
        match statement {
            cst::Statement::Group(group) => {
                if let Some(style) = &group.style {
                    self.style_props(style);
                }
            }
            cst::Statement::Layout(layout) => {
                let name = &layout.algorithm.value;
                if name.parse::<Algorithm>().is_err() {
                    let known: Vec<&str> = Algorithm::ALL.iter().map(|a| a.name()).collect();
                    self.push(
                        "unknown-layout",
                        LintSeverity::Warning,
                        layout.algorithm.span,
                        format!(
                            "Unknown layout `{name}`; the default is used. Known: {}.",
                            known.join(", ")
                        ),
                    );
                }
            }
            cst::Statement::FreeArrow(arrow) => self.style_props(&arrow.props),
            cst::Statement::EdgeOrNode(chain) => self.chain(chain),
        }
    }

    fn chain(&mut self, chain: &cst::EdgeOrNode) {
        for node in chain.node_refs() {
            self.node_ref(node);
        }
        let mut previous = &chain.head;
        for link in &chain.links {
            if link.target.id.value == previous.id.value {
                self.push(
                    "self-loop",
                    LintSeverity::Info,
                    previous.id.span.merge(link.target.id.span),
                    format!("Edge from `{}` to itself.", previous.id.value),
                );
            }
            if let Some(anchor) = &link.anchor {
                self.style_props(anchor);
            }
            previous = &link.target;
        }
    }

    fn node_ref(&mut self, node: &cst::NodeRef) {
        let Some(spec) = &node.shape else {
            return;
        };
        self.style_props(&spec.props);
        let shape = spec.shape.value;
        match self.shapes.get(&node.id.value) {
            Some(&first) if first != shape => self.push(
                "conflicting-shape",
                LintSeverity::Warning,
                spec.shape.span,
                format!(
                    "`{}` was declared as `{}`; this `{}` overrides it.",
                    node.id.value,
                    first.keyword(),
                    shape.keyword()
                ),
            ),
            Some(_) => {}
            None => {
                self.shapes.insert(node.id.value.clone(), shape);
            }
        }
    }

    fn style_props(&mut self, props: &[StyleProp]) {
        for prop in props {
            let key = prop.key.value.as_str();
            let Some(numeric) = is_numeric_key(key) else {
                self.push(
                    "unknown-style-prop",
                    LintSeverity::Warning,
                    prop.key.span,
                    format!("Unknown style property `{key}`; it is ignored."),
                );
                continue;
            };
            let fits = match &prop.value.value {
                StyleValue::Number(_) => numeric,
                StyleValue::Color(_) | StyleValue::Ident(_) => !numeric,
            };
            if !fits {
                let wanted = if numeric { "a number" } else { "a color or name" };
                self.push(
                    "invalid-style-value",
                    LintSeverity::Warning,
                    prop.value.span,
                    format!(
                        "`{key}` takes {wanted}, not a {}; it is ignored.",
                        prop.value.value.kind_name()
                    ),
                );
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
