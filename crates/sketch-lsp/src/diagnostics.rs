//! Diagnostics: parse errors and lint findings → LSP diagnostics.

use crate::text::SourceMap;
use sketch_core::lint::{LintSeverity, lint_document};
use sketch_core::parser::parse_cst;
use tower_lsp::lsp_types::*;

const SOURCE: &str = "sketch";

/// Compute diagnostics for the document text.
///
/// Parse errors are reported as errors; lint findings as warnings or
/// hints. An empty result clears previously published diagnostics.
pub fn compute_diagnostics(text: &str) -> Vec<Diagnostic> {
    let map = SourceMap::new(text);
    // The CST is enough here; building a Document would intern every id.
    let (_, errors) = parse_cst(text);

    let mut diags: Vec<Diagnostic> = errors
        .iter()
        .map(|err| Diagnostic {
            range: err.location.map_or_else(
                || Range::new(Position::new(0, 0), Position::new(0, 0)),
                |loc| map.location_range(loc),
            ),
            severity: Some(DiagnosticSeverity::ERROR),
            source: Some(SOURCE.to_string()),
            message: err.message.clone(),
            ..Default::default()
        })
        .collect();

    diags.extend(lint_document(text).into_iter().map(|lint| Diagnostic {
        range: map.range(lint.span),
        severity: Some(match lint.severity {
            LintSeverity::Warning => DiagnosticSeverity::WARNING,
            LintSeverity::Info => DiagnosticSeverity::INFORMATION,
        }),
        code: Some(NumberOrString::String(lint.rule.to_string())),
        source: Some(SOURCE.to_string()),
        message: lint.message,
        ..Default::default()
    }));

    diags
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sketch_core::NodeId;

    #[test]
    fn valid_document_produces_no_diagnostics() {
        let text = "api(rect, fill: #FF0000): \"API\"\napi -> store";
        assert!(compute_diagnostics(text).is_empty());
    }

    #[test]
    fn lexical_error_range() {
        let diags = compute_diagnostics("a -> b $");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(
            diags[0].range,
            Range::new(Position::new(0, 7), Position::new(0, 8))
        );
    }

    #[test]
    fn end_of_input_error_on_last_line() {
        let diags = compute_diagnostics("a -> b\nc ->");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].range.start, Position::new(1, 4));
        assert!(diags[0].message.contains("end of input"));
    }

    #[test]
    fn diagnostics_leave_node_ids_uninterned() {
        let diags = compute_diagnostics("half_typed_diag_id -> other_diag_id");
        assert!(diags.is_empty());
        assert_eq!(NodeId::lookup("half_typed_diag_id"), None);
        assert_eq!(NodeId::lookup("other_diag_id"), None);
    }

    #[test]
    fn lint_findings_carry_rule_codes() {
        let diags = compute_diagnostics("@layout: spiral\na -> a");
        let found: Vec<_> = diags
            .iter()
            .map(|d| (d.severity, d.code.clone(), d.range.start))
            .collect();
        assert_eq!(
            found,
            vec![
                (
                    Some(DiagnosticSeverity::WARNING),
                    Some(NumberOrString::String("unknown-layout".into())),
                    Position::new(0, 9)
                ),
                (
                    Some(DiagnosticSeverity::INFORMATION),
                    Some(NumberOrString::String("self-loop".into())),
                    Position::new(1, 0)
                ),
            ]
        );
    }
}
