//! Integration tests: parse → emit → re-parse round-trip.
//!
//! Verifies that no statement is lost when converting Sketch text → AST → Sketch text.

use pretty_assertions::assert_eq;
use sketch_core::ast::{ArrowType, ShapeType, Statement};
use sketch_core::emitter::emit_document;
use sketch_core::format::format_document;
use sketch_core::id::NodeId;
use sketch_core::lint::lint_document;
use sketch_core::parser::parse_document;

// ─── Helpers ─────────────────────────────────────────────────────────────

/// Parse, emit, re-parse, and compare statements.
fn assert_roundtrip_preserves(input: &str) -> String {
    let doc1 = parse_document(input);
    assert!(doc1.is_ok(), "first parse failed: {:?}", doc1.errors);
    let emitted = emit_document(&doc1);
    let doc2 = parse_document(&emitted);
    assert!(
        doc2.is_ok(),
        "re-parse failed: {:?}\nEmitted:\n{emitted}",
        doc2.errors
    );
    assert_eq!(
        doc1.statements, doc2.statements,
        "statements changed after round-trip.\nOriginal:\n{input}\nEmitted:\n{emitted}"
    );
    emitted
}

// ─── Fixture-based tests ─────────────────────────────────────────────────

#[test]
fn roundtrip_service_map_fixture() {
    let input = include_str!("fixtures/service_map.sketch");
    assert_roundtrip_preserves(input);
}

#[test]
fn roundtrip_explicit_fixture() {
    let input = include_str!("fixtures/explicit.sketch");
    let emitted = assert_roundtrip_preserves(input);
    assert!(emitted.contains("web -- store(x1: 120, y1: 40, x2: 300, y2: 40)"));
    assert!(emitted.contains("arrow(x1: 0, y1: 200, x2: 100, y2: 200, stroke: red)"));
}

#[test]
fn service_map_structure() {
    let doc = parse_document(include_str!("fixtures/service_map.sketch"));
    assert!(doc.is_ok());

    let ids: Vec<&str> = doc.nodes().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["cdn", "api", "store", "cache", "queue", "worker"]);

    let arrows: Vec<ArrowType> = doc.edges().iter().map(|e| e.arrow_type).collect();
    assert_eq!(
        arrows,
        vec![
            ArrowType::Right,
            ArrowType::Right,
            ArrowType::Dotted,
            ArrowType::Thick,
            ArrowType::Right
        ]
    );

    let api = doc.node(NodeId::intern("api")).expect("api missing");
    assert_eq!(api.label.as_deref(), Some("API"));
    assert_eq!(api.style.width, Some(160.0));
    assert_eq!(api.style.fill.as_deref(), Some("#eef"));
    let store = doc.node(NodeId::intern("store")).expect("store missing");
    assert_eq!(store.shape, Some(ShapeType::Cylinder));
    assert_eq!(doc.layout_directive(), Some("layered"));

    let group = doc
        .statements
        .iter()
        .find_map(|s| match s {
            Statement::Group(g) => Some(g),
            _ => None,
        })
        .expect("group missing");
    assert_eq!(group.id.as_str(), "workers");
    assert_eq!(group.style.stroke.as_deref(), Some("#888"));
    assert_eq!(group.children.len(), 3);
}

#[test]
fn broken_fixture_reports_errors_and_no_statements() {
    let doc = parse_document(include_str!("fixtures/broken.sketch"));
    assert!(doc.statements.is_empty());
    assert!(doc.errors.len() >= 2, "errors: {:?}", doc.errors);
    assert!(doc.errors.iter().all(|e| e.location.is_some()));

    let lines: Vec<u32> = doc
        .errors
        .iter()
        .filter_map(|e| e.location.map(|l| l.start_line))
        .collect();
    let mut sorted = lines.clone();
    sorted.sort_unstable();
    assert_eq!(lines, sorted, "errors must be in source order");
    assert_eq!(lines[0], 3, "first error is the missing edge target");
}

// ─── Testable properties ─────────────────────────────────────────────────

#[test]
fn empty_input_parses_to_nothing() {
    let doc = parse_document("");
    assert!(doc.statements.is_empty());
    assert!(doc.errors.is_empty());
}

#[test]
fn keyword_prefixed_identifier_is_a_node_id() {
    let doc = parse_document("rectangle1(rect): \"x\"");
    assert!(doc.is_ok(), "{:?}", doc.errors);
    let Statement::Node(node) = &doc.statements[0] else {
        panic!("expected node");
    };
    assert_eq!(node.id.as_str(), "rectangle1");
    assert_eq!(node.shape, Some(ShapeType::Rect));
    assert_eq!(node.label.as_deref(), Some("x"));
}

#[test]
fn bare_edge_synthesizes_nodes_in_front() {
    let doc = parse_document("a -> b");
    let kinds: Vec<String> = doc
        .statements
        .iter()
        .map(|s| match s {
            Statement::Node(n) => format!("node {}", n.id),
            Statement::Edge(e) => format!("edge {} {} {}", e.from, e.arrow_type.symbol(), e.to),
            other => other.kind_name().to_string(),
        })
        .collect();
    assert_eq!(kinds, vec!["node b", "node a", "edge a -> b"]);
}

// ─── Formatter and lint over fixtures ────────────────────────────────────

#[test]
fn format_fixture_is_idempotent_and_keeps_header() {
    let input = include_str!("fixtures/service_map.sketch");
    let first = format_document(input).expect("format failed");
    assert!(first.starts_with("# Service map\n\n"));
    let second = format_document(&first).expect("second format failed");
    assert_eq!(first, second);
}

#[test]
fn format_rejects_broken_fixture() {
    let errors = format_document(include_str!("fixtures/broken.sketch")).unwrap_err();
    assert!(!errors.is_empty());
}

#[test]
fn fixtures_lint_clean() {
    assert!(lint_document(include_str!("fixtures/service_map.sketch")).is_empty());
    assert!(lint_document(include_str!("fixtures/explicit.sketch")).is_empty());
}
