//! Integration tests: compile → decompile → re-parse.
//!
//! The decompiler is lossy on geometry and shape kind, but the graph it
//! recovers from a compiled document must match the source graph.

use pretty_assertions::assert_eq;
use sketch_core::compile::{CompileOptions, compile};
use sketch_core::decompile::{DecompileOptions, decompile, decompile_with};
use sketch_core::parser::parse_document;
use sketch_core::shape::{Point, Shape, ShapeKind};

fn rectangle(x: f64, y: f64) -> Shape {
    Shape::new(
        x,
        y,
        ShapeKind::Rectangle {
            width: 120.0,
            height: 60.0,
            corner_radius: 4.0,
            label: None,
        },
    )
}

fn edge_symbols(text: &str) -> Vec<String> {
    let doc = parse_document(text);
    assert!(doc.is_ok(), "decompiled text must parse: {:?}\n{text}", doc.errors);
    doc.edges()
        .iter()
        .map(|e| format!("{}{}", e.arrow_type.symbol(), e.label.as_deref().unwrap_or("")))
        .collect()
}

#[test]
fn two_rectangles_and_an_arrow() {
    let shapes = [
        rectangle(0.0, 0.0),
        rectangle(0.0, 200.0),
        Shape::connector(&[Point::new(60.0, 60.0), Point::new(60.0, 200.0)], Some((false, true))),
    ];
    let text = decompile(&shapes);
    assert_eq!(text.lines().filter(|l| !l.is_empty()).count(), 3);
    assert!(text.ends_with("a -> b\n"));

    let recompiled = compile(&parse_document(&text), &CompileOptions::default()).unwrap();
    let nodes: Vec<&Shape> = recompiled.iter().filter(|s| s.is_node_capable()).collect();
    let connectors: Vec<&Shape> = recompiled.iter().filter(|s| s.is_connector()).collect();
    assert_eq!(nodes.len(), 2);
    assert_eq!(connectors.len(), 1);
    let ShapeKind::Arrow {
        start_arrow,
        end_arrow,
        start_connection,
        end_connection,
        ..
    } = &connectors[0].kind
    else {
        panic!("expected an arrow, got {:?}", connectors[0].kind);
    };
    assert!(!start_arrow && *end_arrow);
    assert_eq!(*start_connection, Some(nodes[0].id));
    assert_eq!(*end_connection, Some(nodes[1].id));
}

#[test]
fn arrow_beyond_threshold_is_dropped() {
    let shapes = [
        rectangle(0.0, 0.0),
        rectangle(400.0, 0.0),
        Shape::connector(&[Point::new(200.0, 200.0), Point::new(300.0, 200.0)], Some((false, true))),
    ];
    let text = decompile(&shapes);
    assert!(!text.contains("->"), "{text}");
    assert_eq!(text, "a(rect)\nb(rect)\n");
}

#[test]
fn compiled_service_map_recovers_its_graph() {
    let doc = parse_document(include_str!("fixtures/service_map.sketch"));
    let shapes = compile(&doc, &CompileOptions::default()).unwrap();
    let text = decompile(&shapes);

    let recovered = parse_document(&text);
    assert_eq!(recovered.nodes().len(), doc.nodes().len());
    assert_eq!(
        edge_symbols(&text),
        vec!["->https", "->reads", "-->", "==>", "->"]
    );

    let labels: Vec<Option<&str>> = recovered.nodes().iter().map(|n| n.label.as_deref()).collect();
    assert_eq!(
        labels,
        vec![Some("CDN"), Some("API"), Some("Primary"), None, None, None]
    );
}

#[test]
fn explicit_fixture_survives_with_positions() {
    let doc = parse_document(include_str!("fixtures/explicit.sketch"));
    let shapes = compile(&doc, &CompileOptions::default()).unwrap();
    let text = decompile_with(
        &shapes,
        &DecompileOptions {
            include_positions: true,
        },
    );
    assert_eq!(
        text,
        "a(rect, x: 0, y: 0): \"Web\"\n\
         b(rect, x: 300, y: 0, width: 100, height: 100): \"Store\"\n\
         \n\
         a -> b: \"writes\"\n\
         a -- b\n"
    );

    let again = compile(&parse_document(&text), &CompileOptions::default()).unwrap();
    let origins: Vec<(f64, f64)> = again
        .iter()
        .filter(|s| s.is_node_capable())
        .map(|s| (s.x, s.y))
        .collect();
    assert_eq!(origins, vec![(0.0, 0.0), (300.0, 0.0)]);
}
