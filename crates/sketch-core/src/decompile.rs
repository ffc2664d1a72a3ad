//! Decompiler: canvas shapes → Sketch text.
//!
//! Rectangles and ellipses become nodes; lines and arrows become edges
//! when both of their endpoints land within `CONNECT_THRESHOLD` of a node's
//! bounding box. Everything else is ignored. Best effort and lossy: the
//! function never fails.

use crate::ast::{ArrowType, Document, Edge, Node, ShapeType, Statement, StyleProps};
use crate::emitter::emit_document;
use crate::id::NodeId;
use crate::shape::{Bounds, DEFAULT_STROKE_WIDTH, Point, Shape, ShapeKind, ShapeStyle};
use serde::{Deserialize, Serialize};

/// Max distance from an endpoint to a node's bounding box.
pub const CONNECT_THRESHOLD: f64 = 50.0;

/// Stroke width at or above which an arrow reads back as `==>`.
const THICK_STROKE_WIDTH: f64 = DEFAULT_STROKE_WIDTH * 2.0;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecompileOptions {
    /// Emit `x`/`y` so the text recompiles in explicit-position mode.
    pub include_positions: bool,
}

/// Decompile shapes into DSL text. Empty input yields `""`.
#[must_use]
pub fn decompile(shapes: &[Shape]) -> String {
    decompile_with(shapes, &DecompileOptions::default())
}

#[must_use]
pub fn decompile_with(shapes: &[Shape], options: &DecompileOptions) -> String {
    emit_document(&infer_document(shapes, options))
}

struct Candidate<'a> {
    id: NodeId,
    bounds: Bounds,
    shape: &'a Shape,
}

/// Infer the node/edge graph behind a shape list.
pub fn infer_document(shapes: &[Shape], options: &DecompileOptions) -> Document {
    let candidates: Vec<Candidate<'_>> = shapes
        .iter()
        .filter_map(|shape| shape.bounds().map(|bounds| (shape, bounds)))
        .enumerate()
        .map(|(i, (shape, bounds))| Candidate {
            id: NodeId::generated(i),
            bounds,
            shape,
        })
        .collect();

    let mut statements: Vec<Statement> = candidates
        .iter()
        .map(|c| Statement::Node(node_for(c, options)))
        .collect();

    let mut edges = 0;
    for connector in shapes.iter().filter(|s| s.is_connector()) {
        if let Some(edge) = edge_for(connector, &candidates) {
            statements.push(Statement::Edge(edge));
            edges += 1;
        }
    }
    log::debug!(
        "decompiled {} shapes into {} nodes, {} edges",
        shapes.len(),
        candidates.len(),
        edges
    );

    Document {
        statements,
        errors: Vec::new(),
    }
}

fn node_for(candidate: &Candidate<'_>, options: &DecompileOptions) -> Node {
    let shape_type = match candidate.shape.kind {
        ShapeKind::Ellipse { .. } => ShapeType::Circle,
        _ => ShapeType::Rect,
    };
    let b = candidate.bounds;
    let (default_w, default_h) = shape_type.default_size();
    let style = &candidate.shape.style;

    let mut props = StyleProps::default();
    if options.include_positions {
        props.x = Some(b.x.round());
        props.y = Some(b.y.round());
    }
    if b.width.round() != default_w || b.height.round() != default_h {
        props.width = Some(b.width.round());
        props.height = Some(b.height.round());
    }
    if !is_blank_fill(&style.fill) {
        props.fill = Some(style.fill.clone());
    }
    if !is_black(&style.stroke) {
        props.stroke = Some(style.stroke.clone());
    }
    if style.stroke_width.round() != DEFAULT_STROKE_WIDTH {
        props.stroke_width = Some(style.stroke_width.round());
    }

    Node {
        id: candidate.id,
        label: candidate.shape.label().map(str::to_string),
        shape: Some(shape_type),
        style: props,
    }
}

fn is_blank_fill(fill: &str) -> bool {
    matches!(
        fill.to_ascii_lowercase().as_str(),
        "" | "transparent" | "none" | "white" | "#fff" | "#ffffff"
    )
}

fn is_black(stroke: &str) -> bool {
    matches!(
        stroke.to_ascii_lowercase().as_str(),
        "" | "black" | "#000" | "#000000"
    )
}

/// In-threshold nodes for a point, nearest first.
fn nearest(point: Point, candidates: &[Candidate<'_>]) -> Vec<(usize, f64)> {
    let mut hits: Vec<(usize, f64)> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (i, c.bounds.distance_to(point)))
        .filter(|&(_, d)| d <= CONNECT_THRESHOLD)
        .collect();
    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits
}

fn edge_for(connector: &Shape, candidates: &[Candidate<'_>]) -> Option<Edge> {
    let Some((start, end)) = connector.endpoints() else {
        log::trace!("connector {} has no usable endpoints", connector.id);
        return None;
    };
    let from = nearest(start, candidates);
    let to = nearest(end, candidates);
    let (Some(&(from_best, _)), Some(&(to_best, _))) = (from.first(), to.first()) else {
        log::trace!("connector {} does not reach a node at both ends", connector.id);
        return None;
    };

    let (source, target) = if from_best != to_best {
        (from_best, to_best)
    } else if let Some(&(alt, _)) = to.get(1) {
        (from_best, alt)
    } else if let Some(&(alt, _)) = from.get(1) {
        (alt, to_best)
    } else {
        log::trace!(
            "connector {} starts and ends on {}",
            connector.id,
            candidates[from_best].id
        );
        return None;
    };

    let edge = Edge {
        from: candidates[source].id,
        to: candidates[target].id,
        arrow_type: arrow_type_of(connector),
        label: connector.label().map(str::to_string),
        style: StyleProps::default(),
    };
    log::trace!(
        "connector {}: {} {} {}",
        connector.id,
        edge.from,
        edge.arrow_type.symbol(),
        edge.to
    );
    Some(edge)
}

fn arrow_type_of(connector: &Shape) -> ArrowType {
    let ShapeKind::Arrow {
        start_arrow,
        end_arrow,
        ..
    } = connector.kind
    else {
        return ArrowType::Line;
    };
    let ShapeStyle {
        dashed,
        stroke_width,
        ..
    } = connector.style;
    match (start_arrow, end_arrow) {
        (true, true) => ArrowType::Both,
        (true, false) => ArrowType::Left,
        _ if dashed => ArrowType::Dotted,
        _ if stroke_width >= THICK_STROKE_WIDTH => ArrowType::Thick,
        _ => ArrowType::Right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{CompileOptions, compile};
    use crate::parser::parse_document;
    use pretty_assertions::assert_eq;

    fn rect(x: f64, y: f64) -> Shape {
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

    fn ellipse(x: f64, y: f64) -> Shape {
        Shape::new(
            x,
            y,
            ShapeKind::Ellipse {
                width: 80.0,
                height: 80.0,
                label: None,
            },
        )
    }

    fn arrow(from: (f64, f64), to: (f64, f64)) -> Shape {
        Shape::connector(
            &[Point::new(from.0, from.1), Point::new(to.0, to.1)],
            Some((false, true)),
        )
    }

    #[test]
    fn empty_input_is_empty_text() {
        assert_eq!(decompile(&[]), "");
    }

    #[test]
    fn two_boxes_and_an_arrow() {
        let shapes = [rect(0.0, 0.0), rect(0.0, 200.0), arrow((60.0, 62.0), (60.0, 198.0))];
        let text = decompile(&shapes);
        assert_eq!(text, "a(rect)\nb(rect)\n\na -> b\n");

        let doc = parse_document(&text);
        assert!(doc.is_ok());
        let compiled = compile(&doc, &CompileOptions::default()).unwrap();
        assert_eq!(compiled.iter().filter(|s| s.is_node_capable()).count(), 2);
        let edges = doc.edges();
        assert_eq!(edges.len(), 1);
        assert_eq!((edges[0].from.as_str(), edges[0].to.as_str()), ("a", "b"));
    }

    #[test]
    fn far_endpoint_drops_edge() {
        let shapes = [rect(0.0, 0.0), rect(0.0, 200.0), arrow((500.0, 500.0), (600.0, 600.0))];
        assert_eq!(decompile(&shapes), "a(rect)\nb(rect)\n");
    }

    #[test]
    fn one_resolved_endpoint_is_not_enough() {
        let shapes = [rect(0.0, 0.0), arrow((60.0, 30.0), (60.0, 400.0))];
        assert_eq!(decompile(&shapes), "a(rect)\n");
    }

    #[test]
    fn threshold_is_inclusive() {
        // End point exactly 50 below b's bottom edge at y=260.
        let shapes = [rect(0.0, 0.0), rect(0.0, 200.0), arrow((60.0, 30.0), (60.0, 310.0))];
        assert!(decompile(&shapes).contains("a -> b"));
    }

    #[test]
    fn just_past_threshold_does_not_connect() {
        let shapes = [rect(0.0, 0.0), rect(0.0, 200.0), arrow((60.0, 30.0), (60.0, 310.5))];
        assert_eq!(decompile(&shapes), "a(rect)\nb(rect)\n");
    }

    #[test]
    fn same_node_collision_uses_second_closest_end() {
        // Both ends inside a; the end is also 20 from b.
        let shapes = [
            rect(0.0, 0.0),
            rect(0.0, 80.0),
            arrow((10.0, 10.0), (60.0, 59.0)),
        ];
        assert!(decompile(&shapes).ends_with("a -> b\n"));
    }

    #[test]
    fn same_node_collision_falls_back_to_start() {
        // End only reaches b; start is 5 from b and 15 from a.
        let shapes = [
            rect(0.0, 80.0),
            rect(0.0, 0.0),
            arrow((60.0, 65.0), (60.0, 10.0)),
        ];
        assert!(decompile(&shapes).ends_with("a -> b\n"));
    }

    #[test]
    fn connector_inside_single_node_is_dropped() {
        let shapes = [rect(0.0, 0.0), arrow((10.0, 10.0), (100.0, 50.0))];
        assert_eq!(decompile(&shapes), "a(rect)\n");
    }

    #[test]
    fn arrow_symbols() {
        let line = Shape::connector(&[Point::new(60.0, 62.0), Point::new(60.0, 198.0)], None);
        let heads = |start: bool, end: bool| {
            let mut a = arrow((60.0, 62.0), (60.0, 198.0));
            if let ShapeKind::Arrow {
                start_arrow,
                end_arrow,
                ..
            } = &mut a.kind
            {
                *start_arrow = start;
                *end_arrow = end;
            }
            a
        };
        let mut dashed = heads(false, true);
        dashed.style.dashed = true;
        let mut thick = heads(false, true);
        thick.style.stroke_width = 4.0;

        let shapes = [
            rect(0.0, 0.0),
            rect(0.0, 200.0),
            line,
            heads(true, true),
            heads(true, false),
            heads(false, false),
            dashed,
            thick,
        ];
        let text = decompile(&shapes);
        let edges: Vec<&str> = text.lines().skip(3).collect();
        assert_eq!(
            edges,
            vec!["a -- b", "a <-> b", "a <- b", "a -> b", "a --> b", "a ==> b"]
        );
    }

    #[test]
    fn ids_continue_past_z() {
        let shapes: Vec<Shape> = (0..28).map(|i| rect(f64::from(i) * 200.0, 0.0)).collect();
        let text = decompile(&shapes);
        let ids: Vec<&str> = text.lines().map(|l| l.split('(').next().unwrap()).collect();
        assert_eq!(ids[0], "a");
        assert_eq!(ids[25], "z");
        assert_eq!(ids[26], "node27");
        assert_eq!(ids[27], "node28");
    }

    #[test]
    fn non_default_properties_and_labels() {
        let mut a = rect(10.0, 20.0);
        a.kind = ShapeKind::Rectangle {
            width: 200.0,
            height: 60.0,
            corner_radius: 4.0,
            label: Some("API".into()),
        };
        a.style.fill = "#ffcc00".into();
        a.style.stroke = "red".into();
        a.style.stroke_width = 3.0;
        let mut b = ellipse(10.0, 200.0);
        b.style.fill = "#FFFFFF".into();
        let mut link = arrow((60.0, 82.0), (50.0, 198.0));
        link.set_label(Some("calls".into()));

        let text = decompile(&[a.clone(), b.clone(), link.clone()]);
        assert_eq!(
            text,
            "a(rect, width: 200, height: 60, fill: #ffcc00, stroke: red, strokeWidth: 3): \"API\"\n\
             b(circle)\n\
             \n\
             a -> b: \"calls\"\n"
        );

        let positioned = decompile_with(
            &[a, b, link],
            &DecompileOptions {
                include_positions: true,
            },
        );
        assert!(positioned.starts_with("a(rect, x: 10, y: 20, width: 200"), "{positioned}");
        assert!(positioned.contains("b(circle, x: 10, y: 200)"), "{positioned}");
    }

    #[test]
    fn positioned_text_recompiles_in_place() {
        let shapes = [rect(40.0, 40.0), rect(40.0, 240.0), arrow((100.0, 100.0), (100.0, 240.0))];
        let text = decompile_with(
            &shapes,
            &DecompileOptions {
                include_positions: true,
            },
        );
        let compiled = compile(&parse_document(&text), &CompileOptions::default()).unwrap();
        assert_eq!((compiled[0].x, compiled[0].y), (40.0, 40.0));
        assert_eq!((compiled[1].x, compiled[1].y), (40.0, 240.0));
    }

    #[test]
    fn degenerate_shapes_are_skipped() {
        let zero = Shape::new(
            0.0,
            0.0,
            ShapeKind::Rectangle {
                width: 0.0,
                height: 0.0,
                corner_radius: 0.0,
                label: None,
            },
        );
        let single = Shape::connector(&[Point::new(0.0, 0.0)], None);
        let text_shape = Shape::new(
            0.0,
            0.0,
            ShapeKind::Text {
                text: "note".into(),
                font_size: 16.0,
            },
        );
        let scribble = Shape::new(0.0, 0.0, ShapeKind::Freehand { points: Vec::new() });
        assert_eq!(
            decompile(&[zero, single, text_shape, scribble]),
            "a(rect, width: 0, height: 0)\n"
        );
    }
}
