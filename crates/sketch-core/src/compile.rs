//! Layout compiler: Document AST → canvas shapes.
//!
//! Explicit-position mode applies when every node has both `x` and `y`;
//! nodes land at their literal coordinates and edges run center to center.
//! Otherwise the graph goes through a `LayoutEngine`. Either way anchor
//! overrides on an edge (`x1,y1,x2,y2`) win over computed endpoints.

use crate::ast::{ArrowType, Document, Edge, FreeArrow, Node, ShapeType, StyleProps};
use crate::id::NodeId;
use crate::layout::{
    Algorithm, BuiltinLayout, Direction, LayoutEdge, LayoutEngine, LayoutError, LayoutGraph,
    LayoutNode, LayoutResult,
};
use crate::shape::{Bounds, Point, Shape, ShapeId, ShapeKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    pub algorithm: Algorithm,
    pub direction: Direction,
    pub node_spacing: f64,
    pub edge_spacing: f64,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Layered,
            direction: Direction::Down,
            node_spacing: 50.0,
            edge_spacing: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("layout result has no position for node `{0}`")]
    MissingNode(String),
}

/// Compile with the built-in layout engine.
pub fn compile(doc: &Document, options: &CompileOptions) -> Result<Vec<Shape>, CompileError> {
    compile_with(doc, options, &BuiltinLayout)
}

/// Compile, delegating automatic layout to `engine`.
pub fn compile_with(
    doc: &Document,
    options: &CompileOptions,
    engine: &impl LayoutEngine,
) -> Result<Vec<Shape>, CompileError> {
    let nodes = doc.nodes();
    let edges = doc.edges();

    let mut shapes = if nodes.iter().all(|n| n.style.position().is_some()) {
        log::debug!("explicit-position compile of {} nodes", nodes.len());
        explicit(&nodes, &edges)
    } else {
        let options = effective_options(doc, options);
        log::debug!(
            "automatic compile of {} nodes with {} layout",
            nodes.len(),
            options.algorithm
        );
        automatic(&nodes, &edges, &options, engine)?
    };

    for arrow in doc.free_arrows() {
        if let Some(shape) = free_arrow_shape(arrow) {
            shapes.push(shape);
        }
    }
    Ok(shapes)
}

/// `@layout:` overrides the configured algorithm when it names one.
fn effective_options(doc: &Document, options: &CompileOptions) -> CompileOptions {
    let mut options = options.clone();
    if let Some(name) = doc.layout_directive() {
        match name.parse::<Algorithm>() {
            Ok(algorithm) => options.algorithm = algorithm,
            Err(err) => log::warn!("{err}; using {}", options.algorithm),
        }
    }
    options
}

fn explicit(nodes: &[&Node], edges: &[&Edge]) -> Vec<Shape> {
    let mut placed: HashMap<NodeId, (ShapeId, Bounds)> = HashMap::new();
    let mut shapes = Vec::with_capacity(nodes.len() + edges.len());
    for node in nodes {
        let (x, y) = node.style.position().unwrap_or_default();
        let (width, height) = node.size();
        let bounds = Bounds {
            x,
            y,
            width,
            height,
        };
        let shape = node_shape(node, bounds);
        placed.insert(node.id, (shape.id, bounds));
        shapes.push(shape);
    }

    for edge in edges {
        let (Some(&(from_id, from)), Some(&(to_id, to))) =
            (placed.get(&edge.from), placed.get(&edge.to))
        else {
            continue;
        };
        let points = vec![from.center(), to.center()];
        shapes.push(edge_shape(edge, points, from_id, to_id));
    }
    shapes
}

fn automatic(
    nodes: &[&Node],
    edges: &[&Edge],
    options: &CompileOptions,
    engine: &impl LayoutEngine,
) -> Result<Vec<Shape>, CompileError> {
    let graph = LayoutGraph {
        nodes: nodes
            .iter()
            .map(|n| {
                let (width, height) = n.size();
                LayoutNode {
                    id: n.id.to_string(),
                    width,
                    height,
                    label: n.label.clone(),
                }
            })
            .collect(),
        edges: edges
            .iter()
            .enumerate()
            .map(|(i, e)| LayoutEdge {
                id: edge_key(i),
                source: e.from.to_string(),
                target: e.to.to_string(),
                label: e.label.clone(),
            })
            .collect(),
    };

    let result: LayoutResult = engine.layout(&graph, options)?;
    let positioned: HashMap<&str, _> = result.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let routed: HashMap<&str, _> = result.edges.iter().map(|e| (e.id.as_str(), e)).collect();

    let mut placed: HashMap<NodeId, (ShapeId, Bounds)> = HashMap::new();
    let mut shapes = Vec::with_capacity(nodes.len() + edges.len());
    for node in nodes {
        let key = node.id.as_str();
        let p = positioned
            .get(key)
            .ok_or_else(|| CompileError::MissingNode(key.to_string()))?;
        if ![p.x, p.y, p.width, p.height].iter().all(|v| v.is_finite()) {
            return Err(LayoutError::NonFinite {
                node: key.to_string(),
            }
            .into());
        }
        let bounds = Bounds {
            x: p.x,
            y: p.y,
            width: p.width,
            height: p.height,
        };
        let shape = node_shape(node, bounds);
        placed.insert(node.id, (shape.id, bounds));
        shapes.push(shape);
    }

    for (i, edge) in edges.iter().enumerate() {
        let (Some(&(from_id, from)), Some(&(to_id, to))) =
            (placed.get(&edge.from), placed.get(&edge.to))
        else {
            continue;
        };
        let points = routed
            .get(edge_key(i).as_str())
            .and_then(|r| routed_points(&r.sections))
            .unwrap_or_else(|| vec![from.center(), to.center()]);
        shapes.push(edge_shape(edge, points, from_id, to_id));
    }
    Ok(shapes)
}

fn edge_key(index: usize) -> String {
    format!("e{index}")
}

/// Sections joined into one polyline; `None` when there are none.
fn routed_points(sections: &[crate::layout::EdgeSection]) -> Option<Vec<Point>> {
    let (first, rest) = sections.split_first()?;
    let mut points = first.polyline();
    for section in rest {
        let polyline = section.polyline();
        let skip = usize::from(points.last() == polyline.first());
        points.extend(polyline.into_iter().skip(skip));
    }
    Some(points)
}

// ─── Shape synthesis ─────────────────────────────────────────────────────

fn apply_style(shape: &mut Shape, style: &StyleProps) {
    if let Some(stroke) = &style.stroke {
        shape.style.stroke.clone_from(stroke);
    }
    if let Some(fill) = &style.fill {
        shape.style.fill.clone_from(fill);
    }
    if let Some(width) = style.stroke_width {
        shape.style.stroke_width = width;
    }
}

fn node_shape(node: &Node, b: Bounds) -> Shape {
    let label = node.label.clone();
    let rectangle = |corner_radius: f64| ShapeKind::Rectangle {
        width: b.width,
        height: b.height,
        corner_radius,
        label: label.clone(),
    };
    let kind = match node.shape_or_default() {
        ShapeType::Rect => rectangle(4.0),
        ShapeType::Circle => ShapeKind::Ellipse {
            width: b.width,
            height: b.height,
            label: label.clone(),
        },
        // No diamond or cylinder primitive on the canvas yet.
        ShapeType::Diamond => rectangle(0.0),
        ShapeType::Cylinder => rectangle(8.0),
    };
    let mut shape = Shape::new(b.x, b.y, kind);
    apply_style(&mut shape, &node.style);
    shape
}

fn edge_shape(edge: &Edge, mut points: Vec<Point>, from: ShapeId, to: ShapeId) -> Shape {
    apply_anchors(&mut points, &edge.style);
    let heads = match edge.arrow_type {
        ArrowType::Line => None,
        arrow => Some((arrow.has_start_head(), arrow.has_end_head())),
    };
    let mut shape = Shape::connector(&points, heads);
    apply_style(&mut shape, &edge.style);
    match edge.arrow_type {
        ArrowType::Dotted => shape.style.dashed = true,
        ArrowType::Thick => shape.style.stroke_width *= 2.0,
        _ => {}
    }
    shape.connect(from, to);
    shape.set_label(edge.label.clone());
    shape
}

/// Replace endpoint coordinates with any `x1,y1,x2,y2` the edge carries.
fn apply_anchors(points: &mut [Point], style: &StyleProps) {
    if let Some(start) = points.first_mut() {
        start.x = style.x1.unwrap_or(start.x);
        start.y = style.y1.unwrap_or(start.y);
    }
    if let Some(end) = points.last_mut() {
        end.x = style.x2.unwrap_or(end.x);
        end.y = style.y2.unwrap_or(end.y);
    }
}

fn free_arrow_shape(arrow: &FreeArrow) -> Option<Shape> {
    let s = &arrow.style;
    let (Some(x1), Some(y1), Some(x2), Some(y2)) = (s.x1, s.y1, s.x2, s.y2) else {
        log::warn!("skipping free arrow without x1, y1, x2, y2");
        return None;
    };
    let mut shape = Shape::connector(&[Point::new(x1, y1), Point::new(x2, y2)], Some((false, true)));
    apply_style(&mut shape, s);
    Some(shape)
}
