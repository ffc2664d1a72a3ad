//! Automatic layout: the engine contract and the built-in engine.
//!
//! The compiler hands a `LayoutGraph` (sized nodes, id'd edges) to a
//! `LayoutEngine` and gets back absolute node boxes plus routed edge
//! polylines. `BuiltinLayout` implements every algorithm named in
//! `Algorithm` on a `petgraph` graph; another engine can be plugged in
//! through the trait.

mod force;
mod layered;

use crate::compile::CompileOptions;
use crate::shape::Point;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ─── Options ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Layered,
    Force,
    Stress,
    Radial,
    Box,
}

impl Algorithm {
    pub const ALL: [Algorithm; 5] = [
        Algorithm::Layered,
        Algorithm::Force,
        Algorithm::Stress,
        Algorithm::Radial,
        Algorithm::Box,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Layered => "layered",
            Algorithm::Force => "force",
            Algorithm::Stress => "stress",
            Algorithm::Radial => "radial",
            Algorithm::Box => "box",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Algorithm::Layered => "Hierarchical layers following edge direction",
            Algorithm::Force => "Spring embedder; connected nodes pull together",
            Algorithm::Stress => "Distances approximate graph hop counts",
            Algorithm::Radial => "Rings around the first root node",
            Algorithm::Box => "Row-major grid packing",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} `{value}` (expected one of: {expected})")]
pub struct UnknownOption {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl FromStr for Algorithm {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownOption {
                kind: "layout algorithm",
                value: s.to_string(),
                expected: "layered, force, stress, radial, box",
            })
    }
}

/// Main flow direction for `layered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Down,
    Right,
    Up,
    Left,
}

impl Direction {
    pub fn name(self) -> &'static str {
        match self {
            Direction::Down => "DOWN",
            Direction::Right => "RIGHT",
            Direction::Up => "UP",
            Direction::Left => "LEFT",
        }
    }

    /// Layers advance along x rather than y.
    fn is_horizontal(self) -> bool {
        matches!(self, Direction::Right | Direction::Left)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Direction {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Direction::Down, Direction::Right, Direction::Up, Direction::Left]
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownOption {
                kind: "direction",
                value: s.to_string(),
                expected: "DOWN, RIGHT, UP, LEFT",
            })
    }
}

// ─── Engine contract ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutNode {
    pub id: String,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutGraph {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSection {
    pub start_point: Point,
    #[serde(default)]
    pub bend_points: Vec<Point>,
    pub end_point: Point,
}

impl EdgeSection {
    /// Start, bends, end as one polyline.
    pub fn polyline(&self) -> Vec<Point> {
        let mut points = Vec::with_capacity(self.bend_points.len() + 2);
        points.push(self.start_point);
        points.extend_from_slice(&self.bend_points);
        points.push(self.end_point);
        points
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedEdge {
    pub id: String,
    #[serde(default)]
    pub sections: Vec<EdgeSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    pub nodes: Vec<PositionedNode>,
    pub edges: Vec<RoutedEdge>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("edge `{edge}` references unknown node `{node}`")]
    UnknownNode { edge: String, node: String },
    #[error("layout produced a non-finite position for node `{node}`")]
    NonFinite { node: String },
    #[error("layout engine failed: {0}")]
    Engine(String),
}

/// A graph-layout collaborator.
pub trait LayoutEngine {
    fn layout(
        &self,
        graph: &LayoutGraph,
        options: &CompileOptions,
    ) -> Result<LayoutResult, LayoutError>;
}

impl<T: LayoutEngine + ?Sized> LayoutEngine for &T {
    fn layout(
        &self,
        graph: &LayoutGraph,
        options: &CompileOptions,
    ) -> Result<LayoutResult, LayoutError> {
        (**self).layout(graph, options)
    }
}

// ─── Built-in engine ─────────────────────────────────────────────────────

/// Deterministic in-process engine for every `Algorithm`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLayout;

/// Node centers plus per-edge interior bend points, before normalization.
pub(crate) struct Placement {
    pub centers: Vec<Point>,
    pub bends: Vec<Vec<Point>>,
}

/// Index view of a `LayoutGraph` shared by the algorithms.
pub(crate) struct Topology {
    pub graph: DiGraph<usize, usize>,
    pub sizes: Vec<(f64, f64)>,
}

impl Topology {
    fn build(input: &LayoutGraph) -> Result<Self, LayoutError> {
        let mut graph = DiGraph::with_capacity(input.nodes.len(), input.edges.len());
        let mut by_id: HashMap<&str, NodeIndex> = HashMap::new();
        for (i, node) in input.nodes.iter().enumerate() {
            let idx = graph.add_node(i);
            by_id.insert(node.id.as_str(), idx);
        }
        for (i, edge) in input.edges.iter().enumerate() {
            let lookup = |id: &str| {
                by_id.get(id).copied().ok_or_else(|| LayoutError::UnknownNode {
                    edge: edge.id.clone(),
                    node: id.to_string(),
                })
            };
            let source = lookup(&edge.source)?;
            let target = lookup(&edge.target)?;
            graph.add_edge(source, target, i);
        }
        let sizes = input.nodes.iter().map(|n| (n.width, n.height)).collect();
        Ok(Self { graph, sizes })
    }

    pub fn node_count(&self) -> usize {
        self.sizes.len()
    }

    /// Endpoints of every edge, by node position in the input.
    pub fn edge_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = vec![(0, 0); self.graph.edge_count()];
        for edge in self.graph.edge_indices() {
            if let Some((s, t)) = self.graph.edge_endpoints(edge) {
                pairs[self.graph[edge]] = (s.index(), t.index());
            }
        }
        pairs
    }

    /// Largest node dimension, used as the unit distance.
    pub fn unit(&self, options: &CompileOptions) -> f64 {
        let max_dim = self
            .sizes
            .iter()
            .map(|&(w, h)| w.max(h))
            .fold(0.0_f64, f64::max);
        max_dim + options.node_spacing
    }

    /// Undirected BFS hop counts from `root`; `None` when unreachable.
    pub fn hops_from(&self, root: usize) -> Vec<Option<usize>> {
        let mut depth = vec![None; self.node_count()];
        let mut queue = VecDeque::new();
        depth[root] = Some(0);
        queue.push_back(NodeIndex::new(root));
        while let Some(n) = queue.pop_front() {
            let d = depth[n.index()].unwrap_or(0);
            for m in self.graph.neighbors_undirected(n) {
                if depth[m.index()].is_none() {
                    depth[m.index()] = Some(d + 1);
                    queue.push_back(m);
                }
            }
        }
        depth
    }
}

impl LayoutEngine for BuiltinLayout {
    fn layout(
        &self,
        graph: &LayoutGraph,
        options: &CompileOptions,
    ) -> Result<LayoutResult, LayoutError> {
        let topology = Topology::build(graph)?;
        log::debug!(
            "{} layout of {} nodes, {} edges",
            options.algorithm,
            graph.nodes.len(),
            graph.edges.len()
        );

        let mut placement = match options.algorithm {
            Algorithm::Layered => layered::place(&topology, options),
            Algorithm::Force => force::fruchterman_reingold(&topology, options),
            Algorithm::Stress => force::stress_majorization(&topology, options),
            Algorithm::Radial => radial(&topology, options),
            Algorithm::Box => grid(&topology, options),
        };
        normalize(&mut placement, &topology.sizes);

        let mut nodes = Vec::with_capacity(graph.nodes.len());
        for (node, center) in graph.nodes.iter().zip(&placement.centers) {
            if !center.x.is_finite() || !center.y.is_finite() {
                return Err(LayoutError::NonFinite {
                    node: node.id.clone(),
                });
            }
            nodes.push(PositionedNode {
                id: node.id.clone(),
                x: center.x - node.width / 2.0,
                y: center.y - node.height / 2.0,
                width: node.width,
                height: node.height,
            });
        }

        let edges = graph
            .edges
            .iter()
            .zip(topology.edge_pairs())
            .zip(&placement.bends)
            .map(|((edge, (s, t)), bends)| RoutedEdge {
                id: edge.id.clone(),
                sections: vec![route(&nodes[s], &nodes[t], s == t, bends)],
            })
            .collect();

        Ok(LayoutResult { nodes, edges })
    }
}

/// Push apart boxes that overlap (with `gap` clearance), along whichever
/// axis needs the smaller move. Used by the non-layered algorithms.
pub(crate) fn remove_overlaps(centers: &mut [Point], sizes: &[(f64, f64)], gap: f64) {
    const PASSES: usize = 100;
    let n = centers.len().min(sizes.len());
    for _ in 0..PASSES {
        let mut moved = false;
        for i in 0..n {
            for j in i + 1..n {
                let need_x = (sizes[i].0 + sizes[j].0) / 2.0 + gap;
                let need_y = (sizes[i].1 + sizes[j].1) / 2.0 + gap;
                let dx = centers[j].x - centers[i].x;
                let dy = centers[j].y - centers[i].y;
                let over_x = need_x - dx.abs();
                let over_y = need_y - dy.abs();
                if over_x <= 0.0 || over_y <= 0.0 {
                    continue;
                }
                moved = true;
                if over_x < over_y {
                    let push = over_x / 2.0 * if dx < 0.0 { -1.0 } else { 1.0 };
                    centers[i].x -= push;
                    centers[j].x += push;
                } else {
                    let push = over_y / 2.0 * if dy < 0.0 { -1.0 } else { 1.0 };
                    centers[i].y -= push;
                    centers[j].y += push;
                }
            }
        }
        if !moved {
            break;
        }
    }
}

/// Shift so the top-left of the bounding box sits at the origin.
fn normalize(placement: &mut Placement, sizes: &[(f64, f64)]) {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    for (c, &(w, h)) in placement.centers.iter().zip(sizes) {
        min_x = min_x.min(c.x - w / 2.0);
        min_y = min_y.min(c.y - h / 2.0);
    }
    for p in placement.bends.iter().flatten() {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
    }
    if !min_x.is_finite() || !min_y.is_finite() {
        return;
    }
    let shift = |p: &mut Point| {
        p.x -= min_x;
        p.y -= min_y;
    };
    placement.centers.iter_mut().for_each(shift);
    placement.bends.iter_mut().flatten().for_each(shift);
}

fn center_of(node: &PositionedNode) -> Point {
    Point::new(node.x + node.width / 2.0, node.y + node.height / 2.0)
}

/// Point where the ray from the box center toward `toward` leaves the box.
fn clip_to_border(node: &PositionedNode, toward: Point) -> Point {
    let c = center_of(node);
    let dx = toward.x - c.x;
    let dy = toward.y - c.y;
    if dx == 0.0 && dy == 0.0 {
        return c;
    }
    let hw = node.width / 2.0;
    let hh = node.height / 2.0;
    let tx = if dx == 0.0 { f64::INFINITY } else { hw / dx.abs() };
    let ty = if dy == 0.0 { f64::INFINITY } else { hh / dy.abs() };
    let t = tx.min(ty).min(1.0);
    Point::new(c.x + dx * t, c.y + dy * t)
}

fn route(
    source: &PositionedNode,
    target: &PositionedNode,
    self_loop: bool,
    bends: &[Point],
) -> EdgeSection {
    if self_loop {
        let c = center_of(source);
        let right = source.x + source.width;
        let bottom = source.y + source.height;
        let reach = 20.0;
        return EdgeSection {
            start_point: Point::new(right, c.y),
            bend_points: vec![
                Point::new(right + reach, c.y),
                Point::new(right + reach, bottom + reach),
                Point::new(c.x, bottom + reach),
            ],
            end_point: Point::new(c.x, bottom),
        };
    }
    let first_aim = bends.first().copied().unwrap_or_else(|| center_of(target));
    let last_aim = bends.last().copied().unwrap_or_else(|| center_of(source));
    EdgeSection {
        start_point: clip_to_border(source, first_aim),
        bend_points: bends.to_vec(),
        end_point: clip_to_border(target, last_aim),
    }
}

/// Row-major grid, `ceil(sqrt(n))` columns, uniform cells.
fn grid(topology: &Topology, options: &CompileOptions) -> Placement {
    let n = topology.node_count();
    let columns = (n as f64).sqrt().ceil().max(1.0) as usize;
    let cell_w = topology.sizes.iter().map(|s| s.0).fold(0.0_f64, f64::max);
    let cell_h = topology.sizes.iter().map(|s| s.1).fold(0.0_f64, f64::max);
    let centers = (0..n)
        .map(|i| {
            let (row, col) = (i / columns, i % columns);
            Point::new(
                col as f64 * (cell_w + options.node_spacing) + cell_w / 2.0,
                row as f64 * (cell_h + options.node_spacing) + cell_h / 2.0,
            )
        })
        .collect();
    Placement {
        centers,
        bends: vec![Vec::new(); topology.graph.edge_count()],
    }
}

/// Concentric rings by BFS depth around the first node with no incoming
/// edges. Unreachable nodes share one extra outer ring.
fn radial(topology: &Topology, options: &CompileOptions) -> Placement {
    let n = topology.node_count();
    let bends = vec![Vec::new(); topology.graph.edge_count()];
    if n == 0 {
        return Placement {
            centers: Vec::new(),
            bends,
        };
    }

    let root = (0..n)
        .find(|&i| {
            topology
                .graph
                .neighbors_directed(NodeIndex::new(i), petgraph::Direction::Incoming)
                .all(|m| m.index() == i)
        })
        .unwrap_or(0);
    let hops = topology.hops_from(root);
    let outer = hops.iter().flatten().max().copied().unwrap_or(0) + 1;
    let depth: Vec<usize> = hops.iter().map(|h| h.unwrap_or(outer)).collect();

    let mut rings: Vec<Vec<usize>> = Vec::new();
    for (i, &d) in depth.iter().enumerate() {
        if rings.len() <= d {
            rings.resize(d + 1, Vec::new());
        }
        rings[d].push(i);
    }

    let unit = topology.unit(options);
    let mut centers = vec![Point::default(); n];
    for (d, ring) in rings.iter().enumerate() {
        let radius = d as f64 * unit;
        for (k, &i) in ring.iter().enumerate() {
            let angle = std::f64::consts::TAU * k as f64 / ring.len() as f64
                - std::f64::consts::FRAC_PI_2;
            centers[i] = Point::new(radius * angle.cos(), radius * angle.sin());
        }
    }
    remove_overlaps(&mut centers, &topology.sizes, options.node_spacing / 2.0);
    Placement { centers, bends }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> LayoutGraph {
        LayoutGraph {
            nodes: nodes
                .iter()
                .map(|id| LayoutNode {
                    id: id.to_string(),
                    width: 120.0,
                    height: 60.0,
                    label: None,
                })
                .collect(),
            edges: edges
                .iter()
                .enumerate()
                .map(|(i, (s, t))| LayoutEdge {
                    id: format!("e{i}"),
                    source: s.to_string(),
                    target: t.to_string(),
                    label: None,
                })
                .collect(),
        }
    }

    fn options(algorithm: Algorithm) -> CompileOptions {
        CompileOptions {
            algorithm,
            ..Default::default()
        }
    }

    fn overlaps(a: &PositionedNode, b: &PositionedNode) -> bool {
        a.x < b.x + b.width && b.x < a.x + a.width && a.y < b.y + b.height && b.y < a.y + a.height
    }

    #[test]
    fn parse_option_names() {
        assert_eq!("Radial".parse::<Algorithm>(), Ok(Algorithm::Radial));
        assert_eq!("left".parse::<Direction>(), Ok(Direction::Left));
        let err = "spiral".parse::<Algorithm>().unwrap_err();
        assert!(err.to_string().contains("spiral"));
    }

    #[test]
    fn unknown_edge_endpoint_is_error() {
        let g = graph(&["a"], &[("a", "ghost")]);
        let err = BuiltinLayout.layout(&g, &CompileOptions::default()).unwrap_err();
        assert_eq!(
            err,
            LayoutError::UnknownNode {
                edge: "e0".into(),
                node: "ghost".into()
            }
        );
    }

    #[test]
    fn empty_graph_lays_out_to_nothing() {
        for algorithm in Algorithm::ALL {
            let result = BuiltinLayout.layout(&LayoutGraph::default(), &options(algorithm)).unwrap();
            assert_eq!(result, LayoutResult::default());
        }
    }

    #[test]
    fn every_algorithm_places_all_nodes_without_overlap() {
        let g = graph(
            &["a", "b", "c", "d", "e"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("d", "e")],
        );
        for algorithm in Algorithm::ALL {
            let result = BuiltinLayout.layout(&g, &options(algorithm)).unwrap();
            assert_eq!(result.nodes.len(), 5, "{algorithm}");
            assert_eq!(result.edges.len(), 5, "{algorithm}");
            for (i, a) in result.nodes.iter().enumerate() {
                assert!(a.x >= -1e-6 && a.y >= -1e-6, "{algorithm}: {a:?} not normalized");
                for b in &result.nodes[i + 1..] {
                    assert!(!overlaps(a, b), "{algorithm}: {a:?} overlaps {b:?}");
                }
            }
            for edge in &result.edges {
                assert_eq!(edge.sections.len(), 1, "{algorithm}");
            }
        }
    }

    #[test]
    fn grid_uses_square_columns() {
        let g = graph(&["a", "b", "c", "d", "e"], &[]);
        let result = BuiltinLayout.layout(&g, &options(Algorithm::Box)).unwrap();
        // 3 columns: a b c / d e
        assert_eq!(result.nodes[0].y, result.nodes[2].y);
        assert_eq!(result.nodes[3].x, result.nodes[0].x);
        assert!(result.nodes[3].y > result.nodes[0].y);
    }

    #[test]
    fn radial_puts_root_in_center() {
        let g = graph(&["hub", "a", "b", "c", "d"], &[("hub", "a"), ("hub", "b"), ("hub", "c"), ("hub", "d")]);
        let result = BuiltinLayout.layout(&g, &options(Algorithm::Radial)).unwrap();
        let center = |n: &PositionedNode| center_of(n);
        let hub = center(&result.nodes[0]);
        let distances: Vec<f64> = result.nodes[1..].iter().map(|n| center(n).distance(hub)).collect();
        for d in &distances {
            assert!((d - distances[0]).abs() < 1e-6, "ring radii differ: {distances:?}");
        }
    }

    #[test]
    fn edges_start_and_end_on_node_borders() {
        let g = graph(&["a", "b"], &[("a", "b")]);
        let result = BuiltinLayout.layout(&g, &CompileOptions::default()).unwrap();
        let (a, b) = (&result.nodes[0], &result.nodes[1]);
        let section = &result.edges[0].sections[0];
        // DOWN: a above b, edge leaves a's bottom and enters b's top.
        assert!((section.start_point.y - (a.y + a.height)).abs() < 1e-6);
        assert!((section.end_point.y - b.y).abs() < 1e-6);
    }

    #[test]
    fn self_loop_routes_around_node() {
        let g = graph(&["a"], &[("a", "a")]);
        let result = BuiltinLayout.layout(&g, &CompileOptions::default()).unwrap();
        let section = &result.edges[0].sections[0];
        assert_eq!(section.bend_points.len(), 3);
        assert_ne!(section.start_point, section.end_point);
    }
}
