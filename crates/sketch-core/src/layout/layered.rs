//! Layered placement: cycle breaking, longest-path layering, barycenter
//! ordering, then coordinates along and across the layers.
//!
//! Edges spanning more than one layer get a virtual vertex per crossed
//! layer; those vertices become the edge's bend points.

use super::{Placement, Topology};
use crate::compile::CompileOptions;
use crate::layout::Direction;
use crate::shape::Point;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

const SWEEPS: usize = 8;

struct Vertex {
    layer: usize,
    real: bool,
    /// Extent in the layer direction.
    along: f64,
    /// Extent within the layer.
    across: f64,
}

pub(crate) fn place(topology: &Topology, options: &CompileOptions) -> Placement {
    let n = topology.node_count();
    let pairs = topology.edge_pairs();
    let reversed = break_cycles(n, &pairs);
    let layer_of = assign_layers(n, &pairs, &reversed);
    let horizontal = options.direction.is_horizontal();

    let mut verts: Vec<Vertex> = topology
        .sizes
        .iter()
        .zip(&layer_of)
        .map(|(&(w, h), &layer)| Vertex {
            layer,
            real: true,
            along: if horizontal { w } else { h },
            across: if horizontal { h } else { w },
        })
        .collect();

    // Vertex chain per edge, in the edge's own direction.
    let mut chains: Vec<Vec<usize>> = vec![Vec::new(); pairs.len()];
    let mut segments: Vec<(usize, usize)> = Vec::new();
    for (e, &(s, t)) in pairs.iter().enumerate() {
        if s == t {
            continue;
        }
        let (u, v) = if reversed[e] { (t, s) } else { (s, t) };
        let mut chain = vec![u];
        for layer in layer_of[u] + 1..layer_of[v] {
            verts.push(Vertex {
                layer,
                real: false,
                along: 0.0,
                across: 0.0,
            });
            chain.push(verts.len() - 1);
        }
        chain.push(v);
        segments.extend(chain.windows(2).map(|w| (w[0], w[1])));
        if reversed[e] {
            chain.reverse();
        }
        chains[e] = chain;
    }

    let order = order_layers(&verts, &segments);
    let across = across_positions(&verts, &order, options);

    let thickness: Vec<f64> = order
        .iter()
        .map(|layer| layer.iter().map(|&v| verts[v].along).fold(0.0_f64, f64::max))
        .collect();
    let mut layer_start = Vec::with_capacity(order.len());
    let mut cursor = 0.0;
    for t in &thickness {
        layer_start.push(cursor);
        cursor += t + options.node_spacing;
    }
    let total_along = (cursor - options.node_spacing).max(0.0);

    let point = |v: usize| {
        let layer = verts[v].layer;
        let mut along = layer_start[layer] + thickness[layer] / 2.0;
        if matches!(options.direction, Direction::Up | Direction::Left) {
            along = total_along - along;
        }
        if horizontal {
            Point::new(along, across[v])
        } else {
            Point::new(across[v], along)
        }
    };

    let centers = (0..n).map(point).collect();
    let bends = chains
        .iter()
        .map(|chain| match chain.len() {
            0..=2 => Vec::new(),
            len => chain[1..len - 1].iter().map(|&v| point(v)).collect(),
        })
        .collect();
    Placement { centers, bends }
}

/// Mark DFS back edges; reversing them makes the graph acyclic.
fn break_cycles(n: usize, pairs: &[(usize, usize)]) -> Vec<bool> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    let mut out: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n];
    for (e, &(s, t)) in pairs.iter().enumerate() {
        if s != t {
            out[s].push((t, e));
        }
    }

    let mut reversed = vec![false; pairs.len()];
    let mut mark = vec![Mark::New; n];
    let mut stack: Vec<(usize, usize)> = Vec::new();
    for root in 0..n {
        if mark[root] != Mark::New {
            continue;
        }
        mark[root] = Mark::Active;
        stack.push((root, 0));
        while let Some(top) = stack.last_mut() {
            let v = top.0;
            if let Some(&(w, e)) = out[v].get(top.1) {
                top.1 += 1;
                match mark[w] {
                    Mark::New => {
                        mark[w] = Mark::Active;
                        stack.push((w, 0));
                    }
                    Mark::Active => reversed[e] = true,
                    Mark::Done => {}
                }
            } else {
                mark[v] = Mark::Done;
                stack.pop();
            }
        }
    }
    reversed
}

/// Longest-path layering over the reoriented edges.
fn assign_layers(n: usize, pairs: &[(usize, usize)], reversed: &[bool]) -> Vec<usize> {
    let mut dag: DiGraph<(), ()> = DiGraph::with_capacity(n, pairs.len());
    for _ in 0..n {
        dag.add_node(());
    }
    for (&(s, t), &flip) in pairs.iter().zip(reversed) {
        if s == t {
            continue;
        }
        let (u, v) = if flip { (t, s) } else { (s, t) };
        dag.add_edge(NodeIndex::new(u), NodeIndex::new(v), ());
    }

    let sorted = toposort(&dag, None).unwrap_or_else(|_| dag.node_indices().collect());
    let mut layer = vec![0; n];
    for v in sorted {
        for w in dag.neighbors(v) {
            layer[w.index()] = layer[w.index()].max(layer[v.index()] + 1);
        }
    }
    layer
}

/// Barycenter sweeps, alternating down and up.
fn order_layers(verts: &[Vertex], segments: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let layer_count = verts.iter().map(|v| v.layer + 1).max().unwrap_or(0);
    let mut order: Vec<Vec<usize>> = vec![Vec::new(); layer_count];
    for (i, v) in verts.iter().enumerate() {
        order[v.layer].push(i);
    }

    let mut upper: Vec<Vec<usize>> = vec![Vec::new(); verts.len()];
    let mut lower: Vec<Vec<usize>> = vec![Vec::new(); verts.len()];
    for &(a, b) in segments {
        lower[a].push(b);
        upper[b].push(a);
    }

    let mut pos = vec![0usize; verts.len()];
    for layer in &order {
        for (i, &v) in layer.iter().enumerate() {
            pos[v] = i;
        }
    }

    for sweep in 0..SWEEPS {
        if sweep % 2 == 0 {
            for layer in order.iter_mut().skip(1) {
                reorder(layer, &upper, &mut pos);
            }
        } else {
            for layer in order.iter_mut().rev().skip(1) {
                reorder(layer, &lower, &mut pos);
            }
        }
    }
    order
}

fn reorder(layer: &mut [usize], neighbors: &[Vec<usize>], pos: &mut [usize]) {
    let mut keyed: Vec<(f64, usize)> = layer
        .iter()
        .map(|&v| {
            let adjacent = &neighbors[v];
            let key = if adjacent.is_empty() {
                pos[v] as f64
            } else {
                adjacent.iter().map(|&u| pos[u] as f64).sum::<f64>() / adjacent.len() as f64
            };
            (key, v)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    for (i, (slot, (_, v))) in layer.iter_mut().zip(keyed).enumerate() {
        *slot = v;
        pos[v] = i;
    }
}

/// Centers within each layer: real nodes `nodeSpacing` apart, virtual
/// vertices `edgeSpacing` from their neighbors, each layer centered on
/// the widest.
fn across_positions(verts: &[Vertex], order: &[Vec<usize>], options: &CompileOptions) -> Vec<f64> {
    let mut across = vec![0.0; verts.len()];
    let mut widths = Vec::with_capacity(order.len());
    for layer in order {
        let mut cursor = 0.0;
        let mut previous_real: Option<bool> = None;
        for &v in layer {
            if let Some(prev) = previous_real {
                cursor += if prev && verts[v].real {
                    options.node_spacing
                } else {
                    options.edge_spacing
                };
            }
            across[v] = cursor + verts[v].across / 2.0;
            cursor += verts[v].across;
            previous_real = Some(verts[v].real);
        }
        widths.push(cursor);
    }

    let widest = widths.iter().copied().fold(0.0_f64, f64::max);
    for (layer, width) in order.iter().zip(&widths) {
        let offset = (widest - width) / 2.0;
        for &v in layer {
            across[v] += offset;
        }
    }
    across
}
