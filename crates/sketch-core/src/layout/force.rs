//! Force-directed and stress placements. Both are deterministic: seeds
//! are geometric, never random.

use super::{Placement, Topology, remove_overlaps};
use crate::compile::CompileOptions;
use crate::shape::Point;
use std::f64::consts::TAU;

const FORCE_ITERATIONS: usize = 300;
const STRESS_ITERATIONS: usize = 100;

/// Fruchterman–Reingold from a grid seed, with linear cooling.
pub(crate) fn fruchterman_reingold(topology: &Topology, options: &CompileOptions) -> Placement {
    let n = topology.node_count();
    let k = topology.unit(options);
    let pairs = topology.edge_pairs();

    let columns = (n as f64).sqrt().ceil().max(1.0) as usize;
    let mut pos: Vec<Point> = (0..n)
        .map(|i| Point::new((i % columns) as f64 * k, (i / columns) as f64 * k))
        .collect();

    let mut temperature = k;
    let cooling = k / FORCE_ITERATIONS as f64;
    for _ in 0..FORCE_ITERATIONS {
        let mut disp = vec![Point::default(); n];
        for i in 0..n {
            for j in i + 1..n {
                let (dx, dy, d) = separation(pos[i], pos[j], i, j);
                let push = k * k / d;
                disp[i].x += dx / d * push;
                disp[i].y += dy / d * push;
                disp[j].x -= dx / d * push;
                disp[j].y -= dy / d * push;
            }
        }
        for &(s, t) in &pairs {
            if s == t {
                continue;
            }
            let (dx, dy, d) = separation(pos[s], pos[t], s, t);
            let pull = d * d / k;
            disp[s].x -= dx / d * pull;
            disp[s].y -= dy / d * pull;
            disp[t].x += dx / d * pull;
            disp[t].y += dy / d * pull;
        }
        for (p, d) in pos.iter_mut().zip(&disp) {
            let len = d.x.hypot(d.y);
            if len > 0.0 {
                let step = len.min(temperature);
                p.x += d.x / len * step;
                p.y += d.y / len * step;
            }
        }
        temperature = (temperature - cooling).max(1.0);
    }

    remove_overlaps(&mut pos, &topology.sizes, options.node_spacing / 2.0);
    Placement {
        centers: pos,
        bends: vec![Vec::new(); pairs.len()],
    }
}

/// Stress majorization toward hop-count distances. Disconnected pairs
/// target one hop more than the longest finite distance.
pub(crate) fn stress_majorization(topology: &Topology, options: &CompileOptions) -> Placement {
    let n = topology.node_count();
    let k = topology.unit(options);
    let edge_count = topology.graph.edge_count();

    let hops: Vec<Vec<Option<usize>>> = (0..n).map(|i| topology.hops_from(i)).collect();
    let longest = hops.iter().flatten().flatten().max().copied().unwrap_or(0);
    let ideal: Vec<Vec<f64>> = hops
        .iter()
        .map(|row| {
            row.iter()
                .map(|h| h.unwrap_or(longest + 1) as f64 * k)
                .collect()
        })
        .collect();

    let radius = (k * n as f64 / TAU).max(k);
    let mut pos: Vec<Point> = (0..n)
        .map(|i| {
            let angle = TAU * i as f64 / n as f64;
            Point::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect();

    for _ in 0..STRESS_ITERATIONS {
        for i in 0..n {
            let (mut sx, mut sy, mut sw) = (0.0, 0.0, 0.0);
            for j in 0..n {
                let d = ideal[i][j];
                if i == j || d <= 0.0 {
                    continue;
                }
                let w = 1.0 / (d * d);
                let dx = pos[i].x - pos[j].x;
                let dy = pos[i].y - pos[j].y;
                let dist = dx.hypot(dy);
                let (ux, uy) = if dist > 1e-9 {
                    (dx / dist, dy / dist)
                } else {
                    (0.0, 0.0)
                };
                sx += w * (pos[j].x + d * ux);
                sy += w * (pos[j].y + d * uy);
                sw += w;
            }
            if sw > 0.0 {
                pos[i] = Point::new(sx / sw, sy / sw);
            }
        }
    }

    remove_overlaps(&mut pos, &topology.sizes, options.node_spacing / 2.0);
    Placement {
        centers: pos,
        bends: vec![Vec::new(); edge_count],
    }
}

/// Vector from `b` to `a` and its length, nudged apart when coincident.
fn separation(a: Point, b: Point, i: usize, j: usize) -> (f64, f64, f64) {
    let (mut dx, mut dy) = (a.x - b.x, a.y - b.y);
    let mut d = dx.hypot(dy);
    if d < 1e-6 {
        dx = if i < j { -0.1 } else { 0.1 };
        dy = 0.1;
        d = dx.hypot(dy);
    }
    (dx, dy, d)
}
