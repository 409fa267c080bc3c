// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sketch triangulation
//!
//! Turns a solved sketch into planar faces, edges and corners:
//!
//! 1. planarize: split lines at every pairwise interior intersection
//! 2. cull pendant edges (anything hanging off a degree-1 point)
//! 3. build per-point adjacency with one traversal flag per direction
//! 4. mark connected components as islands
//! 5. walk vertex loops, always taking the largest CCW turn; CCW loops are
//!    face boundaries, the CW loop is its island's perimeter
//! 6. join islands nested inside other islands with seam edges and re-walk,
//!    so holes merge into their containing face
//! 7. ear-clip each face loop and emit faces, edges and corners with ids
//!    derived from the source sketch elements
//!
//! Derived element ids come from bit-mixing the parent ids, which keeps
//! them identical across geometrically equivalent re-solves.

use crate::error::{Error, Result};
use crate::sketch::Sketch;
use keel_core::scalar::{equal, greater, greater_equal, less, normalize_angle, zero};
use keel_core::{mix_uid, GeoId, GeoKind, SelectionState};
use keel_geometry::{v2_equal, Corner, Edge as MeshEdge, Face, Tri};
use nalgebra::{Point2, Point3};
use smallvec::SmallVec;
use std::f32::consts::PI;
use tracing::debug;

/// Faces, edges and corners produced from one sketch
#[derive(Debug, Default)]
pub struct Triangulation {
    pub faces: Vec<Face>,
    pub edges: Vec<MeshEdge>,
    pub corners: Vec<Corner>,
}

#[derive(Debug, Clone, Copy)]
struct Adj {
    other: u32,
    uid: i64,
    traversed: bool,
}

#[derive(Debug)]
struct TPoint {
    pos: Point2<f32>,
    uid: i64,
    island: Option<usize>,
    adj: SmallVec<[Adj; 4]>,
    alive: bool,
}

#[derive(Debug, Clone, Copy)]
struct PEdge {
    uid: i64,
    p1: u32,
    p2: u32,
    clean: bool,
    culled: bool,
}

#[derive(Debug)]
struct VertLoop {
    island: usize,
    pts: Vec<Point2<f32>>,
    /// Sum of the mixed ids of the loop's edges; the face id
    hash_sum: i64,
    area: f32,
}

fn to3(p: Point2<f32>) -> Point3<f32> {
    Point3::new(p.x, p.y, 0.0)
}

/// Proper interior crossing of two segments: both parameters strictly
/// inside (0, 1) under the kernel epsilon. Collinear overlaps and endpoint
/// touches do not count.
fn proper_intersection(
    l1a: Point2<f32>,
    l1b: Point2<f32>,
    l2a: Point2<f32>,
    l2b: Point2<f32>,
) -> Option<f32> {
    let (x1, y1, x2, y2) = (l1a.x, l1a.y, l1b.x, l1b.y);
    let (x3, y3, x4, y4) = (l2a.x, l2a.y, l2b.x, l2b.y);

    let denom = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
    if zero(denom) {
        return None;
    }

    let u = ((x1 - x3) * (y3 - y4) - (y1 - y3) * (x3 - x4)) / denom;
    if !greater(u, 0.0) || !less(u, 1.0) {
        return None;
    }
    let v = ((x1 - x2) * (y1 - y3) - (y1 - y2) * (x1 - x3)) / -denom;
    if !greater(v, 0.0) || !less(v, 1.0) {
        return None;
    }
    Some(u)
}

/// Triangulate a solved sketch into faces, edges and corners.
///
/// `op_uid` names the operation instance in every emitted geo-id.
pub fn triangulate(sketch: &Sketch, op_uid: i64) -> Result<Triangulation> {
    // import points and lines into working structures
    let mut points: Vec<TPoint> = sketch
        .points
        .iter()
        .map(|p| TPoint {
            pos: p.pos,
            uid: p.uid,
            island: None,
            adj: SmallVec::new(),
            alive: false,
        })
        .collect();
    let mut edges: Vec<PEdge> = sketch
        .lines
        .iter()
        .map(|l| PEdge {
            uid: l.uid,
            p1: l.p1.0,
            p2: l.p2.0,
            clean: false,
            culled: false,
        })
        .collect();

    if points.is_empty() {
        return Ok(Triangulation::default());
    }

    planarize(&mut points, &mut edges);
    cull_pendants(&mut edges);
    build_adjacency(&mut points, &edges);
    let island_count = mark_islands(&mut points);

    let mut loops = extract_loops(&mut points)?;

    // merge nested islands with seam edges until no perimeter contains
    // another, re-walking the loops after every seam
    loop {
        if !merge_one_nested_island(&mut points, &mut edges, &loops, island_count) {
            break;
        }
        loops = extract_loops(&mut points)?;
    }

    let mut out = Triangulation::default();
    for l in &loops {
        if l.area < 0.0 {
            continue; // the island perimeter is not a face
        }
        let tris = ear_clip(&l.pts);
        out.faces.push(Face::new(
            GeoId::new(op_uid, l.hash_sum, GeoKind::Face),
            tris,
        ));
    }

    for e in &edges {
        if e.culled {
            continue;
        }
        out.edges.push(MeshEdge {
            id: GeoId::new(op_uid, e.uid, GeoKind::Edge),
            points: vec![to3(points[e.p1 as usize].pos), to3(points[e.p2 as usize].pos)],
            faces: (None, None),
            sel: SelectionState::default(),
        });
    }

    for p in &points {
        if !p.alive {
            continue;
        }
        out.corners.push(Corner {
            id: GeoId::new(op_uid, p.uid, GeoKind::Corner),
            pos: to3(p.pos),
            sel: SelectionState::default(),
        });
    }

    debug!(
        faces = out.faces.len(),
        edges = out.edges.len(),
        corners = out.corners.len(),
        "triangulated sketch"
    );
    Ok(out)
}

/// Split every pair of crossing edges at their intersection until no
/// crossings remain. Derived points and edges get ids mixed from the two
/// parents, so the same crossing yields the same id on every re-solve.
fn planarize(points: &mut Vec<TPoint>, edges: &mut Vec<PEdge>) {
    loop {
        let Some(e_idx) = edges.iter().position(|e| !e.clean) else {
            break;
        };

        let mut split_any = false;
        for o_idx in 0..edges.len() {
            if o_idx == e_idx || edges[o_idx].clean {
                continue;
            }
            let e = edges[e_idx];
            let o = edges[o_idx];
            let Some(u) = proper_intersection(
                points[e.p1 as usize].pos,
                points[e.p2 as usize].pos,
                points[o.p1 as usize].pos,
                points[o.p2 as usize].pos,
            ) else {
                continue;
            };

            let a = points[e.p1 as usize].pos;
            let b = points[e.p2 as usize].pos;
            let pos = a + (b - a) * u;
            let base = mix_uid(e.uid).wrapping_add(mix_uid(o.uid));

            let cut = points.len() as u32;
            points.push(TPoint {
                pos,
                uid: base,
                island: None,
                adj: SmallVec::new(),
                alive: false,
            });

            // four sub-edges share the cut point: two fresh ones for the
            // split halves of e, and e/o reused for the halves of o
            edges.push(PEdge {
                uid: base.wrapping_add(1),
                p1: e.p1,
                p2: cut,
                clean: false,
                culled: false,
            });
            edges.push(PEdge {
                uid: base.wrapping_add(2),
                p1: e.p2,
                p2: cut,
                clean: false,
                culled: false,
            });
            edges[e_idx] = PEdge {
                uid: base.wrapping_add(3),
                p1: o.p1,
                p2: cut,
                clean: false,
                culled: false,
            };
            edges[o_idx] = PEdge {
                uid: base.wrapping_add(4),
                p1: o.p2,
                p2: cut,
                clean: false,
                culled: false,
            };

            split_any = true;
            break;
        }

        if !split_any {
            edges[e_idx].clean = true;
        }
    }
}

/// Drop edges hanging off degree-1 points, to a fixpoint.
fn cull_pendants(edges: &mut [PEdge]) {
    loop {
        let mut any_culled = false;
        let point_count = edges
            .iter()
            .flat_map(|e| [e.p1, e.p2])
            .max()
            .map_or(0, |m| m as usize + 1);
        for p in 0..point_count {
            let mut count = 0;
            let mut last = None;
            for (i, e) in edges.iter().enumerate() {
                if e.culled {
                    continue;
                }
                if e.p1 == p as u32 || e.p2 == p as u32 {
                    count += 1;
                    last = Some(i);
                }
            }
            if count == 1 {
                edges[last.expect("counted an edge")].culled = true;
                any_culled = true;
            }
        }
        if !any_culled {
            break;
        }
    }
}

fn build_adjacency(points: &mut [TPoint], edges: &[PEdge]) {
    for (pi, p) in points.iter_mut().enumerate() {
        let mut adj: SmallVec<[Adj; 4]> = SmallVec::new();
        for e in edges {
            if e.culled {
                continue;
            }
            if e.p1 == pi as u32 {
                adj.push(Adj {
                    other: e.p2,
                    uid: e.uid,
                    traversed: false,
                });
            } else if e.p2 == pi as u32 {
                adj.push(Adj {
                    other: e.p1,
                    uid: e.uid,
                    traversed: false,
                });
            }
        }
        // pendant culling leaves every connected point with degree >= 2
        debug_assert!(adj.is_empty() || adj.len() >= 2);
        p.alive = !adj.is_empty();
        p.adj = adj;
    }
}

/// DFS the adjacency graph, giving each connected component an island id.
fn mark_islands(points: &mut [TPoint]) -> usize {
    let mut island_count = 0;
    for seed in 0..points.len() {
        if !points[seed].alive || points[seed].island.is_some() {
            continue;
        }
        let island = island_count;
        island_count += 1;

        let mut stack = vec![seed];
        while let Some(i) = stack.pop() {
            if points[i].island.is_some() {
                continue;
            }
            points[i].island = Some(island);
            for a in points[i].adj.clone() {
                if points[a.other as usize].island.is_none() {
                    stack.push(a.other as usize);
                }
            }
        }
    }
    island_count
}

/// Walk every untraversed edge direction into a closed vertex loop,
/// always turning as far CCW as possible. A positive-area loop bounds a
/// face; the negative-area loop is its island's outer perimeter.
fn extract_loops(points: &mut [TPoint]) -> Result<Vec<VertLoop>> {
    for p in points.iter_mut() {
        for a in &mut p.adj {
            a.traversed = false;
        }
    }
    let direction_count: usize = points.iter().map(|p| p.adj.len()).sum();

    let mut loops = Vec::new();
    loop {
        // seed on any untraversed direction
        let mut seed = None;
        'hunt: for (pi, p) in points.iter().enumerate() {
            for (ai, a) in p.adj.iter().enumerate() {
                if !a.traversed {
                    seed = Some((pi, ai));
                    break 'hunt;
                }
            }
        }
        let Some((start, adj_idx)) = seed else {
            break;
        };

        let mut hash_sum;
        let mut prev = start;
        let mut current;
        {
            let a = &mut points[start].adj[adj_idx];
            a.traversed = true;
            hash_sum = mix_uid(a.uid);
            current = a.other as usize;
        }
        let island = points[start].island.ok_or(Error::UnclosedLoop)?;

        let mut dir = {
            let diff = points[current].pos - points[start].pos;
            diff.y.atan2(diff.x)
        };

        let mut pts = vec![points[current].pos];
        let mut steps = 0usize;
        // the loop closes when the walk would re-take the seed direction;
        // seam boundaries revisit vertices, so closing on the start vertex
        // alone would cut them short
        loop {
            steps += 1;
            if steps > direction_count {
                return Err(Error::UnclosedLoop);
            }

            let mut selected = None;
            let mut max_diff = f32::NEG_INFINITY;
            let mut max_angle = 0.0f32;
            for (ai, a) in points[current].adj.iter().enumerate() {
                if a.other as usize == prev {
                    continue;
                }
                let diff = points[a.other as usize].pos - points[current].pos;
                let angle = diff.y.atan2(diff.x);
                let angle_diff = normalize_angle(angle - dir);
                // take the most CCW turn to trace a single face boundary
                if angle_diff > max_diff {
                    selected = Some(ai);
                    max_diff = angle_diff;
                    max_angle = angle;
                }
            }
            let Some(sel) = selected else {
                return Err(Error::UnclosedLoop);
            };
            if current == start && sel == adj_idx {
                break;
            }

            let a = &mut points[current].adj[sel];
            a.traversed = true;
            hash_sum = hash_sum.wrapping_add(mix_uid(a.uid));
            prev = current;
            current = a.other as usize;
            dir = max_angle;
            pts.push(points[current].pos);
        }

        let mut area = 0.0;
        for i in 0..pts.len() {
            let p0 = pts[i];
            let p1 = pts[(i + 1) % pts.len()];
            area += p0.x * p1.y - p1.x * p0.y;
        }
        area /= 2.0;
        if zero(area) {
            return Err(Error::ZeroAreaLoop);
        }

        loops.push(VertLoop {
            island,
            pts,
            hash_sum,
            area,
        });
    }
    Ok(loops)
}

/// Does a ray from `origin` toward +x cross the segment a-b? The segment
/// must strictly straddle the ray's line, which keeps shared loop vertices
/// from double-counting.
fn ray_hits_segment(origin: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> bool {
    let ay = a.y - origin.y;
    let by = b.y - origin.y;
    if (ay > 0.0) == (by > 0.0) {
        return false;
    }
    let t = ay / (ay - by);
    let x = a.x + (b.x - a.x) * t;
    x > origin.x
}

/// Odd crossing count of a ray cast toward +x
fn loop_contains_point(l: &VertLoop, pt: Point2<f32>) -> bool {
    let mut hits = 0;
    for i in 0..l.pts.len() {
        let a = l.pts[i];
        let b = l.pts[(i + 1) % l.pts.len()];
        if ray_hits_segment(pt, a, b) {
            hits += 1;
        }
    }
    hits % 2 == 1
}

/// True when loop `b` nests entirely inside loop `a`
fn loop_contains_loop(a: &VertLoop, b: &VertLoop) -> bool {
    if !loop_contains_point(a, b.pts[0]) {
        return false;
    }
    for i in 0..a.pts.len() {
        let a0 = a.pts[i];
        let a1 = a.pts[(i + 1) % a.pts.len()];
        for j in 0..b.pts.len() {
            let b0 = b.pts[j];
            let b1 = b.pts[(j + 1) % b.pts.len()];
            if proper_intersection(a0, a1, b0, b1).is_some() {
                return false;
            }
        }
    }
    true
}

/// Find one island nested inside another and join the two with a seam
/// edge: the shortest vertex pair that crosses nothing. Returns false when
/// no nesting remains.
fn merge_one_nested_island(
    points: &mut Vec<TPoint>,
    edges: &mut Vec<PEdge>,
    loops: &[VertLoop],
    island_count: usize,
) -> bool {
    let mut perimeter: Vec<Option<&VertLoop>> = vec![None; island_count];
    for l in loops {
        if l.area < 0.0 {
            perimeter[l.island] = Some(l);
        }
    }

    for outer in 0..island_count {
        for inner in 0..island_count {
            if outer == inner {
                continue;
            }
            let (Some(po), Some(pi)) = (perimeter[outer], perimeter[inner]) else {
                continue;
            };
            if !loop_contains_loop(po, pi) {
                continue;
            }

            // candidate seam endpoints, nearest pairs first
            let mut candidates = Vec::new();
            for (oi, op) in points.iter().enumerate() {
                if !op.alive || op.island != Some(outer) {
                    continue;
                }
                for (ii, ip) in points.iter().enumerate() {
                    if !ip.alive || ip.island != Some(inner) {
                        continue;
                    }
                    candidates.push((oi, ii, (ip.pos - op.pos).norm()));
                }
            }
            candidates.sort_by(|a, b| a.2.total_cmp(&b.2));

            let seam = candidates.iter().find(|&&(oi, ii, _)| {
                let a = points[oi].pos;
                let b = points[ii].pos;
                !edges.iter().any(|e| {
                    !e.culled
                        && proper_intersection(
                            a,
                            b,
                            points[e.p1 as usize].pos,
                            points[e.p2 as usize].pos,
                        )
                        .is_some()
                })
            });
            let Some(&(oi, ii, _)) = seam else {
                continue;
            };

            let uid = mix_uid(points[oi].uid).wrapping_add(mix_uid(points[ii].uid));
            edges.push(PEdge {
                uid,
                p1: oi as u32,
                p2: ii as u32,
                clean: true,
                culled: false,
            });
            points[oi].adj.push(Adj {
                other: ii as u32,
                uid,
                traversed: false,
            });
            points[ii].adj.push(Adj {
                other: oi as u32,
                uid,
                traversed: false,
            });

            // the inner island dissolves into the outer one
            for p in points.iter_mut() {
                if p.island == Some(inner) {
                    p.island = Some(outer);
                }
            }
            debug!(outer, inner, "joined nested island with a seam edge");
            return true;
        }
    }
    false
}

/// Next index around the loop that has not been culled
fn next_unculled(culled: &[bool], from: usize) -> usize {
    let n = culled.len();
    let mut i = (from + 1) % n;
    while culled[i] {
        i = (i + 1) % n;
    }
    i
}

/// Strictly interior point test for the ear check
fn point_in_tri(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>, c: Point2<f32>) -> bool {
    let sign = |p1: Point2<f32>, p2: Point2<f32>, p3: Point2<f32>| {
        (p1.x - p3.x) * (p2.y - p3.y) - (p2.x - p3.x) * (p1.y - p3.y)
    };
    let d1 = sign(p, a, b);
    let d2 = sign(p, b, c);
    let d3 = sign(p, c, a);
    greater(d1, 0.0) && greater(d2, 0.0) && greater(d3, 0.0)
        || less(d1, 0.0) && less(d2, 0.0) && less(d3, 0.0)
}

/// Ear-clip one CCW vertex loop into triangles in the z=0 plane.
///
/// Convex corners whose triangle swallows no other active vertex are
/// accepted; zero-area corners are culled without emitting. A no-progress
/// counter bounds malformed input.
fn ear_clip(pts: &[Point2<f32>]) -> Vec<Tri> {
    let n = pts.len();
    if n < 3 {
        return Vec::new();
    }

    let mut culled = vec![false; n];
    let mut culled_count = 0;
    let mut tris = Vec::with_capacity(n - 2);
    let mut idle = 0usize;
    let mut cursor = 0usize;

    loop {
        if idle > n {
            break; // failsafe against loops no ear fits
        }
        let idx = cursor % n;
        cursor += 1;
        idle += 1;

        if culled_count >= n - 2 {
            break;
        }
        if culled[idx] {
            continue;
        }

        let i1 = next_unculled(&culled, idx);
        let i2 = next_unculled(&culled, i1);
        let (a, b, c) = (pts[idx], pts[i1], pts[i2]);

        let angle = normalize_angle(
            (c - a).y.atan2((c - a).x) - (b - a).y.atan2((b - a).x),
        );
        // a reflex corner would cross the gap
        if !greater_equal(angle, 0.0) {
            continue;
        }

        // degenerate ears get culled without a triangle
        let wrapped = angle % PI;
        if equal(wrapped, 0.0) || equal(wrapped, PI) || v2_equal(&a, &b) || v2_equal(&a, &c) {
            culled[i1] = true;
            culled_count += 1;
            continue;
        }

        // an ear that swallows another active vertex is not an ear; this
        // matters once seams fold hole boundaries into the loop
        let swallowed = (0..n).any(|k| {
            !culled[k]
                && k != idx
                && k != i1
                && k != i2
                && !v2_equal(&pts[k], &a)
                && !v2_equal(&pts[k], &b)
                && !v2_equal(&pts[k], &c)
                && point_in_tri(pts[k], a, b, c)
        });
        if swallowed {
            continue;
        }

        tris.push(Tri::new(to3(a), to3(b), to3(c)));
        culled[i1] = true;
        culled_count += 1;
        idle = 0;
    }

    tris
}
