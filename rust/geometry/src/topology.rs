// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Recovering face/edge/corner structure from triangle soup
//!
//! Faces are grown by flood fill over edge-adjacent triangles with nearby
//! normals. Edges between two faces are found by clipping every pair of
//! triangle edges to their collinear overlap and walking the resulting
//! segments into ordered polylines. Corners fall out of shared polyline
//! endpoints.

use crate::solid::{Corner, Edge, Face};
use crate::tri::{v3_equal, vec3_equal, Segment3, Tri};
use keel_core::scalar::{equal, zero};
use keel_core::{mix_uid, GeoId, GeoKind, SelectionState};
use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;
use tracing::{debug, trace};

/// Normal cone for absorbing a triangle into a face, in radians (30 degrees)
const FACE_NORMAL_TOLERANCE: f32 = std::f32::consts::PI / 6.0;

/// Failsafe cap on triangles absorbed into a single face
const FACE_TRI_CUTOFF: usize = 1000;

fn tri_segments(t: &Tri) -> SmallVec<[Segment3; 3]> {
    let v = t.vertices();
    (0..3)
        .map(|i| Segment3::new(v[i], v[(i + 1) % 3]))
        .collect()
}

/// Endpoint coincidence under epsilon, in any combination
fn segments_touch(a: &Segment3, b: &Segment3) -> bool {
    v3_equal(&a.a, &b.a) || v3_equal(&a.a, &b.b) || v3_equal(&a.b, &b.a) || v3_equal(&a.b, &b.b)
}

/// The shared endpoint of two segments, if there is one
fn shared_endpoint(a: &Segment3, b: &Segment3) -> Option<Point3<f32>> {
    if v3_equal(&a.a, &b.a) || v3_equal(&a.a, &b.b) {
        Some(a.a)
    } else if v3_equal(&a.b, &b.b) || v3_equal(&a.b, &b.a) {
        Some(a.b)
    } else {
        None
    }
}

fn angle_between(a: &Vector3<f32>, b: &Vector3<f32>) -> f32 {
    (a.dot(b) / (a.norm() * b.norm())).clamp(-1.0, 1.0).acos()
}

/// Clip segment `a` to its overlap with a collinear `b`.
///
/// Returns `None` unless the two are parallel, collinear and overlap along
/// a segment of nonzero length.
fn clip_collinear_overlap(a: &Segment3, b: &Segment3) -> Option<Segment3> {
    let a_dir = (a.b - a.a).normalize();
    let b_dir = (b.b - b.a).normalize();
    if !vec3_equal(&b_dir, &a_dir) && !vec3_equal(&(-b_dir), &a_dir) {
        return None;
    }

    let offset = b.a - a.a;
    let dot = if zero(offset.norm_squared()) {
        1.0
    } else {
        offset.normalize().dot(&a_dir)
    };
    if !(equal(dot, 1.0) || equal(dot, -1.0)) {
        return None;
    }

    let ab = (a.b - a.a).dot(&a_dir);
    let ba = (b.a - a.a).dot(&a_dir);
    let bb = (b.b - a.a).dot(&a_dir);

    let a_min = 0.0f32.min(ab);
    let a_max = 0.0f32.max(ab);
    let b_min = ba.min(bb);
    let b_max = ba.max(bb);
    if b_max < a_min || b_min > a_max {
        return None;
    }

    let lo = a_min.max(b_min);
    let hi = a_max.min(b_max);
    if equal(lo, hi) {
        return None;
    }

    Some(Segment3::new(a.a + a_dir * lo, a.a + a_dir * hi))
}

/// Group soup triangles into faces by flood fill.
///
/// A triangle joins a face when it shares an edge (endpoint coincidence
/// under epsilon) with an absorbed triangle and its normal sits within 30
/// degrees of that triangle's normal. A cutoff bounds pathological fills.
pub fn recover_faces(tris: &[Tri]) -> Vec<Vec<Tri>> {
    let mut face_of: Vec<Option<usize>> = vec![None; tris.len()];
    let mut groups: Vec<Vec<usize>> = Vec::new();

    while let Some(seed) = face_of.iter().position(Option::is_none) {
        let group_idx = groups.len();
        face_of[seed] = Some(group_idx);

        let seed_normal = tris[seed].normal();
        let mut segments: Vec<(Segment3, Vector3<f32>)> = tri_segments(&tris[seed])
            .into_iter()
            .map(|s| (s, seed_normal))
            .collect();
        let mut members = vec![seed];

        loop {
            let mut any_absorbed = false;
            for (ti, tri) in tris.iter().enumerate() {
                if face_of[ti].is_some() {
                    continue;
                }

                let normal = tri.normal();
                let candidate_segments = tri_segments(tri);
                let adjacent = segments.iter().any(|(seg, seg_normal)| {
                    angle_between(&normal, seg_normal) <= FACE_NORMAL_TOLERANCE
                        && candidate_segments.iter().any(|s| segments_touch(s, seg))
                });
                if !adjacent {
                    continue;
                }

                face_of[ti] = Some(group_idx);
                members.push(ti);
                for s in candidate_segments {
                    segments.push((s, normal));
                }
                any_absorbed = true;
            }

            if members.len() > FACE_TRI_CUTOFF {
                debug!(face = group_idx, "face flood fill hit the cutoff");
                break;
            }
            if !any_absorbed {
                break;
            }
        }

        trace!(face = group_idx, tris = members.len(), "recovered face");
        groups.push(members);
    }

    debug!(faces = groups.len(), tris = tris.len(), "grouped soup into faces");
    groups
        .into_iter()
        .map(|members| members.into_iter().map(|i| tris[i]).collect())
        .collect()
}

/// Walk adjacent segments outward from `start`, consuming them, and return
/// the chain of endpoints reached (the start point itself is not pushed).
fn group_points_adjacent(
    segments: &[Segment3],
    used: &mut [bool],
    start: Point3<f32>,
) -> Vec<Point3<f32>> {
    let mut pt = start;
    let mut out = Vec::new();
    loop {
        let mut found = None;
        for (i, s) in segments.iter().enumerate() {
            if used[i] {
                continue;
            }
            if v3_equal(&s.a, &pt) {
                found = Some((i, s.b));
                break;
            } else if v3_equal(&s.b, &pt) {
                found = Some((i, s.a));
                break;
            }
        }
        let Some((i, next)) = found else {
            break;
        };
        used[i] = true;
        pt = next;
        out.push(pt);
        if v3_equal(&pt, &start) {
            break;
        }
    }
    out
}

/// Assemble one ordered polyline from an unordered segment set, walking in
/// both directions from an arbitrary unconsumed segment.
fn ordered_points(segments: &[Segment3], used: &mut [bool]) -> Option<Vec<Point3<f32>>> {
    let start_idx = used.iter().position(|u| !u)?;
    let start = segments[start_idx].a;

    let forward = group_points_adjacent(segments, used, start);
    let reverse = group_points_adjacent(segments, used, start);

    let mut out = Vec::with_capacity(reverse.len() + 1 + forward.len());
    out.extend(reverse.iter().rev().copied());
    out.push(start);
    out.extend(forward);
    Some(out)
}

/// Find every edge polyline between every pair of faces.
pub fn generate_edges(faces: &[Face], op_uid: i64) -> Vec<Edge> {
    let mut edges = Vec::new();

    for a_idx in 0..faces.len() {
        for b_idx in (a_idx + 1)..faces.len() {
            let mut clipped: Vec<Segment3> = Vec::new();
            for ta in &faces[a_idx].tris {
                for tb in &faces[b_idx].tris {
                    for sa in tri_segments(ta) {
                        for sb in tri_segments(tb) {
                            if let Some(s) = clip_collinear_overlap(&sa, &sb) {
                                clipped.push(s);
                            }
                        }
                    }
                }
            }
            if clipped.is_empty() {
                continue;
            }

            let pair_base = mix_uid(a_idx as i64).wrapping_add(mix_uid(b_idx as i64));
            let mut used = vec![false; clipped.len()];
            let mut ordinal = 0i64;
            while let Some(points) = ordered_points(&clipped, &mut used) {
                if points.len() < 2 {
                    continue;
                }
                edges.push(Edge {
                    id: GeoId::new(op_uid, pair_base + ordinal, GeoKind::Edge),
                    points,
                    faces: (Some(a_idx as u32), Some(b_idx as u32)),
                    sel: SelectionState::default(),
                });
                ordinal += 1;
            }
        }
    }

    debug!(edges = edges.len(), faces = faces.len(), "recovered edges");
    edges
}

/// Find every corner: a point shared by segments of two different edges.
pub fn generate_corners(edges: &[Edge], op_uid: i64) -> Vec<Corner> {
    let mut corners: Vec<Corner> = Vec::new();

    for i in 0..edges.len() {
        for j in (i + 1)..edges.len() {
            for wa in edges[i].points.windows(2) {
                let sa = Segment3::new(wa[0], wa[1]);
                for wb in edges[j].points.windows(2) {
                    let sb = Segment3::new(wb[0], wb[1]);
                    let Some(pt) = shared_endpoint(&sa, &sb) else {
                        continue;
                    };
                    if corners.iter().any(|c| v3_equal(&c.pos, &pt)) {
                        continue;
                    }
                    corners.push(Corner {
                        id: GeoId::new(
                            op_uid,
                            mix_uid(edges[i].id.base_id).wrapping_add(mix_uid(edges[j].id.base_id)),
                            GeoKind::Corner,
                        ),
                        pos: pt,
                        sel: SelectionState::default(),
                    });
                }
            }
        }
    }

    debug!(corners = corners.len(), edges = edges.len(), "recovered corners");
    corners
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collinear_overlap_clipping() {
        let a = Segment3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0));
        let b = Segment3::new(Point3::new(1.0, 0.0, 0.0), Point3::new(3.0, 0.0, 0.0));
        let s = clip_collinear_overlap(&a, &b).unwrap();
        assert!(v3_equal(&s.a, &Point3::new(1.0, 0.0, 0.0)));
        assert!(v3_equal(&s.b, &Point3::new(2.0, 0.0, 0.0)));

        // reversed direction still overlaps
        let b_rev = Segment3::new(Point3::new(3.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0));
        assert!(clip_collinear_overlap(&a, &b_rev).is_some());

        // parallel but offset lines do not
        let off = Segment3::new(Point3::new(0.0, 1.0, 0.0), Point3::new(2.0, 1.0, 0.0));
        assert!(clip_collinear_overlap(&a, &off).is_none());

        // collinear but disjoint ranges do not
        let far = Segment3::new(Point3::new(5.0, 0.0, 0.0), Point3::new(6.0, 0.0, 0.0));
        assert!(clip_collinear_overlap(&a, &far).is_none());

        // touching at a single point is not an overlap
        let touch = Segment3::new(Point3::new(2.0, 0.0, 0.0), Point3::new(3.0, 0.0, 0.0));
        assert!(clip_collinear_overlap(&a, &touch).is_none());
    }

    #[test]
    fn polyline_assembly_orders_segments() {
        let segments = vec![
            Segment3::new(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)),
            Segment3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)),
            Segment3::new(Point3::new(2.0, 0.0, 0.0), Point3::new(3.0, 0.0, 0.0)),
        ];
        let mut used = vec![false; segments.len()];
        let points = ordered_points(&segments, &mut used).unwrap();
        assert_eq!(points.len(), 4);
        // endpoints of the chain are the extremes
        let xs: Vec<f32> = points.iter().map(|p| p.x).collect();
        assert!(
            (xs.first() == Some(&0.0) && xs.last() == Some(&3.0))
                || (xs.first() == Some(&3.0) && xs.last() == Some(&0.0))
        );
        assert!(ordered_points(&segments, &mut used).is_none());
    }

    #[test]
    fn flat_soup_groups_into_one_face() {
        // two triangles sharing an edge in one plane
        let tris = vec![
            Tri::new(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ),
            Tri::new(
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ),
        ];
        let groups = recover_faces(&tris);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn sharp_crease_splits_faces() {
        // two triangles sharing an edge but folded 90 degrees apart
        let tris = vec![
            Tri::new(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ),
            Tri::new(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
                Point3::new(1.0, 0.0, 0.0),
            ),
        ];
        let groups = recover_faces(&tris);
        assert_eq!(groups.len(), 2);
    }
}
