// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lifting planar faces into triangle solids
//!
//! An extrusion produces a closed prism: the input faces become the two
//! caps (the near cap reversed so both face out), and every boundary edge
//! of each face tiling grows a two-triangle side wall. Boundary edges are
//! the triangle edges that appear exactly once in a face's tiling.

use crate::error::{Error, Result};
use crate::solid::{Face, Solid};
use crate::tri::Tri;
use keel_core::scalar::zero;
use keel_core::{mix_uid, GeoId, GeoKind};
use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;

fn point_key(p: &Point3<f32>) -> [u32; 3] {
    [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
}

/// Directed boundary edges of a face tiling: triangle edges whose
/// undirected form occurs exactly once. Interior diagonals occur twice.
fn boundary_edges(tris: &[Tri]) -> Vec<(Point3<f32>, Point3<f32>)> {
    let mut counts: FxHashMap<([u32; 3], [u32; 3]), (u32, (Point3<f32>, Point3<f32>))> =
        FxHashMap::default();
    for t in tris {
        let v = t.vertices();
        for i in 0..3 {
            let (p, q) = (v[i], v[(i + 1) % 3]);
            let (kp, kq) = (point_key(&p), point_key(&q));
            let key = if kp <= kq { (kp, kq) } else { (kq, kp) };
            counts.entry(key).or_insert((0, (p, q))).0 += 1;
        }
    }
    let mut out: Vec<_> = counts
        .into_values()
        .filter(|(count, _)| *count == 1)
        .map(|(_, edge)| edge)
        .collect();
    // hash order is unstable; sort for deterministic output
    out.sort_by(|a, b| point_key(&a.0).cmp(&point_key(&b.0)));
    out
}

/// Extrude planar faces along `direction` by `distance` into a closed solid.
///
/// `direction` must not lie in the face plane and `distance` must be
/// positive. Output faces carry ids differentiated from the source face
/// ids, so re-running the upstream solve keeps them stable.
pub fn extrude(
    faces: &[Face],
    direction: Vector3<f32>,
    distance: f32,
    op_uid: i64,
) -> Result<Solid> {
    if distance <= 0.0 {
        return Err(Error::InvalidExtrusion(format!(
            "distance must be positive, was {distance}"
        )));
    }
    let dir_len = direction.norm();
    if zero(dir_len) {
        return Err(Error::InvalidExtrusion(
            "direction must be nonzero".to_string(),
        ));
    }
    let offset = direction / dir_len * distance;

    let mut out_faces = Vec::new();
    for face in faces {
        if face.tris.is_empty() {
            continue;
        }
        let normal = face.tris[0].normal();
        let along = offset.dot(&normal);
        if zero(along) {
            return Err(Error::InvalidExtrusion(
                "direction lies in the face plane".to_string(),
            ));
        }
        // with the face normal against the direction, near/far cap roles swap
        let forward = along > 0.0;

        let source = mix_uid(face.id.base_id);
        let near_tris: Vec<Tri> = face
            .tris
            .iter()
            .map(|t| if forward { t.inverted() } else { *t })
            .collect();
        let far_tris: Vec<Tri> = face
            .tris
            .iter()
            .map(|t| {
                let moved = Tri::new(t.a + offset, t.b + offset, t.c + offset);
                if forward {
                    moved
                } else {
                    moved.inverted()
                }
            })
            .collect();

        out_faces.push(Face::new(
            GeoId::new(op_uid, source + 1, GeoKind::Face),
            near_tris,
        ));
        out_faces.push(Face::new(
            GeoId::new(op_uid, source + 2, GeoKind::Face),
            far_tris,
        ));

        for (wall, (p, q)) in boundary_edges(&face.tris).into_iter().enumerate() {
            let tris = if forward {
                vec![
                    Tri::new(p, q, q + offset),
                    Tri::new(p, q + offset, p + offset),
                ]
            } else {
                vec![
                    Tri::new(q, p, p + offset),
                    Tri::new(q, p + offset, q + offset),
                ]
            };
            out_faces.push(Face::new(
                GeoId::new(op_uid, source + 3 + wall as i64, GeoKind::Face),
                tris,
            ));
        }
    }

    if out_faces.is_empty() {
        return Err(Error::EmptySolid("extrusion input".to_string()));
    }

    let mut solid = Solid {
        faces: out_faces,
        edges: Vec::new(),
        corners: Vec::new(),
    };
    solid.rebuild_topology(op_uid);
    Ok(solid)
}
