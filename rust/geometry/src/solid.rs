// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Faces, edges, corners and the solid that owns them
//!
//! A [`Solid`] is triangle soup organized into planar [`Face`]s, with
//! [`Edge`] polylines where two faces meet and [`Corner`] points where two
//! edges meet. Every element carries a [`GeoId`] so downstream operations
//! can keep referring to it across re-solves, and a [`SelectionState`] for
//! the host UI.

use crate::error::Result;
use crate::tri::Tri;
use crate::topology;
use keel_core::stl::{self, Facet};
use keel_core::{GeoId, GeoKind, SelectionState};
use nalgebra::{Matrix4, Point3, Vector3};

/// A planar region tiled by triangles
#[derive(Debug, Clone)]
pub struct Face {
    pub id: GeoId,
    pub tris: Vec<Tri>,
    pub sel: SelectionState,
}

impl Face {
    pub fn new(id: GeoId, tris: Vec<Tri>) -> Self {
        Self {
            id,
            tris,
            sel: SelectionState::default(),
        }
    }

    /// Total tiled area
    pub fn area(&self) -> f32 {
        self.tris.iter().map(Tri::area).sum()
    }
}

/// An ordered polyline separating two faces
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: GeoId,
    pub points: Vec<Point3<f32>>,
    /// Indices of the separated faces in the owning solid, when known
    pub faces: (Option<u32>, Option<u32>),
    pub sel: SelectionState,
}

/// A single point where edges meet
#[derive(Debug, Clone)]
pub struct Corner {
    pub id: GeoId,
    pub pos: Point3<f32>,
    pub sel: SelectionState,
}

/// A triangle solid with recovered face/edge/corner structure
#[derive(Debug, Clone, Default)]
pub struct Solid {
    pub faces: Vec<Face>,
    pub edges: Vec<Edge>,
    pub corners: Vec<Corner>,
}

impl Solid {
    /// Iterate over every triangle of every face
    pub fn tris(&self) -> impl Iterator<Item = &Tri> {
        self.faces.iter().flat_map(|f| f.tris.iter())
    }

    /// Flatten the solid to a plain triangle list
    pub fn collect_tris(&self) -> Vec<Tri> {
        self.tris().copied().collect()
    }

    pub fn tri_count(&self) -> usize {
        self.faces.iter().map(|f| f.tris.len()).sum()
    }

    /// A 2-unit cube centered on the origin, with one face per side and
    /// full edge/corner structure.
    pub fn cube(op_uid: i64) -> Self {
        let v = [
            Point3::new(-1.0, -1.0, 1.0),
            Point3::new(1.0, -1.0, 1.0),
            Point3::new(1.0, -1.0, -1.0),
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(-1.0, 1.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(1.0, 1.0, -1.0),
            Point3::new(-1.0, 1.0, -1.0),
        ];
        let quads: [[usize; 4]; 6] = [
            [0, 3, 2, 1], // bottom (-y)
            [7, 6, 2, 3], // back (-z)
            [6, 5, 1, 2], // right (+x)
            [5, 4, 0, 1], // front (+z)
            [4, 7, 3, 0], // left (-x)
            [4, 5, 6, 7], // top (+y)
        ];

        let mut faces = Vec::with_capacity(6);
        for (i, q) in quads.iter().enumerate() {
            let tris = vec![
                Tri::new(v[q[0]], v[q[1]], v[q[2]]),
                Tri::new(v[q[0]], v[q[2]], v[q[3]]),
            ];
            faces.push(Face::new(GeoId::new(op_uid, i as i64, GeoKind::Face), tris));
        }

        let mut solid = Self {
            faces,
            edges: Vec::new(),
            corners: Vec::new(),
        };
        solid.rebuild_topology(op_uid);
        solid
    }

    /// Group raw triangle soup into faces and recover edges and corners.
    pub fn from_soup(tris: Vec<Tri>, op_uid: i64) -> Self {
        let groups = topology::recover_faces(&tris);
        let faces = groups
            .into_iter()
            .enumerate()
            .map(|(i, tris)| Face::new(GeoId::new(op_uid, i as i64, GeoKind::Face), tris))
            .collect();
        let mut solid = Self {
            faces,
            edges: Vec::new(),
            corners: Vec::new(),
        };
        solid.rebuild_topology(op_uid);
        solid
    }

    /// Re-derive edges and corners from the current face tilings
    pub fn rebuild_topology(&mut self, op_uid: i64) {
        self.edges = topology::generate_edges(&self.faces, op_uid);
        self.corners = topology::generate_corners(&self.edges, op_uid);
    }

    pub fn transform(&mut self, m: &Matrix4<f32>) {
        for face in &mut self.faces {
            for tri in &mut face.tris {
                *tri = tri.transformed(m);
            }
        }
        for edge in &mut self.edges {
            for p in &mut edge.points {
                *p = m.transform_point(p);
            }
        }
        for corner in &mut self.corners {
            corner.pos = m.transform_point(&corner.pos);
        }
    }

    pub fn translate(&mut self, offset: Vector3<f32>) {
        self.transform(&Matrix4::new_translation(&offset));
    }

    /// Flip every triangle's orientation
    pub fn invert(&mut self) {
        for face in &mut self.faces {
            for tri in &mut face.tris {
                *tri = tri.inverted();
            }
        }
    }

    pub fn find_face(&self, id: GeoId) -> Option<&Face> {
        self.faces.iter().find(|f| f.id == id)
    }

    pub fn find_edge(&self, id: GeoId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn find_corner(&self, id: GeoId) -> Option<&Corner> {
        self.corners.iter().find(|c| c.id == id)
    }

    /// Flatten to the STL wire-format facets
    pub fn to_facets(&self) -> Vec<Facet> {
        self.tris()
            .map(|t| {
                Facet::from_vertices([
                    [t.a.x, t.a.y, t.a.z],
                    [t.b.x, t.b.y, t.b.z],
                    [t.c.x, t.c.y, t.c.z],
                ])
            })
            .collect()
    }

    /// Serialize as ASCII STL
    pub fn to_stl(&self, name: &str) -> String {
        stl::write(name, &self.to_facets())
    }

    /// Parse ASCII STL into a solid, recentering the soup on its vertex
    /// centroid and recovering face/edge/corner structure.
    pub fn read_stl(text: &str, op_uid: i64) -> Result<Self> {
        let parsed = stl::read(text)?;
        let mut tris: Vec<Tri> = parsed
            .facets
            .iter()
            .map(|f| {
                Tri::new(
                    Point3::from(f.vertices[0]),
                    Point3::from(f.vertices[1]),
                    Point3::from(f.vertices[2]),
                )
            })
            .collect();

        if !tris.is_empty() {
            let mut center = Vector3::zeros();
            for t in &tris {
                center += t.a.coords + t.b.coords + t.c.coords;
            }
            center /= (tris.len() * 3) as f32;
            let shift = Matrix4::new_translation(&-center);
            for t in &mut tris {
                *t = t.transformed(&shift);
            }
        }

        Ok(Self::from_soup(tris, op_uid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tri::v3_equal;
    use keel_core::scalar::equal;

    #[test]
    fn cube_structure() {
        let cube = Solid::cube(1);
        assert_eq!(cube.faces.len(), 6);
        assert_eq!(cube.tri_count(), 12);
        // 12 edges, 8 corners on a cube
        assert_eq!(cube.edges.len(), 12);
        assert_eq!(cube.corners.len(), 8);
        // every face normal points away from the center
        for face in &cube.faces {
            for t in &face.tris {
                let centroid = (t.a.coords + t.b.coords + t.c.coords) / 3.0;
                assert!(t.normal().dot(&centroid) > 0.0);
            }
        }
    }

    #[test]
    fn cube_area() {
        let cube = Solid::cube(1);
        let total: f32 = cube.faces.iter().map(Face::area).sum();
        assert!(equal(total, 24.0));
    }

    #[test]
    fn geo_id_lookup() {
        let cube = Solid::cube(7);
        let id = cube.faces[3].id;
        assert!(cube.find_face(id).is_some());
        assert!(cube.find_face(GeoId::new(7, 99, GeoKind::Face)).is_none());
        assert_eq!(id.op_uid, 7);
    }

    #[test]
    fn stl_round_trip_recenters() {
        let mut cube = Solid::cube(1);
        cube.translate(Vector3::new(10.0, 0.0, 0.0));
        let text = cube.to_stl("cube");
        let back = Solid::read_stl(&text, 2).unwrap();
        assert_eq!(back.tri_count(), 12);
        // the reload recenters on the centroid, undoing the translation
        let mut center = Vector3::zeros();
        for t in back.tris() {
            center += t.a.coords + t.b.coords + t.c.coords;
        }
        center /= (back.tri_count() * 3) as f32;
        assert!(v3_equal(&Point3::from(center), &Point3::origin()));
    }

    #[test]
    fn translate_moves_everything() {
        let mut cube = Solid::cube(1);
        cube.translate(Vector3::new(1.0, 2.0, 3.0));
        for t in cube.tris() {
            assert!(t.a.x >= 0.0 && t.a.x <= 2.0);
        }
        for c in &cube.corners {
            assert!(c.pos.y >= 1.0 && c.pos.y <= 3.0);
        }
    }
}
