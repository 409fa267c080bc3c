// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The whole kernel in one pass: solve a sketch, triangulate it, extrude
//! the face into a solid and combine it with another solid.

use keel_core::scalar::equal;
use keel_geometry::{extrude, union, Bsp, Matrix4, Point3, Solid, Tri, Vector3};
use keel_sketch::{solve, triangulate, Sketch};
use nalgebra::{Point2, Unit};

/// A constrained unit square hanging off the sketch origin
fn solved_unit_square() -> Sketch {
    let mut s = Sketch::new();
    let p1 = s.add_point(Point2::new(0.0, 0.0));
    let p2 = s.add_point(Point2::new(0.9, 0.1));
    let p3 = s.add_point(Point2::new(1.1, 0.9));
    let p4 = s.add_point(Point2::new(0.1, 1.1));

    let l1 = s.add_line(p1, p2).unwrap();
    let l2 = s.add_line(p2, p3).unwrap();
    let l3 = s.add_line(p3, p4).unwrap();
    let l4 = s.add_line(p4, p1).unwrap();

    for line in [l1, l2, l3, l4] {
        s.add_distance(line, 1.0).unwrap();
    }
    let quarter = 90f32.to_radians();
    s.add_angle(l1, false, l2, false, quarter).unwrap();
    s.add_angle(l2, false, l3, false, quarter).unwrap();
    s.add_angle(l3, false, l4, false, quarter).unwrap();
    s.set_origin(l1, true, 0.0).unwrap();

    solve(&mut s);
    assert!(s.constraints.iter().all(|c| !c.violated));
    s
}

fn signed_volume(tris: &[Tri]) -> f32 {
    tris.iter()
        .map(|t| t.a.coords.dot(&t.b.coords.cross(&t.c.coords)) / 6.0)
        .sum()
}

#[test]
fn sketch_to_solid_to_boolean() {
    let sketch = solved_unit_square();
    let triangulated = triangulate(&sketch, 11).unwrap();

    // one face tiling the unit square
    assert_eq!(triangulated.faces.len(), 1);
    let area: f32 = triangulated.faces[0].tris.iter().map(Tri::area).sum();
    assert!(equal(area, 1.0), "face area was {area}");

    // lift it into a closed 1x1x2 prism
    let prism = extrude(&triangulated.faces, Vector3::new(0.0, 0.0, 1.0), 2.0, 12).unwrap();
    let prism_tris = prism.collect_tris();
    let volume = signed_volume(&prism_tris);
    assert!((volume - 2.0).abs() < 0.01, "prism volume was {volume}");

    // combine with a tilted cube overlapping the prism's top
    let mut cube = Solid::cube(13);
    let axis = Unit::new_normalize(Vector3::new(1.0, 1.0, 1.0));
    cube.transform(&Matrix4::from_axis_angle(&axis, 30f32.to_radians()));
    cube.translate(Vector3::new(0.5, 0.5, 2.0));

    let merged = union(&prism_tris, &cube.collect_tris()).unwrap();
    assert!(!merged.is_empty());

    // the union stays closed and holds both bodies
    let normal_sum: Vector3<f32> = merged
        .iter()
        .map(|t| (t.b - t.a).cross(&(t.c - t.a)))
        .sum();
    assert!(normal_sum.norm() < 0.05, "normal sum was {normal_sum:?}");

    let tree = Bsp::build(&merged).unwrap();
    assert!(tree.contains(Point3::new(0.5, 0.5, 0.5)));
    assert!(tree.contains(Point3::new(0.5, 0.5, 2.0)));
    assert!(!tree.contains(Point3::new(5.0, 5.0, 5.0)));

    // the combined volume exceeds either input on its own
    let merged_volume = signed_volume(&merged);
    assert!(merged_volume > 8.0, "union volume was {merged_volume}");
}

#[test]
fn recovered_structure_from_extruded_solid() {
    // flatten the prism to soup and recover faces, edges and corners
    let sketch = solved_unit_square();
    let triangulated = triangulate(&sketch, 11).unwrap();
    let prism = extrude(&triangulated.faces, Vector3::new(0.0, 0.0, 1.0), 2.0, 12).unwrap();

    let recovered = Solid::from_soup(prism.collect_tris(), 20);
    assert_eq!(recovered.faces.len(), 6);
    assert_eq!(recovered.edges.len(), 12);
    assert_eq!(recovered.corners.len(), 8);
}
