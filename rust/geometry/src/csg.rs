// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boolean operations on triangle solids
//!
//! Each operation clips one solid's triangle list against the other solid's
//! BSP tree, joins the survivors and runs fragment recovery. Inputs are
//! expected to have outward-facing normals; outputs keep them outward.

use crate::bsp::{clip, recover_unbroken, Bsp, TriArena};
use crate::error::Result;
use crate::tri::Tri;
use tracing::debug;

/// Flip the orientation of every triangle in the list
pub fn invert(tris: &mut [Tri]) {
    for t in tris.iter_mut() {
        *t = t.inverted();
    }
}

/// Boolean union: keep the parts of each solid outside the other.
pub fn union(a: &[Tri], b: &[Tri]) -> Result<Vec<Tri>> {
    boolean("union", a, b, true, true, false)
}

/// Boolean difference A minus B: the parts of A outside B plus the parts of
/// B inside A with reversed orientation.
pub fn difference(a: &[Tri], b: &[Tri]) -> Result<Vec<Tri>> {
    boolean("difference", a, b, true, false, true)
}

/// Boolean intersection: keep the parts of each solid inside the other.
pub fn intersection(a: &[Tri], b: &[Tri]) -> Result<Vec<Tri>> {
    boolean("intersection", a, b, false, false, false)
}

fn boolean(
    op: &'static str,
    a: &[Tri],
    b: &[Tri],
    within_a: bool,
    within_b: bool,
    invert_b: bool,
) -> Result<Vec<Tri>> {
    let tree_a = Bsp::build(a)?;
    let tree_b = Bsp::build(b)?;

    let mut arena = TriArena::new();
    let list_a = arena.import(a);
    let list_b = arena.import(b);

    let clipped_a = clip(within_a, list_a, &tree_b, &mut arena)?;
    let clipped_b = clip(within_b, list_b, &tree_a, &mut arena)?;

    // ancestor chains never cross the two solids, so recovery over the
    // joined list is recovery over each side
    let kept_a = recover_unbroken(clipped_a, &mut arena);
    let kept_b = recover_unbroken(clipped_b, &mut arena);

    let mut out: Vec<Tri> = kept_a.iter().map(|&id| arena.tri(id)).collect();
    out.extend(kept_b.iter().map(|&id| {
        let t = arena.tri(id);
        if invert_b {
            t.inverted()
        } else {
            t
        }
    }));

    debug!(
        op,
        input = a.len() + b.len(),
        arena = arena.len(),
        output = out.len(),
        "boolean operation complete"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use nalgebra::Point3;

    fn tetra_at(offset: f32) -> Vec<Tri> {
        let v = [
            Point3::new(offset, 0.0, 0.0),
            Point3::new(offset + 1.0, 0.0, 0.0),
            Point3::new(offset + 1.0, 1.0, 0.0),
            Point3::new(offset + 1.0, 0.0, -1.0),
        ];
        vec![
            Tri::new(v[0], v[1], v[2]),
            Tri::new(v[0], v[2], v[3]),
            Tri::new(v[0], v[3], v[1]),
            Tri::new(v[3], v[2], v[1]),
        ]
    }

    #[test]
    fn coplanar_inputs_trip_the_trap() {
        let a = tetra_at(0.0);
        let err = union(&a, &a).unwrap_err();
        assert!(matches!(err, Error::CoplanarTriangle));
    }

    #[test]
    fn invert_reverses_orientation() {
        let mut tris = tetra_at(0.0);
        let normals: Vec<_> = tris.iter().map(Tri::normal).collect();
        invert(&mut tris);
        for (t, n) in tris.iter().zip(normals) {
            assert!((t.normal() + n).norm() < 1e-5);
        }
    }
}
