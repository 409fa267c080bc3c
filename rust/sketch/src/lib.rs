// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Keel Sketch
//!
//! The 2D half of the Keel kernel:
//!
//! - **Sketch model**: points, lines and distance/angle constraints with a
//!   one-point one-angle gauge
//! - **Solver**: manifold propagation followed by iterative relaxation;
//!   unsatisfiable constraints are flagged, never fatal
//! - **Triangulation**: planarization, vertex-loop walking and ear clipping
//!   into faces, edges and corners with re-solve-stable geo-ids
//!
//! A solved, triangulated sketch feeds [`keel_geometry`]'s extrusion and
//! boolean operations.

pub mod error;
pub mod manifold;
pub mod sketch;
pub mod solve;
pub mod triangulate;

pub use error::{Error, Result};
pub use manifold::{join, Manifold};
pub use sketch::{
    Constraint, ConstraintId, ConstraintKind, LineId, PointId, Sketch, SketchLine, SketchPoint,
};
pub use solve::{line_angle, solve};
pub use triangulate::{triangulate, Triangulation};
