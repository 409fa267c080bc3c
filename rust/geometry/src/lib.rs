// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Keel Geometry
//!
//! BSP-based solid modeling for the Keel kernel:
//!
//! - **Triangle math**: winding normals, plane intersection, segments
//! - **BSP**: spatial partition over triangle soup, point-in-solid tests,
//!   triangle-list clipping with fragment recovery
//! - **CSG**: boolean union / difference / intersection on triangle solids
//! - **Solid model**: faces, edges and corners with stable geo-ids,
//!   recovered from raw soup by flood fill and pairwise edge clipping
//! - **Extrusion**: lifting planar faces into closed prisms
//!
//! The kernel is single-threaded and synchronous; every operation runs to
//! completion on the calling thread and owns its scratch state. All
//! coordinates are `f32` under the single kernel epsilon from
//! [`keel_core::scalar`].

pub mod bsp;
pub mod csg;
pub mod error;
pub mod extrude;
pub mod solid;
pub mod topology;
pub mod tri;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point2, Point3, Vector2, Vector3};

pub use bsp::{clip, recover_unbroken, Bsp, BspTri, TriArena, TriId};
pub use csg::{difference, intersection, invert, union};
pub use error::{Error, Result};
pub use extrude::extrude;
pub use solid::{Corner, Edge, Face, Solid};
pub use tri::{ray_plane_intersection, v2_equal, v3_equal, vec3_equal, Segment3, Tri};
