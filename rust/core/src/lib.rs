// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Keel Core
//!
//! Shared foundations for the Keel geometric kernel:
//!
//! - **Scalar conventions**: the single-epsilon float predicates every other
//!   crate builds on
//! - **Geo-IDs**: stable identifiers for faces, edges and corners that
//!   survive re-solving
//! - **Selection state**: the opaque UI record attached to every piece of
//!   geometry
//! - **STL wire format**: reader and writer for the restricted ASCII STL
//!   dialect the kernel exchanges with the outside world
//!
//! ## Feature Flags
//!
//! - `serde`: enable serialization support for the plain data types

pub mod error;
pub mod id;
pub mod scalar;
pub mod select;
pub mod stl;

pub use error::{Error, Result};
pub use id::{mix_uid, GeoId, GeoKind};
pub use select::SelectionState;
pub use stl::{Facet, StlSolid};
