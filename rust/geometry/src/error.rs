// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during solid geometry processing.
///
/// The degeneracy traps (`CoplanarTriangle`, `DegenerateSplit`) indicate the
/// caller violated a precondition; an operation that returns one of them has
/// written nothing structural.
#[derive(Error, Debug)]
pub enum Error {
    #[error("coplanar triangle pair encountered during clipping")]
    CoplanarTriangle,

    #[error("degenerate spanning split: {0}")]
    DegenerateSplit(String),

    #[error("empty triangle list: {0}")]
    EmptySolid(String),

    #[error("invalid extrusion: {0}")]
    InvalidExtrusion(String),

    #[error("core error: {0}")]
    Core(#[from] keel_core::Error),
}
