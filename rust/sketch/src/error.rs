// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for sketch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or triangulating a sketch.
///
/// These are malformed-input conditions: the operation that reports one has
/// not touched the sketch. An unsolvable sketch is not an error; the solver
/// reports that through per-constraint `violated` flags instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown point id {0}")]
    UnknownPoint(u32),

    #[error("unknown line id {0}")]
    UnknownLine(u32),

    #[error("line endpoints must be two distinct points")]
    DegenerateLine,

    #[error("vertex loop with zero area")]
    ZeroAreaLoop,

    #[error("vertex loop failed to close")]
    UnclosedLoop,
}
