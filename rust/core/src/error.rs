// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading kernel input formats.
///
/// Malformed input is fatal: the reader stops at the first bad token and
/// returns nothing structural.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unexpected token: expected {expected}, found '{found}'")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
    },

    #[error("malformed number token '{0}'")]
    MalformedNumber(String),

    #[error("unexpected end of input while reading {0}")]
    UnexpectedEof(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
