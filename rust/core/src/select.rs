// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! UI selection state attached to geometry

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Selection record carried by every face, edge, corner and sketch element.
///
/// The kernel itself only reads and writes `selected`; the animation floats
/// belong to the host UI and are passed through untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SelectionState {
    pub hover_anim: f32,
    pub selection_anim: f32,
    pub selected: bool,
}
