// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stable geometry identifiers
//!
//! Every face, edge and corner carries a [`GeoId`] so that downstream
//! operations referring to geometry by handle survive re-solving. Derived
//! geometry (an intersection point, a loop of edges) gets a synthetic id by
//! bit-mixing the ids of the elements it came from, which keeps the result
//! identical across geometrically equivalent re-solves.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which kind of geometry an id refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GeoKind {
    Face,
    Edge,
    Corner,
}

/// Stable identity of a face, edge or corner.
///
/// `op_uid` names the operation that produced the geometry, `base_id` the
/// source element (or mix of source elements) within that operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoId {
    pub op_uid: i64,
    pub base_id: i64,
    pub kind: GeoKind,
}

impl GeoId {
    #[inline]
    pub fn new(op_uid: i64, base_id: i64, kind: GeoKind) -> Self {
        Self {
            op_uid,
            base_id,
            kind,
        }
    }
}

/// Scramble an id into a well-distributed synthetic one.
///
/// Mix constants from Stafford's mix13 variant of the murmur finalizer.
#[inline]
pub fn mix_uid(id: i64) -> i64 {
    let mut out = id as u64;
    out ^= out >> 33;
    out = out.wrapping_mul(0xff51afd7ed558ccd);
    out ^= out >> 33;
    out = out.wrapping_mul(0xc4ceb9fe1a85ec53);
    out ^= out >> 33;
    out as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix_is_deterministic() {
        assert_eq!(mix_uid(17), mix_uid(17));
        assert_ne!(mix_uid(17), mix_uid(18));
    }

    #[test]
    fn mix_spreads_consecutive_ids() {
        // neighboring inputs should not land near each other
        let a = mix_uid(1);
        let b = mix_uid(2);
        assert!((a.wrapping_sub(b)).unsigned_abs() > 1u64 << 32);
    }

    #[test]
    fn geo_id_equality_covers_all_fields() {
        let a = GeoId::new(1, 2, GeoKind::Face);
        assert_eq!(a, GeoId::new(1, 2, GeoKind::Face));
        assert_ne!(a, GeoId::new(1, 2, GeoKind::Edge));
        assert_ne!(a, GeoId::new(1, 3, GeoKind::Face));
        assert_ne!(a, GeoId::new(2, 2, GeoKind::Face));
    }
}
