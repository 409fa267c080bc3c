// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary space partitioning over triangle soup
//!
//! Triangles live in a flat arena and are addressed by [`TriId`]; lists are
//! plain `Vec<TriId>`. Splitting a triangle leaves the parent in the arena
//! and records it as the `ancestor` of each piece, forming a reverse forest
//! that the post-clip recovery pass walks to merge fragments back together.

use crate::error::{Error, Result};
use crate::tri::{ray_plane_intersection, Tri};
use keel_core::scalar::{equal, zero};
use nalgebra::{Point3, Vector3};

/// Index of a triangle in a [`TriArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriId(u32);

impl TriId {
    #[inline]
    fn idx(self) -> usize {
        self.0 as usize
    }
}

/// A triangle plus the clip bookkeeping that recovery needs
#[derive(Debug, Clone)]
pub struct BspTri {
    pub tri: Tri,
    /// The pre-split triangle this one was cut from
    pub ancestor: Option<TriId>,
    /// Which face of the originating solid this piece belongs to
    pub source_face: Option<u32>,
    any_child_deleted: bool,
    recovered: bool,
}

/// Flat arena owning every triangle of one clip operation
#[derive(Debug, Default)]
pub struct TriArena {
    tris: Vec<BspTri>,
}

impl TriArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tri: Tri, source_face: Option<u32>) -> TriId {
        let id = TriId(self.tris.len() as u32);
        self.tris.push(BspTri {
            tri,
            ancestor: None,
            source_face,
            any_child_deleted: false,
            recovered: false,
        });
        id
    }

    /// Append plain triangles without face tags, returning their ids in order
    pub fn import(&mut self, tris: &[Tri]) -> Vec<TriId> {
        tris.iter().map(|t| self.push(*t, None)).collect()
    }

    fn push_piece(&mut self, tri: Tri, parent: TriId) -> TriId {
        let source_face = self.tris[parent.idx()].source_face;
        let id = TriId(self.tris.len() as u32);
        self.tris.push(BspTri {
            tri,
            ancestor: Some(parent),
            source_face,
            any_child_deleted: false,
            recovered: false,
        });
        id
    }

    #[inline]
    pub fn get(&self, id: TriId) -> &BspTri {
        &self.tris[id.idx()]
    }

    #[inline]
    pub fn tri(&self, id: TriId) -> Tri {
        self.tris[id.idx()].tri
    }

    pub fn len(&self) -> usize {
        self.tris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tris.is_empty()
    }
}

/// How a triangle sits relative to a splitting plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlaneRelation {
    Coplanar,
    Inner,
    Outer,
    Spanning,
}

/// Classify by the signed distance of each vertex, with zero meaning "on the
/// plane" under the kernel epsilon.
fn classify(tri: &Tri, plane_normal: &Vector3<f32>, plane_origin: &Point3<f32>) -> PlaneRelation {
    let mut any_inner = false;
    let mut any_outer = false;
    for v in tri.vertices() {
        let d = (v - plane_origin).dot(plane_normal);
        if !zero(d) {
            if d > 0.0 {
                any_outer = true;
            } else {
                any_inner = true;
            }
        }
    }
    match (any_inner, any_outer) {
        (true, true) => PlaneRelation::Spanning,
        (true, false) => PlaneRelation::Inner,
        (false, true) => PlaneRelation::Outer,
        (false, false) => PlaneRelation::Coplanar,
    }
}

/// Index of a node in a [`Bsp`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeId(u32);

#[derive(Debug)]
struct BspNode {
    /// The splitting plane, stored as the triangle it came from
    tri: Tri,
    inner: Option<NodeId>,
    outer: Option<NodeId>,
}

/// A BSP tree over a triangle list.
///
/// Invariant: every triangle reachable through `inner` lies entirely within
/// or on the node's plane, every triangle through `outer` entirely on or
/// outside. Spanning and coplanar triangles are duplicated into both
/// subtrees during construction rather than being geometrically split.
#[derive(Debug)]
pub struct Bsp {
    nodes: Vec<BspNode>,
    root: NodeId,
}

impl Bsp {
    /// Build a tree from a triangle list; the first triangle seeds the root.
    pub fn build(tris: &[Tri]) -> Result<Self> {
        let mut nodes = Vec::with_capacity(tris.len());
        let root = build_node(&mut nodes, tris.to_vec())
            .ok_or_else(|| Error::EmptySolid("BSP construction".to_string()))?;
        Ok(Self { nodes, root })
    }

    #[inline]
    fn node(&self, id: NodeId) -> &BspNode {
        &self.nodes[id.0 as usize]
    }

    /// Point-in-solid test: descend inner on signed distance <= 0.
    ///
    /// Running off a missing inner child means "inside"; off a missing
    /// outer child, "outside". Non-finite coordinates land outside.
    pub fn contains(&self, point: Point3<f32>) -> bool {
        let mut id = self.root;
        loop {
            let node = self.node(id);
            let d = (point - node.tri.a).dot(&node.tri.normal());
            if d <= 0.0 {
                match node.inner {
                    Some(inner) => id = inner,
                    None => return true,
                }
            } else {
                match node.outer {
                    Some(outer) => id = outer,
                    None => return false,
                }
            }
        }
    }
}

fn build_node(nodes: &mut Vec<BspNode>, candidates: Vec<Tri>) -> Option<NodeId> {
    let mut iter = candidates.into_iter();
    let split = iter.next()?;
    let normal = split.normal();
    let origin = split.a;

    let id = NodeId(nodes.len() as u32);
    nodes.push(BspNode {
        tri: split,
        inner: None,
        outer: None,
    });

    let mut inner = Vec::new();
    let mut outer = Vec::new();
    for t in iter {
        match classify(&t, &normal, &origin) {
            PlaneRelation::Outer => outer.push(t),
            PlaneRelation::Inner => inner.push(t),
            // spanning and coplanar triangles live on both sides
            _ => {
                inner.push(t);
                outer.push(t);
            }
        }
    }

    let inner_id = build_node(nodes, inner);
    let outer_id = build_node(nodes, outer);
    let node = &mut nodes[id.0 as usize];
    node.inner = inner_id;
    node.outer = outer_id;
    Some(id)
}

/// Clip a triangle list against a tree.
///
/// With `within` set, pieces inside the tree's solid are removed; otherwise
/// pieces outside. Every surviving piece keeps its ancestor chain so
/// [`recover_unbroken`] can merge fragments whose splits turned out not to
/// matter. Coplanar triangles are a degeneracy trap and abort the clip.
pub fn clip(within: bool, list: Vec<TriId>, bsp: &Bsp, arena: &mut TriArena) -> Result<Vec<TriId>> {
    clip_node(within, list, bsp, bsp.root, arena)
}

fn clip_node(
    within: bool,
    list: Vec<TriId>,
    bsp: &Bsp,
    node_id: NodeId,
    arena: &mut TriArena,
) -> Result<Vec<TriId>> {
    let cutter = bsp.node(node_id).tri;

    let mut inside = Vec::new();
    let mut outside = Vec::new();
    for id in list {
        split_tri(id, &cutter, arena, &mut inside, &mut outside)?;
    }

    let node = bsp.node(node_id);
    let (inner, outer) = (node.inner, node.outer);

    let mut inside = match inner {
        Some(child) => clip_node(within, inside, bsp, child, arena)?,
        None if within => {
            poison_ancestors(&inside, arena);
            Vec::new()
        }
        None => inside,
    };

    let outside = match outer {
        Some(child) => clip_node(within, outside, bsp, child, arena)?,
        None if !within => {
            poison_ancestors(&outside, arena);
            Vec::new()
        }
        None => outside,
    };

    inside.extend(outside);
    Ok(inside)
}

/// Dropping geometry makes every split along its ancestry load-bearing:
/// recovery must not undo those splits, so the whole chain is poisoned.
fn poison_ancestors(dropped: &[TriId], arena: &mut TriArena) {
    for &id in dropped {
        let mut cur = Some(id);
        while let Some(c) = cur {
            let t = &mut arena.tris[c.idx()];
            t.any_child_deleted = true;
            cur = t.ancestor;
        }
    }
}

/// Split one triangle by the cutter's plane, pushing the pieces (or the
/// whole triangle) onto the side lists.
fn split_tri(
    id: TriId,
    cutter: &Tri,
    arena: &mut TriArena,
    inside: &mut Vec<TriId>,
    outside: &mut Vec<TriId>,
) -> Result<()> {
    let cut_normal = cutter.normal();
    let tri = arena.tri(id);

    match classify(&tri, &cut_normal, &cutter.a) {
        PlaneRelation::Coplanar => return Err(Error::CoplanarTriangle),
        PlaneRelation::Outer => {
            outside.push(id);
            return Ok(());
        }
        PlaneRelation::Inner => {
            inside.push(id);
            return Ok(());
        }
        PlaneRelation::Spanning => {}
    }

    // Collect the original vertices interleaved with the edge/plane
    // intersection points, giving a 4- or 5-vertex loop.
    let mut verts = [Point3::origin(); 5];
    let mut count = 0usize;
    let mut first_cut: Option<usize> = None;

    for i in 0..3 {
        if count >= 5 {
            return Err(Error::DegenerateSplit(
                "spanning triangle produced more than five loop vertices".to_string(),
            ));
        }
        let pt = tri.vertex(i);
        verts[count] = pt;
        count += 1;

        let next_pt = tri.vertex((i + 1) % 3);
        let diff = next_pt - pt;
        let direction = diff.normalize();
        let t = match ray_plane_intersection(cutter.a, cut_normal, pt, direction) {
            Some(t) => t,
            None => continue,
        };
        if equal(t * t, diff.norm_squared()) {
            continue;
        } else if t < 0.0 || zero(t) {
            continue;
        } else if t * t > diff.norm_squared() {
            continue;
        }

        if count >= 5 {
            return Err(Error::DegenerateSplit(
                "spanning triangle produced more than five loop vertices".to_string(),
            ));
        }
        // The loop gets rotated so that vertex 0 is a cut vertex, which
        // keeps the fan triangulation below from crossing the cut. When the
        // first intersection lands at loop position 1 and four vertices have
        // been collected, the second cut has to become the origin instead;
        // a fan from the first would cross the cut line.
        if first_cut.is_none() || (first_cut == Some(1) && count == 4) {
            first_cut = Some(count);
        }
        verts[count] = pt + direction * t;
        count += 1;
    }

    let first_cut = first_cut.ok_or_else(|| {
        Error::DegenerateSplit("spanning triangle with no cut vertex".to_string())
    })?;

    let mut rotated = [Point3::origin(); 5];
    for (i, slot) in rotated.iter_mut().take(count).enumerate() {
        *slot = verts[(i + first_cut) % count];
    }

    let side_of = |p: Point3<f32>| (p - cutter.a).dot(&cut_normal) > 0.0;

    if count == 5 {
        let t1 = arena.push_piece(Tri::new(rotated[0], rotated[1], rotated[2]), id);
        let t2 = arena.push_piece(Tri::new(rotated[2], rotated[3], rotated[4]), id);
        let t3 = arena.push_piece(Tri::new(rotated[4], rotated[0], rotated[2]), id);

        if side_of(rotated[1]) {
            outside.push(t1);
            inside.push(t2);
            inside.push(t3);
        } else {
            inside.push(t1);
            outside.push(t2);
            outside.push(t3);
        }
    } else if count == 4 {
        let t1 = arena.push_piece(Tri::new(rotated[0], rotated[1], rotated[2]), id);
        let t2 = arena.push_piece(Tri::new(rotated[2], rotated[3], rotated[0]), id);

        // vertex 1 of t1 cannot sit on the cut plane once rotation is right
        if side_of(rotated[1]) {
            outside.push(t1);
            inside.push(t2);
        } else {
            inside.push(t1);
            outside.push(t2);
        }
    } else {
        // more than 5 is impossible, fewer than 4 would not have classified
        // as spanning
        return Err(Error::DegenerateSplit(format!(
            "spanning triangle split into a {count}-vertex loop"
        )));
    }

    Ok(())
}

/// Merge surviving fragments back into their largest clean ancestor.
///
/// A fragment whose ancestor chain carries no deletions is replaced by the
/// highest such ancestor; each ancestor is emitted at most once. Fragments
/// that hit a poisoned ancestor stay as they are.
pub fn recover_unbroken(list: Vec<TriId>, arena: &mut TriArena) -> Vec<TriId> {
    let mut remaining = Vec::new();
    let mut recovered = Vec::new();

    for id in list {
        let mut oldest = arena.get(id).ancestor;
        while let Some(o) = oldest {
            if arena.get(o).any_child_deleted {
                oldest = None;
                break;
            }
            match arena.get(o).ancestor {
                Some(parent) if !arena.get(parent).any_child_deleted => {
                    oldest = Some(parent);
                }
                _ => break,
            }
        }

        match oldest {
            Some(o) => {
                if !arena.tris[o.idx()].recovered {
                    arena.tris[o.idx()].recovered = true;
                    recovered.push(o);
                }
            }
            None => remaining.push(id),
        }
    }

    remaining.extend(recovered);
    remaining
}
