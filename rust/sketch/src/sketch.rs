// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The sketch data model
//!
//! A sketch is an append-only collection of 2D points, lines between them,
//! and constraints over the lines, addressed by index newtypes. One point
//! and one line form the gauge: the origin point is fixed in space and the
//! origin line's angle is pinned to a configured value, which is what makes
//! the rest of the sketch solvable.

use crate::error::{Error, Result};
use crate::manifold::Manifold;
use keel_core::SelectionState;
use nalgebra::Point2;

/// Index of a point in a sketch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointId(pub(crate) u32);

/// Index of a line in a sketch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineId(pub(crate) u32);

/// Index of a constraint in a sketch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(pub(crate) u32);

/// A sketch point with its per-solve state
#[derive(Debug, Clone)]
pub struct SketchPoint {
    pub pos: Point2<f32>,
    /// The locus this point may still occupy, rebuilt on every solve
    pub manifold: Manifold,
    pub solved: bool,
    pub uid: i64,
    pub sel: SelectionState,
    pub marked_for_delete: bool,
}

/// A line between two sketch points
#[derive(Debug, Clone)]
pub struct SketchLine {
    pub p1: PointId,
    pub p2: PointId,
    /// Angle from p1 to p2 in radians CCW, once known; may not be normalized
    pub expected_angle: f32,
    pub angle_solved: bool,
    pub(crate) angle_applied: bool,
    pub uid: i64,
    pub sel: SelectionState,
    pub marked_for_delete: bool,
}

/// What a constraint demands of its lines
#[derive(Debug, Clone, Copy)]
pub enum ConstraintKind {
    /// The line's length equals `value`
    Distance { line: LineId, value: f32 },
    /// The CCW angle from line1 to line2 equals `value`. A line's angle runs
    /// p1 to p2 by default; the flips measure from the p2 end instead.
    Angle {
        line1: LineId,
        line2: LineId,
        flip1: bool,
        flip2: bool,
        value: f32,
    },
}

/// A constraint plus its per-solve result flags
#[derive(Debug, Clone)]
pub struct Constraint {
    pub kind: ConstraintKind,
    /// Set after solving when the constraint could not be satisfied
    pub violated: bool,
    pub(crate) applied: bool,
    pub sel: SelectionState,
    pub marked_for_delete: bool,
}

/// A 2D sketch: points, lines, constraints and the gauge
#[derive(Debug, Clone)]
pub struct Sketch {
    pub points: Vec<SketchPoint>,
    pub lines: Vec<SketchLine>,
    pub constraints: Vec<Constraint>,
    pub origin_point: PointId,
    pub origin_line: LineId,
    pub origin_angle: f32,
    next_uid: i64,
}

impl Sketch {
    /// A new sketch seeded with its origin segment, so it is never empty
    /// and always has a gauge.
    pub fn new() -> Self {
        let mut sketch = Self {
            points: Vec::new(),
            lines: Vec::new(),
            constraints: Vec::new(),
            origin_point: PointId(0),
            origin_line: LineId(0),
            origin_angle: 0.0,
            next_uid: 1,
        };
        let p1 = sketch.add_point(Point2::new(0.0, 0.0));
        let p2 = sketch.add_point(Point2::new(1.0, 0.0));
        let line = sketch
            .add_line(p1, p2)
            .expect("origin segment endpoints are valid");
        sketch.origin_point = p1;
        sketch.origin_line = line;
        sketch
    }

    fn take_uid(&mut self) -> i64 {
        let uid = self.next_uid;
        self.next_uid += 1;
        uid
    }

    pub fn add_point(&mut self, pos: Point2<f32>) -> PointId {
        let uid = self.take_uid();
        self.points.push(SketchPoint {
            pos,
            manifold: Manifold::Any,
            solved: false,
            uid,
            sel: SelectionState::default(),
            marked_for_delete: false,
        });
        PointId(self.points.len() as u32 - 1)
    }

    /// Add a line between two points, or return the existing one if the
    /// points are already connected (in either direction).
    pub fn add_line(&mut self, p1: PointId, p2: PointId) -> Result<LineId> {
        self.check_point(p1)?;
        self.check_point(p2)?;
        if p1 == p2 {
            return Err(Error::DegenerateLine);
        }

        for (i, l) in self.lines.iter().enumerate() {
            if (l.p1 == p1 && l.p2 == p2) || (l.p1 == p2 && l.p2 == p1) {
                return Ok(LineId(i as u32));
            }
        }

        let uid = self.take_uid();
        self.lines.push(SketchLine {
            p1,
            p2,
            expected_angle: 0.0,
            angle_solved: false,
            angle_applied: false,
            uid,
            sel: SelectionState::default(),
            marked_for_delete: false,
        });
        Ok(LineId(self.lines.len() as u32 - 1))
    }

    /// Pin the gauge: `line` gets the fixed angle, and whichever of its
    /// endpoints `origin_on_p1` picks becomes the fixed origin point.
    pub fn set_origin(&mut self, line: LineId, origin_on_p1: bool, angle: f32) -> Result<()> {
        self.check_line(line)?;
        let l = &self.lines[line.0 as usize];
        self.origin_point = if origin_on_p1 { l.p1 } else { l.p2 };
        self.origin_line = line;
        self.origin_angle = angle;
        Ok(())
    }

    pub fn add_distance(&mut self, line: LineId, value: f32) -> Result<ConstraintId> {
        self.check_line(line)?;
        self.constraints.push(Constraint {
            kind: ConstraintKind::Distance { line, value },
            violated: false,
            applied: false,
            sel: SelectionState::default(),
            marked_for_delete: false,
        });
        Ok(ConstraintId(self.constraints.len() as u32 - 1))
    }

    pub fn add_angle(
        &mut self,
        line1: LineId,
        flip1: bool,
        line2: LineId,
        flip2: bool,
        value: f32,
    ) -> Result<ConstraintId> {
        self.check_line(line1)?;
        self.check_line(line2)?;
        self.constraints.push(Constraint {
            kind: ConstraintKind::Angle {
                line1,
                line2,
                flip1,
                flip2,
                value,
            },
            violated: false,
            applied: false,
            sel: SelectionState::default(),
            marked_for_delete: false,
        });
        Ok(ConstraintId(self.constraints.len() as u32 - 1))
    }

    pub fn point(&self, id: PointId) -> &SketchPoint {
        &self.points[id.0 as usize]
    }

    pub fn line(&self, id: LineId) -> &SketchLine {
        &self.lines[id.0 as usize]
    }

    pub fn constraint(&self, id: ConstraintId) -> &Constraint {
        &self.constraints[id.0 as usize]
    }

    pub fn point_mut(&mut self, id: PointId) -> &mut SketchPoint {
        &mut self.points[id.0 as usize]
    }

    /// Current length of a line
    pub fn line_length(&self, id: LineId) -> f32 {
        let l = self.line(id);
        (self.point(l.p2).pos - self.point(l.p1).pos).norm()
    }

    fn check_point(&self, id: PointId) -> Result<()> {
        if (id.0 as usize) < self.points.len() {
            Ok(())
        } else {
            Err(Error::UnknownPoint(id.0))
        }
    }

    fn check_line(&self, id: LineId) -> Result<()> {
        if (id.0 as usize) < self.lines.len() {
            Ok(())
        } else {
            Err(Error::UnknownLine(id.0))
        }
    }

    pub fn deselect_all(&mut self) {
        for p in &mut self.points {
            p.sel.selected = false;
        }
        for l in &mut self.lines {
            l.sel.selected = false;
        }
        for c in &mut self.constraints {
            c.sel.selected = false;
        }
    }

    /// Remove everything marked for delete, dragging dependents along:
    /// lines lose deleted endpoints, constraints lose deleted lines, and
    /// points that no surviving line uses go too. The origin line and its
    /// endpoints always survive. Outstanding ids are invalidated; elements
    /// keep their uids.
    pub fn sweep_deleted(&mut self) {
        // a deleted endpoint takes its lines with it
        for l in &mut self.lines {
            if self.points[l.p1.0 as usize].marked_for_delete
                || self.points[l.p2.0 as usize].marked_for_delete
            {
                l.marked_for_delete = true;
            }
        }
        self.lines[self.origin_line.0 as usize].marked_for_delete = false;

        // keep only points that a surviving line still uses
        for p in &mut self.points {
            p.marked_for_delete = true;
        }
        for l in &self.lines {
            if !l.marked_for_delete {
                self.points[l.p1.0 as usize].marked_for_delete = false;
                self.points[l.p2.0 as usize].marked_for_delete = false;
            }
        }

        for c in &mut self.constraints {
            let doomed = match c.kind {
                ConstraintKind::Distance { line, .. } => {
                    self.lines[line.0 as usize].marked_for_delete
                }
                ConstraintKind::Angle { line1, line2, .. } => {
                    self.lines[line1.0 as usize].marked_for_delete
                        || self.lines[line2.0 as usize].marked_for_delete
                }
            };
            if doomed {
                c.marked_for_delete = true;
            }
        }

        // compact points, building the remap table as we go
        let mut point_map: Vec<Option<PointId>> = vec![None; self.points.len()];
        let mut kept_points = Vec::with_capacity(self.points.len());
        for (i, p) in self.points.drain(..).enumerate() {
            if !p.marked_for_delete {
                point_map[i] = Some(PointId(kept_points.len() as u32));
                kept_points.push(p);
            }
        }
        self.points = kept_points;

        let mut line_map: Vec<Option<LineId>> = vec![None; self.lines.len()];
        let mut kept_lines = Vec::with_capacity(self.lines.len());
        for (i, mut l) in self.lines.drain(..).enumerate() {
            if !l.marked_for_delete {
                l.p1 = point_map[l.p1.0 as usize].expect("endpoint of surviving line kept");
                l.p2 = point_map[l.p2.0 as usize].expect("endpoint of surviving line kept");
                line_map[i] = Some(LineId(kept_lines.len() as u32));
                kept_lines.push(l);
            }
        }
        self.lines = kept_lines;

        let mut kept_constraints = Vec::with_capacity(self.constraints.len());
        for mut c in self.constraints.drain(..) {
            if c.marked_for_delete {
                continue;
            }
            c.kind = match c.kind {
                ConstraintKind::Distance { line, value } => ConstraintKind::Distance {
                    line: line_map[line.0 as usize].expect("line of surviving constraint kept"),
                    value,
                },
                ConstraintKind::Angle {
                    line1,
                    line2,
                    flip1,
                    flip2,
                    value,
                } => ConstraintKind::Angle {
                    line1: line_map[line1.0 as usize].expect("line of surviving constraint kept"),
                    line2: line_map[line2.0 as usize].expect("line of surviving constraint kept"),
                    flip1,
                    flip2,
                    value,
                },
            };
            kept_constraints.push(c);
        }
        self.constraints = kept_constraints;

        self.origin_line =
            line_map[self.origin_line.0 as usize].expect("origin line always survives");
        self.origin_point =
            point_map[self.origin_point.0 as usize].expect("origin point always survives");
    }
}

impl Default for Sketch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sketch_has_an_origin_segment() {
        let s = Sketch::new();
        assert_eq!(s.points.len(), 2);
        assert_eq!(s.lines.len(), 1);
        let l = s.line(s.origin_line);
        assert!(s.origin_point == l.p1 || s.origin_point == l.p2);
    }

    #[test]
    fn add_line_deduplicates() {
        let mut s = Sketch::new();
        let a = s.add_point(Point2::new(0.0, 2.0));
        let b = s.add_point(Point2::new(2.0, 0.0));
        let l1 = s.add_line(a, b).unwrap();
        let l2 = s.add_line(b, a).unwrap();
        assert_eq!(l1, l2);
        assert_eq!(s.lines.len(), 2); // origin segment plus one
    }

    #[test]
    fn rejects_bad_handles() {
        let mut s = Sketch::new();
        let bogus = PointId(99);
        assert!(matches!(
            s.add_line(bogus, s.origin_point),
            Err(Error::UnknownPoint(99))
        ));
        assert!(matches!(
            s.add_distance(LineId(42), 1.0),
            Err(Error::UnknownLine(42))
        ));
        let p = s.add_point(Point2::new(1.0, 1.0));
        assert!(matches!(s.add_line(p, p), Err(Error::DegenerateLine)));
    }

    #[test]
    fn sweep_deleted_drags_dependents() {
        let mut s = Sketch::new();
        let a = s.add_point(Point2::new(0.0, 1.0));
        let b = s.add_point(Point2::new(1.0, 1.0));
        let c = s.add_point(Point2::new(2.0, 1.0));
        let ab = s.add_line(a, b).unwrap();
        let bc = s.add_line(b, c).unwrap();
        s.add_distance(ab, 1.0).unwrap();
        s.add_distance(bc, 1.0).unwrap();

        let b_uid = s.point(b).uid;
        s.point_mut(a).marked_for_delete = true;
        s.sweep_deleted();

        // line ab and its distance constraint followed point a out; point b
        // survives through line bc
        assert_eq!(s.constraints.len(), 1);
        assert!(s.points.iter().any(|p| p.uid == b_uid));
        assert_eq!(s.points.len(), 4); // two origin points, b, c
        assert_eq!(s.lines.len(), 2); // origin line, bc

        // the gauge survived the compaction
        let l = s.line(s.origin_line);
        assert!(s.origin_point == l.p1 || s.origin_point == l.p2);
    }

    #[test]
    fn deselect_all_clears_selection() {
        let mut s = Sketch::new();
        let a = s.add_point(Point2::new(0.0, 1.0));
        s.point_mut(a).sel.selected = true;
        s.deselect_all();
        assert!(!s.point(a).sel.selected);
    }
}
