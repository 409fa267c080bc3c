// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The two-phase constraint solver
//!
//! Phase one propagates manifolds: each constraint that has exactly one
//! side determined shrinks the free side's manifold, and points whose
//! manifolds collapse to a position become solved. When propagation stalls
//! with points still free, phase two relaxes the remaining error
//! iteratively, up to a fixed pass cap. Neither infeasibility nor hitting
//! the cap is fatal: the sketch stays in its last-iterated state and the
//! final sweep flags the constraints that did not hold.

use crate::manifold::{join, Manifold};
use crate::sketch::{ConstraintKind, Sketch};
use keel_core::scalar::{normalize_angle, zero, EPSILON};
use nalgebra::{Point2, Rotation2, Vector2};
use std::f32::consts::PI;
use tracing::debug;

/// Relaxation pass cap; hitting it is the solver's timeout
const MAX_RELAX_PASSES: usize = 1000;

/// Angle of the line from `p1` to `p2` in radians CCW; `flip` measures
/// from the other end.
pub fn line_angle(p1: Point2<f32>, p2: Point2<f32>, flip: bool) -> f32 {
    let diff = p2 - p1;
    let mut angle = diff.y.atan2(diff.x);
    if flip {
        angle += PI;
    }
    angle
}

/// Solve the sketch in place.
///
/// Always succeeds structurally: constraints that could not be satisfied
/// end up with `violated` set and every point holds its best-known
/// position.
pub fn solve(sketch: &mut Sketch) {
    let point_count = sketch.points.len();
    let mut solved_count = 1usize; // the origin point

    // reset per-solve state
    for p in &mut sketch.points {
        p.manifold = Manifold::Any;
        p.solved = false;
    }
    for l in &mut sketch.lines {
        l.expected_angle = 0.0;
        l.angle_solved = false;
        l.angle_applied = false;
    }
    for c in &mut sketch.constraints {
        c.violated = false;
        c.applied = false;
    }

    // pin the gauge
    let ol = sketch.origin_line.0 as usize;
    sketch.lines[ol].angle_solved = true;
    sketch.lines[ol].expected_angle = sketch.origin_angle;
    let op = sketch.origin_point.0 as usize;
    sketch.points[op].solved = true;
    sketch.points[op].manifold = Manifold::Point(sketch.points[op].pos);

    let mut passes = 0usize;
    loop {
        passes += 1;
        let mut any_solved = false;

        // apply constraints with exactly one side determined
        for ci in 0..sketch.constraints.len() {
            if sketch.constraints[ci].applied {
                continue;
            }
            let mut applied = false;
            match sketch.constraints[ci].kind {
                ConstraintKind::Distance { line, value } => {
                    let (p1, p2) = {
                        let l = &sketch.lines[line.0 as usize];
                        (l.p1.0 as usize, l.p2.0 as usize)
                    };
                    let (s1, s2) = (sketch.points[p1].solved, sketch.points[p2].solved);
                    if s1 != s2 {
                        let (fixed, variable) = if s1 { (p1, p2) } else { (p2, p1) };
                        let circle = Manifold::Circle {
                            origin: sketch.points[fixed].pos,
                            radius: value,
                        };
                        let joined = join(sketch.points[variable].manifold, circle);
                        if !joined.is_none() {
                            sketch.points[variable].manifold = joined;
                        }
                        // an empty join means the constraint cannot hold;
                        // it still counts as applied and the final sweep
                        // reports it
                        applied = true;
                    }
                }
                ConstraintKind::Angle {
                    line1,
                    line2,
                    flip1,
                    flip2,
                    value,
                } => {
                    let a1 = sketch.lines[line1.0 as usize].angle_solved;
                    let a2 = sketch.lines[line2.0 as usize].angle_solved;
                    if a1 != a2 {
                        let fixed_is_line1 = a1;
                        let (fixed, variable) = if a1 { (line1, line2) } else { (line2, line1) };

                        let mut fixed_angle = sketch.lines[fixed.0 as usize].expected_angle;
                        if fixed_is_line1 && flip1 {
                            fixed_angle += PI;
                        } else if !fixed_is_line1 && flip2 {
                            fixed_angle += PI;
                        }

                        // the constraint value runs line1 to line2, so the
                        // sign turns around when line2 is the fixed one
                        let mut variable_angle =
                            fixed_angle + value * if fixed_is_line1 { 1.0 } else { -1.0 };
                        if !fixed_is_line1 && flip1 {
                            variable_angle += PI;
                        } else if fixed_is_line1 && flip2 {
                            variable_angle += PI;
                        }

                        let v = &mut sketch.lines[variable.0 as usize];
                        v.angle_solved = true;
                        v.expected_angle = variable_angle;
                        applied = true;
                    }
                }
            }
            if applied {
                sketch.constraints[ci].applied = true;
                any_solved = true;
            }
        }

        // derive line angles from solved endpoints, and line manifolds from
        // solved angles
        for li in 0..sketch.lines.len() {
            let (p1, p2, angle_solved, angle_applied, expected) = {
                let l = &sketch.lines[li];
                (
                    l.p1.0 as usize,
                    l.p2.0 as usize,
                    l.angle_solved,
                    l.angle_applied,
                    l.expected_angle,
                )
            };
            let (s1, s2) = (sketch.points[p1].solved, sketch.points[p2].solved);
            let n_solved = s1 as u8 + s2 as u8;

            if !angle_solved && n_solved == 2 {
                let diff = sketch.points[p2].pos - sketch.points[p1].pos;
                let l = &mut sketch.lines[li];
                l.expected_angle = diff.y.atan2(diff.x);
                l.angle_solved = true;
                any_solved = true;
            } else if angle_solved && n_solved == 1 && !angle_applied {
                // the expected angle runs p1 to p2, so the ray direction
                // inverts when the free end is p1
                let (fixed, variable, sign) = if s1 { (p1, p2, 1.0f32) } else { (p2, p1, -1.0f32) };
                let direction = Vector2::new(sign * expected.cos(), sign * expected.sin());
                let ray = Manifold::Line {
                    origin: sketch.points[fixed].pos,
                    direction,
                };
                let joined = join(sketch.points[variable].manifold, ray);
                if !joined.is_none() {
                    sketch.points[variable].manifold = joined;
                }
                sketch.lines[li].angle_applied = true;
                any_solved = true;
            }
        }

        // collapse determined manifolds into positions
        for p in &mut sketch.points {
            if p.solved {
                continue;
            }
            match p.manifold {
                Manifold::Point(pos) => {
                    p.pos = pos;
                    p.solved = true;
                    solved_count += 1;
                    any_solved = true;
                }
                Manifold::TwoPoints { a, b } => {
                    // the current position acts as a bias hint
                    p.pos = if (a - p.pos).norm() < (b - p.pos).norm() {
                        a
                    } else {
                        b
                    };
                    p.solved = true;
                    solved_count += 1;
                    any_solved = true;
                }
                _ => {}
            }
        }

        if solved_count >= point_count {
            debug!(passes, "propagation solved every point");
            break;
        }
        if !any_solved {
            debug!(
                passes,
                solved = solved_count,
                total = point_count,
                "propagation stalled, falling back to relaxation"
            );
            break;
        }
    }

    if solved_count < point_count {
        relax(sketch);
    }
    sweep_violations(sketch);
}

/// Gradient-style relaxation of whatever propagation left unsolved.
fn relax(sketch: &mut Sketch) {
    for pass in 0..MAX_RELAX_PASSES {
        let mut max_error = 0f32;

        for ci in 0..sketch.constraints.len() {
            let error = match sketch.constraints[ci].kind {
                ConstraintKind::Angle {
                    line1,
                    line2,
                    flip1,
                    flip2,
                    value,
                } => {
                    let (l1p1, l1p2) = {
                        let l = &sketch.lines[line1.0 as usize];
                        (l.p1.0 as usize, l.p2.0 as usize)
                    };
                    let (l2p1, l2p2) = {
                        let l = &sketch.lines[line2.0 as usize];
                        (l.p1.0 as usize, l.p2.0 as usize)
                    };
                    if sketch.points[l1p1].solved
                        && sketch.points[l1p2].solved
                        && sketch.points[l2p1].solved
                        && sketch.points[l2p2].solved
                    {
                        continue;
                    }

                    // the expected angle is no use here; measure the real one
                    let a1 = line_angle(sketch.points[l1p1].pos, sketch.points[l1p2].pos, flip1);
                    let a2 = line_angle(sketch.points[l2p1].pos, sketch.points[l2p2].pos, flip2);
                    let half = normalize_angle(value - normalize_angle(a2 - a1)) / 2.0;

                    rotate_when_unsolved(sketch, l1p1, l1p2, -half);
                    rotate_when_unsolved(sketch, l2p1, l2p2, half);
                    (half * 2.0).abs()
                }
                ConstraintKind::Distance { line, value } => {
                    let (p1, p2) = {
                        let l = &sketch.lines[line.0 as usize];
                        (l.p1.0 as usize, l.p2.0 as usize)
                    };
                    let a = sketch.points[p1].pos;
                    let b = sketch.points[p2].pos;
                    let before = (b - a).norm();
                    let dir = (b - a) / before;
                    let mid = nalgebra::center(&a, &b);

                    if !sketch.points[p1].solved {
                        sketch.points[p1].pos = mid - dir * (value / 2.0);
                    }
                    if !sketch.points[p2].solved {
                        sketch.points[p2].pos = mid + dir * (value / 2.0);
                    }
                    (before - value).abs()
                }
            };
            max_error = max_error.max(error);
        }

        if max_error < EPSILON {
            debug!(passes = pass + 1, "relaxation converged");
            return;
        }
    }
    debug!(passes = MAX_RELAX_PASSES, "relaxation hit the pass cap");
}

/// Rotate a line's free endpoints by `angle` around the right pivot: the
/// midpoint when both ends are free, the solved end when one is pinned.
fn rotate_when_unsolved(sketch: &mut Sketch, p1: usize, p2: usize, angle: f32) {
    let s1 = sketch.points[p1].solved;
    let s2 = sketch.points[p2].solved;
    let t = if s1 && !s2 {
        0.0
    } else if s2 && !s1 {
        1.0
    } else {
        0.5
    };

    let a = sketch.points[p1].pos;
    let b = sketch.points[p2].pos;
    let mid = a + (b - a) * t;
    let rot = Rotation2::new(angle);

    if !s1 {
        sketch.points[p1].pos = mid + rot * (a - mid);
    }
    if !s2 {
        sketch.points[p2].pos = mid + rot * (b - mid);
    }
}

/// Measure every constraint against the final positions and flag the ones
/// that did not hold.
fn sweep_violations(sketch: &mut Sketch) {
    for ci in 0..sketch.constraints.len() {
        let error = match sketch.constraints[ci].kind {
            ConstraintKind::Distance { line, value } => sketch.line_length(line) - value,
            ConstraintKind::Angle {
                line1,
                line2,
                flip1,
                flip2,
                value,
            } => {
                let l1 = &sketch.lines[line1.0 as usize];
                let l2 = &sketch.lines[line2.0 as usize];
                let a1 = line_angle(
                    sketch.points[l1.p1.0 as usize].pos,
                    sketch.points[l1.p2.0 as usize].pos,
                    flip1,
                );
                let a2 = line_angle(
                    sketch.points[l2.p1.0 as usize].pos,
                    sketch.points[l2.p2.0 as usize].pos,
                    flip2,
                );
                normalize_angle(value - normalize_angle(a2 - a1))
            }
        };
        if !zero(error) {
            sketch.constraints[ci].violated = true;
            debug!(constraint = ci, error, "constraint violated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::scalar::equal;

    #[test]
    fn line_angle_measures_ccw_from_p1() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(0.0, 2.0);
        assert!(equal(line_angle(a, b, false), PI / 2.0));
        assert!(equal(normalize_angle(line_angle(a, b, true)), -PI / 2.0));
    }

    #[test]
    fn solve_is_gauge_stable() {
        // solving the bare origin sketch twice leaves it untouched
        let mut s = Sketch::new();
        solve(&mut s);
        let first: Vec<_> = s.points.iter().map(|p| p.pos).collect();
        solve(&mut s);
        let second: Vec<_> = s.points.iter().map(|p| p.pos).collect();
        for (a, b) in first.iter().zip(&second) {
            assert!(keel_geometry::v2_equal(a, b));
        }
    }
}
