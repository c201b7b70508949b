//! Overlap tests between [`CollisionShape`]s based on the separating axis theorem.
//!
//! Shapes overlap only when their interiors intersect by more than [`SAT_EPS`]: shapes that merely touch
//! are considered disjoint. A [`Gap`] demands extra clearance: the first shape is treated as if it
//! were inflated by an axis-aligned box of half-extents `(gap.x, gap.y)`.

use itertools::Either;
use serde::{Deserialize, Serialize};

use crate::collision_detection::shape::{CollisionShape, ConvexPolygon};
use crate::geometry::primitives::{Circle, Point, Rect};

/// Penetration depth below which two shapes are still considered to be touching
pub const SAT_EPS: f64 = 1e-9;

/// Required clearance between two shapes, per axis
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub x: f64,
    pub y: f64,
}

impl Gap {
    pub const ZERO: Gap = Gap { x: 0.0, y: 0.0 };

    pub fn uniform(gap: f64) -> Self {
        Gap { x: gap, y: gap }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Component-wise maximum of both gaps
    pub fn max(self, other: Gap) -> Gap {
        Gap {
            x: self.x.max(other.x),
            y: self.y.max(other.y),
        }
    }

    /// Half-width of the clearance box projected on a unit `axis`
    #[inline(always)]
    fn support(&self, axis: Point) -> f64 {
        self.x * axis.0.abs() + self.y * axis.1.abs()
    }
}

/// True if the interiors of `a` and `b` overlap
pub fn overlaps(a: &CollisionShape, b: &CollisionShape) -> bool {
    overlaps_with_gap(a, b, Gap::ZERO)
}

/// True if `a` and `b` overlap or come closer than the required `gap`.
/// Symmetric in `a` and `b`.
pub fn overlaps_with_gap(a: &CollisionShape, b: &CollisionShape, gap: Gap) -> bool {
    if bboxes_separated(&a.bbox(), &b.bbox(), gap) {
        return false;
    }
    atoms(a).any(|atom_a| atoms(b).any(|atom_b| atoms_overlap(atom_a, atom_b, gap)))
}

/// Convex building blocks of a shape
#[derive(Clone, Copy, Debug)]
enum Atom<'a> {
    Point(Point),
    Circle(&'a Circle),
    Convex(&'a ConvexPolygon),
}

impl Atom<'_> {
    fn bbox(&self) -> Rect {
        match self {
            Atom::Point(p) => Rect {
                x_min: p.0,
                y_min: p.1,
                x_max: p.0,
                y_max: p.1,
            },
            Atom::Circle(c) => Rect {
                x_min: c.center.0 - c.radius,
                y_min: c.center.1 - c.radius,
                x_max: c.center.0 + c.radius,
                y_max: c.center.1 + c.radius,
            },
            Atom::Convex(c) => c.bbox,
        }
    }

    fn project(&self, axis: Point) -> (f64, f64) {
        match self {
            Atom::Point(p) => {
                let v = p.dot(&axis);
                (v, v)
            }
            Atom::Circle(c) => {
                let v = c.center.dot(&axis);
                (v - c.radius, v + c.radius)
            }
            Atom::Convex(c) => c.project(axis),
        }
    }
}

fn atoms(shape: &CollisionShape) -> impl Iterator<Item = Atom<'_>> {
    match shape {
        CollisionShape::Concave(c) => Either::Left(c.parts.iter().map(Atom::Convex)),
        CollisionShape::Point(p) => Either::Right(std::iter::once(Atom::Point(*p))),
        CollisionShape::Circle(c) => Either::Right(std::iter::once(Atom::Circle(c))),
        CollisionShape::Convex(c) => Either::Right(std::iter::once(Atom::Convex(c))),
    }
}

const X_AXIS: Point = Point(1.0, 0.0);
const Y_AXIS: Point = Point(0.0, 1.0);

#[inline(always)]
fn bboxes_separated(a: &Rect, b: &Rect, gap: Gap) -> bool {
    interval_separation((a.x_min, a.x_max), (b.x_min, b.x_max)) >= gap.x - SAT_EPS
        || interval_separation((a.y_min, a.y_max), (b.y_min, b.y_max)) >= gap.y - SAT_EPS
}

/// Signed distance between two intervals, negative when they overlap
#[inline(always)]
fn interval_separation((a_min, a_max): (f64, f64), (b_min, b_max): (f64, f64)) -> f64 {
    f64::max(b_min - a_max, a_min - b_max)
}

fn separated_on(axis: Point, a: Atom, b: Atom, gap: Gap) -> bool {
    interval_separation(a.project(axis), b.project(axis)) >= gap.support(axis) - SAT_EPS
}

fn atoms_overlap(a: Atom, b: Atom, gap: Gap) -> bool {
    if bboxes_separated(&a.bbox(), &b.bbox(), gap) {
        return false;
    }
    match (a, b) {
        (Atom::Point(_), Atom::Point(_)) => gap_between_points(a, b, gap),
        (Atom::Circle(_) | Atom::Point(_), Atom::Circle(_) | Atom::Point(_)) => {
            round_atoms_overlap(a, b, gap)
        }
        (Atom::Convex(poly), other) | (other, Atom::Convex(poly)) => {
            let extra_axis = match other {
                Atom::Convex(_) | Atom::Point(_) => None,
                //axis towards the polygon vertex closest to the circle center
                Atom::Circle(c) => poly
                    .points
                    .iter()
                    .map(|p| *p - c.center)
                    .min_by(|p1, p2| p1.norm().total_cmp(&p2.norm()))
                    .and_then(|d| d.normalized()),
            };
            let other_normals: &[Point] = match other {
                Atom::Convex(o) => o.normals(),
                _ => &[],
            };
            let gap_axes = match gap.is_zero() {
                true => None,
                false => Some([X_AXIS, Y_AXIS]),
            };

            let mut axes = poly
                .normals()
                .iter()
                .chain(other_normals.iter())
                .copied()
                .chain(extra_axis)
                .chain(gap_axes.into_iter().flatten());

            !axes.any(|axis| separated_on(axis, Atom::Convex(poly), other, gap))
        }
    }
}

/// Points have no interior, they only conflict when a clearance is demanded
fn gap_between_points(a: Atom, b: Atom, gap: Gap) -> bool {
    !gap.is_zero() && !bboxes_separated(&a.bbox(), &b.bbox(), gap)
}

fn round_atoms_overlap(a: Atom, b: Atom, gap: Gap) -> bool {
    let (center_of, radius_of) = (
        |x: Atom| match x {
            Atom::Circle(c) => c.center,
            Atom::Point(p) => p,
            Atom::Convex(_) => unreachable!("convex atoms are handled by the polygon test"),
        },
        |x: Atom| match x {
            Atom::Circle(c) => c.radius,
            _ => 0.0,
        },
    );
    let d = center_of(b) - center_of(a);
    match d.normalized() {
        None => radius_of(a) + radius_of(b) > SAT_EPS,
        Some(axis) => {
            let required = radius_of(a) + radius_of(b) + gap.support(axis);
            d.norm() < required - SAT_EPS
        }
    }
}
