use std::hash::{Hash, Hasher};
use std::ops::{Add, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::geometry::Transformation;
use crate::geometry::geo_traits::{Transformable, TransformableFrom};

/// Geometric primitive representing a point, also used as a 2D vector
#[derive(Debug, Clone, PartialEq, Copy, Default, Serialize, Deserialize)]
pub struct Point(pub f64, pub f64);

impl Transformable for Point {
    fn transform(&mut self, t: &Transformation) -> &mut Self {
        let Point(x, y) = self;
        (*x, *y) = transform_formula(*x, *y, t);
        self
    }
}

impl TransformableFrom for Point {
    fn transform_from(&mut self, reference: &Self, t: &Transformation) -> &mut Self {
        let Point(x, y) = self;
        (*x, *y) = transform_formula(reference.0, reference.1, t);
        self
    }
}

#[inline(always)]
fn transform_formula(x: f64, y: f64, t: &Transformation) -> (f64, f64) {
    let m = t.matrix();
    let t_x = m[0][0].into_inner() * x + m[0][1].into_inner() * y + m[0][2].into_inner();
    let t_y = m[1][0].into_inner() * x + m[1][1].into_inner() * y + m[1][2].into_inner();
    (t_x, t_y)
}

impl Point {
    #[inline(always)]
    pub fn x(&self) -> f64 {
        self.0
    }

    #[inline(always)]
    pub fn y(&self) -> f64 {
        self.1
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        self.sq_distance_to(other).sqrt()
    }

    pub fn sq_distance_to(&self, other: &Point) -> f64 {
        (self.0 - other.0).powi(2) + (self.1 - other.1).powi(2)
    }

    /// Dot product, treating both points as vectors from the origin
    #[inline(always)]
    pub fn dot(&self, other: &Point) -> f64 {
        self.0 * other.0 + self.1 * other.1
    }

    /// Z-component of the cross product, positive if `other` lies counterclockwise of `self`
    #[inline(always)]
    pub fn cross(&self, other: &Point) -> f64 {
        self.0 * other.1 - self.1 * other.0
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction, `None` for the zero vector
    pub fn normalized(&self) -> Option<Point> {
        let n = self.norm();
        match n > f64::EPSILON {
            true => Some(Point(self.0 / n, self.1 / n)),
            false => None,
        }
    }

    /// Perpendicular vector, rotated 90° clockwise
    pub fn perp_cw(&self) -> Point {
        Point(self.1, -self.0)
    }

    pub fn scale(&self, factor: f64) -> Point {
        Point(self.0 * factor, self.1 * factor)
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite() && self.1.is_finite()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point(self.0 + rhs.0, self.1 + rhs.1)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point(self.0 - rhs.0, self.1 - rhs.1)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point(-self.0, -self.1)
    }
}

impl Eq for Point {}

impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
        self.1.to_bits().hash(state);
    }
}

impl From<Point> for (f64, f64) {
    fn from(p: Point) -> Self {
        (p.0, p.1)
    }
}

impl From<(f64, f64)> for Point {
    fn from(p: (f64, f64)) -> Self {
        Point(p.0, p.1)
    }
}
