use std::f64::consts::PI;

use anyhow::{Result, ensure};

use crate::geometry::Transformation;
use crate::geometry::geo_traits::{CollidesWith, Shape, Transformable, TransformableFrom};
use crate::geometry::primitives::Point;
use crate::geometry::primitives::Rect;

/// Circle
#[derive(Clone, Debug, PartialEq, Copy)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
}

impl Circle {
    pub fn try_new(center: Point, radius: f64) -> Result<Self> {
        ensure!(
            radius.is_finite() && radius > 0.0,
            "invalid circle radius: {radius}"
        );
        ensure!(center.is_finite(), "invalid circle center: {center:?}");
        Ok(Self { center, radius })
    }
}

impl Shape for Circle {
    fn centroid(&self) -> Point {
        self.center
    }

    fn area(&self) -> f64 {
        self.radius * self.radius * PI
    }

    fn bbox(&self) -> Rect {
        let (r, x, y) = (self.radius, self.center.0, self.center.1);
        Rect {
            x_min: x - r,
            y_min: y - r,
            x_max: x + r,
            y_max: y + r,
        }
    }

    fn diameter(&self) -> f64 {
        self.radius * 2.0
    }
}

impl Transformable for Circle {
    fn transform(&mut self, t: &Transformation) -> &mut Self {
        self.center.transform(t);
        self
    }
}

impl TransformableFrom for Circle {
    fn transform_from(&mut self, reference: &Self, t: &Transformation) -> &mut Self {
        self.center.transform_from(&reference.center, t);
        self.radius = reference.radius;
        self
    }
}

impl CollidesWith<Circle> for Circle {
    /// Strict overlap: circles that touch do not collide
    fn collides_with(&self, other: &Circle) -> bool {
        let sq_d = self.center.sq_distance_to(&other.center);
        let r_sum = self.radius + other.radius;
        sq_d < r_sum * r_sum
    }
}

impl CollidesWith<Point> for Circle {
    fn collides_with(&self, point: &Point) -> bool {
        self.center.sq_distance_to(point) < self.radius * self.radius
    }
}
