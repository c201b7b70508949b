use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::geometry::geo_enums::GeoRelation;
use crate::geometry::geo_traits::CollidesWith;
use crate::geometry::primitives::Edge;
use crate::geometry::primitives::Point;
use crate::util::FPA;

///Axis-aligned rectangle
#[derive(Clone, Debug, PartialEq, Copy, Serialize, Deserialize)]
pub struct Rect {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Rect {
    pub fn try_new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Result<Self> {
        ensure!(
            x_min < x_max && y_min < y_max,
            "invalid rectangle, x_min: {x_min}, x_max: {x_max}, y_min: {y_min}, y_max: {y_max}"
        );
        Ok(Rect {
            x_min,
            y_min,
            x_max,
            y_max,
        })
    }

    /// Smallest rectangle enclosing all points. Degenerate (zero width or height) results are allowed.
    pub fn bounding_points(points: &[Point]) -> Option<Rect> {
        let first = points.first()?;
        let init = Rect {
            x_min: first.0,
            y_min: first.1,
            x_max: first.0,
            y_max: first.1,
        };
        Some(points.iter().skip(1).fold(init, |r, p| Rect {
            x_min: r.x_min.min(p.0),
            y_min: r.y_min.min(p.1),
            x_max: r.x_max.max(p.0),
            y_max: r.y_max.max(p.1),
        }))
    }

    /// Returns the geometric relation between `self` and another [`Rect`].
    pub fn relation_to(&self, other: Rect) -> GeoRelation {
        if !self.collides_with(&other) {
            return GeoRelation::Disjoint;
        }
        if self.x_min <= other.x_min
            && self.y_min <= other.y_min
            && self.x_max >= other.x_max
            && self.y_max >= other.y_max
        {
            return GeoRelation::Surrounding;
        }
        if self.x_min >= other.x_min
            && self.y_min >= other.y_min
            && self.x_max <= other.x_max
            && self.y_max <= other.y_max
        {
            return GeoRelation::Enclosed;
        }
        GeoRelation::Intersecting
    }

    /// True if `other` lies within `self`, with a tolerance for floating point precision
    pub fn almost_contains(&self, other: &Rect) -> bool {
        FPA(self.x_min) <= FPA(other.x_min)
            && FPA(self.y_min) <= FPA(other.y_min)
            && FPA(self.x_max) >= FPA(other.x_max)
            && FPA(self.y_max) >= FPA(other.y_max)
    }

    /// True if the interiors of both rectangles overlap by more than `eps` in both dimensions.
    /// Rectangles that merely touch do not overlap.
    #[inline(always)]
    pub fn overlaps_strictly(&self, other: &Rect, eps: f64) -> bool {
        f64::min(self.x_max, other.x_max) - f64::max(self.x_min, other.x_min) > eps
            && f64::min(self.y_max, other.y_max) - f64::max(self.y_min, other.y_min) > eps
    }

    /// Returns a copy expanded by `dx` on both x-sides and `dy` on both y-sides.
    pub fn inflate(&self, dx: f64, dy: f64) -> Rect {
        Rect {
            x_min: self.x_min - dx,
            y_min: self.y_min - dy,
            x_max: self.x_max + dx,
            y_max: self.y_max + dy,
        }
    }

    /// Returns the 4 quadrants of `self`.
    /// Ordered in the same way as quadrants in a cartesian plane:
    /// <https://en.wikipedia.org/wiki/Quadrant_(plane_geometry)>
    pub fn quadrants(&self) -> [Self; 4] {
        let Point(mx, my) = self.centroid();
        [
            Rect { x_min: mx, y_min: my, x_max: self.x_max, y_max: self.y_max },
            Rect { x_min: self.x_min, y_min: my, x_max: mx, y_max: self.y_max },
            Rect { x_min: self.x_min, y_min: self.y_min, x_max: mx, y_max: my },
            Rect { x_min: mx, y_min: self.y_min, x_max: self.x_max, y_max: my },
        ]
    }

    /// Returns the four corners of `self`, in the same order as [Rect::quadrants].
    pub fn corners(&self) -> [Point; 4] {
        [
            Point(self.x_max, self.y_max),
            Point(self.x_min, self.y_max),
            Point(self.x_min, self.y_min),
            Point(self.x_max, self.y_min),
        ]
    }

    /// Returns the four edges that make up `self`, counterclockwise
    pub fn edges(&self) -> [Edge; 4] {
        let c = self.corners();
        [
            Edge { start: c[0], end: c[1] },
            Edge { start: c[1], end: c[2] },
            Edge { start: c[2], end: c[3] },
            Edge { start: c[3], end: c[0] },
        ]
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Returns the smallest rectangle that contains both `a` and `b`.
    pub fn bounding_rect(a: Rect, b: Rect) -> Rect {
        Rect {
            x_min: f64::min(a.x_min, b.x_min),
            y_min: f64::min(a.y_min, b.y_min),
            x_max: f64::max(a.x_max, b.x_max),
            y_max: f64::max(a.y_max, b.y_max),
        }
    }

    pub fn centroid(&self) -> Point {
        Point(
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn diameter(&self) -> f64 {
        (self.width().powi(2) + self.height().powi(2)).sqrt()
    }
}

impl CollidesWith<Rect> for Rect {
    #[inline(always)]
    fn collides_with(&self, other: &Rect) -> bool {
        f64::max(self.x_min, other.x_min) <= f64::min(self.x_max, other.x_max)
            && f64::max(self.y_min, other.y_min) <= f64::min(self.y_max, other.y_max)
    }
}

impl CollidesWith<Point> for Rect {
    #[inline(always)]
    fn collides_with(&self, point: &Point) -> bool {
        let Point(x, y) = *point;
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_rects_do_not_overlap_strictly() {
        let a = Rect::try_new(0.0, 0.0, 10.0, 10.0).unwrap();
        let b = Rect::try_new(10.0, 0.0, 20.0, 10.0).unwrap();
        assert!(a.collides_with(&b));
        assert!(!a.overlaps_strictly(&b, 1e-9));
    }

    #[test]
    fn quadrants_tile_the_rect() {
        let r = Rect::try_new(0.0, 0.0, 8.0, 4.0).unwrap();
        let total: f64 = r.quadrants().iter().map(|q| q.area()).sum();
        assert_eq!(total, r.area());
        assert_eq!(r.quadrants()[2], Rect::try_new(0.0, 0.0, 4.0, 2.0).unwrap());
    }

    #[test]
    fn relation_detects_enclosure() {
        let outer = Rect::try_new(0.0, 0.0, 10.0, 10.0).unwrap();
        let inner = Rect::try_new(2.0, 2.0, 3.0, 3.0).unwrap();
        assert_eq!(inner.relation_to(outer), GeoRelation::Enclosed);
        assert_eq!(outer.relation_to(inner), GeoRelation::Surrounding);
    }
}
