use anyhow::{Result, ensure};

use crate::geometry::Transformation;
use crate::geometry::geo_traits::{Transformable, TransformableFrom};
use crate::geometry::primitives::Point;
use crate::geometry::primitives::Rect;

/// Line segment between two [`Point`]s
#[derive(Clone, Debug, PartialEq, Copy)]
pub struct Edge {
    pub start: Point,
    pub end: Point,
}

impl Edge {
    pub fn try_new(start: Point, end: Point) -> Result<Self> {
        ensure!(start != end, "degenerate edge, {start:?} == {end:?}");
        Ok(Edge { start, end })
    }

    pub fn reverse(mut self) -> Self {
        std::mem::swap(&mut self.start, &mut self.end);
        self
    }

    /// Vector from `start` to `end`
    pub fn direction(&self) -> Point {
        self.end - self.start
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    /// Angle of the edge with respect to the positive x-axis, in radians
    pub fn angle(&self) -> f64 {
        let Point(dx, dy) = self.direction();
        dy.atan2(dx)
    }

    /// Intersection point with `other`, touching endpoints included
    pub fn collides_at(&self, other: &Edge) -> Option<Point> {
        let r = self.direction();
        let s = other.direction();
        let denom = r.cross(&s);
        let qp = other.start - self.start;

        if denom.abs() < f64::EPSILON {
            //parallel, only report collinear overlaps
            if qp.cross(&r).abs() > INTERSECT_EPS * r.norm().max(1.0) {
                return None;
            }
            let rr = r.dot(&r);
            let t0 = qp.dot(&r) / rr;
            let t1 = t0 + s.dot(&r) / rr;
            let (lo, hi) = (t0.min(t1), t0.max(t1));
            return match hi >= -INTERSECT_EPS && lo <= 1.0 + INTERSECT_EPS {
                true => Some(self.start + r.scale(lo.clamp(0.0, 1.0))),
                false => None,
            };
        }

        let t = qp.cross(&s) / denom;
        let u = qp.cross(&r) / denom;
        let range = -INTERSECT_EPS..=1.0 + INTERSECT_EPS;
        match range.contains(&t) && range.contains(&u) {
            true => Some(self.start + r.scale(t)),
            false => None,
        }
    }

    /// Distance along the ray `origin + t * dir` (t > 0) at which it hits the edge, if it does
    pub fn ray_intersection(&self, origin: Point, dir: Point) -> Option<f64> {
        let s = self.direction();
        let denom = dir.cross(&s);
        if denom.abs() < f64::EPSILON {
            return None;
        }
        let qp = self.start - origin;
        let t = qp.cross(&s) / denom;
        let u = qp.cross(&dir) / denom;
        match t > INTERSECT_EPS && (-INTERSECT_EPS..=1.0 + INTERSECT_EPS).contains(&u) {
            true => Some(t),
            false => None,
        }
    }

    pub fn x_min(&self) -> f64 {
        f64::min(self.start.0, self.end.0)
    }

    pub fn y_min(&self) -> f64 {
        f64::min(self.start.1, self.end.1)
    }

    pub fn x_max(&self) -> f64 {
        f64::max(self.start.0, self.end.0)
    }

    pub fn y_max(&self) -> f64 {
        f64::max(self.start.1, self.end.1)
    }

    pub fn bbox(&self) -> Rect {
        Rect {
            x_min: self.x_min(),
            y_min: self.y_min(),
            x_max: self.x_max(),
            y_max: self.y_max(),
        }
    }

    pub fn centroid(&self) -> Point {
        Point(
            (self.start.0 + self.end.0) / 2.0,
            (self.start.1 + self.end.1) / 2.0,
        )
    }
}

const INTERSECT_EPS: f64 = 1e-9;

impl Transformable for Edge {
    fn transform(&mut self, t: &Transformation) -> &mut Self {
        let Edge { start, end } = self;
        start.transform(t);
        end.transform(t);
        self
    }
}

impl TransformableFrom for Edge {
    fn transform_from(&mut self, reference: &Self, t: &Transformation) -> &mut Self {
        let Edge { start, end } = self;
        start.transform_from(&reference.start, t);
        end.transform_from(&reference.end, t);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_edges_intersect_in_the_middle() {
        let a = Edge::try_new(Point(0.0, 0.0), Point(2.0, 2.0)).unwrap();
        let b = Edge::try_new(Point(0.0, 2.0), Point(2.0, 0.0)).unwrap();
        let p = a.collides_at(&b).unwrap();
        assert!((p.0 - 1.0).abs() < 1e-9 && (p.1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn touching_endpoints_count_as_intersection() {
        let a = Edge::try_new(Point(0.0, 0.0), Point(1.0, 0.0)).unwrap();
        let b = Edge::try_new(Point(1.0, 0.0), Point(1.0, 1.0)).unwrap();
        assert!(a.collides_at(&b).is_some());
    }

    #[test]
    fn parallel_disjoint_edges_do_not_intersect() {
        let a = Edge::try_new(Point(0.0, 0.0), Point(1.0, 0.0)).unwrap();
        let b = Edge::try_new(Point(0.0, 1.0), Point(1.0, 1.0)).unwrap();
        assert!(a.collides_at(&b).is_none());
    }

    #[test]
    fn ray_hits_edge_in_front_only() {
        let e = Edge::try_new(Point(2.0, -1.0), Point(2.0, 1.0)).unwrap();
        assert_eq!(e.ray_intersection(Point(0.0, 0.0), Point(1.0, 0.0)), Some(2.0));
        assert_eq!(e.ray_intersection(Point(0.0, 0.0), Point(-1.0, 0.0)), None);
    }

    #[test]
    fn degenerate_edge_is_rejected() {
        assert!(Edge::try_new(Point(1.0, 1.0), Point(1.0, 1.0)).is_err());
    }
}
