use anyhow::{Result, ensure};
use itertools::Itertools;

use crate::geometry::Transformation;
use crate::geometry::convex_hull::convex_hull_from_points;
use crate::geometry::decompose::decompose;
use crate::geometry::geo_traits::{Shape, Transformable};
use crate::geometry::primitives::{Circle, Point, Rect, SPolygon, is_convex};

/// Convex polygon (or segment) prepared for separating axis tests
#[derive(Clone, Debug)]
pub struct ConvexPolygon {
    /// Vertices in counterclockwise order
    pub points: Vec<Point>,
    pub bbox: Rect,
    /// Unit normals of all non-degenerate edges
    normals: Vec<Point>,
}

impl ConvexPolygon {
    /// Points are expected to describe a convex polygon, or a segment when only two are given
    pub fn new(mut points: Vec<Point>) -> Self {
        if SPolygon::calculate_area(&points) < 0.0 {
            points.reverse();
        }
        let bbox = Rect::bounding_points(&points).unwrap_or(Rect {
            x_min: 0.0,
            y_min: 0.0,
            x_max: 0.0,
            y_max: 0.0,
        });
        let normals = edge_normals(&points);
        Self {
            points,
            bbox,
            normals,
        }
    }

    pub fn normals(&self) -> &[Point] {
        &self.normals
    }

    pub fn area(&self) -> f64 {
        SPolygon::calculate_area(&self.points)
    }

    /// Region covered by the polygon while it is translated by `d`
    pub fn swept(&self, d: Point) -> ConvexPolygon {
        let points = self.points.iter().flat_map(|p| [*p, *p + d]).collect_vec();
        ConvexPolygon::new(convex_hull_from_points(points))
    }

    /// Interval covered by the projection of the polygon on `axis`
    pub fn project(&self, axis: Point) -> (f64, f64) {
        self.points
            .iter()
            .map(|p| p.dot(&axis))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            })
    }
}

fn edge_normals(points: &[Point]) -> Vec<Point> {
    match points.len() {
        0 | 1 => vec![],
        _ => points
            .iter()
            .circular_tuple_windows()
            .filter_map(|(a, b)| (*b - *a).perp_cw().normalized())
            .collect_vec(),
    }
}

impl Transformable for ConvexPolygon {
    fn transform(&mut self, t: &Transformation) -> &mut Self {
        let ConvexPolygon {
            points,
            bbox,
            normals,
        } = self;
        points.iter_mut().for_each(|p| {
            p.transform(t);
        });
        if let Some(b) = Rect::bounding_points(points) {
            *bbox = b;
        }
        *normals = edge_normals(points);
        self
    }
}

/// A concave polygon, represented by its convex parts
#[derive(Clone, Debug)]
pub struct ConcavePolygon {
    pub parts: Vec<ConvexPolygon>,
    pub bbox: Rect,
}

impl ConcavePolygon {
    pub fn from_parts(parts: Vec<ConvexPolygon>) -> Result<Self> {
        ensure!(!parts.is_empty(), "a concave polygon needs at least one part");
        let bbox = parts
            .iter()
            .map(|p| p.bbox)
            .reduce(Rect::bounding_rect)
            .unwrap_or(parts[0].bbox);
        Ok(Self { parts, bbox })
    }
}

impl Transformable for ConcavePolygon {
    fn transform(&mut self, t: &Transformation) -> &mut Self {
        self.parts.iter_mut().for_each(|p| {
            p.transform(t);
        });
        if let Some(b) = self.parts.iter().map(|p| p.bbox).reduce(Rect::bounding_rect) {
            self.bbox = b;
        }
        self
    }
}

/// Shapes understood by the collision oracle
#[derive(Clone, Debug)]
pub enum CollisionShape {
    Point(Point),
    Circle(Circle),
    Convex(ConvexPolygon),
    Concave(ConcavePolygon),
}

impl CollisionShape {
    /// Decodes the point-list representation of a shape.
    /// A circle is encoded as two points: its center and a marker whose x-coordinate is the radius.
    /// Two points otherwise describe a segment, three or more a polygon.
    pub fn from_points(points: &[Point], is_circle: bool) -> Result<Self> {
        ensure!(
            points.iter().all(|p| p.is_finite()),
            "shape contains non-finite coordinates: {points:?}"
        );
        match (points.len(), is_circle) {
            (2, true) => Ok(CollisionShape::Circle(Circle::try_new(points[0], points[1].0)?)),
            (_, true) => anyhow::bail!("a circle is encoded by exactly 2 points, got {}", points.len()),
            (0, false) => anyhow::bail!("cannot build a shape from an empty point list"),
            (1, false) => Ok(CollisionShape::Point(points[0])),
            (2, false) => {
                ensure!(points[0] != points[1], "degenerate segment: {points:?}");
                Ok(CollisionShape::Convex(ConvexPolygon::new(points.to_vec())))
            }
            _ => CollisionShape::from_polygon(&SPolygon::new(points.to_vec())?),
        }
    }

    /// Convex polygons are kept whole, concave ones are decomposed into convex parts
    pub fn from_polygon(polygon: &SPolygon) -> Result<Self> {
        match is_convex(&polygon.vertices) {
            true => Ok(CollisionShape::Convex(ConvexPolygon::new(polygon.vertices.clone()))),
            false => {
                let parts = decompose(&polygon.vertices)?
                    .into_iter()
                    .map(ConvexPolygon::new)
                    .collect_vec();
                Ok(CollisionShape::Concave(ConcavePolygon::from_parts(parts)?))
            }
        }
    }

    /// Merges several shapes into one compound shape made up of all their convex parts
    pub fn compound(shapes: &[CollisionShape]) -> Result<Self> {
        let parts = shapes
            .iter()
            .flat_map(|s| match s {
                CollisionShape::Convex(c) => vec![c.clone()],
                CollisionShape::Concave(c) => c.parts.clone(),
                CollisionShape::Point(p) => vec![ConvexPolygon::new(vec![*p])],
                CollisionShape::Circle(c) => vec![ConvexPolygon::new(c.bbox().corners().to_vec())],
            })
            .collect_vec();
        Ok(CollisionShape::Concave(ConcavePolygon::from_parts(parts)?))
    }

    pub fn bbox(&self) -> Rect {
        match self {
            CollisionShape::Point(p) => Rect {
                x_min: p.0,
                y_min: p.1,
                x_max: p.0,
                y_max: p.1,
            },
            CollisionShape::Circle(c) => c.bbox(),
            CollisionShape::Convex(c) => c.bbox,
            CollisionShape::Concave(c) => c.bbox,
        }
    }

    /// Region covered by the shape while it is translated by `d`.
    /// Circles are swept by their bounding box.
    pub fn swept(&self, d: Point) -> CollisionShape {
        match self {
            CollisionShape::Point(p) => CollisionShape::Convex(ConvexPolygon::new(vec![*p, *p + d])),
            CollisionShape::Circle(c) => {
                CollisionShape::Convex(ConvexPolygon::new(c.bbox().corners().to_vec()).swept(d))
            }
            CollisionShape::Convex(c) => CollisionShape::Convex(c.swept(d)),
            CollisionShape::Concave(c) => {
                let parts = c.parts.iter().map(|p| p.swept(d)).collect_vec();
                let bbox = parts.iter().map(|p| p.bbox).fold(c.bbox, Rect::bounding_rect);
                CollisionShape::Concave(ConcavePolygon { parts, bbox })
            }
        }
    }

    /// Convex parts of the shape, concave shapes yield all of their parts
    pub fn convex_parts(&self) -> &[ConvexPolygon] {
        match self {
            CollisionShape::Convex(c) => std::slice::from_ref(c),
            CollisionShape::Concave(c) => &c.parts,
            CollisionShape::Point(_) | CollisionShape::Circle(_) => &[],
        }
    }
}

impl Transformable for CollisionShape {
    fn transform(&mut self, t: &Transformation) -> &mut Self {
        match self {
            CollisionShape::Point(p) => {
                p.transform(t);
            }
            CollisionShape::Circle(c) => {
                c.transform(t);
            }
            CollisionShape::Convex(c) => {
                c.transform(t);
            }
            CollisionShape::Concave(c) => {
                c.transform(t);
            }
        }
        self
    }
}
