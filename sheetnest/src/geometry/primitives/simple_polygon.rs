use itertools::Itertools;
use ordered_float::OrderedFloat;

use anyhow::{Result, bail, ensure};

use crate::geometry::Transformation;
use crate::geometry::geo_enums::Winding;
use crate::geometry::geo_traits::{Shape, Transformable, TransformableFrom};
use crate::geometry::primitives::Edge;
use crate::geometry::primitives::Point;
use crate::geometry::primitives::Rect;

/// A Simple Polygon is a polygon that does not intersect itself and contains no holes.
/// Vertices are always stored in counterclockwise order.
/// [read more](https://en.wikipedia.org/wiki/Simple_polygon)
#[derive(Clone, Debug)]
pub struct SPolygon {
    /// Set of points that form the polygon
    pub vertices: Vec<Point>,
    /// Bounding box
    pub bbox: Rect,
    /// Area of its interior
    pub area: f64,
    /// Maximum distance between any two points in the polygon
    pub diameter: f64,
}

impl SPolygon {
    /// Create a new simple polygon from a set of points.
    /// A repeated closing point is dropped and clockwise input is reversed.
    pub fn new(mut points: Vec<Point>) -> Result<Self> {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        if points.len() < 3 {
            bail!("simple polygon must have at least 3 points: {points:?}");
        }
        ensure!(
            points.iter().all(|p| p.is_finite()),
            "simple polygon contains non-finite coordinates: {points:?}"
        );
        if points.iter().unique().count() != points.len() {
            bail!("simple polygon should not contain duplicate points: {points:?}");
        }

        let signed_area = SPolygon::calculate_area(&points);
        let area = match Winding::from_signed_area(signed_area) {
            Winding::Collinear => bail!("simple polygon has no area: {points:?}"),
            Winding::Clockwise => {
                //vertices are always ordered counterclockwise (positive area)
                points.reverse();
                -signed_area
            }
            Winding::CounterClockwise => signed_area,
        };

        let bbox = SPolygon::generate_bounding_box(&points)?;
        let diameter = SPolygon::calculate_diameter(&points);

        Ok(SPolygon {
            vertices: points,
            bbox,
            area,
            diameter,
        })
    }

    pub fn vertex(&self, i: usize) -> Point {
        self.vertices[i]
    }

    pub fn edge(&self, i: usize) -> Edge {
        let j = (i + 1) % self.n_vertices();
        Edge {
            start: self.vertices[i],
            end: self.vertices[j],
        }
    }

    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// True if no interior angle exceeds 180°
    pub fn is_convex(&self) -> bool {
        is_convex(&self.vertices)
    }

    /// True if the polygon is an axis-aligned rectangle (collinear vertices allowed)
    pub fn is_axis_aligned_rect(&self) -> bool {
        let corners = self
            .vertices
            .iter()
            .circular_tuple_windows()
            .filter(|(a, b, c)| (**b - **a).cross(&(**c - **b)).abs() > COLLINEAR_EPS)
            .map(|(_, b, _)| *b)
            .collect_vec();

        corners.len() == 4
            && corners
                .iter()
                .circular_tuple_windows()
                .all(|(a, b)| (a.0 - b.0).abs() < COLLINEAR_EPS || (a.1 - b.1).abs() < COLLINEAR_EPS)
    }

    /// Returns a copy translated so that the bounding box minimum lies on the origin
    pub fn normalized_to_origin(&self) -> SPolygon {
        let t = Transformation::from_translation((-self.bbox.x_min, -self.bbox.y_min));
        self.transform_clone(&t)
    }

    pub fn generate_bounding_box(points: &[Point]) -> Result<Rect> {
        let bbox = Rect::bounding_points(points)
            .ok_or_else(|| anyhow::anyhow!("cannot bound an empty point set"))?;
        Rect::try_new(bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max)
    }

    pub fn calculate_diameter(points: &[Point]) -> f64 {
        points
            .iter()
            .tuple_combinations()
            .map(|(p1, p2)| OrderedFloat(p1.sq_distance_to(p2)))
            .max()
            .map_or(0.0, |sq_d| sq_d.0.sqrt())
    }

    //https://en.wikipedia.org/wiki/Shoelace_formula
    //counterclockwise = positive area, clockwise = negative area
    pub fn calculate_area(points: &[Point]) -> f64 {
        let sigma: f64 = points
            .iter()
            .circular_tuple_windows()
            .map(|(p_i, p_j)| p_i.0 * p_j.1 - p_j.0 * p_i.1)
            .sum();
        0.5 * sigma
    }
}

pub(crate) const COLLINEAR_EPS: f64 = 1e-9;

/// True if the (counterclockwise) point sequence never turns clockwise
pub fn is_convex(points: &[Point]) -> bool {
    points
        .iter()
        .circular_tuple_windows()
        .all(|(a, b, c)| (*b - *a).cross(&(*c - *b)) >= -COLLINEAR_EPS)
}

impl Shape for SPolygon {
    fn centroid(&self) -> Point {
        //based on: https://en.wikipedia.org/wiki/Centroid#Of_a_polygon
        let (c_x, c_y) = self
            .vertices
            .iter()
            .circular_tuple_windows()
            .fold((0.0, 0.0), |(c_x, c_y), (Point(x_i, y_i), Point(x_j, y_j))| {
                let cross = x_i * y_j - x_j * y_i;
                (c_x + (x_i + x_j) * cross, c_y + (y_i + y_j) * cross)
            });

        Point(c_x / (6.0 * self.area), c_y / (6.0 * self.area))
    }

    fn area(&self) -> f64 {
        self.area
    }

    fn bbox(&self) -> Rect {
        self.bbox
    }

    fn diameter(&self) -> f64 {
        self.diameter
    }
}

impl Transformable for SPolygon {
    fn transform(&mut self, t: &Transformation) -> &mut Self {
        //destructuring pattern to ensure that the code is updated when the struct changes
        let SPolygon {
            vertices,
            bbox,
            area: _,
            diameter: _,
        } = self;

        vertices.iter_mut().for_each(|v| {
            v.transform(t);
        });
        if let Some(new_bbox) = Rect::bounding_points(vertices) {
            *bbox = new_bbox;
        }
        self
    }
}

impl TransformableFrom for SPolygon {
    fn transform_from(&mut self, reference: &Self, t: &Transformation) -> &mut Self {
        let SPolygon {
            vertices,
            bbox,
            area: _,
            diameter: _,
        } = self;

        for (v, ref_v) in vertices.iter_mut().zip(&reference.vertices) {
            v.transform_from(ref_v, t);
        }
        if let Some(new_bbox) = Rect::bounding_points(vertices) {
            *bbox = new_bbox;
        }
        self
    }
}
