use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use anyhow::{Context, Result, ensure};

use crate::collision_detection::CollisionShape;
use crate::geometry::Transformation;
use crate::geometry::geo_traits::Transformable;
use crate::geometry::primitives::{Edge, Rect, SPolygon};

/// A piece type to be cut out of the sheets, `quantity` times.
#[derive(Clone, Debug)]
pub struct Piece {
    pub id: usize,
    /// Contour of the piece. Counterclockwise, with its bounding box minimum on the local origin (the reference point)
    pub shape: Arc<SPolygon>,
    /// Collision shape in local coordinates. Concave pieces are decomposed once, here.
    pub collision_shape: Arc<CollisionShape>,
    /// Number of instances to place
    pub quantity: usize,
    /// Reference lines, in local coordinates
    pub reference_lines: Vec<Edge>,
    /// Whether the contour is an axis-aligned rectangle
    pub is_rect: bool,
    /// Transformation that was applied to the input contour to normalize it
    pub pretransform: Transformation,
}

impl Piece {
    pub fn new(
        id: usize,
        shape: SPolygon,
        quantity: usize,
        reference_lines: Vec<Edge>,
    ) -> Result<Piece> {
        ensure!(
            reference_lines.iter().all(|l| l.length() > 0.0),
            "piece {id} has a zero-length reference line"
        );
        let pretransform = Transformation::from_translation((-shape.bbox.x_min, -shape.bbox.y_min));
        let shape = shape.transform_clone(&pretransform);
        let reference_lines = reference_lines
            .iter()
            .map(|l| l.transform_clone(&pretransform))
            .collect();
        let collision_shape = CollisionShape::from_polygon(&shape)
            .with_context(|| format!("failed to build the collision shape of piece {id}"))?;
        let is_rect = shape.is_axis_aligned_rect();

        Ok(Piece {
            id,
            shape: Arc::new(shape),
            collision_shape: Arc::new(collision_shape),
            quantity,
            reference_lines,
            is_rect,
            pretransform,
        })
    }

    pub fn area(&self) -> f64 {
        self.shape.area
    }

    pub fn bbox(&self) -> Rect {
        self.shape.bbox
    }

    /// Rotation (radians) which aligns the first reference line with the feed axis (+y)
    pub fn reference_angle(&self) -> Option<f64> {
        self.reference_lines.first().map(|l| FRAC_PI_2 - l.angle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::primitives::Point;

    #[test]
    fn contour_is_normalized_to_the_origin() {
        let shape = SPolygon::new(vec![Point(12.0, 5.0), Point(10.0, 9.0), Point(10.0, 5.0)]).unwrap();
        let line = Edge::try_new(Point(10.0, 5.0), Point(12.0, 5.0)).unwrap();
        let piece = Piece::new(0, shape, 3, vec![line]).unwrap();

        assert_eq!((piece.bbox().x_min, piece.bbox().y_min), (0.0, 0.0));
        assert_eq!(piece.collision_shape.bbox(), piece.bbox());
        assert_eq!(piece.reference_lines[0].start, Point(0.0, 0.0));
        assert!((piece.reference_angle().unwrap() - FRAC_PI_2).abs() < 1e-12);
        assert!(!piece.is_rect);
    }
}
