use slotmap::new_key_type;

use crate::collision_detection::CollisionShape;
use crate::entities::Piece;
use crate::geometry::DTransformation;
use crate::geometry::geo_traits::Transformable;
use crate::geometry::primitives::SPolygon;

new_key_type! {
    /// Unique key for each [`PlacedItem`] in a layout.
    pub struct PItemKey;
}

/// Instance of a [`Piece`] placed on a sheet.
#[derive(Clone, Debug)]
pub struct PlacedItem {
    pub piece_id: usize,
    /// Index of the instance in the flattened instance list
    pub instance: usize,
    /// Rotation followed by translation, applied to the piece's local coordinates
    pub d_transf: DTransformation,
    /// Collision shape in sheet coordinates
    pub shape: CollisionShape,
    /// Contour in sheet coordinates
    pub outline: SPolygon,
    /// Area of the piece
    pub area: f64,
    /// The pair this instance was nested in, if any
    pub pair_id: Option<usize>,
}

impl PlacedItem {
    pub fn new(
        piece: &Piece,
        instance: usize,
        d_transf: DTransformation,
        pair_id: Option<usize>,
    ) -> Self {
        let t = d_transf.compose();
        PlacedItem {
            piece_id: piece.id,
            instance,
            d_transf,
            shape: piece.collision_shape.transform_clone(&t),
            outline: piece.shape.transform_clone(&t),
            area: piece.area(),
            pair_id,
        }
    }
}
