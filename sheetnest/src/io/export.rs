use itertools::Itertools;

use crate::entities::{Instance, Layout, Piece, PlacedItem};
use crate::geometry::DTransformation;
use crate::io::ext_repr::ExtTransformation;

/// Transformations to apply to the pieces as they were given in the input, for every item of the layout
pub fn export_placed_items(layout: &Layout, instance: &Instance) -> Vec<(usize, ExtTransformation)> {
    layout
        .placed_items
        .values()
        .sorted_by_key(|pi| pi.instance)
        .map(|pi| (pi.piece_id, ext_transformation(pi, instance.piece(pi.piece_id))))
        .collect()
}

fn ext_transformation(pi: &PlacedItem, piece: &Piece) -> ExtTransformation {
    int_to_ext_transformation(&pi.d_transf, piece).into()
}

/// Converts an internal transformation (applicable to the normalized piece) to one applicable to the input contour.
pub fn int_to_ext_transformation(int_transf: &DTransformation, piece: &Piece) -> DTransformation {
    //1. do the normalization
    //2. do the internal transformation
    piece
        .pretransform
        .clone()
        .transform(&int_transf.compose())
        .decompose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Transformation;
    use crate::geometry::geo_traits::Transformable;
    use crate::geometry::primitives::{Point, SPolygon};

    #[test]
    fn ext_transformation_maps_input_contour_onto_placement() {
        let input = SPolygon::new(vec![Point(5.0, 5.0), Point(9.0, 5.0), Point(9.0, 7.0), Point(5.0, 7.0)]).unwrap();
        let piece = Piece::new(0, input.clone(), 1, vec![]).unwrap();
        let dt = DTransformation::new(90f64.to_radians(), (10.0, 0.0));

        let placed = piece.shape.transform_clone(&dt.compose());
        let ext = int_to_ext_transformation(&dt, &piece);
        let from_input = input.transform_clone(&Transformation::from(ext));

        for (a, b) in placed.vertices.iter().zip(from_input.vertices.iter()) {
            assert!(a.distance_to(b) < 1e-9, "{a:?} != {b:?}");
        }
    }
}
