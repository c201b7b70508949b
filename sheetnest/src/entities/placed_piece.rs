use serde::{Deserialize, Serialize};

/// Outcome of the attempt to place one instance of a piece.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedPiece {
    pub piece_id: usize,
    /// Sheet the instance ended up on, `None` if it could not be placed
    pub sheet_id: Option<usize>,
    /// Index of the instance in the flattened instance list
    pub instance: usize,
    /// Translation applied to the reference point (bounding box minimum of the normalized piece)
    pub position: (f64, f64),
    /// Rotation in degrees, counterclockwise
    pub rotation: f64,
    pub placed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair_id: Option<usize>,
}

impl PlacedPiece {
    pub fn unplaced(piece_id: usize, instance: usize) -> Self {
        PlacedPiece {
            piece_id,
            sheet_id: None,
            instance,
            position: (0.0, 0.0),
            rotation: 0.0,
            placed: false,
            pair_id: None,
        }
    }
}
