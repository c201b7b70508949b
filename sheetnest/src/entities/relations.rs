use serde::{Deserialize, Serialize};

/// Family of piece types (same shape, different size) which may be substituted for one another
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SameTypePiece {
    pub id: usize,
    pub piece_ids: Vec<usize>,
}

impl SameTypePiece {
    pub fn contains(&self, piece_id: usize) -> bool {
        self.piece_ids.contains(&piece_id)
    }
}

/// Two piece types which are nested together as one compound unit, `right` rotated head to head against `left`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PairPiece {
    pub id: usize,
    pub left: usize,
    pub right: usize,
    /// Nominal size label of the pair
    pub size: f64,
}
