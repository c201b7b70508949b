#[derive(Debug, PartialEq, Clone, Copy)]
/// Possible relations between two geometric entities A and B.
/// A is `GeoRelation` to B
pub enum GeoRelation {
    /// A ∩ B ≠ ∅ and neither A ⊆ B nor B ⊆ A
    Intersecting,
    /// A ⊆ B
    Enclosed,
    /// B ⊆ A
    Surrounding,
    /// A ∩ B = ∅
    Disjoint,
}

/// Orientation of a closed point sequence
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Winding {
    Clockwise,
    CounterClockwise,
    /// Zero signed area, all points (nearly) on a line
    Collinear,
}

impl Winding {
    pub fn from_signed_area(signed_area: f64) -> Self {
        match signed_area {
            a if a.abs() <= f64::EPSILON => Winding::Collinear,
            a if a < 0.0 => Winding::Clockwise,
            _ => Winding::CounterClockwise,
        }
    }
}
