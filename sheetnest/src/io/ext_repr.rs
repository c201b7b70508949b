use serde::{Deserialize, Serialize};

use crate::entities::{Margins, SheetKind};
use crate::geometry::DTransformation;

/// External representation of an [`Instance`](crate::entities::Instance).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExtInstance {
    /// The name of the instance
    #[serde(default)]
    pub name: String,
    pub pieces: Vec<ExtPiece>,
    pub sheets: Vec<ExtSheet>,
    /// Families of interchangeable piece types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub same_type_pieces: Vec<ExtSameTypePiece>,
    /// Piece types that are nested together
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pair_pieces: Vec<ExtPairPiece>,
}

/// External representation of a [`Piece`](crate::entities::Piece).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExtPiece {
    /// Unique identifier of the piece, ids run from 0 to n-1
    pub id: u64,
    pub shape: ExtShape,
    /// Number of times the piece has to be nested
    pub quantity: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_lines: Vec<ExtLine>,
}

/// External representation of a [`Sheet`](crate::entities::Sheet).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExtSheet {
    /// Unique identifier of the sheet, ids run from 0 to n-1
    pub id: u64,
    pub kind: SheetKind,
    pub width: f64,
    /// Required for whole sheets and packages, ignored for strips
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margins: Option<Margins>,
}

/// Various ways to represent a shape
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum ExtShape {
    /// Axis-aligned rectangle. With its left bottom corner at (x_min, y_min), a width and height
    Rectangle {
        x_min: f64,
        y_min: f64,
        width: f64,
        height: f64,
    },
    /// Polygon with a single outer boundary
    SimplePolygon(ExtSPolygon),
}

/// External representation of a [`SPolygon`](crate::geometry::primitives::SPolygon).
/// A polygon with no holes and no self-intersections.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExtSPolygon(pub Vec<(f64, f64)>);

/// A reference line, in the same coordinates as the shape of its piece
#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct ExtLine {
    pub start: (f64, f64),
    pub end: (f64, f64),
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExtSameTypePiece {
    pub id: u64,
    pub piece_ids: Vec<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExtPairPiece {
    pub id: u64,
    pub left: u64,
    pub right: u64,
    pub size: f64,
}

/// Represents a proper rigid transformation defined as a rotation followed by translation
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct ExtTransformation {
    /// The rotation angle in degrees
    pub rotation: f64,
    /// The translation vector (x, y)
    pub translation: (f64, f64),
}

impl From<DTransformation> for ExtTransformation {
    fn from(dt: DTransformation) -> Self {
        ExtTransformation {
            rotation: dt.rotation_deg(),
            translation: dt.translation(),
        }
    }
}
