mod d_transformation;
mod transformation;

pub mod convex_hull;
/// Splitting simple polygons into convex parts
pub mod decompose;
pub mod geo_enums;
pub mod geo_traits;
pub mod primitives;

#[doc(inline)]
pub use d_transformation::DTransformation;
#[doc(inline)]
pub use transformation::Transformation;
