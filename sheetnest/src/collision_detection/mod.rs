mod cd_engine;
/// Overlap tests between collision shapes
pub mod sat;
mod shape;

/// Quadtree used as a spatial pre-filter
pub mod quadtree;

#[doc(inline)]
pub use cd_engine::{CDEngine, GapRule, RegisteredShape};
#[doc(inline)]
pub use sat::{Gap, overlaps, overlaps_with_gap};
#[doc(inline)]
pub use shape::{CollisionShape, ConcavePolygon, ConvexPolygon};
