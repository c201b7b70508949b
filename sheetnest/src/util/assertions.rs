//! Consistency checks, mostly used in `debug_assert!` statements and tests.

use itertools::Itertools;
use log::error;

use crate::collision_detection::{CDEngine, Gap, overlaps, overlaps_with_gap};
use crate::entities::{Layout, PlacedItem};
use crate::geometry::geo_traits::CollidesWith;
use crate::geometry::primitives::Rect;

/// True if the bounding box of the placed item lies within `region`
pub fn item_in_bounds(pi: &PlacedItem, region: &Rect) -> bool {
    let contained = region.almost_contains(&pi.shape.bbox());
    if !contained {
        error!(
            "piece {} (instance {}) lies outside of {region:?}: {:?}",
            pi.piece_id,
            pi.instance,
            pi.shape.bbox()
        );
    }
    contained
}

/// True if no two placed items of the layout overlap, checked exhaustively without the quadtree
pub fn layout_is_collision_free(layout: &Layout) -> bool {
    let colliding = layout
        .placed_items
        .iter()
        .tuple_combinations()
        .find(|((_, a), (_, b))| overlaps(&a.shape, &b.shape));

    match colliding {
        Some(((k1, a), (k2, b))) => {
            error!(
                "collision between {k1:?} (piece {}) and {k2:?} (piece {}) on sheet {}",
                a.piece_id, b.piece_id, layout.sheet.id
            );
            false
        }
        None => true,
    }
}

/// True if every registered shape that overlaps `region` is reported by the quadtree
pub fn quadtree_query_complete(cde: &CDEngine, region: &Rect) -> bool {
    let found = cde.quadtree.query(region);
    cde.registered
        .iter()
        .filter(|(_, reg)| reg.shape.bbox().collides_with(region))
        .all(|(key, _)| found.contains(&key))
}

/// True if the layout respects `gap` between all pairs of placed items for which `gap_applies` holds
pub fn layout_respects_gap(
    layout: &Layout,
    gap: Gap,
    gap_applies: impl Fn(&PlacedItem, &PlacedItem) -> bool,
) -> bool {
    layout
        .placed_items
        .values()
        .tuple_combinations()
        .filter(|(a, b)| gap_applies(a, b))
        .all(|(a, b)| !overlaps_with_gap(&a.shape, &b.shape, gap))
}
