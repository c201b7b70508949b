use slotmap::SlotMap;

use crate::collision_detection::CDEngine;
use crate::entities::{PItemKey, Piece, PlacedItem, PlacedPiece, Sheet};
use crate::geometry::DTransformation;
use crate::geometry::primitives::Rect;
use crate::util::{CDEConfig, assertions};

/// Pieces placed on a single [`Sheet`].
/// Each layout maintains a [`CDEngine`], which is used to check for collisions before placing pieces.
#[derive(Clone, Debug)]
pub struct Layout {
    pub sheet: Sheet,
    /// Region in which pieces may be placed, see [`Sheet::usable_rect`]
    pub region: Rect,
    /// All the pieces placed in this layout, indexed by a unique key
    pub placed_items: SlotMap<PItemKey, PlacedItem>,
    cde: CDEngine,
}

impl Layout {
    pub fn new(sheet: Sheet, strip_horizon: f64, cde_config: CDEConfig) -> Self {
        let region = sheet.usable_rect(strip_horizon);
        Layout {
            sheet,
            region,
            placed_items: SlotMap::with_key(),
            cde: CDEngine::new(region, cde_config),
        }
    }

    /// Places an instance of `piece` and registers it in the collision detection engine
    pub fn place_item(
        &mut self,
        piece: &Piece,
        instance: usize,
        d_transf: DTransformation,
        pair_id: Option<usize>,
    ) -> PItemKey {
        let pk = self
            .placed_items
            .insert(PlacedItem::new(piece, instance, d_transf, pair_id));
        let pi = &self.placed_items[pk];
        self.cde.register(pk, pi.piece_id, pi.shape.clone());

        debug_assert!(assertions::item_in_bounds(pi, &self.region));

        pk
    }

    /// True if no pieces are placed
    pub fn is_empty(&self) -> bool {
        self.placed_items.is_empty()
    }

    pub fn n_placed(&self) -> usize {
        self.placed_items.len()
    }

    /// Returns the collision detection engine for this layout
    pub fn cde(&self) -> &CDEngine {
        &self.cde
    }

    /// Total area of the placed pieces
    pub fn placed_area(&self) -> f64 {
        self.placed_items.values().map(|pi| pi.area).sum()
    }

    /// Bounding box of everything placed so far
    pub fn occupied_bbox(&self) -> Option<Rect> {
        self.placed_items
            .values()
            .map(|pi| pi.shape.bbox())
            .reduce(Rect::bounding_rect)
    }

    /// Length of material used along the feed axis, measured from the start of the usable region
    pub fn used_length(&self) -> f64 {
        self.occupied_bbox()
            .map_or(0.0, |bbox| bbox.y_max - self.region.y_min)
    }

    /// True if any placed piece belongs to one of the given piece types
    pub fn holds_any_of(&self, piece_ids: &[usize]) -> bool {
        self.placed_items
            .values()
            .any(|pi| piece_ids.contains(&pi.piece_id))
    }

    /// Output records of all placed pieces, ordered by instance index
    pub fn placed_pieces(&self) -> Vec<PlacedPiece> {
        let mut placed = self
            .placed_items
            .values()
            .map(|pi| PlacedPiece {
                piece_id: pi.piece_id,
                sheet_id: Some(self.sheet.id),
                instance: pi.instance,
                position: pi.d_transf.translation(),
                rotation: pi.d_transf.rotation_deg(),
                placed: true,
                pair_id: pi.pair_id,
            })
            .collect::<Vec<_>>();
        placed.sort_by_key(|p| p.instance);
        placed
    }

    /// Returns true if all the pieces are placed within bounds and without colliding
    pub fn is_feasible(&self) -> bool {
        assertions::layout_is_collision_free(self)
            && self
                .placed_items
                .values()
                .all(|pi| assertions::item_in_bounds(pi, &self.region))
    }
}
