use slotmap::SecondaryMap;

use crate::collision_detection::quadtree::QTNode;
use crate::collision_detection::sat::{Gap, overlaps_with_gap};
use crate::collision_detection::shape::CollisionShape;
use crate::entities::PItemKey;
use crate::geometry::primitives::Rect;
use crate::util::CDEConfig;

/// Decides how much clearance a shape under test must keep from each registered shape.
pub trait GapRule {
    /// Clearance required towards a registered shape belonging to piece type `piece_id`
    fn gap_to(&self, piece_id: usize) -> Gap;

    /// Upper bound of every clearance [`GapRule::gap_to`] can return
    fn max_gap(&self) -> Gap;
}

impl GapRule for Gap {
    fn gap_to(&self, _piece_id: usize) -> Gap {
        *self
    }

    fn max_gap(&self) -> Gap {
        *self
    }
}

/// A shape registered in the [`CDEngine`]
#[derive(Clone, Debug)]
pub struct RegisteredShape {
    /// Piece type the shape belongs to
    pub piece_id: usize,
    pub shape: CollisionShape,
}

/// The Collision Detection Engine (CDE) of a single sheet.
/// Shapes of placed pieces are registered in it, after which candidate shapes can be tested against all of them.
/// A quadtree over the bounding boxes acts as a pre-filter, the exact verdict is always given by [`overlaps_with_gap`].
#[derive(Clone, Debug)]
pub struct CDEngine {
    pub quadtree: QTNode<PItemKey>,
    pub registered: SecondaryMap<PItemKey, RegisteredShape>,
    pub config: CDEConfig,
    pub bbox: Rect,
}

impl CDEngine {
    pub fn new(bbox: Rect, config: CDEConfig) -> CDEngine {
        CDEngine {
            quadtree: QTNode::new(
                config.quadtree_depth,
                bbox,
                config.quadtree_split_threshold,
            ),
            registered: SecondaryMap::new(),
            config,
            bbox,
        }
    }

    /// Registers the shape of a placed piece
    pub fn register(&mut self, key: PItemKey, piece_id: usize, shape: CollisionShape) {
        debug_assert!(
            !self.registered.contains_key(key),
            "shape already registered"
        );
        self.quadtree.insert(key, shape.bbox());
        self.registered.insert(key, RegisteredShape { piece_id, shape });
    }

    /// True if `shape` overlaps any registered shape, or violates the clearance demanded by `rule`
    pub fn detect_collision(&self, shape: &CollisionShape, rule: &impl GapRule) -> bool {
        self.candidates(shape, rule).any(|(_, reg)| {
            overlaps_with_gap(shape, &reg.shape, rule.gap_to(reg.piece_id))
        })
    }

    /// Keys of all registered shapes that collide with `shape` under `rule`
    pub fn collect_collisions(&self, shape: &CollisionShape, rule: &impl GapRule) -> Vec<PItemKey> {
        self.candidates(shape, rule)
            .filter(|(_, reg)| overlaps_with_gap(shape, &reg.shape, rule.gap_to(reg.piece_id)))
            .map(|(key, _)| key)
            .collect()
    }

    fn candidates<'a>(
        &'a self,
        shape: &CollisionShape,
        rule: &impl GapRule,
    ) -> impl Iterator<Item = (PItemKey, &'a RegisteredShape)> {
        let reach = rule.max_gap();
        let region = shape.bbox().inflate(reach.x, reach.y);
        self.quadtree
            .query(&region)
            .into_iter()
            .filter_map(move |key| self.registered.get(key).map(|reg| (key, reg)))
    }

    pub fn n_registered(&self) -> usize {
        self.registered.len()
    }

    /// Removes all registered shapes
    pub fn clear(&mut self) {
        self.quadtree.clear();
        self.registered.clear();
    }
}

#[cfg(test)]
mod tests {
    use rand::prelude::SmallRng;
    use rand::{Rng, SeedableRng};
    use slotmap::SlotMap;

    use super::*;
    use crate::collision_detection::shape::ConvexPolygon;
    use crate::geometry::primitives::Point;
    use crate::util::assertions::quadtree_query_complete;

    fn square(x: f64, y: f64, size: f64) -> CollisionShape {
        CollisionShape::Convex(ConvexPolygon::new(vec![
            Point(x, y),
            Point(x + size, y),
            Point(x + size, y + size),
            Point(x, y + size),
        ]))
    }

    /// Zero gap between shapes of the same piece type, `gap` otherwise
    struct SameTypeFlush {
        piece_id: usize,
        gap: Gap,
    }

    impl GapRule for SameTypeFlush {
        fn gap_to(&self, piece_id: usize) -> Gap {
            match piece_id == self.piece_id {
                true => Gap::ZERO,
                false => self.gap,
            }
        }

        fn max_gap(&self) -> Gap {
            self.gap
        }
    }

    #[test]
    fn registered_shapes_are_detected() {
        let mut keys: SlotMap<PItemKey, ()> = SlotMap::with_key();
        let mut cde = CDEngine::new(
            Rect::try_new(0.0, 0.0, 100.0, 100.0).unwrap(),
            CDEConfig::default(),
        );
        for i in 0..10 {
            let x = (i * 10) as f64;
            cde.register(keys.insert(()), 0, square(x, 0.0, 10.0));
        }
        assert_eq!(cde.n_registered(), 10);

        assert!(cde.detect_collision(&square(15.0, 5.0, 2.0), &Gap::ZERO));
        assert!(!cde.detect_collision(&square(15.0, 10.0, 2.0), &Gap::ZERO));
        assert!(cde.detect_collision(&square(15.0, 10.0, 2.0), &Gap::uniform(1.0)));
        //overlapping the border between two squares
        assert_eq!(cde.collect_collisions(&square(19.0, 5.0, 2.0), &Gap::ZERO).len(), 2);

        cde.clear();
        assert_eq!(cde.n_registered(), 0);
        assert!(!cde.detect_collision(&square(15.0, 5.0, 2.0), &Gap::ZERO));
    }

    #[test]
    fn quadtree_prefilter_misses_nothing() {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut keys: SlotMap<PItemKey, ()> = SlotMap::with_key();
        let config = CDEConfig {
            quadtree_depth: 5,
            quadtree_split_threshold: 2,
        };
        let mut cde = CDEngine::new(Rect::try_new(0.0, 0.0, 100.0, 100.0).unwrap(), config);
        for _ in 0..200 {
            let (x, y) = (rng.random_range(0.0..95.0), rng.random_range(0.0..95.0));
            cde.register(keys.insert(()), 0, square(x, y, rng.random_range(0.5..5.0)));
        }
        for _ in 0..100 {
            let (x, y) = (rng.random_range(0.0..90.0), rng.random_range(0.0..90.0));
            let region = Rect::try_new(x, y, x + rng.random_range(0.1..10.0), y + rng.random_range(0.1..10.0)).unwrap();
            assert!(quadtree_query_complete(&cde, &region), "{region:?}");
        }
    }

    #[test]
    fn gap_rule_is_applied_per_piece_type() {
        let mut keys: SlotMap<PItemKey, ()> = SlotMap::with_key();
        let mut cde = CDEngine::new(
            Rect::try_new(0.0, 0.0, 100.0, 100.0).unwrap(),
            CDEConfig::default(),
        );
        cde.register(keys.insert(()), 7, square(0.0, 0.0, 10.0));

        let candidate = square(10.0, 0.0, 10.0);
        let same_type = SameTypeFlush {
            piece_id: 7,
            gap: Gap::uniform(2.0),
        };
        let other_type = SameTypeFlush {
            piece_id: 3,
            gap: Gap::uniform(2.0),
        };
        assert!(!cde.detect_collision(&candidate, &same_type));
        assert!(cde.detect_collision(&candidate, &other_type));
    }
}
