use itertools::Itertools;

use sheetnest::collision_detection::{CollisionShape, Gap, GapRule};
use sheetnest::entities::{Layout, PItemKey};
use sheetnest::geometry::geo_traits::Transformable;
use sheetnest::geometry::primitives::{Point, Rect};
use sheetnest::geometry::{DTransformation, Transformation};

use crate::config::{AdaptiveSpacing, NestConfig, PlacementMode};
use crate::observer::{NestEvent, NestObserver};

mod candidate_point;
mod compaction;
mod rotations;

pub use candidate_point::{CandidatePointStrategy, ScanOrder};
pub use compaction::{CompactionStrategy, slide};
pub use rotations::rotation_set;

/// Identifies units of the same kind, which share geometry and rotation set
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitKey {
    Piece(usize),
    Pair(usize),
}

/// Clearance rule of one unit towards the pieces already on the sheet
#[derive(Clone, Copy, Debug)]
pub struct Spacing {
    pub gap: Gap,
    pub adaptive: AdaptiveSpacing,
    /// Piece type towards which the adaptive relaxation applies.
    /// Only set when the unit consists of a single piece type.
    pub relaxed_for: Option<usize>,
}

impl Spacing {
    pub fn new(config: &NestConfig, left: usize, right: usize) -> Self {
        Spacing {
            gap: config.gap(),
            adaptive: config.adaptive_spacing,
            relaxed_for: (left == right).then_some(left),
        }
    }
}

impl GapRule for Spacing {
    fn gap_to(&self, piece_id: usize) -> Gap {
        match self.relaxed_for == Some(piece_id) {
            true => Gap {
                x: if self.adaptive.horizontal { 0.0 } else { self.gap.x },
                y: if self.adaptive.vertical { 0.0 } else { self.gap.y },
            },
            false => self.gap,
        }
    }

    fn max_gap(&self) -> Gap {
        self.gap
    }
}

/// A unit as the strategies see it: one collision shape in local coordinates
#[derive(Clone, Copy, Debug)]
pub struct PlacementUnit<'a> {
    pub key: UnitKey,
    pub shape: &'a CollisionShape,
    pub spacing: Spacing,
    /// Rotation (radians) aligning the unit's reference line with the feed axis
    pub reference_angle: Option<f64>,
    /// Position of the unit in the nesting order, drives left-right alternation
    pub serial: usize,
    /// Whether the extended rotation set of tail-line mixing is in use
    pub extended: bool,
}

/// Where a unit goes
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Index of the layout
    pub layout: usize,
    /// Rotation (degrees) from the rotation set
    pub rotation: f64,
    /// Transformation applied to the unit's local coordinates
    pub d_transf: DTransformation,
    /// Bounding box of the placed shape
    pub bbox: Rect,
}

/// The unit's shape rotated, with its bounding box minimum moved onto the origin
#[derive(Clone, Debug)]
pub struct Oriented {
    pub rotation: f64,
    pub shape: CollisionShape,
    pub width: f64,
    pub height: f64,
    base: DTransformation,
}

impl Oriented {
    pub fn new(shape: &CollisionShape, rotation: f64) -> Self {
        let bbox = shape
            .transform_clone(&Transformation::from_rotation(rotation.to_radians()))
            .bbox();
        let base = DTransformation::new(rotation.to_radians(), (-bbox.x_min, -bbox.y_min));
        Oriented {
            rotation,
            shape: shape.transform_clone(&base.compose()),
            width: bbox.width(),
            height: bbox.height(),
            base,
        }
    }

    /// Transformation of the unit's local coordinates that puts the bounding box minimum on `(x, y)`
    pub fn d_transf_at(&self, (x, y): (f64, f64)) -> DTransformation {
        let (bx, by) = self.base.translation();
        DTransformation::new(self.base.rotation(), (bx + x, by + y))
    }

    pub fn bbox_at(&self, (x, y): (f64, f64)) -> Rect {
        Rect {
            x_min: x,
            y_min: y,
            x_max: x + self.width,
            y_max: y + self.height,
        }
    }

    pub fn shape_at(&self, (x, y): (f64, f64)) -> CollisionShape {
        self.shape
            .transform_clone(&Transformation::from_translation((x, y)))
    }

    pub fn placement_at(&self, layout: usize, pos: (f64, f64)) -> Placement {
        Placement {
            layout,
            rotation: self.rotation,
            d_transf: self.d_transf_at(pos),
            bbox: self.bbox_at(pos),
        }
    }
}

/// Shared state of one search: the configuration, the observer and the number of collision queries
pub struct SearchContext<'a> {
    pub config: &'a NestConfig,
    pub observer: &'a mut dyn NestObserver,
    pub n_queries: usize,
}

impl<'a> SearchContext<'a> {
    pub fn new(config: &'a NestConfig, observer: &'a mut dyn NestObserver) -> Self {
        SearchContext {
            config,
            observer,
            n_queries: 0,
        }
    }

    /// Bounds check followed by a collision query against the pieces on `layout`
    pub fn fits(&mut self, layout: &Layout, unit: &PlacementUnit, o: &Oriented, pos: (f64, f64)) -> bool {
        let bbox = o.bbox_at(pos);
        if !layout.region.almost_contains(&bbox) {
            return false;
        }
        self.n_queries += 1;
        let collides = layout
            .cde()
            .detect_collision(&o.shape_at(pos), &unit.spacing);
        if collides {
            self.observer.notify(NestEvent::RejectedRect {
                sheet_id: layout.sheet.id,
                rect: bbox,
            });
        }
        !collides
    }

    /// True if the unit fits at `to` and can be moved there in a straight line from `from`
    pub fn fits_along(
        &mut self,
        layout: &Layout,
        unit: &PlacementUnit,
        o: &Oriented,
        from: (f64, f64),
        to: (f64, f64),
    ) -> bool {
        if !self.fits(layout, unit, o, to) {
            return false;
        }
        if from == to {
            return true;
        }
        self.n_queries += 1;
        let swept = o.shape_at(from).swept(Point(to.0 - from.0, to.1 - from.1));
        !layout.cde().detect_collision(&swept, &unit.spacing)
    }
}

/// How units are placed on one layout
#[derive(Clone, Debug)]
pub enum PlacementStrategy {
    CandidatePoint(CandidatePointStrategy),
    Compaction(CompactionStrategy),
}

impl PlacementStrategy {
    /// Strategy for a newly opened layout
    pub fn for_layout(layout: &Layout, config: &NestConfig) -> Self {
        let compaction = match config.placement {
            PlacementMode::Auto => layout.sheet.is_strip(),
            PlacementMode::CandidatePoint => false,
            PlacementMode::Compaction => true,
        };
        match compaction {
            true => PlacementStrategy::Compaction(CompactionStrategy::new(config)),
            false => PlacementStrategy::CandidatePoint(CandidatePointStrategy::new(layout, config)),
        }
    }

    /// Searches a position for `unit` on `layout`, `None` if it does not fit
    pub fn place_one_instance(
        &mut self,
        layout_idx: usize,
        layout: &Layout,
        unit: &PlacementUnit,
        ctx: &mut SearchContext,
    ) -> Option<Placement> {
        match self {
            PlacementStrategy::CandidatePoint(s) => s.place(layout_idx, layout, unit, ctx),
            PlacementStrategy::Compaction(s) => s.place(layout_idx, layout, unit, ctx),
        }
    }

    /// Pushes a feasible placement further down and to the side while it stays feasible
    pub fn compact(
        &self,
        layout: &Layout,
        unit: &PlacementUnit,
        placement: Placement,
        ctx: &mut SearchContext,
    ) -> Placement {
        match self {
            //the compaction strategy already returns compacted placements
            PlacementStrategy::Compaction(_) => placement,
            PlacementStrategy::CandidatePoint(s) => s.compact(layout, unit, placement, ctx),
        }
    }

    /// True if `unit`, transformed by `d_transf`, collides with any of the pieces on `layout`
    pub fn collides_with_others(
        &self,
        layout: &Layout,
        unit: &PlacementUnit,
        d_transf: &DTransformation,
        ctx: &mut SearchContext,
    ) -> bool {
        ctx.n_queries += 1;
        let shape = unit.shape.transform_clone(&d_transf.compose());
        layout.cde().detect_collision(&shape, &unit.spacing)
    }

    /// Informs the strategy that `keys` were just placed on `layout`
    pub fn register(&mut self, layout: &Layout, keys: &[PItemKey], placement: &Placement, gap: Gap) {
        if let PlacementStrategy::CandidatePoint(s) = self {
            s.register(layout, keys, placement, gap)
        }
    }
}

/// Tries the `eligible` layouts in the given order, the first one that fits the unit wins.
/// `None` means the unit needs a new sheet.
pub fn place_on_sheets(
    layouts: &[Layout],
    strategies: &mut [PlacementStrategy],
    eligible: &[usize],
    unit: &PlacementUnit,
    ctx: &mut SearchContext,
) -> Option<Placement> {
    eligible.iter().find_map(|&i| {
        let strategy = &mut strategies[i];
        let placement = strategy.place_one_instance(i, &layouts[i], unit, ctx)?;
        Some(strategy.compact(&layouts[i], unit, placement, ctx))
    })
}

/// Cross-axis positions worth trying on `layout` for a shape of `width`
pub(crate) fn cross_starts(layout: &Layout, width: f64, gap: Gap) -> Vec<f64> {
    let region = layout.region;
    let last = region.x_max - width;
    std::iter::once(region.x_min)
        .chain(
            layout
                .placed_items
                .values()
                .map(|pi| pi.shape.bbox().x_max + gap.x),
        )
        .chain(std::iter::once(last))
        .filter(|x| *x >= region.x_min && *x <= last)
        .sorted_by(f64::total_cmp)
        .dedup()
        .collect_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetnest::geometry::primitives::{Point, SPolygon};
    use sheetnest::util::FPA;

    fn rect_shape(w: f64, h: f64) -> CollisionShape {
        let poly = SPolygon::new(vec![
            Point(0.0, 0.0),
            Point(w, 0.0),
            Point(w, h),
            Point(0.0, h),
        ])
        .unwrap();
        CollisionShape::from_polygon(&poly).unwrap()
    }

    #[test]
    fn oriented_shape_starts_at_the_origin() {
        let shape = rect_shape(4.0, 2.0);
        for rotation in [0.0, 90.0, 180.0, 270.0] {
            let o = Oriented::new(&shape, rotation);
            let bbox = o.shape.bbox();
            assert!(bbox.x_min.abs() < 1e-9 && bbox.y_min.abs() < 1e-9, "{rotation}: {bbox:?}");
            assert!((o.width * o.height - 8.0).abs() < 1e-9);

            //the decomposed transformation reproduces the oriented shape
            let placed = shape.transform_clone(&o.d_transf_at((3.0, 5.0)).compose());
            let expected = o.bbox_at((3.0, 5.0));
            let actual = placed.bbox();
            assert!(
                FPA(actual.x_min) == FPA(expected.x_min)
                    && FPA(actual.y_min) == FPA(expected.y_min)
                    && FPA(actual.x_max) == FPA(expected.x_max)
                    && FPA(actual.y_max) == FPA(expected.y_max),
                "{rotation}: {actual:?} != {expected:?}"
            );
        }
    }

    #[test]
    fn adaptive_spacing_only_relaxes_towards_the_same_type() {
        let config = NestConfig {
            spacing: 2.0,
            adaptive_spacing: AdaptiveSpacing {
                horizontal: true,
                vertical: false,
            },
            ..NestConfig::default()
        };
        let single = Spacing::new(&config, 3, 3);
        assert_eq!(single.gap_to(3), Gap { x: 0.0, y: 2.0 });
        assert_eq!(single.gap_to(4), Gap::uniform(2.0));
        assert_eq!(single.max_gap(), Gap::uniform(2.0));

        let mixed_pair = Spacing::new(&config, 3, 4);
        assert_eq!(mixed_pair.gap_to(3), Gap::uniform(2.0));
    }
}
