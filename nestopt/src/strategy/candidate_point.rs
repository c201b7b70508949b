use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use log::trace;
use ordered_float::OrderedFloat;

use sheetnest::collision_detection::Gap;
use sheetnest::entities::{Layout, PItemKey};
use sheetnest::geometry::primitives::Point;
use sheetnest::util::FPA;

use crate::config::NestConfig;
use crate::observer::NestEvent;
use crate::strategy::{
    Oriented, Placement, PlacementUnit, SearchContext, UnitKey, rotation_set, slide,
};

/// Corner of a unit's bounding box that is pinned onto an anchor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Corner {
    BottomLeft,
    BottomRight,
    TopLeft,
    TopRight,
}

/// Order in which anchors are scanned
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanOrder {
    /// Bottom to top, left to right within a row
    Vertical,
    /// Left to right, bottom to top within a column
    Horizontal,
    /// Along the diagonal from the bottom-left corner
    Diagonal,
}

type ScanKey = (OrderedFloat<f64>, OrderedFloat<f64>);

impl ScanOrder {
    pub fn from_config(config: &NestConfig, is_strip: bool) -> Self {
        match (is_strip, config.orientation.horizontal, config.orientation.vertical) {
            (true, _, _) => ScanOrder::Vertical,
            (false, true, true) => ScanOrder::Diagonal,
            (false, true, false) => ScanOrder::Horizontal,
            (false, false, _) => ScanOrder::Vertical,
        }
    }

    pub fn key(&self, Point(x, y): Point) -> ScanKey {
        match self {
            ScanOrder::Vertical => (OrderedFloat(y), OrderedFloat(x)),
            ScanOrder::Horizontal => (OrderedFloat(x), OrderedFloat(y)),
            ScanOrder::Diagonal => (OrderedFloat(x + y), OrderedFloat(y)),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Anchor {
    point: Point,
    corner: Corner,
    /// Number of placements on the layout when the anchor was created
    generation: usize,
    key: ScanKey,
}

impl Anchor {
    /// Bounding box minimum of a `width` x `height` box pinned onto this anchor
    fn position(&self, width: f64, height: f64) -> (f64, f64) {
        let Point(x, y) = self.point;
        match self.corner {
            Corner::BottomLeft => (x, y),
            Corner::BottomRight => (x - width, y),
            Corner::TopLeft => (x, y - height),
            Corner::TopRight => (x - width, y - height),
        }
    }
}

/// Anchors of the last placement of a unit kind. Anchors that existed back then and come
/// earlier in the scan were all infeasible for that kind, and stay so as the layout only fills up.
#[derive(Clone, Copy, Debug)]
struct ResumeHint {
    key: ScanKey,
    generation: usize,
}

/// Candidate-point placement: units are pinned onto anchor points derived from the sheet corners and the
/// pieces placed so far. Anchors are scanned in a fixed order, the first feasible one wins.
#[derive(Clone, Debug)]
pub struct CandidatePointStrategy {
    anchors: Vec<Anchor>,
    seen: HashSet<(Point, Corner)>,
    sorted: bool,
    generation: usize,
    hints: HashMap<UnitKey, ResumeHint>,
    scan: ScanOrder,
    min_height: bool,
    step: f64,
    accuracy: f64,
}

impl CandidatePointStrategy {
    pub fn new(layout: &Layout, config: &NestConfig) -> Self {
        let mut strategy = CandidatePointStrategy {
            anchors: vec![],
            seen: HashSet::new(),
            sorted: true,
            generation: 0,
            hints: HashMap::new(),
            scan: ScanOrder::from_config(config, layout.sheet.is_strip()),
            min_height: config.min_height_optimization,
            step: config.compact_step,
            accuracy: config.compact_accuracy,
        };
        let r = layout.region;
        strategy.add_anchor(Point(r.x_min, r.y_min), Corner::BottomLeft);
        strategy.add_anchor(Point(r.x_max, r.y_min), Corner::BottomRight);
        //the top of a strip is only a horizon, nothing should be pinned onto it
        if !layout.sheet.is_strip() {
            strategy.add_anchor(Point(r.x_min, r.y_max), Corner::TopLeft);
            strategy.add_anchor(Point(r.x_max, r.y_max), Corner::TopRight);
        }
        strategy
    }

    pub fn n_anchors(&self) -> usize {
        self.anchors.len()
    }

    fn add_anchor(&mut self, point: Point, corner: Corner) {
        if self.seen.insert((point, corner)) {
            self.anchors.push(Anchor {
                point,
                corner,
                generation: self.generation,
                key: self.scan.key(point),
            });
            self.sorted = false;
        }
    }

    fn sort_anchors(&mut self) {
        if !self.sorted {
            //stable, anchors with equal keys keep their insertion order
            self.anchors.sort_by_key(|a| a.key);
            self.sorted = true;
        }
    }

    pub fn place(
        &mut self,
        layout_idx: usize,
        layout: &Layout,
        unit: &PlacementUnit,
        ctx: &mut SearchContext,
    ) -> Option<Placement> {
        self.sort_anchors();
        let orientations = rotation_set(unit, &layout.sheet, ctx.config)
            .into_iter()
            .map(|r| Oriented::new(unit.shape, r))
            .collect_vec();

        let hint = match unit.extended {
            true => None,
            false => self.hints.get(&unit.key).copied(),
        };
        let stale = |a: &Anchor| hint.is_some_and(|h| a.generation <= h.generation && a.key < h.key);
        let sheet_id = layout.sheet.id;

        let (placement, first_feasible_key) = match self.min_height {
            false => {
                let mut found = None;
                'anchors: for anchor in self.anchors.iter().filter(|a| !stale(a)) {
                    ctx.observer.notify(NestEvent::Probe {
                        sheet_id,
                        point: anchor.point,
                    });
                    for o in &orientations {
                        let pos = anchor.position(o.width, o.height);
                        if ctx.fits(layout, unit, o, pos) {
                            found = Some((o.placement_at(layout_idx, pos), anchor.key));
                            break 'anchors;
                        }
                    }
                }
                found?
            }
            true => {
                //every rotation takes its first feasible anchor, the lowest top edge wins
                let mut best: Option<(FPA, Placement)> = None;
                let mut first_key: Option<ScanKey> = None;
                for o in &orientations {
                    let hit = self.anchors.iter().filter(|a| !stale(a)).find_map(|anchor| {
                        ctx.observer.notify(NestEvent::Probe {
                            sheet_id,
                            point: anchor.point,
                        });
                        let pos = anchor.position(o.width, o.height);
                        ctx.fits(layout, unit, o, pos).then_some((pos, anchor.key))
                    });
                    if let Some((pos, key)) = hit {
                        first_key = Some(first_key.map_or(key, |k| k.min(key)));
                        let extent = FPA(pos.1 + o.height);
                        if best.as_ref().is_none_or(|(e, _)| extent < *e) {
                            best = Some((extent, o.placement_at(layout_idx, pos)));
                        }
                    }
                }
                match (best, first_key) {
                    (Some((_, placement)), Some(key)) => (placement, key),
                    _ => return None,
                }
            }
        };

        if !unit.extended {
            self.hints.insert(
                unit.key,
                ResumeHint {
                    key: first_feasible_key,
                    generation: self.generation,
                },
            );
        }
        Some(placement)
    }

    /// Slides a placement down and then to the left while it stays feasible
    pub fn compact(
        &self,
        layout: &Layout,
        unit: &PlacementUnit,
        placement: Placement,
        ctx: &mut SearchContext,
    ) -> Placement {
        let o = Oriented::new(unit.shape, placement.rotation);
        let region = layout.region;
        let (x, y) = (placement.bbox.x_min, placement.bbox.y_min);

        let (x, y) = match self.scan {
            ScanOrder::Horizontal => {
                let x = slide(x, region.x_min, self.step, self.accuracy, |from, to| {
                    ctx.fits_along(layout, unit, &o, (from, y), (to, y))
                })
                .unwrap_or(x);
                let y = slide(y, region.y_min, self.step, self.accuracy, |from, to| {
                    ctx.fits_along(layout, unit, &o, (x, from), (x, to))
                })
                .unwrap_or(y);
                (x, y)
            }
            ScanOrder::Vertical | ScanOrder::Diagonal => {
                let y = slide(y, region.y_min, self.step, self.accuracy, |from, to| {
                    ctx.fits_along(layout, unit, &o, (x, from), (x, to))
                })
                .unwrap_or(y);
                let x = slide(x, region.x_min, self.step, self.accuracy, |from, to| {
                    ctx.fits_along(layout, unit, &o, (from, y), (to, y))
                })
                .unwrap_or(x);
                (x, y)
            }
        };

        if (x, y) != (placement.bbox.x_min, placement.bbox.y_min) {
            trace!(
                "[CP] compacted {:?} from ({}, {}) to ({x}, {y})",
                unit.key,
                placement.bbox.x_min,
                placement.bbox.y_min
            );
        }
        o.placement_at(placement.layout, (x, y))
    }

    /// Derives new anchors from the pieces that were just placed
    pub fn register(&mut self, layout: &Layout, keys: &[PItemKey], placement: &Placement, gap: Gap) {
        self.generation += 1;
        let region = layout.region;
        let bbox = placement.bbox;
        let inside = |p: &Point| p.0 < region.x_max && p.1 < region.y_max;

        let new_points = [
            Point(bbox.x_max + gap.x, bbox.y_min),
            Point(bbox.x_min, bbox.y_max + gap.y),
        ]
        .into_iter()
        .chain(
            keys.iter()
                .flat_map(|k| layout.placed_items[*k].outline.vertices.iter().copied()),
        )
        .filter(inside)
        .collect_vec();

        for p in new_points {
            self.add_anchor(p, Corner::BottomLeft);
        }
    }
}

#[cfg(test)]
mod tests {
    use sheetnest::entities::{Margins, Piece, Sheet, SheetKind};
    use sheetnest::geometry::primitives::SPolygon;

    use super::*;
    use crate::observer::Silent;
    use crate::strategy::Spacing;

    fn square_piece(id: usize, size: f64) -> Piece {
        let poly = SPolygon::new(vec![
            Point(0.0, 0.0),
            Point(size, 0.0),
            Point(size, size),
            Point(0.0, size),
        ])
        .unwrap();
        Piece::new(id, poly, 1, vec![]).unwrap()
    }

    fn whole_layout(width: f64, height: f64, config: &NestConfig) -> Layout {
        let sheet = Sheet::new(0, SheetKind::Whole, width, Some(height), Margins::default()).unwrap();
        Layout::new(sheet, 0.0, config.cde_config)
    }

    fn unit<'a>(piece: &'a Piece, config: &NestConfig, serial: usize) -> PlacementUnit<'a> {
        PlacementUnit {
            key: UnitKey::Piece(piece.id),
            shape: &piece.collision_shape,
            spacing: Spacing::new(config, piece.id, piece.id),
            reference_angle: None,
            serial,
            extended: false,
        }
    }

    fn place_all(config: &NestConfig, layout: &mut Layout, piece: &Piece, n: usize) -> Vec<Option<Placement>> {
        let mut strategy = CandidatePointStrategy::new(layout, config);
        let mut observer = Silent;
        let mut ctx = SearchContext::new(config, &mut observer);
        (0..n)
            .map(|i| {
                let u = unit(piece, config, i);
                let placement = strategy.place(0, layout, &u, &mut ctx)?;
                let keys = [layout.place_item(piece, i, placement.d_transf, None)];
                strategy.register(layout, &keys, &placement, config.gap());
                Some(placement)
            })
            .collect_vec()
    }

    #[test]
    fn squares_fill_rows_bottom_up() {
        let config = NestConfig::default();
        let mut layout = whole_layout(25.0, 20.0, &config);
        let piece = square_piece(0, 10.0);

        let placements = place_all(&config, &mut layout, &piece, 5);
        let corners = placements
            .iter()
            .map(|p| p.map(|p| (p.bbox.x_min, p.bbox.y_min)))
            .collect_vec();
        assert_eq!(
            corners,
            vec![
                Some((0.0, 0.0)),
                Some((10.0, 0.0)),
                Some((0.0, 10.0)),
                Some((10.0, 10.0)),
                None
            ]
        );
        assert!(layout.is_feasible());
    }

    #[test]
    fn horizontal_orientation_fills_columns_first() {
        let config = NestConfig {
            orientation: crate::config::Orientation {
                horizontal: true,
                vertical: false,
            },
            ..NestConfig::default()
        };
        let mut layout = whole_layout(25.0, 20.0, &config);
        let piece = square_piece(0, 10.0);
        let placements = place_all(&config, &mut layout, &piece, 2);
        assert_eq!(placements[1].map(|p| (p.bbox.x_min, p.bbox.y_min)), Some((0.0, 10.0)));
    }

    #[test]
    fn spacing_is_kept_between_pieces() {
        let config = NestConfig {
            spacing: 1.0,
            ..NestConfig::default()
        };
        let mut layout = whole_layout(25.0, 10.0, &config);
        let piece = square_piece(0, 10.0);
        let placements = place_all(&config, &mut layout, &piece, 3);
        assert_eq!(placements[1].map(|p| p.bbox.x_min), Some(11.0));
        assert_eq!(placements[2], None);
    }

    #[test]
    fn min_height_prefers_the_flattest_rotation() {
        let config = NestConfig {
            rotatable: true,
            max_rotate_angle: 90.0,
            min_height_optimization: true,
            ..NestConfig::default()
        };
        let mut layout = whole_layout(30.0, 30.0, &config);
        let tall = SPolygon::new(vec![
            Point(0.0, 0.0),
            Point(4.0, 0.0),
            Point(4.0, 12.0),
            Point(0.0, 12.0),
        ])
        .unwrap();
        let piece = Piece::new(0, tall, 1, vec![]).unwrap();
        let placement = place_all(&config, &mut layout, &piece, 1)[0].unwrap();
        assert_eq!(placement.rotation, 90.0);
        assert!((placement.bbox.height() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn anchors_are_deduplicated() {
        let config = NestConfig::default();
        let layout = whole_layout(25.0, 20.0, &config);
        let mut strategy = CandidatePointStrategy::new(&layout, &config);
        assert_eq!(strategy.n_anchors(), 4);
        strategy.add_anchor(Point(0.0, 0.0), Corner::BottomLeft);
        assert_eq!(strategy.n_anchors(), 4);
        strategy.add_anchor(Point(0.0, 0.0), Corner::TopLeft);
        assert_eq!(strategy.n_anchors(), 5);
    }
}
