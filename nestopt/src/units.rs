use std::cmp::Reverse;
use std::f64::consts::PI;

use anyhow::{Result, bail};
use itertools::Itertools;
use log::debug;
use ordered_float::OrderedFloat;

use sheetnest::collision_detection::{CollisionShape, GapRule, overlaps_with_gap};
use sheetnest::entities::{Instance, PairPiece};
use sheetnest::geometry::geo_traits::Transformable;
use sheetnest::geometry::primitives::Point;
use sheetnest::geometry::{DTransformation, Transformation};

use crate::config::NestConfig;
use crate::strategy::{Spacing, UnitKey, slide};

/// Contiguous range `[start, end)` of the flattened instance list occupied by one piece type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PieceIndexRange {
    pub piece_id: usize,
    pub start: usize,
    pub end: usize,
}

impl PieceIndexRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..self.end).contains(&index)
    }
}

/// Flattens the instance: every piece type is repeated `quantity` times.
/// Types are ordered by descending area when `size_down` is set, by input order otherwise.
pub fn index_ranges(instance: &Instance, size_down: bool) -> Vec<PieceIndexRange> {
    let order = match size_down {
        true => instance
            .pieces
            .iter()
            .sorted_by_key(|p| Reverse(OrderedFloat(p.area())))
            .map(|p| p.id)
            .collect_vec(),
        false => instance.pieces.iter().map(|p| p.id).collect_vec(),
    };
    let mut start = 0;
    order
        .into_iter()
        .map(|piece_id| {
            let end = start + instance.piece(piece_id).quantity;
            let range = PieceIndexRange {
                piece_id,
                start,
                end,
            };
            start = end;
            range
        })
        .collect_vec()
}

/// What is nested in one go: a single instance or two instances forming a pair
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NestUnit {
    Single {
        piece_id: usize,
        instance: usize,
    },
    Pair {
        pair_id: usize,
        /// Piece type and instance index of the left member
        left: (usize, usize),
        right: (usize, usize),
    },
}

impl NestUnit {
    pub fn key(&self) -> UnitKey {
        match self {
            NestUnit::Single { piece_id, .. } => UnitKey::Piece(*piece_id),
            NestUnit::Pair { pair_id, .. } => UnitKey::Pair(*pair_id),
        }
    }

    /// (piece type, instance index) of every member
    pub fn members(&self) -> Vec<(usize, usize)> {
        match self {
            NestUnit::Single { piece_id, instance } => vec![(*piece_id, *instance)],
            NestUnit::Pair { left, right, .. } => vec![*left, *right],
        }
    }

    pub fn n_instances(&self) -> usize {
        match self {
            NestUnit::Single { .. } => 1,
            NestUnit::Pair { .. } => 2,
        }
    }

    pub fn area(&self, instance: &Instance) -> f64 {
        self.members()
            .iter()
            .map(|(piece_id, _)| instance.piece(*piece_id).area())
            .sum()
    }

    /// Piece type whose same-type family governs mixing
    pub fn primary_piece(&self) -> usize {
        match self {
            NestUnit::Single { piece_id, .. } => *piece_id,
            NestUnit::Pair { left, .. } => left.0,
        }
    }
}

/// Groups the instances into units, in nesting order.
/// Pairs come first (pairwise nest types only), the leftover instances become singles.
pub fn build_units(instance: &Instance, ranges: &[PieceIndexRange], config: &NestConfig) -> Vec<NestUnit> {
    //next unused instance index and end of the range, per piece type
    let mut next = vec![(0, 0); instance.pieces.len()];
    for r in ranges {
        next[r.piece_id] = (r.start, r.end);
    }

    let mut pairs = vec![];
    if config.nest_type.is_pairwise() {
        for pair in &instance.pair_pieces {
            while let Some((left, right)) = take_pair(&mut next, pair.left, pair.right) {
                pairs.push((
                    pair,
                    NestUnit::Pair {
                        pair_id: pair.id,
                        left: (pair.left, left),
                        right: (pair.right, right),
                    },
                ));
            }
        }
    }

    let singles = ranges
        .iter()
        .flat_map(|r| (next[r.piece_id].0..r.end).map(move |i| (r.piece_id, i)))
        .map(|(piece_id, instance)| NestUnit::Single { piece_id, instance })
        .collect_vec();

    if config.strategies.size_down {
        pairs.sort_by_key(|(pair, unit)| {
            (
                Reverse(OrderedFloat(pair.size)),
                Reverse(OrderedFloat(unit.area(instance))),
            )
        });
    }

    pairs
        .into_iter()
        .map(|(_, unit)| unit)
        .chain(singles)
        .collect_vec()
}

/// Takes an unused instance of both `left` and `right`, if both are available
fn take_pair(next: &mut [(usize, usize)], left: usize, right: usize) -> Option<(usize, usize)> {
    let needed = |id: usize| if left == right && id == left { 2 } else { 1 };
    let available = |(cur, end): (usize, usize), n: usize| end - cur >= n;
    if !available(next[left], needed(left)) || !available(next[right], needed(right)) {
        return None;
    }
    let l = next[left].0;
    next[left].0 += 1;
    let r = next[right].0;
    next[right].0 += 1;
    Some((l, r))
}

/// Geometry of a pair: `left` unrotated on the origin, `right` rotated by 180° and pushed against it
#[derive(Clone, Debug)]
pub struct PairCompound {
    pub pair_id: usize,
    /// Union of both members' convex parts, bounding box minimum on the origin
    pub shape: CollisionShape,
    pub left_dt: DTransformation,
    pub right_dt: DTransformation,
}

impl PairCompound {
    pub fn build(pair: &PairPiece, instance: &Instance, config: &NestConfig) -> Result<Self> {
        let (left, right) = (instance.piece(pair.left), instance.piece(pair.right));
        let gap = Spacing::new(config, pair.left, pair.right).gap_to(pair.left);
        let (rw, rh) = (right.bbox().width(), right.bbox().height());

        //right member rotated head to head, with its bounding box minimum on (x, 0)
        let right_dt_at = |x: f64| DTransformation::new(PI, (rw + x, rh));
        let right_at = |x: f64| right.collision_shape.transform_clone(&right_dt_at(x).compose());

        let start = left.bbox().x_max + gap.x + config.compact_step;
        let floor = -rw - gap.x;
        let Some(x) = slide(start, floor, config.compact_step, config.compact_accuracy, |from, to| {
            let swept = right_at(from).swept(Point(to - from, 0.0));
            !overlaps_with_gap(&left.collision_shape, &swept, gap)
        }) else {
            bail!("members of pair {} cannot be separated", pair.id)
        };

        let compound = CollisionShape::compound(&[(*left.collision_shape).clone(), right_at(x)])?;
        let bbox = compound.bbox();
        let to_origin = Transformation::from_translation((-bbox.x_min, -bbox.y_min));
        let normalize = |dt: DTransformation| dt.compose().transform(&to_origin).decompose();

        debug!(
            "[NEST] pair {} compound: {:.3} x {:.3}, right member at x = {:.3}",
            pair.id,
            bbox.width(),
            bbox.height(),
            x
        );

        Ok(PairCompound {
            pair_id: pair.id,
            shape: compound.transform_clone(&to_origin),
            left_dt: normalize(DTransformation::empty()),
            right_dt: normalize(right_dt_at(x)),
        })
    }

    /// Transformations of the left and right member when the compound is placed with `dt`
    pub fn member_transforms(&self, dt: &DTransformation) -> (DTransformation, DTransformation) {
        let t = dt.compose();
        (
            self.left_dt.compose().transform(&t).decompose(),
            self.right_dt.compose().transform(&t).decompose(),
        )
    }
}

#[cfg(test)]
mod tests {
    use sheetnest::entities::{Margins, Piece, Sheet, SheetKind};
    use sheetnest::geometry::primitives::{Point, SPolygon};

    use super::*;
    use crate::config::NestType;

    fn rect(id: usize, w: f64, h: f64, quantity: usize) -> Piece {
        let poly = SPolygon::new(vec![Point(0.0, 0.0), Point(w, 0.0), Point(w, h), Point(0.0, h)]).unwrap();
        Piece::new(id, poly, quantity, vec![]).unwrap()
    }

    fn triangle(id: usize, quantity: usize) -> Piece {
        let poly = SPolygon::new(vec![Point(0.0, 0.0), Point(10.0, 0.0), Point(0.0, 10.0)]).unwrap();
        Piece::new(id, poly, quantity, vec![]).unwrap()
    }

    fn instance(pieces: Vec<Piece>, pairs: Vec<PairPiece>) -> Instance {
        let sheet = Sheet::new(0, SheetKind::Strip, 100.0, None, Margins::default()).unwrap();
        Instance::new(pieces, vec![sheet], vec![], pairs).unwrap()
    }

    #[test]
    fn ranges_are_disjoint_and_cover_all_instances() {
        let inst = instance(vec![rect(0, 1.0, 1.0, 3), rect(1, 5.0, 5.0, 2), rect(2, 2.0, 2.0, 4)], vec![]);
        let ranges = index_ranges(&inst, true);
        assert_eq!(ranges.iter().map(|r| r.piece_id).collect_vec(), vec![1, 2, 0]);
        assert_eq!(ranges.iter().map(|r| r.len()).sum::<usize>(), inst.total_piece_qty());
        assert!(ranges.iter().tuple_windows().all(|(a, b)| a.end == b.start));

        let unsorted = index_ranges(&inst, false);
        assert_eq!(unsorted.iter().map(|r| r.piece_id).collect_vec(), vec![0, 1, 2]);
    }

    #[test]
    fn pairs_come_first_and_leftovers_become_singles() {
        let pair = PairPiece {
            id: 0,
            left: 0,
            right: 1,
            size: 42.0,
        };
        let inst = instance(vec![triangle(0, 3), triangle(1, 1), rect(2, 20.0, 20.0, 1)], vec![pair]);
        let config = NestConfig {
            nest_type: NestType::PairwiseSingleRow,
            ..NestConfig::default()
        };
        let ranges = index_ranges(&inst, true);
        let units = build_units(&inst, &ranges, &config);

        assert_eq!(units.len(), 4);
        assert!(matches!(units[0], NestUnit::Pair { pair_id: 0, .. }));
        assert!(units[1..].iter().all(|u| matches!(u, NestUnit::Single { .. })));
        assert_eq!(units.iter().map(|u| u.n_instances()).sum::<usize>(), 5);

        let all_instances = units
            .iter()
            .flat_map(|u| u.members())
            .map(|(_, i)| i)
            .sorted()
            .collect_vec();
        assert_eq!(all_instances, (0..5).collect_vec());
    }

    #[test]
    fn pairs_are_ignored_by_single_row_nesting() {
        let pair = PairPiece {
            id: 0,
            left: 0,
            right: 0,
            size: 1.0,
        };
        let inst = instance(vec![triangle(0, 4)], vec![pair]);
        let single = build_units(&inst, &index_ranges(&inst, true), &NestConfig::default());
        assert_eq!(single.len(), 4);

        let paired_config = NestConfig {
            nest_type: NestType::PairwiseDoubleRow,
            ..NestConfig::default()
        };
        let paired = build_units(&inst, &index_ranges(&inst, true), &paired_config);
        assert_eq!(paired.len(), 2);
    }

    #[test]
    fn triangles_pair_up_into_a_square() {
        let pair = PairPiece {
            id: 0,
            left: 0,
            right: 0,
            size: 1.0,
        };
        let inst = instance(vec![triangle(0, 2)], vec![pair.clone()]);
        let config = NestConfig {
            compact_accuracy: 0.01,
            ..NestConfig::default()
        };
        let compound = PairCompound::build(&pair, &inst, &config).unwrap();
        let bbox = compound.shape.bbox();
        assert!(bbox.x_min.abs() < 1e-9 && bbox.y_min.abs() < 1e-9);
        assert!(bbox.width() < 10.0 + 0.01 + 1e-6, "{bbox:?}");
        assert!((bbox.height() - 10.0).abs() < 1e-6);

        let (l, r) = compound.member_transforms(&DTransformation::new(0.0, (5.0, 5.0)));
        let left = inst.piece(0).collision_shape.transform_clone(&l.compose());
        let right = inst.piece(0).collision_shape.transform_clone(&r.compose());
        assert!(!sheetnest::collision_detection::overlaps(&left, &right));
        assert!((left.bbox().x_min - 5.0).abs() < 1e-9);
    }
}
