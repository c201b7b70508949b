use log::trace;

use sheetnest::collision_detection::GapRule;
use sheetnest::entities::Layout;
use sheetnest::geometry::primitives::Point;
use sheetnest::util::FPA;

use crate::config::NestConfig;
use crate::observer::NestEvent;
use crate::strategy::{Oriented, Placement, PlacementUnit, SearchContext, cross_starts, rotation_set};

/// Continuous compaction: every unit is dropped from above the pieces already placed and pushed
/// along the feed axis (−y) for as long as it stays feasible.
#[derive(Clone, Debug)]
pub struct CompactionStrategy {
    step: f64,
    accuracy: f64,
    left_right_turn: bool,
}

impl CompactionStrategy {
    pub fn new(config: &NestConfig) -> Self {
        CompactionStrategy {
            step: config.compact_step,
            accuracy: config.compact_accuracy,
            left_right_turn: config.strategies.left_right_turn,
        }
    }

    pub fn place(
        &mut self,
        layout_idx: usize,
        layout: &Layout,
        unit: &PlacementUnit,
        ctx: &mut SearchContext,
    ) -> Option<Placement> {
        let region = layout.region;
        let gap = unit.spacing.max_gap();
        let top = layout
            .occupied_bbox()
            .map_or(region.y_min, |bbox| bbox.y_max);
        let mirrored = self.left_right_turn && unit.serial % 2 == 1;

        let mut best: Option<(FPA, f64, Placement)> = None;

        for rotation in rotation_set(unit, &layout.sheet, ctx.config) {
            let o = Oriented::new(unit.shape, rotation);
            if o.width > region.width() + 1e-9 || o.height > region.height() + 1e-9 {
                continue;
            }
            let start_y = (top + gap.y + self.step)
                .min(region.y_max - o.height)
                .max(region.y_min);

            for x in cross_starts(layout, o.width, gap) {
                let Some(y) = slide(start_y, region.y_min, self.step, self.accuracy, |from, to| {
                    ctx.fits_along(layout, unit, &o, (x, from), (x, to))
                }) else {
                    continue;
                };
                ctx.observer.notify(NestEvent::CompactionTrial {
                    sheet_id: layout.sheet.id,
                    from: Point(x, start_y),
                    to: Point(x, y),
                });

                let extent = FPA(y + o.height);
                let cross = if mirrored { -x } else { x };
                let improves = match &best {
                    None => true,
                    Some((best_extent, best_cross, _)) => {
                        extent < *best_extent || (extent == *best_extent && cross < *best_cross)
                    }
                };
                if improves {
                    best = Some((extent, cross, o.placement_at(layout_idx, (x, y))));
                }
            }
        }

        let (extent, _, placement) = best?;
        trace!(
            "[CMP] {:?} compacted to {:?} (extent {})",
            unit.key,
            placement.bbox,
            extent
        );
        Some(placement)
    }
}

/// Pushes a position down from `start` towards `floor`: steps of `step` while the move is possible,
/// followed by a bisection of the last step until the interval is within `accuracy`.
/// `movable(from, to)` is true if `to` is feasible and reached from `from` without crossing anything,
/// so obstacles thinner than `step` stop the slide as well.
/// Returns the lowest position reached, `None` if `start` itself is infeasible.
pub fn slide(
    start: f64,
    floor: f64,
    step: f64,
    accuracy: f64,
    mut movable: impl FnMut(f64, f64) -> bool,
) -> Option<f64> {
    if !movable(start, start) {
        return None;
    }
    let mut lowest = start;
    let mut blocked = loop {
        let next = lowest - step;
        if next <= floor {
            if lowest <= floor {
                return Some(lowest);
            }
            match movable(lowest, floor) {
                true => return Some(floor),
                false => break floor,
            }
        }
        match movable(lowest, next) {
            true => lowest = next,
            false => break next,
        }
    };
    while lowest - blocked > accuracy {
        let mid = (lowest + blocked) / 2.0;
        match movable(lowest, mid) {
            true => lowest = mid,
            false => blocked = mid,
        }
    }
    Some(lowest)
}
