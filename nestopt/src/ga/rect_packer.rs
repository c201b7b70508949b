use sheetnest::entities::Sheet;
use sheetnest::geometry::primitives::Rect;
use sheetnest::util::FPA;

use crate::config::NestConfig;
use crate::ga::Chromosome;

const FIT_EPS: f64 = 1e-9;

/// Rectangle to pack: the bounding box of one instance
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinRect {
    pub width: f64,
    pub height: f64,
    pub piece_id: usize,
    pub instance: usize,
}

impl MinRect {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Dimensions after the optional 90° rotation
    pub fn oriented(&self, rotated: bool) -> (f64, f64) {
        match rotated {
            true => (self.height, self.width),
            false => (self.width, self.height),
        }
    }
}

/// Where a rectangle ended up: bottom-left corner `(x, y)` in bin `bin`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RectPlacement {
    /// Index of the rectangle in [`PackingProblem::rects`]
    pub rect: usize,
    pub bin: usize,
    pub x: f64,
    pub y: f64,
    pub rotated: bool,
}

/// Free rectangle remaining in a bin
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmptyRectArea {
    pub bin: usize,
    pub rect: Rect,
}

/// Everything a decode needs. Shared read-only between decodes running in parallel.
#[derive(Clone, Debug)]
pub struct PackingProblem {
    pub rects: Vec<MinRect>,
    pub sheets: Vec<Sheet>,
    /// Clearance kept between rectangles
    pub spacing: f64,
    pub auto_repeat: bool,
    pub sheet_limit: Option<usize>,
    /// Rectangles may be turned by 90° when their gene's orientation fits nowhere
    pub rotatable: bool,
    /// End of the usable region of strip sheets
    pub strip_horizon: f64,
    total_area: f64,
}

impl PackingProblem {
    pub fn new(rects: Vec<MinRect>, sheets: Vec<Sheet>, config: &NestConfig, strip_horizon: f64) -> Self {
        let total_area = rects.iter().map(MinRect::area).sum();
        PackingProblem {
            rects,
            sheets,
            spacing: config.spacing,
            auto_repeat: config.auto_repeat_last_sheet,
            sheet_limit: config.sheet_limit,
            rotatable: config.rotatable,
            strip_horizon,
            total_area,
        }
    }

    pub fn total_area(&self) -> f64 {
        self.total_area
    }

    /// The sheet backing bin `i`, `None` if no such bin may be opened
    pub fn bin_sheet(&self, i: usize) -> Option<Sheet> {
        if self.sheet_limit.is_some_and(|limit| i >= limit) {
            return None;
        }
        match self.sheets.get(i) {
            Some(sheet) => Some(sheet.clone()),
            None if self.auto_repeat => self.sheets.last().map(|s| s.clone_with_id(i)),
            None => None,
        }
    }
}

/// Result of decoding one chromosome
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded {
    pub placements: Vec<RectPlacement>,
    /// Indices of the rectangles that did not fit anywhere
    pub unplaced: Vec<usize>,
    /// Sheets of the opened bins, in the order of the input sheets followed by the repeated copies
    pub bins: Vec<Sheet>,
    pub placed_area: f64,
    pub consumed_area: f64,
    /// `(placed / consumed) × (placed / total)`, in [0, 1]
    pub fitness: f64,
}

#[derive(Clone, Debug)]
struct Bin {
    /// Position of the sheet in the input, copies of the last sheet continue the numbering
    index: usize,
    sheet: Sheet,
    region: Rect,
    used_y: f64,
}

/// Guillotine packer. Every decode gets its own packer, nothing is shared between decodes.
pub struct RectPacker<'a> {
    problem: &'a PackingProblem,
    bins: Vec<Bin>,
    free: Vec<EmptyRectArea>,
    placements: Vec<RectPlacement>,
    unplaced: Vec<usize>,
}

impl<'a> RectPacker<'a> {
    pub fn new(problem: &'a PackingProblem) -> Self {
        RectPacker {
            problem,
            bins: vec![],
            free: vec![],
            placements: vec![],
            unplaced: vec![],
        }
    }

    pub fn decode(mut self, chromosome: &Chromosome) -> Decoded {
        for (rect, rotated) in chromosome.decode() {
            //the gene's orientation first, the other one only as a fallback
            let orientations = [rotated, !rotated];
            let orientations = match self.problem.rotatable {
                true => &orientations[..],
                false => &orientations[..1],
            };
            let target = orientations
                .iter()
                .find_map(|&r| {
                    let (w, h) = self.padded(rect, r);
                    self.best_free_area(w, h).map(|area| (area, r, w, h))
                })
                .or_else(|| {
                    orientations.iter().find_map(|&r| {
                        let (w, h) = self.padded(rect, r);
                        self.open_bin(w, h).map(|area| (area, r, w, h))
                    })
                });
            match target {
                Some((area, r, w, h)) => self.place(area, rect, r, w, h),
                None => self.unplaced.push(rect),
            }
        }
        self.finish()
    }

    /// Dimensions of a rectangle with the clearance added to its right and top
    fn padded(&self, rect: usize, rotated: bool) -> (f64, f64) {
        let (w, h) = self.problem.rects[rect].oriented(rotated);
        let s = self.problem.spacing;
        (w + s, h + s)
    }

    pub fn free_areas(&self) -> &[EmptyRectArea] {
        &self.free
    }

    /// Smallest free rectangle the given dimensions fit in.
    /// Ties go to the lowest y, then the lowest x, then the one found first.
    fn best_free_area(&self, w: f64, h: f64) -> Option<usize> {
        let key = |r: &Rect| (FPA(r.area()), FPA(r.y_min), FPA(r.x_min));
        let mut best: Option<usize> = None;
        for (i, area) in self.free.iter().enumerate() {
            if !fits(&area.rect, w, h) {
                continue;
            }
            let better = match best {
                None => true,
                Some(b) => key(&area.rect) < key(&self.free[b].rect),
            };
            if better {
                best = Some(i);
            }
        }
        best
    }

    /// Opens the first unused sheet the dimensions fit while empty and returns its free area.
    /// The input sheets are tried in order, then the next copy of the last sheet.
    fn open_bin(&mut self, w: f64, h: f64) -> Option<usize> {
        let n_sheets = self.problem.sheets.len();
        let n_copies = self.bins.iter().filter(|b| b.index >= n_sheets).count();
        let unused = (0..n_sheets)
            .filter(|i| self.bins.iter().all(|b| b.index != *i))
            .chain([n_sheets + n_copies])
            .collect::<Vec<_>>();

        let s = self.problem.spacing;
        for index in unused {
            let Some(sheet) = self.problem.bin_sheet(index) else {
                continue;
            };
            let region = sheet.usable_rect(self.problem.strip_horizon);
            //the region is inflated so that rectangles can touch the far edges
            let inflated = Rect {
                x_max: region.x_max + s,
                y_max: region.y_max + s,
                ..region
            };
            if !fits(&inflated, w, h) {
                continue;
            }
            self.bins.push(Bin {
                index,
                sheet,
                region,
                used_y: region.y_min,
            });
            self.free.push(EmptyRectArea {
                bin: self.bins.len() - 1,
                rect: inflated,
            });
            return Some(self.free.len() - 1);
        }
        None
    }

    /// Places a rectangle in the bottom-left corner of a free area and splits the remainder
    /// along the shorter leftover axis
    fn place(&mut self, area: usize, rect: usize, rotated: bool, w: f64, h: f64) {
        let EmptyRectArea { bin, rect: fr } = self.free.remove(area);
        let (x, y) = (fr.x_min, fr.y_min);

        let (leftover_w, leftover_h) = (fr.width() - w, fr.height() - h);
        let (right, top) = match leftover_w < leftover_h {
            true => (
                Rect {
                    x_min: x + w,
                    y_min: y,
                    x_max: fr.x_max,
                    y_max: y + h,
                },
                Rect {
                    x_min: x,
                    y_min: y + h,
                    x_max: fr.x_max,
                    y_max: fr.y_max,
                },
            ),
            false => (
                Rect {
                    x_min: x + w,
                    y_min: y,
                    x_max: fr.x_max,
                    y_max: fr.y_max,
                },
                Rect {
                    x_min: x,
                    y_min: y + h,
                    x_max: x + w,
                    y_max: fr.y_max,
                },
            ),
        };
        for part in [right, top] {
            if part.width() > FIT_EPS && part.height() > FIT_EPS {
                self.free.push(EmptyRectArea { bin, rect: part });
            }
        }

        let real_h = h - self.problem.spacing;
        let b = &mut self.bins[bin];
        b.used_y = b.used_y.max(y + real_h);
        self.placements.push(RectPlacement {
            rect,
            bin,
            x,
            y,
            rotated,
        });
    }

    fn finish(mut self) -> Decoded {
        //bins are reported in sheet order, whatever order they were opened in
        let mut order = (0..self.bins.len()).collect::<Vec<_>>();
        order.sort_by_key(|b| self.bins[*b].index);
        let mut new_pos = vec![0; order.len()];
        for (pos, b) in order.iter().enumerate() {
            new_pos[*b] = pos;
        }
        for p in &mut self.placements {
            p.bin = new_pos[p.bin];
        }
        let bins = order.iter().map(|b| self.bins[*b].clone()).collect::<Vec<_>>();

        let placed_area = self
            .placements
            .iter()
            .map(|p| self.problem.rects[p.rect].area())
            .sum::<f64>();
        let consumed_area = bins
            .iter()
            .map(|b| match b.sheet.usable_area() {
                Some(area) => area,
                None => b.region.width() * (b.used_y - b.region.y_min),
            })
            .sum::<f64>();
        let total_area = self.problem.total_area();
        let fitness = match consumed_area > 0.0 && total_area > 0.0 {
            true => (placed_area / consumed_area) * (placed_area / total_area),
            false => 0.0,
        };
        Decoded {
            placements: self.placements,
            unplaced: self.unplaced,
            bins: bins.into_iter().map(|b| b.sheet).collect(),
            placed_area,
            consumed_area,
            fitness,
        }
    }
}

fn fits(area: &Rect, w: f64, h: f64) -> bool {
    w <= area.width() + FIT_EPS && h <= area.height() + FIT_EPS
}

#[cfg(test)]
mod tests {
    use sheetnest::entities::{Margins, SheetKind};

    use super::*;

    fn rects(dims: &[(f64, f64)]) -> Vec<MinRect> {
        dims.iter()
            .enumerate()
            .map(|(i, (w, h))| MinRect {
                width: *w,
                height: *h,
                piece_id: i,
                instance: i,
            })
            .collect()
    }

    fn whole(w: f64, h: f64) -> Sheet {
        Sheet::new(0, SheetKind::Whole, w, Some(h), Margins::default()).unwrap()
    }

    fn problem(dims: &[(f64, f64)], sheets: Vec<Sheet>, config: NestConfig) -> PackingProblem {
        PackingProblem::new(rects(dims), sheets, &config, 1000.0)
    }

    #[test]
    fn two_squares_use_eighty_percent_of_the_sheet() {
        let p = problem(&[(10.0, 10.0), (10.0, 10.0)], vec![whole(25.0, 10.0)], NestConfig::default());
        let decoded = RectPacker::new(&p).decode(&Chromosome::from_order(&[0, 1]));
        assert!(decoded.unplaced.is_empty());
        let positions = decoded.placements.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>();
        assert_eq!(positions, vec![(0.0, 0.0), (10.0, 0.0)]);
        assert!((decoded.fitness - 0.8).abs() < 1e-9);
    }

    #[test]
    fn smallest_fitting_free_area_wins() {
        let p = problem(
            &[(10.0, 5.0), (4.0, 4.0), (10.0, 10.0)],
            vec![whole(20.0, 20.0)],
            NestConfig::default(),
        );
        let mut packer = RectPacker::new(&p);
        packer.open_bin(10.0, 5.0);
        packer.place(0, 0, false, 10.0, 5.0);
        //shorter leftover axis is the width: the top part spans the full width
        let free = packer.free_areas().iter().map(|a| a.rect).collect::<Vec<_>>();
        assert_eq!(
            free,
            vec![
                Rect::try_new(10.0, 0.0, 20.0, 5.0).unwrap(),
                Rect::try_new(0.0, 5.0, 20.0, 20.0).unwrap()
            ]
        );

        let decoded = RectPacker::new(&p).decode(&Chromosome::from_order(&[0, 1, 2]));
        let positions = decoded.placements.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>();
        assert_eq!(positions, vec![(0.0, 0.0), (10.0, 0.0), (0.0, 5.0)]);
    }

    #[test]
    fn rotation_makes_rects_fit() {
        let p = problem(&[(5.0, 20.0)], vec![whole(20.0, 10.0)], NestConfig::default());
        let upright = RectPacker::new(&p).decode(&Chromosome { genes: vec![1] });
        assert_eq!(upright.unplaced, vec![0]);
        assert!(upright.bins.is_empty());
        assert_eq!(upright.fitness, 0.0);

        let rotated = RectPacker::new(&p).decode(&Chromosome { genes: vec![-1] });
        assert!(rotated.unplaced.is_empty());
        assert!(rotated.placements[0].rotated);
    }

    #[test]
    fn later_sheets_are_opened_when_earlier_ones_are_too_small() {
        let small = Sheet::new(0, SheetKind::Whole, 10.0, Some(10.0), Margins::default()).unwrap();
        let large = Sheet::new(1, SheetKind::Whole, 30.0, Some(30.0), Margins::default()).unwrap();
        let p = problem(&[(20.0, 20.0), (5.0, 5.0)], vec![small, large], NestConfig::default());
        let decoded = RectPacker::new(&p).decode(&Chromosome::from_order(&[0, 1]));
        assert!(decoded.unplaced.is_empty());
        //the small sheet is opened second but still reported first
        assert_eq!(decoded.bins.iter().map(|s| s.id).collect::<Vec<_>>(), vec![0, 1]);
        let bins = decoded.placements.iter().map(|p| (p.rect, p.bin)).collect::<Vec<_>>();
        assert_eq!(bins, vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn rotatable_rects_fall_back_to_the_other_orientation() {
        let config = NestConfig {
            rotatable: true,
            ..NestConfig::default()
        };
        let p = problem(&[(5.0, 20.0)], vec![whole(20.0, 10.0)], config);
        let decoded = RectPacker::new(&p).decode(&Chromosome { genes: vec![1] });
        assert!(decoded.unplaced.is_empty());
        assert!(decoded.placements[0].rotated);
    }

    #[test]
    fn auto_repeat_opens_copies_up_to_the_limit() {
        let dims = [(10.0, 10.0); 3];
        let config = NestConfig {
            auto_repeat_last_sheet: true,
            ..NestConfig::default()
        };
        let p = problem(&dims, vec![whole(10.0, 10.0)], config);
        let decoded = RectPacker::new(&p).decode(&Chromosome::from_order(&[0, 1, 2]));
        assert_eq!(decoded.bins.iter().map(|s| s.id).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!((decoded.fitness - 1.0).abs() < 1e-9);

        let limited = problem(
            &dims,
            vec![whole(10.0, 10.0)],
            NestConfig {
                sheet_limit: Some(2),
                ..config
            },
        );
        let decoded = RectPacker::new(&limited).decode(&Chromosome::from_order(&[0, 1, 2]));
        assert_eq!(decoded.bins.len(), 2);
        assert_eq!(decoded.unplaced, vec![2]);
    }

    #[test]
    fn spacing_separates_rects_but_not_from_the_edge() {
        let config = NestConfig {
            spacing: 1.0,
            ..NestConfig::default()
        };
        let p = problem(&[(10.0, 10.0), (10.0, 10.0)], vec![whole(21.0, 10.0)], config);
        let decoded = RectPacker::new(&p).decode(&Chromosome::from_order(&[0, 1]));
        assert!(decoded.unplaced.is_empty());
        assert_eq!(decoded.placements[1].x, 11.0);
    }

    #[test]
    fn strips_consume_only_the_used_length() {
        let strip = Sheet::new(0, SheetKind::Strip, 10.0, None, Margins::default()).unwrap();
        let p = problem(&[(10.0, 4.0), (5.0, 3.0)], vec![strip], NestConfig::default());
        let decoded = RectPacker::new(&p).decode(&Chromosome::from_order(&[0, 1]));
        assert_eq!(decoded.bins.len(), 1);
        assert!((decoded.consumed_area - 70.0).abs() < 1e-9);
        assert!((decoded.fitness - 55.0 / 70.0).abs() < 1e-9);
    }

    #[test]
    fn decoding_is_deterministic() {
        let dims = [(3.0, 7.0), (5.0, 5.0), (2.0, 9.0), (6.0, 1.0), (4.0, 4.0)];
        let p = problem(&dims, vec![whole(10.0, 10.0)], NestConfig::default());
        let c = Chromosome {
            genes: vec![3, -1, 5, 2, -4],
        };
        assert_eq!(RectPacker::new(&p).decode(&c), RectPacker::new(&p).decode(&c));
    }
}
