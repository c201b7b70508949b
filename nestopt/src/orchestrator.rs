use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{Context, Result, bail, ensure};
use itertools::Itertools;
use log::{debug, info, warn};
use rand::SeedableRng;
use rand::prelude::SmallRng;
use serde::Serialize;
use thousands::Separable;

use sheetnest::collision_detection::GapRule;
use sheetnest::entities::{Instance, Layout, PlacedPiece, SheetKind};
use sheetnest::geometry::DTransformation;

use crate::config::{Engine, NestConfig};
use crate::ga::{GaOptimizer, MinRect, PackingProblem};
use crate::observer::{NestEvent, NestObserver};
use crate::strategy::{Placement, PlacementStrategy, PlacementUnit, SearchContext, Spacing, place_on_sheets};
use crate::units::{NestUnit, PairCompound, build_units, index_ranges};

/// Lifecycle of a [`Nester`]. There are no transitions back to `Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NestState {
    Idle,
    Running,
    Finished,
    Interrupted,
}

/// Usage of one sheet
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SheetReport {
    pub sheet_id: usize,
    pub kind: SheetKind,
    pub n_pieces: usize,
    pub placed_area: f64,
    /// Usable area of bounded sheets. For strips: usable width × consumed length.
    pub usable_area: f64,
    pub utilization: f64,
    /// Consumed length along the feed axis, rounded up to the cut step for strips cut with one knife
    pub used_length: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct NestReport {
    /// One record per attempted instance, ordered by instance index
    pub placed_pieces: Vec<PlacedPiece>,
    /// Only the sheets that received at least one piece
    pub sheets: Vec<SheetReport>,
    pub utilization: f64,
    pub n_unplaced: usize,
    pub n_collision_queries: usize,
    pub elapsed_ms: f64,
    /// Final layouts of the reported sheets
    #[serde(skip)]
    pub layouts: Vec<Layout>,
}

#[derive(Clone, Debug)]
pub enum NestOutcome {
    Finished(NestReport),
    /// The run was cancelled, `remaining` instances were never attempted and are missing from the report.
    /// Instances that were attempted but did not fit are in the report and counted by `n_unplaced`.
    Interrupted { report: NestReport, remaining: usize },
}

impl NestOutcome {
    pub fn report(&self) -> &NestReport {
        match self {
            NestOutcome::Finished(report) => report,
            NestOutcome::Interrupted { report, .. } => report,
        }
    }

    pub fn into_report(self) -> NestReport {
        match self {
            NestOutcome::Finished(report) => report,
            NestOutcome::Interrupted { report, .. } => report,
        }
    }
}

/// Distributes all instances of an [`Instance`] over its sheets
pub struct Nester {
    instance: Instance,
    config: NestConfig,
    /// Geometry of every pair, by pair id. Only built for the pairwise nest types.
    compounds: HashMap<usize, PairCompound>,
    state: NestState,
}

impl Nester {
    pub fn new(instance: Instance, config: NestConfig) -> Result<Self> {
        config.validate().context("invalid configuration")?;

        if config.engine == Engine::RectangularGa {
            if let Some(piece) = instance.pieces.iter().find(|p| !p.is_rect) {
                bail!(
                    "the rectangular engine requires axis-aligned rectangles, piece {} is not one",
                    piece.id
                );
            }
        }

        let compounds = match config.engine == Engine::GeneralPolygon && config.nest_type.is_pairwise() {
            true => instance
                .pair_pieces
                .iter()
                .map(|pair| Ok((pair.id, PairCompound::build(pair, &instance, &config)?)))
                .collect::<Result<HashMap<_, _>>>()?,
            false => HashMap::new(),
        };

        Ok(Nester {
            instance,
            config,
            compounds,
            state: NestState::Idle,
        })
    }

    pub fn state(&self) -> NestState {
        self.state
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn config(&self) -> &NestConfig {
        &self.config
    }

    /// Runs the nesting. Only allowed once, from [`NestState::Idle`].
    /// `cancel` is checked between units (general polygon engine) or generations (rectangular engine).
    pub fn run(&mut self, observer: &mut dyn NestObserver, cancel: &AtomicBool) -> Result<NestOutcome> {
        ensure!(
            self.state == NestState::Idle,
            "a nester only runs once, current state: {:?}",
            self.state
        );
        self.state = NestState::Running;
        info!(
            "[NEST] nesting {} instances of {} piece types on {} sheets ({:?}, {:?})",
            self.instance.total_piece_qty(),
            self.instance.pieces.len(),
            self.instance.sheets.len(),
            self.config.engine,
            self.config.nest_type
        );

        let outcome = match self.config.engine {
            Engine::GeneralPolygon => self.run_polygon(observer, cancel),
            Engine::RectangularGa => self.run_ga(observer, cancel),
        };
        //a run that failed counts as interrupted
        self.state = match &outcome {
            Ok(NestOutcome::Finished(_)) => NestState::Finished,
            _ => NestState::Interrupted,
        };
        outcome
    }

    fn run_polygon(&self, observer: &mut dyn NestObserver, cancel: &AtomicBool) -> Result<NestOutcome> {
        let start = Instant::now();
        let (instance, cfg) = (&self.instance, &self.config);
        let ranges = index_ranges(instance, cfg.strategies.size_down);
        let units = build_units(instance, &ranges, cfg);
        let horizon = strip_horizon(instance, cfg);

        let mut layouts = instance
            .sheets
            .iter()
            .map(|s| Layout::new(s.clone(), horizon, cfg.cde_config))
            .collect_vec();
        let mut strategies = layouts
            .iter()
            .map(|l| PlacementStrategy::for_layout(l, cfg))
            .collect_vec();

        let mut ctx = SearchContext::new(cfg, observer);
        let mut unplaced = vec![];
        let mut current = 0;
        let mut attempted = 0;
        let mut remaining = None;
        let total = instance.total_piece_qty();

        for (serial, unit) in units.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                let n_remaining = units[serial..].iter().map(NestUnit::n_instances).sum();
                info!("[NEST] cancelled, {n_remaining} instances remaining");
                remaining = Some(n_remaining);
                break;
            }

            let p_unit = self.placement_unit(unit, serial)?;
            let eligible = self.eligible_layouts(&layouts, current, unit);
            let mut placement = place_unit(&layouts, &mut strategies, &eligible, &p_unit, &mut ctx);

            if placement.is_none() && cfg.auto_repeat_last_sheet && below_sheet_limit(cfg, layouts.len()) {
                if let Some(last) = layouts.last() {
                    let sheet = last.sheet.clone_with_id(layouts.len());
                    let sheet_id = sheet.id;
                    let layout = Layout::new(sheet, horizon, cfg.cde_config);
                    strategies.push(PlacementStrategy::for_layout(&layout, cfg));
                    layouts.push(layout);
                    ctx.observer
                        .notify(NestEvent::AutoRepeatedLastSheet { sheet_id });

                    let new = layouts.len() - 1;
                    placement = place_unit(&layouts, &mut strategies, &[new], &p_unit, &mut ctx);
                    match placement {
                        Some(_) => info!("[NEST] repeated the last sheet as sheet {sheet_id}"),
                        None => {
                            debug!("[NEST] {:?} does not fit an empty sheet either", unit);
                            layouts.pop();
                            strategies.pop();
                        }
                    }
                }
            }

            match placement {
                Some(p) => {
                    self.commit(
                        &mut layouts[p.layout],
                        &mut strategies[p.layout],
                        unit,
                        &p_unit,
                        &p,
                        &mut ctx,
                    );
                    current = current.max(p.layout);
                }
                None => {
                    warn!("[NEST] could not place {:?}", unit);
                    for (piece_id, instance) in unit.members() {
                        ctx.observer
                            .notify(NestEvent::Unplaced { piece_id, instance });
                        unplaced.push(PlacedPiece::unplaced(piece_id, instance));
                    }
                }
            }

            attempted += unit.n_instances();
            ctx.observer
                .notify(NestEvent::Progress(percentage(attempted, total)));
        }

        let n_queries = ctx.n_queries;
        let report = self.report(layouts, unplaced, n_queries, start);
        Ok(match remaining {
            None => NestOutcome::Finished(report),
            Some(remaining) => NestOutcome::Interrupted { report, remaining },
        })
    }

    fn run_ga(&self, observer: &mut dyn NestObserver, cancel: &AtomicBool) -> Result<NestOutcome> {
        let start = Instant::now();
        let (instance, cfg) = (&self.instance, &self.config);
        let horizon = strip_horizon(instance, cfg);

        //pairs are packed as two separate rectangles
        let rects = index_ranges(instance, cfg.strategies.size_down)
            .iter()
            .flat_map(|r| (r.start..r.end).map(move |i| (r.piece_id, i)))
            .map(|(piece_id, instance_idx)| {
                let bbox = instance.piece(piece_id).bbox();
                MinRect {
                    width: bbox.width(),
                    height: bbox.height(),
                    piece_id,
                    instance: instance_idx,
                }
            })
            .collect_vec();
        let problem = PackingProblem::new(rects, instance.sheets.clone(), cfg, horizon);

        let rng = match cfg.prng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        let result = GaOptimizer::new(&problem, cfg, rng)
            .run(cancel, |pct| observer.notify(NestEvent::Progress(pct)));
        let decoded = &result.decoded;

        let mut layouts = decoded
            .bins
            .iter()
            .map(|s| Layout::new(s.clone(), horizon, cfg.cde_config))
            .collect_vec();
        for sheet in decoded.bins.iter().filter(|s| s.id >= instance.sheets.len()) {
            observer.notify(NestEvent::AutoRepeatedLastSheet { sheet_id: sheet.id });
        }

        for p in &decoded.placements {
            let r = problem.rects[p.rect];
            //rotated by 90° around the origin, the bounding box minimum lands on (-height, 0)
            let d_transf = match p.rotated {
                true => DTransformation::new(FRAC_PI_2, (p.x + r.height, p.y)),
                false => DTransformation::new(0.0, (p.x, p.y)),
            };
            let layout = &mut layouts[p.bin];
            layout.place_item(instance.piece(r.piece_id), r.instance, d_transf, None);
            observer.notify(NestEvent::Placed {
                piece_id: r.piece_id,
                instance: r.instance,
                sheet_id: layout.sheet.id,
            });
        }

        let unplaced = decoded
            .unplaced
            .iter()
            .map(|i| {
                let r = problem.rects[*i];
                observer.notify(NestEvent::Unplaced {
                    piece_id: r.piece_id,
                    instance: r.instance,
                });
                PlacedPiece::unplaced(r.piece_id, r.instance)
            })
            .collect_vec();

        if !result.interrupted {
            observer.notify(NestEvent::Progress(100));
        }

        let report = self.report(layouts, unplaced, 0, start);
        Ok(match result.interrupted {
            false => NestOutcome::Finished(report),
            //the best decode attempted every instance
            true => NestOutcome::Interrupted { report, remaining: 0 },
        })
    }

    /// The unit as seen by the placement strategies
    fn placement_unit(&self, unit: &NestUnit, serial: usize) -> Result<PlacementUnit<'_>> {
        let cfg = &self.config;
        let p_unit = match *unit {
            NestUnit::Single { piece_id, .. } => {
                let piece = self.instance.piece(piece_id);
                PlacementUnit {
                    key: unit.key(),
                    shape: &piece.collision_shape,
                    spacing: Spacing::new(cfg, piece_id, piece_id),
                    reference_angle: piece.reference_angle(),
                    serial,
                    extended: false,
                }
            }
            NestUnit::Pair {
                pair_id,
                left,
                right,
            } => {
                let compound = self
                    .compounds
                    .get(&pair_id)
                    .with_context(|| format!("no geometry was built for pair {pair_id}"))?;
                PlacementUnit {
                    key: unit.key(),
                    shape: &compound.shape,
                    spacing: Spacing::new(cfg, left.0, right.0),
                    //the left member keeps its orientation within the compound
                    reference_angle: self.instance.piece(left.0).reference_angle(),
                    serial,
                    extended: false,
                }
            }
        };
        Ok(p_unit)
    }

    /// Layouts `unit` may be placed on, in the order they are tried
    fn eligible_layouts(&self, layouts: &[Layout], current: usize, unit: &NestUnit) -> Vec<usize> {
        let mixing = self.config.mixing;
        let family = self.instance.family_of(unit.primary_piece());
        let limit = self
            .config
            .sheet_limit
            .map_or(layouts.len(), |l| l.min(layouts.len()));

        (0..limit)
            .filter(|&i| {
                i >= current
                    || mixing.tail_piece
                    || (mixing.same_type_size
                        && family.is_some_and(|f| layouts[i].holds_any_of(&f.piece_ids)))
            })
            .collect_vec()
    }

    /// Places the unit's members on the layout and informs the strategy
    fn commit(
        &self,
        layout: &mut Layout,
        strategy: &mut PlacementStrategy,
        unit: &NestUnit,
        p_unit: &PlacementUnit,
        placement: &Placement,
        ctx: &mut SearchContext,
    ) {
        debug_assert!(!strategy.collides_with_others(layout, p_unit, &placement.d_transf, ctx));

        let keys = match *unit {
            NestUnit::Single { piece_id, instance } => vec![layout.place_item(
                self.instance.piece(piece_id),
                instance,
                placement.d_transf,
                None,
            )],
            NestUnit::Pair {
                pair_id,
                left,
                right,
            } => {
                //placement_unit() already verified the compound exists
                let (left_dt, right_dt) = self.compounds[&pair_id].member_transforms(&placement.d_transf);
                vec![
                    layout.place_item(self.instance.piece(left.0), left.1, left_dt, Some(pair_id)),
                    layout.place_item(self.instance.piece(right.0), right.1, right_dt, Some(pair_id)),
                ]
            }
        };
        strategy.register(layout, &keys, placement, p_unit.spacing.max_gap());

        debug!(
            "[NEST] placed {:?} on sheet {} at {:?}, rotated {}°",
            unit,
            layout.sheet.id,
            placement.d_transf.translation(),
            placement.rotation
        );
        for (piece_id, instance) in unit.members() {
            ctx.observer.notify(NestEvent::Placed {
                piece_id,
                instance,
                sheet_id: layout.sheet.id,
            });
        }
    }

    fn report(
        &self,
        layouts: Vec<Layout>,
        unplaced: Vec<PlacedPiece>,
        n_collision_queries: usize,
        start: Instant,
    ) -> NestReport {
        let layouts = layouts.into_iter().filter(|l| !l.is_empty()).collect_vec();
        let sheets = layouts.iter().map(|l| self.sheet_report(l)).collect_vec();

        let placed_area = sheets.iter().map(|s| s.placed_area).sum::<f64>();
        let usable_area = sheets.iter().map(|s| s.usable_area).sum::<f64>();
        let utilization = ratio(placed_area, usable_area);

        let n_unplaced = unplaced.len();
        let placed_pieces = layouts
            .iter()
            .flat_map(|l| l.placed_pieces())
            .chain(unplaced)
            .sorted_by_key(|p| p.instance)
            .collect_vec();
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        info!(
            "[NEST] {}/{} instances placed on {} sheets, utilization {:.3}% ({} collision queries in {:.3}ms)",
            (placed_pieces.len() - n_unplaced).separate_with_commas(),
            placed_pieces.len().separate_with_commas(),
            sheets.len(),
            utilization * 100.0,
            n_collision_queries.separate_with_commas(),
            elapsed_ms
        );

        NestReport {
            placed_pieces,
            sheets,
            utilization,
            n_unplaced,
            n_collision_queries,
            elapsed_ms,
            layouts,
        }
    }

    fn sheet_report(&self, layout: &Layout) -> SheetReport {
        let sheet = &layout.sheet;
        let (used_length, usable_area) = match sheet.usable_area() {
            Some(area) => (layout.used_length(), area),
            None => {
                let length = self.strip_length(layout.used_length());
                (length, sheet.usable_width() * length)
            }
        };
        let placed_area = layout.placed_area();
        SheetReport {
            sheet_id: sheet.id,
            kind: sheet.kind,
            n_pieces: layout.n_placed(),
            placed_area,
            usable_area,
            utilization: ratio(placed_area, usable_area),
            used_length,
        }
    }

    /// Consumed strip length, rounded up to a multiple of the cut step when cutting with one knife
    fn strip_length(&self, used_length: f64) -> f64 {
        let step = self.config.cut_step;
        match self.config.one_knife_cut && step > 0.0 {
            true => ((used_length / step) - 1e-9).ceil().max(0.0) * step,
            false => used_length,
        }
    }
}

/// Tries the eligible layouts, retrying with the extended rotation set under tail-line mixing
fn place_unit(
    layouts: &[Layout],
    strategies: &mut [PlacementStrategy],
    eligible: &[usize],
    unit: &PlacementUnit,
    ctx: &mut SearchContext,
) -> Option<Placement> {
    if let Some(placement) = place_on_sheets(layouts, strategies, eligible, unit, ctx) {
        return Some(placement);
    }
    match ctx.config.mixing.tail_line {
        true => {
            let extended = PlacementUnit {
                extended: true,
                ..*unit
            };
            place_on_sheets(layouts, strategies, eligible, &extended, ctx)
        }
        false => None,
    }
}

/// Where the usable region of strips ends: far enough for every instance to be placed one after the other
pub fn strip_horizon(instance: &Instance, config: &NestConfig) -> f64 {
    let bottom = instance
        .sheets
        .iter()
        .map(|s| s.margins.bottom)
        .fold(0.0, f64::max);
    let extent = instance
        .pieces
        .iter()
        .map(|p| p.bbox().diameter() * p.quantity as f64)
        .sum::<f64>();
    bottom + extent + instance.total_piece_qty() as f64 * config.spacing + config.compact_step
}

fn below_sheet_limit(config: &NestConfig, n_sheets: usize) -> bool {
    config.sheet_limit.is_none_or(|limit| n_sheets < limit)
}

fn percentage(done: usize, total: usize) -> u8 {
    match total {
        0 => 100,
        _ => ((done * 100) / total).min(100) as u8,
    }
}

fn ratio(a: f64, b: f64) -> f64 {
    match b > 0.0 {
        true => a / b,
        false => 0.0,
    }
}
