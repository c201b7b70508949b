use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use sheetnest::collision_detection::Gap;
use sheetnest::io::svg::SvgDrawOptions;
use sheetnest::util::CDEConfig;

/// Which engine performs the nesting
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Engine {
    /// Placement strategies on arbitrary (concave) polygons
    #[default]
    GeneralPolygon,
    /// Genetic algorithm over a guillotine rectangle packer, rectangular pieces only
    RectangularGa,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NestType {
    #[default]
    SingleRow,
    DoubleRow,
    PairwiseSingleRow,
    PairwiseDoubleRow,
}

impl NestType {
    /// Pair pieces are only nested as compounds in the pairwise nest types
    pub fn is_pairwise(&self) -> bool {
        matches!(self, NestType::PairwiseSingleRow | NestType::PairwiseDoubleRow)
    }

    /// Double-row nest types also try every piece rotated by 180°
    pub fn is_double_row(&self) -> bool {
        matches!(self, NestType::DoubleRow | NestType::PairwiseDoubleRow)
    }
}

/// Rules that relax which sheets a unit may go to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mixing {
    /// Every earlier sheet remains eligible
    #[serde(default)]
    pub tail_piece: bool,
    /// Retry failing units with the extended rotation set before opening a new sheet
    #[serde(default)]
    pub tail_line: bool,
    /// Earlier sheets holding a member of the unit's same-type family remain eligible
    #[serde(default)]
    pub same_type_size: bool,
}

/// Drops the spacing along an axis between two instances of the same piece type (common-line cutting)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptiveSpacing {
    #[serde(default)]
    pub horizontal: bool,
    #[serde(default)]
    pub vertical: bool,
}

/// Fill direction of the candidate-point strategy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orientation {
    #[serde(default)]
    pub horizontal: bool,
    #[serde(default)]
    pub vertical: bool,
}

impl Default for Orientation {
    fn default() -> Self {
        Self {
            horizontal: false,
            vertical: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategies {
    /// Every other instance is pushed to the right instead of the left
    #[serde(default)]
    pub left_right_turn: bool,
    /// Units are nested in order of descending size
    #[serde(default)]
    pub size_down: bool,
    /// On strips, pieces with a reference line are aligned with the feed direction
    #[serde(default)]
    pub reference_line: bool,
}

impl Default for Strategies {
    fn default() -> Self {
        Self {
            left_right_turn: false,
            size_down: true,
            reference_line: false,
        }
    }
}

/// Placement strategy used by the general polygon engine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementMode {
    /// Continuous compaction on strips, candidate points on bounded sheets
    #[default]
    Auto,
    CandidatePoint,
    Compaction,
}

/// Parameters of the genetic optimizer
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaConfig {
    pub population_size: usize,
    pub max_generations: usize,
    /// Generations without improvement of the best fitness after which the search stops
    pub stagnation_limit: usize,
    pub tournament_size: usize,
    /// Number of best individuals copied unchanged into the next generation
    pub elite_count: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub flip_rate: f64,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 30,
            max_generations: 200,
            stagnation_limit: 50,
            tournament_size: 3,
            elite_count: 2,
            crossover_rate: 0.9,
            mutation_rate: 0.2,
            flip_rate: 0.1,
        }
    }
}

/// Configuration of a nesting run
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct NestConfig {
    pub engine: Engine,
    pub nest_type: NestType,
    pub mixing: Mixing,
    pub adaptive_spacing: AdaptiveSpacing,
    pub orientation: Orientation,
    pub strategies: Strategies,
    pub placement: PlacementMode,
    /// Minimum distance between any two placed pieces
    pub spacing: f64,
    /// Step size of the compaction search
    pub compact_step: f64,
    /// The compaction search bisects until the remaining interval is smaller than this
    pub compact_accuracy: f64,
    /// Round the consumed strip length up to a multiple of `cut_step`
    pub one_knife_cut: bool,
    pub cut_step: f64,
    /// Allow rotations in multiples of 90°
    pub rotatable: bool,
    /// Largest rotation (degrees) tried when `rotatable` is set
    pub max_rotate_angle: f64,
    /// Rotation step (degrees) of the extended rotation set used by tail-line mixing
    pub tail_rotation_step: f64,
    /// Pick the rotation with the smallest extent along the feed axis instead of the first feasible one
    pub min_height_optimization: bool,
    /// When the last sheet is full, continue on a copy of it
    pub auto_repeat_last_sheet: bool,
    /// Maximum number of sheets in use, auto-repeated copies included
    pub sheet_limit: Option<usize>,
    /// Configuration of the Collision Detection Engine
    pub cde_config: CDEConfig,
    pub ga: GaConfig,
    /// Seed for the PRNG. If undefined, the algorithm will run in non-deterministic mode using entropy
    pub prng_seed: Option<u64>,
    pub svg_draw_options: SvgDrawOptions,
}

impl Default for NestConfig {
    fn default() -> Self {
        Self {
            engine: Engine::default(),
            nest_type: NestType::default(),
            mixing: Mixing::default(),
            adaptive_spacing: AdaptiveSpacing::default(),
            orientation: Orientation::default(),
            strategies: Strategies::default(),
            placement: PlacementMode::default(),
            spacing: 0.0,
            compact_step: 5.0,
            compact_accuracy: 0.25,
            one_knife_cut: false,
            cut_step: 0.0,
            rotatable: false,
            max_rotate_angle: 270.0,
            tail_rotation_step: 45.0,
            min_height_optimization: false,
            auto_repeat_last_sheet: false,
            sheet_limit: None,
            cde_config: CDEConfig::default(),
            ga: GaConfig::default(),
            prng_seed: Some(0),
            svg_draw_options: SvgDrawOptions::default(),
        }
    }
}

impl NestConfig {
    /// Rejects configurations the engines cannot work with
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.compact_step.is_finite() && self.compact_step > 0.0,
            "compact_step must be positive, got {}",
            self.compact_step
        );
        ensure!(
            self.compact_accuracy > 0.0 && self.compact_accuracy <= self.compact_step,
            "compact_accuracy must lie in (0, compact_step], got {}",
            self.compact_accuracy
        );
        ensure!(
            self.orientation.horizontal || self.orientation.vertical,
            "at least one orientation must be enabled"
        );
        ensure!(
            self.spacing.is_finite() && self.spacing >= 0.0,
            "spacing must be non-negative, got {}",
            self.spacing
        );
        ensure!(
            self.cut_step.is_finite() && self.cut_step >= 0.0,
            "cut_step must be non-negative, got {}",
            self.cut_step
        );
        ensure!(
            self.max_rotate_angle <= 360.0,
            "max_rotate_angle must not exceed 360°, got {}",
            self.max_rotate_angle
        );
        ensure!(
            self.tail_rotation_step > 0.0 && self.tail_rotation_step <= 360.0,
            "tail_rotation_step must lie in (0, 360], got {}",
            self.tail_rotation_step
        );
        ensure!(
            self.cde_config.quadtree_split_threshold >= 1,
            "quadtree_split_threshold must be at least 1"
        );

        let ga = &self.ga;
        ensure!(
            ga.population_size >= 2,
            "population_size must be at least 2, got {}",
            ga.population_size
        );
        ensure!(
            ga.elite_count < ga.population_size,
            "elite_count ({}) must be smaller than population_size ({})",
            ga.elite_count,
            ga.population_size
        );
        ensure!(ga.tournament_size >= 1, "tournament_size must be at least 1");
        for (name, rate) in [
            ("crossover_rate", ga.crossover_rate),
            ("mutation_rate", ga.mutation_rate),
            ("flip_rate", ga.flip_rate),
        ] {
            ensure!(
                (0.0..=1.0).contains(&rate),
                "{name} must lie in [0, 1], got {rate}"
            );
        }
        Ok(())
    }

    /// Clearance demanded between pieces of different types
    pub fn gap(&self) -> Gap {
        Gap::uniform(self.spacing)
    }
}
