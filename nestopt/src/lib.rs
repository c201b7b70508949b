//! Nesting engine on top of [`sheetnest`]: placement strategies, the orchestrator that distributes
//! pieces over sheets, a genetic optimizer for rectangular stock and a worker thread to run it all in
//! the background.

use std::sync::LazyLock;
use std::time::Instant;

pub mod config;
/// Genetic algorithm over a guillotine rectangle packer
pub mod ga;
pub mod io;
pub mod observer;
pub mod orchestrator;
/// Placement strategies: where does the next unit go on a sheet
pub mod strategy;
/// Instance list and the units (single pieces or pairs) that are nested
pub mod units;
pub mod worker;

pub static EPOCH: LazyLock<Instant> = LazyLock::new(Instant::now);
