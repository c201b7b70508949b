use serde::Serialize;

use sheetnest::entities::Instance;
use sheetnest::io::export::export_placed_items;
use sheetnest::io::ext_repr::{ExtInstance, ExtTransformation};

use crate::config::NestConfig;
use crate::orchestrator::{NestOutcome, NestReport};

/// Solution file written by the binary: the input instance, the solution and the configuration used
#[derive(Serialize, Clone, Debug)]
pub struct NestOutput {
    #[serde(flatten)]
    pub instance: ExtInstance,
    pub solution: ExtSolution,
    pub config: NestConfig,
}

#[derive(Serialize, Clone, Debug)]
pub struct ExtSolution {
    pub interrupted: bool,
    /// Instances that were never attempted, they are missing from `report`
    pub remaining: usize,
    pub report: NestReport,
    /// Transformations to apply to the input contours, per used sheet
    pub layouts: Vec<ExtLayout>,
}

#[derive(Serialize, Clone, Debug)]
pub struct ExtLayout {
    pub sheet_id: usize,
    pub placed_items: Vec<ExtPlacedItem>,
}

#[derive(Serialize, Clone, Copy, Debug)]
pub struct ExtPlacedItem {
    pub piece_id: usize,
    pub transformation: ExtTransformation,
}

impl NestOutput {
    pub fn new(instance: ExtInstance, outcome: &NestOutcome, int_instance: &Instance, config: NestConfig) -> Self {
        let (interrupted, remaining) = match outcome {
            NestOutcome::Finished(_) => (false, 0),
            NestOutcome::Interrupted { remaining, .. } => (true, *remaining),
        };
        let report = outcome.report();
        let layouts = report
            .layouts
            .iter()
            .map(|l| ExtLayout {
                sheet_id: l.sheet.id,
                placed_items: export_placed_items(l, int_instance)
                    .into_iter()
                    .map(|(piece_id, transformation)| ExtPlacedItem {
                        piece_id,
                        transformation,
                    })
                    .collect(),
            })
            .collect();
        NestOutput {
            instance,
            solution: ExtSolution {
                interrupted,
                remaining,
                report: report.clone(),
                layouts,
            },
            config,
        }
    }
}
