use std::fs;
use std::path::Path;
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser as ClapParser;
use log::{debug, info, warn};

use nestopt::config::NestConfig;
use nestopt::io;
use nestopt::io::cli::Cli;
use nestopt::io::output::NestOutput;
use nestopt::orchestrator::NestOutcome;
use nestopt::worker::{NestRequest, NestResult, NestWorker};
use sheetnest::io::import::Importer;
use sheetnest::io::svg::layout_to_svg;

fn main() -> Result<()> {
    let args = Cli::parse();
    io::init_logger(args.log_level)?;

    let config = match &args.config_file {
        None => {
            warn!("[MAIN] No config file provided, use --config-file to provide a custom config");
            NestConfig::default()
        }
        Some(config_file) => io::read_config(config_file)?,
    };
    let config = args.apply_overrides(config);

    info!("[MAIN] Successfully parsed NestConfig: {config:?}");

    let input_stem = args
        .input_file
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("invalid input file name: {}", args.input_file.display()))?;

    if !args.solution_folder.exists() {
        fs::create_dir_all(&args.solution_folder).with_context(|| {
            format!(
                "could not create solution folder: {}",
                args.solution_folder.display()
            )
        })?;
    }

    let ext_instance = io::read_json_instance(&args.input_file)?;
    let instance = Importer.import_instance(&ext_instance)?;

    let worker = NestWorker::spawn(NestRequest {
        instance: ext_instance.clone(),
        config,
    })?;
    let deadline = args
        .time_limit
        .map(|secs| Instant::now() + Duration::from_secs_f64(secs.max(0.0)));
    loop {
        let timeout = match deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => Duration::MAX,
        };
        match worker.progress().recv_timeout(timeout) {
            Ok(pct) => debug!("[MAIN] progress: {pct}%"),
            Err(RecvTimeoutError::Timeout) => {
                warn!("[MAIN] time limit reached, cancelling");
                worker.cancel();
                for pct in worker.progress().iter() {
                    debug!("[MAIN] progress: {pct}%");
                }
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    let outcome = match worker.wait() {
        NestResult::Finished(report) => NestOutcome::Finished(report),
        NestResult::Interrupted { report, remaining } => NestOutcome::Interrupted { report, remaining },
        NestResult::Rejected(msg) => bail!("nesting request rejected: {msg}"),
        NestResult::Failed(msg) => bail!("nesting failed: {msg}"),
    };

    {
        let output = NestOutput::new(ext_instance, &outcome, &instance, config);
        let solution_path = args.solution_folder.join(format!("sol_{input_stem}.json"));
        io::write_json(&output, Path::new(&solution_path))?;
    }

    {
        for layout in &outcome.report().layouts {
            let svg_path = args
                .solution_folder
                .join(format!("sol_{input_stem}_{}.svg", layout.sheet.id));
            let svg = layout_to_svg(layout, &instance, config.svg_draw_options);
            io::write_svg(&svg, Path::new(&svg_path))?;
        }
    }

    Ok(())
}
