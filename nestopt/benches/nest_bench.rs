use std::path::Path;
use std::sync::atomic::AtomicBool;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::prelude::SmallRng;

use nestopt::config::{Engine, NestConfig};
use nestopt::ga::{Chromosome, MinRect, PackingProblem, RectPacker};
use nestopt::io;
use nestopt::observer::Silent;
use nestopt::orchestrator::Nester;
use sheetnest::entities::{Instance, Margins, Sheet, SheetKind};
use sheetnest::io::import::Importer;

criterion_main!(benches);
criterion_group!(benches, polygon_nest_bench, rect_decode_bench);

const ASSETS: [&str; 3] = ["squares", "shapes_strip", "shapes_sheets"];

fn load_instance(name: &str) -> Instance {
    let path = format!("../assets/{name}.json");
    let ext = io::read_json_instance(Path::new(&path)).unwrap();
    Importer.import_instance(&ext).unwrap()
}

fn polygon_nest_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("polygon_nest");
    group.sample_size(10);
    for name in ASSETS {
        let instance = load_instance(name);
        let config = NestConfig {
            engine: Engine::GeneralPolygon,
            ..NestConfig::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(name), &instance, |b, instance| {
            b.iter(|| {
                let mut nester = Nester::new(instance.clone(), config).unwrap();
                nester.run(&mut Silent, &AtomicBool::new(false)).unwrap()
            })
        });
    }
    group.finish();
}

fn rect_decode_bench(c: &mut Criterion) {
    let config = NestConfig {
        rotatable: true,
        auto_repeat_last_sheet: true,
        ..NestConfig::default()
    };
    let mut rng = SmallRng::seed_from_u64(0);

    let mut group = c.benchmark_group("rect_decode");
    for n_rects in [50, 200, 1000] {
        let rects = (0..n_rects)
            .map(|i| MinRect {
                width: 2.0 + (i % 7) as f64,
                height: 1.0 + (i % 5) as f64 * 1.5,
                piece_id: i % 7,
                instance: i,
            })
            .collect();
        let sheet = Sheet::new(0, SheetKind::Whole, 60.0, Some(40.0), Margins::default()).unwrap();
        let problem = PackingProblem::new(rects, vec![sheet], &config, 0.0);
        let chromosomes = (0..32)
            .map(|_| Chromosome::random(n_rects, true, &mut rng))
            .collect::<Vec<_>>();

        group.bench_function(BenchmarkId::from_parameter(n_rects), |b| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % chromosomes.len();
                RectPacker::new(&problem).decode(&chromosomes[i])
            })
        });
    }
    group.finish();
}
