#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::AtomicBool;

    use serde_json::json;
    use test_case::test_case;

    use nestopt::config::{Engine, Mixing, NestConfig, NestType, PlacementMode};
    use nestopt::io;
    use nestopt::observer::{NestEvent, Silent};
    use nestopt::orchestrator::{NestOutcome, NestReport, Nester};
    use nestopt::worker::{NestRequest, NestResult, NestWorker};
    use sheetnest::entities::{Instance, PlacedItem};
    use sheetnest::io::ext_repr::ExtInstance;
    use sheetnest::io::import::Importer;
    use sheetnest::util::assertions::layout_respects_gap;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn ext_instance(value: serde_json::Value) -> ExtInstance {
        serde_json::from_value(value).unwrap()
    }

    fn rect_piece(id: usize, w: f64, h: f64, quantity: usize) -> serde_json::Value {
        json!({
            "id": id,
            "shape": { "type": "rectangle", "data": { "x_min": 0.0, "y_min": 0.0, "width": w, "height": h } },
            "quantity": quantity
        })
    }

    fn nest(ext: &ExtInstance, config: NestConfig) -> (Instance, NestReport) {
        let instance = Importer.import_instance(ext).unwrap();
        let mut nester = Nester::new(instance.clone(), config).unwrap();
        let outcome = nester.run(&mut Silent, &AtomicBool::new(false)).unwrap();
        assert!(matches!(outcome, NestOutcome::Finished(_)));
        (instance, outcome.into_report())
    }

    fn assert_valid(instance: &Instance, report: &NestReport) {
        assert_eq!(report.placed_pieces.len(), instance.total_piece_qty());
        for layout in &report.layouts {
            assert!(layout.is_feasible(), "infeasible layout on sheet {}", layout.sheet.id);
        }
        let placed = report.placed_pieces.iter().filter(|p| p.placed).count();
        assert_eq!(placed + report.n_unplaced, instance.total_piece_qty());
        assert!(report.utilization >= 0.0 && report.utilization <= 1.0 + 1e-9);
    }

    #[test_case(Engine::GeneralPolygon; "general polygon")]
    #[test_case(Engine::RectangularGa; "rectangular ga")]
    fn two_squares_fill_eighty_percent(engine: Engine) {
        init_logger();
        let ext = io::read_json_instance(Path::new("../assets/squares.json")).unwrap();
        let config = NestConfig {
            engine,
            ..NestConfig::default()
        };
        let (instance, report) = nest(&ext, config);

        assert_valid(&instance, &report);
        assert_eq!(report.n_unplaced, 0);
        assert_eq!(report.sheets.len(), 1);
        assert!((report.utilization - 0.8).abs() < 1e-9, "{}", report.utilization);
    }

    #[test]
    fn oversize_pentagon_stays_unplaced() {
        init_logger();
        let pentagon = (0..5)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / 5.0;
                [20.0 * angle.cos(), 20.0 * angle.sin()]
            })
            .collect::<Vec<_>>();
        let ext = ext_instance(json!({
            "pieces": [{ "id": 0, "shape": { "type": "simple_polygon", "data": pentagon }, "quantity": 1 }],
            "sheets": [{ "id": 0, "kind": "Whole", "width": 10.0, "height": 10.0 }]
        }));
        let (instance, report) = nest(&ext, NestConfig::default());

        assert_valid(&instance, &report);
        assert_eq!(report.n_unplaced, 1);
        assert!(report.sheets.is_empty());
        assert_eq!(report.utilization, 0.0);
        assert!(!report.placed_pieces[0].placed);
    }

    #[test]
    fn strip_compaction_stacks_rects() {
        init_logger();
        let ext = ext_instance(json!({
            "pieces": [rect_piece(0, 10.0, 5.0, 3)],
            "sheets": [{ "id": 0, "kind": "Strip", "width": 15.0 }]
        }));
        let config = NestConfig {
            spacing: 1.0,
            compact_step: 5.0,
            compact_accuracy: 0.25,
            ..NestConfig::default()
        };
        let (instance, report) = nest(&ext, config);

        assert_valid(&instance, &report);
        let ys = report.placed_pieces.iter().map(|p| p.position.1).collect::<Vec<_>>();
        for (y, expected) in ys.iter().zip([0.0, 6.0, 12.0]) {
            assert!((y - expected).abs() <= 0.25, "{ys:?}");
        }
        assert!((report.sheets[0].used_length - 17.0).abs() <= 0.25);
    }

    #[test]
    fn compaction_stops_on_obstacles_thinner_than_the_step() {
        init_logger();
        let ext = ext_instance(json!({
            "pieces": [rect_piece(0, 5.0, 10.0, 1), rect_piece(1, 10.0, 1.0, 1), rect_piece(2, 4.0, 2.0, 1)],
            "sheets": [{ "id": 0, "kind": "Strip", "width": 10.0 }]
        }));
        let config = NestConfig {
            placement: PlacementMode::Compaction,
            compact_step: 5.0,
            compact_accuracy: 0.25,
            ..NestConfig::default()
        };
        let (instance, report) = nest(&ext, config);

        assert_valid(&instance, &report);
        let y_of = |piece_id: usize| {
            let p = report.placed_pieces.iter().find(|p| p.piece_id == piece_id).unwrap();
            p.position.1
        };
        //the full-width bar rests on the tall piece and the small piece on the bar, not underneath it
        assert!((y_of(1) - 10.0).abs() <= 0.25, "{}", y_of(1));
        assert!((y_of(2) - 11.0).abs() <= 0.25, "{}", y_of(2));
    }

    #[test]
    fn one_knife_cut_rounds_the_strip_length() {
        let ext = ext_instance(json!({
            "pieces": [rect_piece(0, 10.0, 7.0, 1)],
            "sheets": [{ "id": 0, "kind": "Strip", "width": 10.0 }]
        }));
        let config = NestConfig {
            one_knife_cut: true,
            cut_step: 5.0,
            ..NestConfig::default()
        };
        let (_, report) = nest(&ext, config);
        assert_eq!(report.sheets[0].used_length, 10.0);
        assert!((report.utilization - 0.7).abs() < 1e-9);
    }

    #[test_case(NestType::PairwiseSingleRow; "single row")]
    #[test_case(NestType::PairwiseDoubleRow; "double row")]
    fn pairs_are_nested_head_to_head(nest_type: NestType) {
        init_logger();
        let ext = ext_instance(json!({
            "pieces": [{
                "id": 0,
                "shape": { "type": "simple_polygon", "data": [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]] },
                "quantity": 2
            }],
            "sheets": [{ "id": 0, "kind": "Whole", "width": 10.0, "height": 10.0 }],
            "pair_pieces": [{ "id": 0, "left": 0, "right": 0, "size": 10.0 }]
        }));
        let config = NestConfig {
            nest_type,
            ..NestConfig::default()
        };
        let (instance, report) = nest(&ext, config);

        //both triangles only fit the sheet as a compound square
        assert_valid(&instance, &report);
        assert_eq!(report.n_unplaced, 0);
        assert!(report.placed_pieces.iter().all(|p| p.pair_id == Some(0)));
        let rotations = report.placed_pieces.iter().map(|p| p.rotation).collect::<Vec<_>>();
        let relative = (rotations[0] - rotations[1]).rem_euclid(360.0);
        assert!((relative - 180.0).abs() < 1e-6, "{rotations:?}");
        assert!((report.utilization - 1.0).abs() < 1e-6);
    }

    #[test]
    fn auto_repeat_adds_sheets_up_to_the_limit() {
        init_logger();
        let ext = ext_instance(json!({
            "pieces": [rect_piece(0, 10.0, 10.0, 3)],
            "sheets": [{ "id": 0, "kind": "Whole", "width": 10.0, "height": 10.0 }]
        }));
        let config = NestConfig {
            auto_repeat_last_sheet: true,
            ..NestConfig::default()
        };

        let instance = Importer.import_instance(&ext).unwrap();
        let mut repeated = vec![];
        let mut observer = |event: NestEvent| {
            if let NestEvent::AutoRepeatedLastSheet { sheet_id } = event {
                repeated.push(sheet_id);
            }
        };
        let outcome = Nester::new(instance.clone(), config)
            .unwrap()
            .run(&mut observer, &AtomicBool::new(false))
            .unwrap();
        let report = outcome.report();
        assert_valid(&instance, report);
        assert_eq!(repeated, vec![1, 2]);
        assert_eq!(report.sheets.iter().map(|s| s.sheet_id).collect::<Vec<_>>(), vec![0, 1, 2]);

        let limited = NestConfig {
            sheet_limit: Some(2),
            ..config
        };
        let (_, report) = nest(&ext, limited);
        assert_eq!(report.sheets.len(), 2);
        assert_eq!(report.n_unplaced, 1);
    }

    #[test_case(&[(10.0, 10.0), (30.0, 30.0)], &[(20.0, 20.0, 1), (5.0, 5.0, 3)]; "large piece on the second sheet")]
    #[test_case(&[(30.0, 30.0), (10.0, 10.0), (25.0, 25.0)], &[(20.0, 20.0, 2), (4.0, 4.0, 2)]; "small sheet skipped")]
    #[test_case(&[(12.0, 8.0), (8.0, 12.0), (40.0, 40.0)], &[(15.0, 15.0, 1), (6.0, 6.0, 4)]; "only the last sheet takes the large piece")]
    fn both_engines_use_later_larger_sheets(sheets: &[(f64, f64)], pieces: &[(f64, f64, usize)]) {
        init_logger();
        let sheets = sheets
            .iter()
            .enumerate()
            .map(|(id, (w, h))| json!({ "id": id, "kind": "Whole", "width": w, "height": h }))
            .collect::<Vec<_>>();
        let pieces = pieces
            .iter()
            .enumerate()
            .map(|(id, (w, h, qty))| rect_piece(id, *w, *h, *qty))
            .collect::<Vec<_>>();
        let ext = ext_instance(json!({ "pieces": pieces, "sheets": sheets }));

        let placed_sets = [Engine::GeneralPolygon, Engine::RectangularGa].map(|engine| {
            let config = NestConfig {
                engine,
                prng_seed: Some(0),
                ..NestConfig::default()
            };
            let (instance, report) = nest(&ext, config);
            assert_valid(&instance, &report);
            assert_eq!(report.n_unplaced, 0, "{engine:?}");
            let mut placed = report
                .placed_pieces
                .iter()
                .filter(|p| p.placed)
                .map(|p| (p.piece_id, p.instance))
                .collect::<Vec<_>>();
            placed.sort();
            placed
        });
        assert_eq!(placed_sets[0], placed_sets[1]);
    }

    #[test_case(Mixing::default(), 1; "no mixing")]
    #[test_case(Mixing { tail_piece: true, ..Mixing::default() }, 0; "tail piece")]
    fn tail_pieces_fill_earlier_sheets(mixing: Mixing, expected_sheet: usize) {
        init_logger();
        let ext = ext_instance(json!({
            "pieces": [rect_piece(0, 20.0, 20.0, 2), rect_piece(1, 5.0, 5.0, 2)],
            "sheets": [
                { "id": 0, "kind": "Whole", "width": 25.0, "height": 20.0 },
                { "id": 1, "kind": "Whole", "width": 25.0, "height": 20.0 }
            ]
        }));
        let config = NestConfig {
            mixing,
            ..NestConfig::default()
        };
        let (instance, report) = nest(&ext, config);

        assert_valid(&instance, &report);
        let small_sheets = report
            .placed_pieces
            .iter()
            .filter(|p| p.piece_id == 1)
            .map(|p| p.sheet_id)
            .collect::<Vec<_>>();
        assert_eq!(small_sheets, vec![Some(expected_sheet); 2]);
    }

    #[test_case("../assets/shapes_strip.json", NestConfig::default(); "strip")]
    #[test_case("../assets/shapes_strip.json", NestConfig { spacing: 1.5, rotatable: true, ..NestConfig::default() }; "strip rotatable spacing")]
    #[test_case("../assets/shapes_strip.json", NestConfig { placement: PlacementMode::CandidatePoint, min_height_optimization: true, ..NestConfig::default() }; "strip candidate points")]
    #[test_case("../assets/shapes_sheets.json", NestConfig::default(); "sheets")]
    #[test_case("../assets/shapes_sheets.json", NestConfig { nest_type: NestType::PairwiseDoubleRow, spacing: 0.5, ..NestConfig::default() }; "sheets pairwise")]
    #[test_case("../assets/shapes_sheets.json", NestConfig { placement: PlacementMode::Compaction, auto_repeat_last_sheet: true, ..NestConfig::default() }; "sheets compaction")]
    #[test_case("../assets/shapes_sheets.json", NestConfig { mixing: Mixing { tail_piece: true, tail_line: true, same_type_size: true }, ..NestConfig::default() }; "sheets mixing")]
    fn layouts_are_feasible(instance_path: &str, config: NestConfig) {
        init_logger();
        let ext = io::read_json_instance(Path::new(instance_path)).unwrap();
        let (instance, report) = nest(&ext, config);
        assert_valid(&instance, &report);
        assert!(report.n_collision_queries > 0);

        //members of a pair are nested as one compound, the spacing only applies between units
        let gap_applies = |_: &PlacedItem, _: &PlacedItem| !config.nest_type.is_pairwise();
        for layout in &report.layouts {
            assert!(layout_respects_gap(layout, config.gap(), gap_applies));
        }
    }

    #[test]
    fn rectangular_engine_is_reproducible() {
        init_logger();
        let pieces = [(7.0, 3.0), (4.0, 6.0), (5.0, 5.0), (3.0, 8.0), (6.0, 2.0)]
            .iter()
            .enumerate()
            .map(|(i, (w, h))| rect_piece(i, *w, *h, 2))
            .collect::<Vec<_>>();
        let ext = ext_instance(json!({
            "pieces": pieces,
            "sheets": [{ "id": 0, "kind": "Whole", "width": 15.0, "height": 12.0 }]
        }));
        let config = NestConfig {
            engine: Engine::RectangularGa,
            rotatable: true,
            auto_repeat_last_sheet: true,
            prng_seed: Some(7),
            ..NestConfig::default()
        };
        let (instance, a) = nest(&ext, config);
        let (_, b) = nest(&ext, config);

        assert_valid(&instance, &a);
        assert_eq!(a.n_unplaced, 0);
        assert_eq!(a.placed_pieces, b.placed_pieces);
    }

    #[test]
    fn worker_reports_monotonic_progress() {
        init_logger();
        let instance = io::read_json_instance(Path::new("../assets/shapes_sheets.json")).unwrap();
        let worker = NestWorker::spawn(NestRequest {
            instance,
            config: NestConfig::default(),
        })
        .unwrap();

        let progress = worker.progress().iter().collect::<Vec<_>>();
        assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{progress:?}");
        assert!(progress.iter().all(|p| *p <= 100));
        assert!(matches!(worker.wait(), NestResult::Finished(_)));
    }

    #[test]
    fn worker_can_be_cancelled() {
        init_logger();
        let ext = ext_instance(json!({
            "pieces": [rect_piece(0, 3.0, 2.0, 500), rect_piece(1, 2.0, 2.0, 500)],
            "sheets": [{ "id": 0, "kind": "Strip", "width": 200.0 }]
        }));
        let worker = NestWorker::spawn(NestRequest {
            instance: ext,
            config: NestConfig::default(),
        })
        .unwrap();
        worker.cancel();

        match worker.wait() {
            NestResult::Interrupted { report, remaining } => {
                assert!(remaining > 0);
                assert_eq!(report.placed_pieces.len() + remaining, 1000);
            }
            other => panic!("expected an interrupted result, got {other:?}"),
        }
    }

    #[test]
    fn worker_rejects_invalid_requests() {
        init_logger();
        let invalid_config = NestConfig {
            compact_step: 0.0,
            ..NestConfig::default()
        };
        let ext = io::read_json_instance(Path::new("../assets/squares.json")).unwrap();
        let worker = NestWorker::spawn(NestRequest {
            instance: ext,
            config: invalid_config,
        })
        .unwrap();
        assert!(matches!(worker.wait(), NestResult::Rejected(_)));

        let degenerate = ext_instance(json!({
            "pieces": [{ "id": 0, "shape": { "type": "simple_polygon", "data": [[0.0, 0.0], [1.0, 1.0]] }, "quantity": 1 }],
            "sheets": [{ "id": 0, "kind": "Whole", "width": 10.0, "height": 10.0 }]
        }));
        let worker = NestWorker::spawn(NestRequest {
            instance: degenerate,
            config: NestConfig::default(),
        })
        .unwrap();
        assert!(matches!(worker.wait(), NestResult::Rejected(_)));
    }
}
