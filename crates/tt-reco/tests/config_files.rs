//! Loading reconstruction configurations and density tables from disk.

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tt_core::{FourMomentum, Jet, Lepton, LeptonFlavour, Met};
use tt_reco::{
    AnyStrategy, EventView, RecoConfig, ReconstructionStatus, StrategyConfig,
    reconstruct_sequential,
};

fn tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("ttreco_{}_{}_{}", std::process::id(), nanos, name));
    fs::create_dir_all(&p).unwrap();
    p
}

const TABLES_JSON: &str = r#"{
    "nu_distance": { "edges": [0, 50, 100, 200, 1000], "content": [8, 4, 2, 1] },
    "w_top_mass": {
        "x_edges": [0, 60, 100, 500],
        "y_edges": [0, 140, 210, 1000],
        "content": [[1, 1, 1], [1, 10, 1], [1, 1, 1]]
    }
}"#;

fn event_objects() -> (Vec<Jet>, Lepton) {
    let jets = vec![
        Jet::from_pt_eta_phi_m(60.0, -0.4, 1.5, 4.8, 0.9),
        Jet::from_pt_eta_phi_m(55.0, 1.1, -2.0, 4.8, 0.8),
        Jet::from_pt_eta_phi_m(45.0, 0.0, 2.6, 6.0, 0.1),
        Jet::from_pt_eta_phi_m(35.0, -1.5, -0.8, 5.0, 0.2),
        Jet::from_pt_eta_phi_m(28.0, 0.9, 0.4, 4.0, 0.3),
    ];
    let lepton =
        Lepton::new(FourMomentum::from_pt_eta_phi_m(40.0, 0.3, 0.2, 0.105), LeptonFlavour::Muon);
    (jets, lepton)
}

#[test]
fn test_likelihood_config_with_relative_table_path() {
    let dir = tmp_dir("likelihood");
    fs::write(dir.join("tables.json"), TABLES_JSON).unwrap();
    fs::write(
        dir.join("reco.json"),
        r#"{
            "selection": { "min_pt": 30.0, "max_abs_eta": 2.4 },
            "strategy": {
                "kind": "likelihood",
                "tables": "tables.json",
                "neutrino_table": "nu_distance",
                "mass_table": "w_top_mass"
            }
        }"#,
    )
    .unwrap();

    let config = RecoConfig::from_path(dir.join("reco.json")).unwrap();
    match &config.strategy {
        StrategyConfig::Likelihood(src) => assert_eq!(src.tables, dir.join("tables.json")),
        other => panic!("unexpected strategy {other:?}"),
    }

    let mut strategy = config.build_strategy().unwrap();
    assert!(matches!(strategy, AnyStrategy::Likelihood(_)));
    let mut assigner = config.build_assigner();

    let (jets, lepton) = event_objects();
    let event = EventView::new(&jets, Some(&lepton), Met::new(-15.0, 30.0));
    let reco = assigner.reconstruct(&event, &mut strategy);
    // The softest jet fails the pt cut.
    assert_eq!(reco.n_selected_jets(), 4);
    assert_eq!(reco.status(), ReconstructionStatus::Success);
    assert!(reco.rank().is_finite());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_missing_table_name_fails_when_building() {
    let dir = tmp_dir("missing_table");
    fs::write(dir.join("tables.json"), TABLES_JSON).unwrap();
    fs::write(
        dir.join("reco.json"),
        r#"{
            "strategy": {
                "kind": "likelihood",
                "tables": "tables.json",
                "neutrino_table": "nu_distance",
                "mass_table": "nope"
            }
        }"#,
    )
    .unwrap();

    // Tables are only read when the strategy is built.
    let config = RecoConfig::from_path(dir.join("reco.json")).unwrap();
    let err = config.build_strategy().unwrap_err();
    assert!(matches!(err, tt_core::Error::Validation(_)));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_chi2_config_file_drives_batch_processing() {
    let dir = tmp_dir("chi2");
    fs::write(
        dir.join("reco.json"),
        r#"{
            "selection": { "min_pt": 25.0, "max_abs_eta": null },
            "b_tag": { "working_point": { "threshold": 0.5 }, "mode": "at_least_one_tagged" },
            "strategy": {
                "kind": "chi2",
                "terms": [
                    { "expression": "mass_top_lep", "mean": 173.0, "variance": 25.0 },
                    { "expression": "mass_top_had", "mean": 173.0, "variance": 20.0 },
                    { "expression": "mass_w_had", "mean": 80.4, "variance": 10.0 }
                ]
            }
        }"#,
    )
    .unwrap();

    let config = RecoConfig::from_path(dir.join("reco.json")).unwrap();
    assert_eq!(config.selection.max_abs_eta, f64::INFINITY);

    let (jets, lepton) = event_objects();
    let events = vec![
        tt_reco::Event::new(jets.clone(), Some(lepton), Met::new(-15.0, 30.0)),
        tt_reco::Event::new(jets[..3].to_vec(), Some(lepton), Met::new(-15.0, 30.0)),
        tt_reco::Event::new(jets, None, Met::new(-15.0, 30.0)),
    ];
    let outcomes = reconstruct_sequential(
        &events,
        &config.build_assigner(),
        &config.build_strategy().unwrap(),
    )
    .unwrap();

    assert_eq!(outcomes[0].status, ReconstructionStatus::Success);
    let a = outcomes[0].assignment.unwrap();
    assert!(events[0].jets[a.b_top_lep].b_tag > 0.5 || events[0].jets[a.b_top_had].b_tag > 0.5);
    assert_eq!(outcomes[1].status, ReconstructionStatus::InsufficientJets);
    assert_eq!(outcomes[2].status, ReconstructionStatus::NoLeptonOrNeutrino);
    assert_eq!(outcomes[2].observables.status_code, 2);

    fs::remove_dir_all(&dir).ok();
}
