//! End-to-end scenarios against artifacts trained in-test.

mod common;

use common::{dashboard_record, training_samples, write_artifacts};
use dpe_predict::encoding::{AlignMode, FeatureRecord, UnknownPolicy};
use dpe_predict::error::ErrorKind;
use dpe_predict::serving::{
    predict_chain, ArtifactSet, ClassifierService, LoadOptions, ModelState, RegressorService,
};
use dpe_predict::{DpeClass, DpeError};
use serde_json::json;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn artifacts() -> (TempDir, ArtifactSet) {
    let dir = TempDir::new().unwrap();
    let set = write_artifacts(dir.path());
    (dir, set)
}

// ============================================================================
// Scenario 1: classifier → regressor chain
// ============================================================================

#[test]
fn test_chain_produces_class_and_floored_consumption() {
    let (_dir, set) = artifacts();
    let classifier = set.load_classifier(LoadOptions::default()).unwrap();
    let regressor = set.load_regressor(LoadOptions::default()).unwrap();

    let result = predict_chain(&classifier, &regressor, &dashboard_record()).unwrap();
    assert!(result.class_index <= 6);
    assert_eq!(DpeClass::from_index(result.class_index), Some(result.class));
    assert!(result.displayed_kwh >= 50.0);
    assert!(result.consumption_kwh >= 0.0);
    let expected_co2 = (result.displayed_kwh * 0.25 * 10.0).round() / 10.0;
    assert!((result.co2_kg - expected_co2).abs() < 1e-9);
}

#[test]
fn test_chain_overrides_caller_class() {
    let (_dir, set) = artifacts();
    let classifier = set.load_classifier(LoadOptions::default()).unwrap();
    let regressor = set.load_regressor(LoadOptions::default()).unwrap();

    let plain = predict_chain(&classifier, &regressor, &dashboard_record()).unwrap();
    let with_bogus = dashboard_record().with("etiquette_dpe", 99_i64);
    let overridden = predict_chain(&classifier, &regressor, &with_bogus).unwrap();
    assert_eq!(plain, overridden);
}

#[test]
fn test_classifier_learns_training_data() {
    let (_dir, set) = artifacts();
    let classifier = set.load_classifier(LoadOptions::default()).unwrap();
    let samples = training_samples();

    let correct = samples
        .iter()
        .filter(|s| classifier.predict(&s.record).unwrap().class_index == s.class_index)
        .count();
    assert!(correct * 10 >= samples.len() * 7, "accuracy {correct}/{}", samples.len());
}

// ============================================================================
// Scenario 2: missing numeric attribute
// ============================================================================

#[test]
fn test_missing_height_still_predicts() {
    let (_dir, set) = artifacts();
    let classifier = ClassifierService::ready(set.load_classifier(LoadOptions::default()).unwrap());
    let regressor = RegressorService::ready(set.load_regressor(LoadOptions::default()).unwrap());

    let body = json!({
        "surface_habitable_logement": 80,
        "qualite_isolation_murs": "bonne",
        "periode_construction": "1989-2000",
        "logement": "Ancien"
    });
    let class = classifier.predict_json(&body).unwrap();
    assert!(class.class_index <= 6);

    let mut conso_body = body.clone();
    conso_body["etiquette_dpe"] = json!(class.class_index);
    let conso = regressor.predict_json(&conso_body).unwrap();
    assert!(conso.kwh >= 0.0);
}

// ============================================================================
// Scenario 3: not ready
// ============================================================================

#[test]
fn test_unloaded_service_is_unavailable() {
    let service = ClassifierService::new();
    assert_eq!(service.state(), ModelState::NotLoaded);

    let err = service
        .predict_json(&json!({"surface_habitable_logement": 50}))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
}

#[test]
fn test_failed_load_is_terminal_and_unavailable() {
    let dir = TempDir::new().unwrap();
    let set = ArtifactSet::new(dir.path());
    let service = RegressorService::new();

    let state = service.slot().load_with(|| set.load_regressor(LoadOptions::default()));
    assert_eq!(state, ModelState::Failed);
    assert!(service.slot().failure().is_some());

    let err = service
        .predict_json(&json!({"etiquette_dpe": 3}))
        .unwrap_err();
    assert!(matches!(err, DpeError::ServiceUnavailable { ref state } if state == "failed"));
}

#[test]
fn test_background_load_publishes_complete_context() {
    let (_dir, set) = artifacts();
    let service = ClassifierService::new();
    let body = json!({"surface_habitable_logement": 120, "qualite_isolation_murs": "bonne"});

    let loader = {
        let slot = Arc::clone(service.slot());
        thread::spawn(move || slot.load_with(|| set.load_classifier(LoadOptions::default())))
    };

    // Every answer is either "unavailable" or a real prediction.
    while !loader.is_finished() {
        match service.predict_json(&body) {
            Ok(resp) => assert!(resp.class_index <= 6),
            Err(e) => assert_eq!(e.kind(), ErrorKind::ServiceUnavailable),
        }
    }
    assert_eq!(loader.join().unwrap(), ModelState::Ready);
    assert!(service.predict_json(&body).is_ok());
}

// ============================================================================
// Scenario 4: unrecognized category
// ============================================================================

#[test]
fn test_unknown_insulation_rejected_by_default() {
    let (_dir, set) = artifacts();
    let service = ClassifierService::ready(set.load_classifier(LoadOptions::default()).unwrap());

    let err = service
        .predict_json(&json!({"qualite_isolation_murs": "excellente"}))
        .unwrap_err();
    match err {
        DpeError::UnrecognizedCategory { feature, value } => {
            assert_eq!(feature, "qualite_isolation_murs");
            assert_eq!(value, "excellente");
        }
        other => panic!("expected UnrecognizedCategory, got {other:?}"),
    }
}

#[test]
fn test_unknown_insulation_accepted_with_sentinel() {
    let (_dir, set) = artifacts();
    let options = LoadOptions::default().with_unknown_policy(UnknownPolicy::Sentinel);
    let service = ClassifierService::ready(set.load_classifier(options).unwrap());

    let resp = service
        .predict_json(&json!({"qualite_isolation_murs": "excellente"}))
        .unwrap();
    assert!(resp.class_index <= 6);
}

// ============================================================================
// Contract properties
// ============================================================================

#[test]
fn test_predict_dpe_is_idempotent() {
    let (_dir, set) = artifacts();
    let service = ClassifierService::ready(set.load_classifier(LoadOptions::default()).unwrap());
    let body = json!({
        "surface_habitable_logement": 42.5,
        "hauteur_sous_plafond": 2.4,
        "type_energie_n1": "Électricité",
        "nombre_appartement_cat": "Grand Collectif(> 30 logements)"
    });

    let first = service.predict_json(&body).unwrap();
    for _ in 0..10 {
        assert_eq!(service.predict_json(&body).unwrap(), first);
    }
}

#[test]
fn test_consumption_never_negative() {
    let (_dir, set) = artifacts();
    let regressor = set.load_regressor(LoadOptions::default()).unwrap();

    for sample in training_samples() {
        for class in 0..=6_i64 {
            let record = sample.record.clone().with("etiquette_dpe", class);
            let kwh = regressor.predict(&record).unwrap().kwh;
            assert!(kwh >= 0.0);
            assert_eq!((kwh * 100.0).round() / 100.0, kwh);
        }
    }

    let tiny = FeatureRecord::new()
        .with("surface_habitable_logement", -10_000.0)
        .with("etiquette_dpe", 6_i64);
    assert_eq!(regressor.predict(&tiny).unwrap().kwh, 0.0);
}

#[test]
fn test_strict_mode_reports_dropped_columns() {
    let (_dir, set) = artifacts();
    let strict = LoadOptions::default().with_align_mode(AlignMode::Strict);
    let lenient = set.load_regressor(LoadOptions::default()).unwrap();
    let strict = set.load_regressor(strict).unwrap();

    // The consumption layout has no biomass indicator.
    let record = dashboard_record()
        .with("type_energie_n1", "Bois et biomasse")
        .with("etiquette_dpe", 3_i64);

    let reported = strict.predict(&record).unwrap();
    assert_eq!(
        reported.dropped_columns,
        Some(vec!["type_energie_n1_Bois et biomasse".to_string()])
    );
    let silent = lenient.predict(&record).unwrap();
    assert_eq!(silent.dropped_columns, None);
    assert_eq!(silent.kwh, reported.kwh);
}

#[test]
fn test_fractional_class_is_invalid_input() {
    let (_dir, set) = artifacts();
    let service = RegressorService::ready(set.load_regressor(LoadOptions::default()).unwrap());
    let err = service
        .predict_json(&json!({"etiquette_dpe": 2.5}))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}
