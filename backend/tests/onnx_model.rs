use std::path::PathBuf;

use credit_scoring::{
    load_model, Classifier, ModelState, OnnxClassifier, OutputKind, ScoringService, Threshold,
    FEATURE_COUNT,
};

// Fixtures come from tests/fixtures/make_fixtures.py:
// p = sigmoid(0.1 * sum(x) - 1), outputs `label` (i64) then `probabilities` [1, 2].
fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[test]
fn loads_a_twenty_feature_classifier() {
    let state = load_model(fixture("linear_20.onnx"), OutputKind::Probabilities);
    assert!(state.is_loaded(), "{:?}", state);
}

#[test]
fn reads_the_positive_class_after_the_label() {
    let model = OnnxClassifier::load(fixture("linear_20.onnx"), OutputKind::Probabilities)
        .expect("fixture should load");

    let zeros = [0.0f32; FEATURE_COUNT];
    let p = model.predict_proba(&zeros).unwrap();
    assert!((p - sigmoid(-1.0)).abs() < 1e-5, "{}", p);

    let mut row = [0.0f32; FEATURE_COUNT];
    row[0] = 20.0;
    let p = model.predict_proba(&row).unwrap();
    assert!((p - sigmoid(1.0)).abs() < 1e-5, "{}", p);
}

#[test]
fn same_row_scores_identically() {
    let model = OnnxClassifier::load(fixture("linear_20.onnx"), OutputKind::Probabilities).unwrap();
    let row = [0.5f32; FEATURE_COUNT];
    assert_eq!(
        model.predict_proba(&row).unwrap(),
        model.predict_proba(&row).unwrap()
    );
}

#[test]
fn artifact_with_another_schema_is_unavailable() {
    let state = load_model(fixture("linear_7.onnx"), OutputKind::Probabilities);
    match state {
        ModelState::Unavailable { cause } => assert!(cause.contains("linear_7.onnx"), "{}", cause),
        ModelState::Ready(_) => panic!("7-feature artifact accepted for a 20-feature schema"),
    }
}

#[test]
fn loaded_artifact_drives_the_decision() {
    let state = load_model(fixture("linear_20.onnx"), OutputKind::Probabilities);
    let service = ScoringService::new(state, Threshold::new(0.5).unwrap());
    assert!(service.model_loaded());

    let application = serde_json::from_value(serde_json::json!({
        "AMT_ANNUITY": 0.0,
        "AMT_CREDIT": 0.0,
        "AMT_GOODS_PRICE": 0.0,
        "AMT_INCOME_TOTAL": 0.0,
        "AMT_REQ_CREDIT_BUREAU_QRT": 0.0,
        "AMT_REQ_CREDIT_BUREAU_YEAR": 0.0,
        "CODE_GENDER_F": 0,
        "DAYS_BIRTH": 0.0,
        "DAYS_EMPLOYED": 0.0,
        "DAYS_ID_PUBLISH": 0.0,
        "DAYS_LAST_PHONE_CHANGE": 0.0,
        "DAYS_REGISTRATION": 0.0,
        "EXT_SOURCE_1": 0.0,
        "EXT_SOURCE_2": 0.0,
        "EXT_SOURCE_3": 0.0,
        "HOUR_APPR_PROCESS_START": 0,
        "NAME_CONTRACT_TYPE": 0,
        "OWN_CAR_AGE": 0.0,
        "REGION_POPULATION_RELATIVE": 0.0,
        "TOTALAREA_MODE": 0.0
    }))
    .unwrap();

    let result = service.score(&application).unwrap();
    assert!((result.probability - sigmoid(-1.0)).abs() < 1e-5);
    assert_eq!(result.decision, 0);
}
