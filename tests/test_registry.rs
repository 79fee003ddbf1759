use forecast_engine::data::{ClasseAbc, PadraoDemanda};
use forecast_engine::registry::{ModelRegistry, MIN_WEEKS_FOR_COMPLEX};
use pretty_assertions::assert_eq;

#[test]
fn test_override_wins_over_everything() {
    let registry = ModelRegistry::default();

    // Override applies even with insufficient data
    let selection = registry.select_model(
        ClasseAbc::A,
        PadraoDemanda::Regular,
        Some("NAIVE"),
        Some(5),
    );
    assert_eq!(selection.primary, "NAIVE");
    assert_eq!(selection.fallback, "NAIVE");
    assert!(!selection.ensemble);
}

#[test]
fn test_insufficient_history_routes_to_ets() {
    let registry = ModelRegistry::default();
    let selection = registry.select_model(
        ClasseAbc::A,
        PadraoDemanda::Regular,
        None,
        Some(MIN_WEEKS_FOR_COMPLEX - 1),
    );
    assert_eq!(selection.primary, "ETS");
    assert_eq!(selection.fallback, "NAIVE");
    assert!(!selection.ensemble);
}

#[test]
fn test_intermittent_routes_by_pattern_regardless_of_class() {
    let registry = ModelRegistry::default();
    for classe in [ClasseAbc::A, ClasseAbc::B, ClasseAbc::C] {
        let selection =
            registry.select_model(classe, PadraoDemanda::Intermitente, None, Some(100));
        assert_eq!(selection.primary, "CROSTON");
        assert_eq!(selection.fallback, "SBA");
    }
}

#[test]
fn test_lumpy_routes_to_tsb() {
    let registry = ModelRegistry::default();
    let selection = registry.select_model(ClasseAbc::B, PadraoDemanda::Lumpy, None, Some(100));
    assert_eq!(selection.primary, "TSB");
    assert_eq!(selection.fallback, "BOOTSTRAP");
}

#[test]
fn test_regular_matrix() {
    let registry = ModelRegistry::default();

    let a = registry.select_model(ClasseAbc::A, PadraoDemanda::Regular, None, Some(100));
    assert_eq!(a.primary, "TFT");
    assert_eq!(a.fallback, "LGBM");

    let b = registry.select_model(ClasseAbc::B, PadraoDemanda::Regular, None, Some(100));
    assert_eq!(b.primary, "TFT");
    assert!(!b.ensemble);

    let c = registry.select_model(ClasseAbc::C, PadraoDemanda::Regular, None, Some(100));
    assert_eq!(c.primary, "ETS");
    assert_eq!(c.fallback, "NAIVE");
}

#[test]
fn test_erratic_matrix() {
    let registry = ModelRegistry::default();

    let a = registry.select_model(ClasseAbc::A, PadraoDemanda::Erratico, None, Some(100));
    assert_eq!(a.primary, "TFT");
    assert_eq!(a.fallback, "ETS");

    let c = registry.select_model(ClasseAbc::C, PadraoDemanda::Erratico, None, Some(100));
    assert_eq!(c.primary, "ETS");
    assert_eq!(c.fallback, "NAIVE");
}

#[test]
fn test_ensemble_only_for_class_a_tft() {
    let registry = ModelRegistry::default();

    let a = registry.select_model(ClasseAbc::A, PadraoDemanda::Regular, None, Some(100));
    assert!(a.ensemble);
    let weights = a.ensemble_weights.expect("class A TFT carries weights");
    assert_eq!(weights["TFT"], 0.6);
    assert_eq!(weights["LGBM"], 0.4);

    let b = registry.select_model(ClasseAbc::B, PadraoDemanda::Regular, None, Some(100));
    assert!(!b.ensemble);
    assert!(b.ensemble_weights.is_none());
}

#[test]
fn test_selection_is_deterministic() {
    let registry = ModelRegistry::default();
    let first = registry.select_model(ClasseAbc::A, PadraoDemanda::Erratico, None, Some(80));
    let second = registry.select_model(ClasseAbc::A, PadraoDemanda::Erratico, None, Some(80));
    assert_eq!(first, second);
}

#[test]
fn test_missing_weeks_is_treated_as_sufficient() {
    let registry = ModelRegistry::default();
    let selection = registry.select_model(ClasseAbc::A, PadraoDemanda::Regular, None, None);
    assert_eq!(selection.primary, "TFT");
}

#[test]
fn test_all_model_names_sorted() {
    let registry = ModelRegistry::default();
    let names = registry.get_all_model_names();
    assert_eq!(
        names,
        vec!["BOOTSTRAP", "CROSTON", "ENSEMBLE", "ETS", "LGBM", "NAIVE", "SBA", "TFT", "TSB"]
    );
}

#[test]
fn test_configurable_complexity_threshold() {
    let registry = ModelRegistry::new(10);
    let selection = registry.select_model(ClasseAbc::A, PadraoDemanda::Regular, None, Some(20));
    // 20 weeks clears the lowered threshold
    assert_eq!(selection.primary, "TFT");
}
