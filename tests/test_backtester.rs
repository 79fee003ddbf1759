use forecast_engine::backtesting::{collect_metadata, Backtester, BASELINE_KEY};
use forecast_engine::models::default_models;
use std::collections::HashMap;

fn trending_series(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 + i as f64 * 0.5).collect()
}

fn setup() -> (Vec<String>, HashMap<String, Vec<f64>>, HashMap<String, String>) {
    let ids = vec!["p1".to_string(), "p2".to_string()];
    let mut series = HashMap::new();
    series.insert("p1".to_string(), trending_series(104));
    series.insert("p2".to_string(), trending_series(104));

    let mut classes = HashMap::new();
    classes.insert("p1".to_string(), "A".to_string());
    classes.insert("p2".to_string(), "C".to_string());

    (ids, series, classes)
}

#[test]
fn test_baseline_always_present() {
    let (ids, series, classes) = setup();
    let mut models = default_models(42);

    let result = Backtester::default()
        .run(&mut models, &ids, &series, &classes)
        .unwrap();

    assert!(result.per_product.contains_key(BASELINE_KEY));
    assert!(result.per_class.contains_key(BASELINE_KEY));
    assert_eq!(result.per_product[BASELINE_KEY].len(), 2);
    assert_eq!(result.products_tested, 2);
}

#[test]
fn test_baseline_aggregated_by_class() {
    let (ids, series, classes) = setup();
    let mut models = default_models(42);

    let result = Backtester::default()
        .run(&mut models, &ids, &series, &classes)
        .unwrap();

    let by_class = &result.per_class[BASELINE_KEY];
    assert!(by_class.contains_key("A"));
    assert!(by_class.contains_key("C"));
    assert_eq!(by_class["A"].product_count, 1);
}

#[test]
fn test_short_series_excluded_entirely() {
    let ids = vec!["long".to_string(), "short".to_string()];
    let mut series = HashMap::new();
    series.insert("long".to_string(), trending_series(104));
    series.insert("short".to_string(), vec![5.0; 13]);

    let mut models = default_models(42);
    let result = Backtester::default()
        .run(&mut models, &ids, &series, &HashMap::new())
        .unwrap();

    assert_eq!(result.products_tested, 1);
    assert!(!result.per_product[BASELINE_KEY].contains_key("short"));
    for (_, per_product) in &result.per_product {
        assert!(!per_product.contains_key("short"));
    }
}

#[test]
fn test_empty_survivor_set_short_circuits() {
    let ids = vec!["p1".to_string()];
    let mut series = HashMap::new();
    series.insert("p1".to_string(), vec![1.0; 5]);

    let mut models = default_models(42);
    let result = Backtester::default()
        .run(&mut models, &ids, &series, &HashMap::new())
        .unwrap();

    assert_eq!(result.products_tested, 0);
    assert!(result.per_product.is_empty());
    assert!(result.baseline_comparisons.is_empty());
}

#[test]
fn test_baseline_comparisons_cover_every_model() {
    let (ids, series, classes) = setup();
    let mut models = default_models(42);

    let result = Backtester::default()
        .run(&mut models, &ids, &series, &classes)
        .unwrap();

    let model_count = result.per_product.len() - 1; // minus BASELINE
    assert_eq!(result.baseline_comparisons.len(), model_count * 2);
    for c in &result.baseline_comparisons {
        assert!((c.mape_improvement - (c.baseline_mape - c.model_mape)).abs() < 0.005);
        assert_eq!(c.model_beats_baseline, c.baseline_mape - c.model_mape > 0.0);
    }
}

#[test]
fn test_collect_metadata_baseline_only_mode() {
    let (ids, series, classes) = setup();
    let mut models = default_models(42);

    let result = Backtester::default()
        .run(&mut models, &ids, &series, &classes)
        .unwrap();

    let model_names: Vec<String> = result
        .per_product
        .keys()
        .filter(|k| k.as_str() != BASELINE_KEY)
        .cloned()
        .collect();

    let metadata = collect_metadata(&model_names, &HashMap::new(), &result, None);

    assert_eq!(metadata.len(), model_names.len());
    for md in &metadata {
        let tm = md.training_metrics.as_ref().unwrap();
        assert!(tm.avg_mape.is_some());
        assert_eq!(tm.products_tested, 2);
        // Baseline-only mode embeds no promotion decision
        assert!(tm.promotion_log.is_none());
    }
}

#[test]
fn test_collect_metadata_with_champion_mapes() {
    let (ids, series, classes) = setup();
    let mut models = default_models(42);

    let result = Backtester::default()
        .run(&mut models, &ids, &series, &classes)
        .unwrap();

    let names = vec!["NAIVE".to_string()];
    let mut champions = HashMap::new();
    champions.insert("NAIVE".to_string(), None::<f64>);

    let metadata = collect_metadata(&names, &HashMap::new(), &result, Some(&champions));

    let tm = metadata[0].training_metrics.as_ref().unwrap();
    let log = tm.promotion_log.as_ref().unwrap();
    // No champion on record: auto-promoted
    assert!(log.promoted);
    assert!(metadata[0].is_champion);
}

#[test]
fn test_metadata_for_model_without_metrics() {
    let (ids, series, classes) = setup();
    let mut models = default_models(42);

    let result = Backtester::default()
        .run(&mut models, &ids, &series, &classes)
        .unwrap();

    let names = vec!["IMAGINARY".to_string()];
    let mut champions = HashMap::new();
    champions.insert("IMAGINARY".to_string(), Some(10.0));

    let metadata = collect_metadata(&names, &HashMap::new(), &result, Some(&champions));

    let tm = metadata[0].training_metrics.as_ref().unwrap();
    assert!(tm.avg_mape.is_none());
    assert_eq!(tm.products_tested, 0);
    let log = tm.promotion_log.as_ref().unwrap();
    assert!(!log.promoted);
    assert_eq!(log.reason, "No backtest metrics available for model");
}
