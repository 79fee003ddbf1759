use forecast_engine::backtesting::champion::{
    ChampionChallengerService, ChampionStore, InMemoryChampionStore,
};
use forecast_engine::backtesting::{BacktestResult, ModelMetadata, TrainingMetrics};
use forecast_engine::models::BacktestMetrics;
use std::collections::HashMap;

fn result_with_mapes(model_name: &str, mapes: &[(&str, f64)]) -> BacktestResult {
    let mut result = BacktestResult::default();
    let per_product: HashMap<String, BacktestMetrics> = mapes
        .iter()
        .map(|(pid, mape)| {
            (
                pid.to_string(),
                BacktestMetrics { mape: *mape, mae: 1.0, rmse: 1.0, bias: 0.0 },
            )
        })
        .collect();
    result.products_tested = per_product.len();
    result.per_product.insert(model_name.to_string(), per_product);
    result
}

fn metadata(model_name: &str, avg_mape: f64) -> ModelMetadata {
    ModelMetadata {
        model_name: model_name.to_string(),
        version: 1,
        training_metrics: Some(TrainingMetrics {
            avg_mape: Some(avg_mape),
            avg_mae: Some(1.0),
            products_tested: 2,
            promotion_log: None,
        }),
        artifact_path: None,
        is_champion: false,
    }
}

#[test]
fn test_promotes_on_strict_improvement() {
    let service = ChampionChallengerService::new(InMemoryChampionStore::new());
    let result = result_with_mapes("TFT", &[("p1", 5.0), ("p2", 7.0)]);

    let decision = service.evaluate(&result, "TFT", Some(10.0));

    assert!(decision.promoted);
    assert_eq!(decision.new_mape, Some(6.0));
    assert_eq!(decision.champion_mape, Some(10.0));
    assert_eq!(decision.reason, "New MAPE (6.00%) < Champion MAPE (10.00%)");
}

#[test]
fn test_does_not_promote_when_worse() {
    let service = ChampionChallengerService::new(InMemoryChampionStore::new());
    let result = result_with_mapes("TFT", &[("p1", 12.0), ("p2", 14.0)]);

    let decision = service.evaluate(&result, "TFT", Some(10.0));

    assert!(!decision.promoted);
    assert_eq!(decision.new_mape, Some(13.0));
    assert_eq!(decision.reason, "New MAPE (13.00%) >= Champion MAPE (10.00%)");
}

#[test]
fn test_tie_retains_incumbent() {
    let service = ChampionChallengerService::new(InMemoryChampionStore::new());
    let result = result_with_mapes("TFT", &[("p1", 10.0), ("p2", 10.0)]);

    let decision = service.evaluate(&result, "TFT", Some(10.0));

    assert!(!decision.promoted);
}

#[test]
fn test_auto_promotes_with_no_champion() {
    let service = ChampionChallengerService::new(InMemoryChampionStore::new());
    // Even a poor challenger is promoted when nothing exists yet
    let result = result_with_mapes("TFT", &[("p1", 95.0)]);

    let decision = service.evaluate(&result, "TFT", None);

    assert!(decision.promoted);
    assert!(decision.reason.contains("auto-promoted"));
}

#[test]
fn test_no_metrics_means_no_promotion() {
    let service = ChampionChallengerService::new(InMemoryChampionStore::new());
    let result = BacktestResult::default();

    let decision = service.evaluate(&result, "TFT", None);

    assert!(!decision.promoted);
    assert_eq!(decision.reason, "No backtest metrics available for model");
}

#[test]
fn test_apply_promotion_flips_champion_flag() {
    let mut store = InMemoryChampionStore::new();
    let old_id = store.save_model(&metadata("TFT", 10.0)).unwrap();
    store.promote_champion("TFT", &old_id).unwrap();
    let new_id = store.save_model(&metadata("TFT", 6.0)).unwrap();

    let mut service = ChampionChallengerService::new(store);
    let result = result_with_mapes("TFT", &[("p1", 6.0)]);
    let decision = service.evaluate(&result, "TFT", Some(10.0));
    assert!(decision.promoted);

    let log = service.apply_promotion(&decision, &new_id).unwrap();

    assert!(log.promoted);
    assert_eq!(log.old_champion_id, Some(old_id));
    assert_eq!(log.new_model_id, Some(new_id.clone()));

    let champion = service
        .store()
        .find_current_champion("TFT")
        .unwrap()
        .unwrap();
    assert_eq!(champion.model_id, new_id);
}

#[test]
fn test_apply_promotion_without_promotion_mutates_nothing() {
    let mut store = InMemoryChampionStore::new();
    let old_id = store.save_model(&metadata("TFT", 8.0)).unwrap();
    store.promote_champion("TFT", &old_id).unwrap();
    let new_id = store.save_model(&metadata("TFT", 12.0)).unwrap();

    let mut service = ChampionChallengerService::new(store);
    let result = result_with_mapes("TFT", &[("p1", 12.0)]);
    let decision = service.evaluate(&result, "TFT", Some(8.0));
    assert!(!decision.promoted);

    let log = service.apply_promotion(&decision, &new_id).unwrap();

    // Audit record exists even without a promotion
    assert!(!log.promoted);
    assert_eq!(log.old_champion_id, Some(old_id.clone()));
    assert!(log.new_model_id.is_none());

    let champion = service
        .store()
        .find_current_champion("TFT")
        .unwrap()
        .unwrap();
    assert_eq!(champion.model_id, old_id);
}

#[test]
fn test_demote_with_no_champion_is_noop() {
    let mut store = InMemoryChampionStore::new();
    store.demote_champion("TFT").unwrap();
    assert!(store.find_current_champion("TFT").unwrap().is_none());
}

#[test]
fn test_champion_slots_are_independent_per_family() {
    let mut store = InMemoryChampionStore::new();
    let tft_id = store.save_model(&metadata("TFT", 10.0)).unwrap();
    let ets_id = store.save_model(&metadata("ETS", 15.0)).unwrap();
    store.promote_champion("TFT", &tft_id).unwrap();
    store.promote_champion("ETS", &ets_id).unwrap();

    store.demote_champion("TFT").unwrap();

    assert!(store.find_current_champion("TFT").unwrap().is_none());
    assert!(store.find_current_champion("ETS").unwrap().is_some());
}

#[test]
fn test_promotion_history_is_persisted() {
    let mut store = InMemoryChampionStore::new();
    let id = store.save_model(&metadata("TFT", 6.0)).unwrap();

    let mut service = ChampionChallengerService::new(store);
    let result = result_with_mapes("TFT", &[("p1", 6.0)]);

    let first = service.evaluate(&result, "TFT", None);
    service.apply_promotion(&first, &id).unwrap();
    let second = service.evaluate(&result, "TFT", Some(6.0));
    service.apply_promotion(&second, &id).unwrap();

    // Newest decision first.
    let history = service.store().find_champion_history("TFT", 10).unwrap();
    assert_eq!(history.len(), 2);
    assert!(!history[0].promoted);
    assert!(history[1].promoted);

    let limited = service.store().find_champion_history("TFT", 1).unwrap();
    assert_eq!(limited.len(), 1);
    assert!(!limited[0].promoted);

    assert!(service.store().find_champion_history("ETS", 10).unwrap().is_empty());
}

#[test]
fn test_collect_metadata_with_champion_lookup() {
    let mut store = InMemoryChampionStore::new();
    let old_id = store.save_model(&metadata("TFT", 20.0)).unwrap();
    store.promote_champion("TFT", &old_id).unwrap();

    let service = ChampionChallengerService::new(store);
    let result = result_with_mapes("TFT", &[("p1", 5.0), ("p2", 7.0)]);

    let names = vec!["TFT".to_string()];
    let rows = service
        .collect_metadata_with_champion(&names, &HashMap::new(), &result)
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert!(rows[0].is_champion);
    let log = rows[0]
        .training_metrics
        .as_ref()
        .unwrap()
        .promotion_log
        .as_ref()
        .unwrap();
    assert_eq!(log.champion_mape, Some(20.0));
}
