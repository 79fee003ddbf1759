//! Champion-challenger promotion state machine
//!
//! Each model family owns one independent champion slot. A newly
//! backtested challenger auto-promotes when no champion exists and
//! otherwise promotes only on strict MAPE improvement; a tie retains
//! the incumbent. Every evaluation produces an audit record whether or
//! not a promotion happened.

use crate::backtesting::{BacktestResult, ModelMetadata};
use crate::error::Result;
use crate::utils::{mean, round4};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Outcome of evaluating a challenger against the current champion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionDecision {
    pub model_name: String,
    pub promoted: bool,
    pub new_mape: Option<f64>,
    pub champion_mape: Option<f64>,
    pub reason: String,
}

/// Audit record of one promotion evaluation, persisted even when no
/// promotion occurred
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionLog {
    pub model_name: String,
    pub old_champion_id: Option<String>,
    pub new_model_id: Option<String>,
    pub new_mape: Option<f64>,
    pub old_mape: Option<f64>,
    pub promoted: bool,
    pub reason: String,
    pub decided_at: DateTime<Utc>,
}

/// Current champion for one model family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChampionRecord {
    pub model_id: String,
    pub model_name: String,
    pub version: u32,
    pub avg_mape: Option<f64>,
}

/// Persistence boundary for champion state and promotion audit rows.
///
/// Demoting a family with no champion is a harmless no-op, not an
/// error. Demotion is a blanket operation over every flagged champion
/// of the family to tolerate data drift.
pub trait ChampionStore {
    fn find_current_champion(&self, model_name: &str) -> Result<Option<ChampionRecord>>;
    fn demote_champion(&mut self, model_name: &str) -> Result<()>;
    fn promote_champion(&mut self, model_name: &str, model_id: &str) -> Result<()>;
    fn save_model(&mut self, metadata: &ModelMetadata) -> Result<String>;
    fn save_promotion_log(&mut self, log: &PromotionLog) -> Result<()>;
    /// Recent promotion records for a family, newest first, at most `limit`
    fn find_champion_history(&self, model_name: &str, limit: usize) -> Result<Vec<PromotionLog>>;
}

#[derive(Debug, Clone)]
struct StoredModel {
    metadata: ModelMetadata,
    is_champion: bool,
}

/// In-memory champion store for tests and single-process runs
#[derive(Debug, Default)]
pub struct InMemoryChampionStore {
    models: HashMap<String, StoredModel>,
    logs: Vec<PromotionLog>,
    next_id: u64,
}

impl InMemoryChampionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChampionStore for InMemoryChampionStore {
    fn find_current_champion(&self, model_name: &str) -> Result<Option<ChampionRecord>> {
        let champion = self
            .models
            .iter()
            .filter(|(_, m)| m.is_champion && m.metadata.model_name == model_name)
            .max_by_key(|(_, m)| m.metadata.version)
            .map(|(id, m)| ChampionRecord {
                model_id: id.clone(),
                model_name: m.metadata.model_name.clone(),
                version: m.metadata.version,
                avg_mape: m
                    .metadata
                    .training_metrics
                    .as_ref()
                    .and_then(|t| t.avg_mape),
            });
        Ok(champion)
    }

    fn demote_champion(&mut self, model_name: &str) -> Result<()> {
        for model in self.models.values_mut() {
            if model.metadata.model_name == model_name {
                model.is_champion = false;
            }
        }
        Ok(())
    }

    fn promote_champion(&mut self, model_name: &str, model_id: &str) -> Result<()> {
        if let Some(model) = self.models.get_mut(model_id) {
            if model.metadata.model_name == model_name {
                model.is_champion = true;
            }
        }
        Ok(())
    }

    fn save_model(&mut self, metadata: &ModelMetadata) -> Result<String> {
        self.next_id += 1;
        let model_id = format!("model-{}", self.next_id);
        self.models.insert(
            model_id.clone(),
            StoredModel {
                metadata: metadata.clone(),
                is_champion: false,
            },
        );
        Ok(model_id)
    }

    fn save_promotion_log(&mut self, log: &PromotionLog) -> Result<()> {
        self.logs.push(log.clone());
        Ok(())
    }

    fn find_champion_history(&self, model_name: &str, limit: usize) -> Result<Vec<PromotionLog>> {
        Ok(self
            .logs
            .iter()
            .rev()
            .filter(|l| l.model_name == model_name)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Promotion rule shared by `evaluate` and metadata collection.
///
/// `avg_mape` is the challenger's average MAPE over its tested
/// products, or None when the backtest produced no metrics for it.
pub(crate) fn decide(
    model_name: &str,
    avg_mape: Option<f64>,
    champion_mape: Option<f64>,
) -> PromotionDecision {
    let Some(avg_mape) = avg_mape else {
        return PromotionDecision {
            model_name: model_name.to_string(),
            promoted: false,
            new_mape: None,
            champion_mape,
            reason: "No backtest metrics available for model".to_string(),
        };
    };
    let new_mape = round4(avg_mape);

    let Some(champion_mape) = champion_mape else {
        return PromotionDecision {
            model_name: model_name.to_string(),
            promoted: true,
            new_mape: Some(new_mape),
            champion_mape: None,
            reason: format!(
                "No existing champion, auto-promoted (MAPE {new_mape:.2}%)"
            ),
        };
    };

    // Strict improvement only; a tie retains the incumbent.
    let promoted = new_mape < champion_mape;
    let comparator = if promoted { "<" } else { ">=" };
    PromotionDecision {
        model_name: model_name.to_string(),
        promoted,
        new_mape: Some(new_mape),
        champion_mape: Some(champion_mape),
        reason: format!(
            "New MAPE ({new_mape:.2}%) {comparator} Champion MAPE ({champion_mape:.2}%)"
        ),
    }
}

/// Decides and applies champion promotions through an injected store
pub struct ChampionChallengerService<S: ChampionStore> {
    store: S,
}

impl<S: ChampionStore> ChampionChallengerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Evaluate a challenger's backtest result against the champion MAPE
    pub fn evaluate(
        &self,
        result: &BacktestResult,
        model_name: &str,
        champion_mape: Option<f64>,
    ) -> PromotionDecision {
        let avg_mape = result
            .per_product
            .get(model_name)
            .filter(|m| !m.is_empty())
            .map(|m| {
                let mapes: Vec<f64> = m.values().map(|x| x.mape).collect();
                mean(&mapes)
            });

        let decision = decide(model_name, avg_mape, champion_mape);
        info!(
            model = model_name,
            promoted = decision.promoted,
            reason = %decision.reason,
            "promotion decision"
        );
        decision
    }

    /// Apply a promotion decision, mutating champion flags when promoted.
    ///
    /// Demote and promote are two separate store operations; the store
    /// may wrap them in a transaction but this service does not require
    /// it. Always returns (and persists) the audit record.
    pub fn apply_promotion(
        &mut self,
        decision: &PromotionDecision,
        new_model_id: &str,
    ) -> Result<PromotionLog> {
        let old_champion = self.store.find_current_champion(&decision.model_name)?;

        if decision.promoted {
            self.store.demote_champion(&decision.model_name)?;
            self.store
                .promote_champion(&decision.model_name, new_model_id)?;
            info!(
                model = %decision.model_name,
                new_model_id,
                old_champion = old_champion.as_ref().map(|c| c.model_id.as_str()),
                "champion promoted"
            );
        }

        let log = PromotionLog {
            model_name: decision.model_name.clone(),
            old_champion_id: old_champion.as_ref().map(|c| c.model_id.clone()),
            new_model_id: decision.promoted.then(|| new_model_id.to_string()),
            new_mape: decision.new_mape,
            old_mape: old_champion.and_then(|c| c.avg_mape),
            promoted: decision.promoted,
            reason: decision.reason.clone(),
            decided_at: Utc::now(),
        };
        self.store.save_promotion_log(&log)?;

        Ok(log)
    }

    /// Collect per-model metadata with an explicit champion lookup.
    ///
    /// Looks up the current champion MAPE per model through the store
    /// before delegating to the shared promotion rule.
    pub fn collect_metadata_with_champion(
        &self,
        model_names: &[String],
        versions: &HashMap<String, u32>,
        result: &BacktestResult,
    ) -> Result<Vec<ModelMetadata>> {
        let mut champion_mapes: HashMap<String, Option<f64>> = HashMap::new();
        for name in model_names {
            let champion = self.store.find_current_champion(name)?;
            champion_mapes.insert(name.clone(), champion.and_then(|c| c.avg_mape));
        }

        Ok(crate::backtesting::collect_metadata(
            model_names,
            versions,
            result,
            Some(&champion_mapes),
        ))
    }
}
