//! Model registry: routes each SKU to a forecast model family
//!
//! Selection is a pure function of the SKU's ABC class, demand pattern,
//! manual override, and weeks of available history. The same inputs
//! always yield the same selection.

use crate::data::{ClasseAbc, PadraoDemanda};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// History length below which complex models are not trusted
pub const MIN_WEEKS_FOR_COMPLEX: usize = 40;

/// Outcome of routing one SKU through the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSelection {
    pub primary: String,
    pub fallback: String,
    pub ensemble: bool,
    pub ensemble_weights: Option<BTreeMap<String, f64>>,
}

impl ModelSelection {
    fn new(primary: &str, fallback: &str) -> Self {
        Self {
            primary: primary.to_string(),
            fallback: fallback.to_string(),
            ensemble: false,
            ensemble_weights: None,
        }
    }

    fn with_ensemble(mut self) -> Self {
        self.ensemble = true;
        self.ensemble_weights = Some(crate::models::ensemble::default_weights());
        self
    }
}

/// Routes SKUs to model families by class and demand pattern
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    min_weeks_for_complex: usize,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(MIN_WEEKS_FOR_COMPLEX)
    }
}

impl ModelRegistry {
    pub fn new(min_weeks_for_complex: usize) -> Self {
        Self { min_weeks_for_complex }
    }

    /// Select the model family for one SKU.
    ///
    /// Precedence: manual override, then insufficient history, then
    /// demand pattern, then the class/pattern matrix. The ensemble flag
    /// is set only for class-A SKUs whose primary resolves to TFT.
    pub fn select_model(
        &self,
        classe_abc: ClasseAbc,
        padrao_demanda: PadraoDemanda,
        modelo_override: Option<&str>,
        weeks_of_data: Option<usize>,
    ) -> ModelSelection {
        if let Some(name) = modelo_override {
            debug!(model = name, "manual model override");
            return ModelSelection::new(name, "NAIVE");
        }

        if let Some(weeks) = weeks_of_data {
            if weeks < self.min_weeks_for_complex {
                debug!(weeks, "insufficient history, routing to ETS");
                return ModelSelection::new("ETS", "NAIVE");
            }
        }

        let selection = match padrao_demanda {
            PadraoDemanda::Intermitente => ModelSelection::new("CROSTON", "SBA"),
            PadraoDemanda::Lumpy => ModelSelection::new("TSB", "BOOTSTRAP"),
            PadraoDemanda::Regular => match classe_abc {
                ClasseAbc::A | ClasseAbc::B => ModelSelection::new("TFT", "LGBM"),
                ClasseAbc::C => ModelSelection::new("ETS", "NAIVE"),
            },
            PadraoDemanda::Erratico => match classe_abc {
                ClasseAbc::A | ClasseAbc::B => ModelSelection::new("TFT", "ETS"),
                ClasseAbc::C => ModelSelection::new("ETS", "NAIVE"),
            },
        };

        if classe_abc == ClasseAbc::A && selection.primary == "TFT" {
            return selection.with_ensemble();
        }

        selection
    }

    /// All model family names the registry can route to, sorted
    pub fn get_all_model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = [
            "BOOTSTRAP", "CROSTON", "ENSEMBLE", "ETS", "LGBM", "NAIVE", "SBA", "TFT", "TSB",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        names.sort();
        names
    }
}
