//! SKU segmentation: groups classified products by assigned model
//!
//! Each product is routed through the registry and bucketed under its
//! primary model name, so every model family trains and predicts over
//! its own cohort in one batch. The ensemble flag travels with each
//! product's selection for downstream consumers.

use crate::data::SkuClassification;
use crate::registry::{ModelRegistry, ModelSelection};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

/// One model's cohort of products with their individual selections
#[derive(Debug, Clone)]
pub struct SkuSegment {
    pub model_name: String,
    pub produto_ids: Vec<String>,
    pub selections: HashMap<String, ModelSelection>,
}

impl SkuSegment {
    fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            produto_ids: Vec::new(),
            selections: HashMap::new(),
        }
    }
}

/// Groups classified SKUs into per-model segments
#[derive(Debug, Clone, Default)]
pub struct SkuSegmenter {
    registry: ModelRegistry,
}

impl SkuSegmenter {
    pub fn new(registry: ModelRegistry) -> Self {
        Self { registry }
    }

    /// Segment the classified SKUs by assigned primary model.
    ///
    /// Input order is preserved within each segment.
    pub fn segment(
        &self,
        classifications: &[SkuClassification],
        weeks_by_product: &HashMap<String, usize>,
    ) -> BTreeMap<String, SkuSegment> {
        let mut segments: BTreeMap<String, SkuSegment> = BTreeMap::new();

        for c in classifications {
            let selection = self.registry.select_model(
                c.classe_abc,
                c.padrao_demanda,
                c.modelo_forecast_sugerido.as_deref(),
                weeks_by_product.get(&c.produto_id).copied(),
            );

            let segment_name = selection.primary.clone();
            let segment = segments
                .entry(segment_name.clone())
                .or_insert_with(|| SkuSegment::new(&segment_name));
            segment.produto_ids.push(c.produto_id.clone());
            segment.selections.insert(c.produto_id.clone(), selection);
        }

        info!(
            segments = segments.len(),
            products = classifications.len(),
            "segmented products by model"
        );

        segments
    }
}
