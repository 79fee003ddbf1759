//! SKU classification domain types and demand-history loading

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

/// ABC revenue-contribution class of a SKU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClasseAbc {
    A,
    B,
    C,
}

impl ClasseAbc {
    /// Class label as persisted ("A", "B", "C")
    pub fn as_str(&self) -> &'static str {
        match self {
            ClasseAbc::A => "A",
            ClasseAbc::B => "B",
            ClasseAbc::C => "C",
        }
    }
}

impl FromStr for ClasseAbc {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "A" => Ok(ClasseAbc::A),
            "B" => Ok(ClasseAbc::B),
            "C" => Ok(ClasseAbc::C),
            other => Err(ForecastError::ValidationError(format!(
                "Unknown ABC class: {other}"
            ))),
        }
    }
}

/// Demand pattern of a SKU's historical series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PadraoDemanda {
    /// Smooth, continuous demand
    Regular,
    /// Frequent zero weeks between demand occurrences
    Intermitente,
    /// Continuous but highly volatile demand
    Erratico,
    /// Rare, large, irregular spikes
    Lumpy,
}

impl FromStr for PadraoDemanda {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "REGULAR" => Ok(PadraoDemanda::Regular),
            "INTERMITENTE" => Ok(PadraoDemanda::Intermitente),
            "ERRATICO" => Ok(PadraoDemanda::Erratico),
            "LUMPY" => Ok(PadraoDemanda::Lumpy),
            other => Err(ForecastError::ValidationError(format!(
                "Unknown demand pattern: {other}"
            ))),
        }
    }
}

/// SKU classification record, produced by an external classification process.
///
/// Immutable per planning cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkuClassification {
    pub produto_id: String,
    pub classe_abc: ClasseAbc,
    pub padrao_demanda: PadraoDemanda,
    /// User-specified model override; wins over every registry rule
    pub modelo_forecast_sugerido: Option<String>,
}

impl SkuClassification {
    pub fn new(produto_id: impl Into<String>, classe_abc: ClasseAbc, padrao: PadraoDemanda) -> Self {
        Self {
            produto_id: produto_id.into(),
            classe_abc,
            padrao_demanda: padrao,
            modelo_forecast_sugerido: None,
        }
    }

    pub fn with_override(mut self, modelo: impl Into<String>) -> Self {
        self.modelo_forecast_sugerido = Some(modelo.into());
        self
    }
}

/// Loader for weekly demand history in long CSV format
#[derive(Debug)]
pub struct DemandLoader;

/// One row of the long-format demand CSV: `produto_id,semana,quantidade`
#[derive(Debug, Deserialize)]
struct DemandRow {
    produto_id: String,
    #[allow(dead_code)]
    semana: u32,
    quantidade: f64,
}

impl DemandLoader {
    /// Load weekly demand series per product from a CSV file.
    ///
    /// Rows are expected in chronological order per product; the loader
    /// preserves file order within each series.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<HashMap<String, Vec<f64>>> {
        let file = File::open(path)?;
        let mut reader = csv::Reader::from_reader(file);

        let mut series_by_product: HashMap<String, Vec<f64>> = HashMap::new();
        for row in reader.deserialize() {
            let row: DemandRow = row?;
            series_by_product
                .entry(row.produto_id)
                .or_default()
                .push(row.quantidade);
        }

        if series_by_product.is_empty() {
            return Err(ForecastError::DataError(
                "No demand rows found in CSV".to_string(),
            ));
        }

        Ok(series_by_product)
    }
}

/// Derive weeks-of-history per product from loaded series
pub fn weeks_of_history(series_by_product: &HashMap<String, Vec<f64>>) -> HashMap<String, usize> {
    series_by_product
        .iter()
        .map(|(pid, series)| (pid.clone(), series.len()))
        .collect()
}
