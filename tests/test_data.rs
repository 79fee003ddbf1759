use forecast_engine::data::{weeks_of_history, ClasseAbc, DemandLoader, PadraoDemanda};
use std::io::Write;
use std::str::FromStr;
use tempfile::NamedTempFile;

fn write_csv(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_demand_csv_preserves_order() {
    let file = write_csv(
        "produto_id,semana,quantidade\n\
         SKU-1,1,10.0\n\
         SKU-1,2,12.5\n\
         SKU-2,1,3.0\n\
         SKU-1,3,11.0\n",
    );

    let series = DemandLoader::from_csv(file.path()).unwrap();

    assert_eq!(series.len(), 2);
    assert_eq!(series["SKU-1"], vec![10.0, 12.5, 11.0]);
    assert_eq!(series["SKU-2"], vec![3.0]);
}

#[test]
fn test_empty_csv_is_an_error() {
    let file = write_csv("produto_id,semana,quantidade\n");
    let err = DemandLoader::from_csv(file.path()).unwrap_err();
    assert!(err.to_string().contains("No demand rows"));
}

#[test]
fn test_malformed_row_is_an_error() {
    let file = write_csv("produto_id,semana,quantidade\nSKU-1,one,ten\n");
    assert!(DemandLoader::from_csv(file.path()).is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    assert!(DemandLoader::from_csv("/nonexistent/demand.csv").is_err());
}

#[test]
fn test_weeks_of_history() {
    let file = write_csv(
        "produto_id,semana,quantidade\n\
         SKU-1,1,10.0\n\
         SKU-1,2,12.5\n\
         SKU-2,1,3.0\n",
    );
    let series = DemandLoader::from_csv(file.path()).unwrap();
    let weeks = weeks_of_history(&series);

    assert_eq!(weeks["SKU-1"], 2);
    assert_eq!(weeks["SKU-2"], 1);
}

#[test]
fn test_classe_abc_round_trip() {
    for (label, classe) in [("A", ClasseAbc::A), ("B", ClasseAbc::B), ("C", ClasseAbc::C)] {
        assert_eq!(ClasseAbc::from_str(label).unwrap(), classe);
        assert_eq!(classe.as_str(), label);
    }
    assert!(ClasseAbc::from_str("D").is_err());
}

#[test]
fn test_padrao_demanda_parsing() {
    assert_eq!(
        PadraoDemanda::from_str("INTERMITENTE").unwrap(),
        PadraoDemanda::Intermitente
    );
    assert_eq!(PadraoDemanda::from_str("LUMPY").unwrap(), PadraoDemanda::Lumpy);
    assert!(PadraoDemanda::from_str("SEASONAL").is_err());
}
