use forecast_engine::data::{ClasseAbc, PadraoDemanda, SkuClassification};
use forecast_engine::segmentation::SkuSegmenter;
use pretty_assertions::assert_eq;
use std::collections::HashMap;

fn weeks(entries: &[(&str, usize)]) -> HashMap<String, usize> {
    entries
        .iter()
        .map(|(pid, w)| (pid.to_string(), *w))
        .collect()
}

#[test]
fn test_grouping_by_primary_model() {
    let classifications = vec![
        SkuClassification::new("p1", ClasseAbc::A, PadraoDemanda::Regular),
        SkuClassification::new("p2", ClasseAbc::A, PadraoDemanda::Regular),
        SkuClassification::new("p3", ClasseAbc::C, PadraoDemanda::Regular),
    ];
    let weeks = weeks(&[("p1", 104), ("p2", 104), ("p3", 104)]);

    let segments = SkuSegmenter::default().segment(&classifications, &weeks);

    assert_eq!(segments.len(), 2);
    assert_eq!(segments["TFT"].produto_ids, vec!["p1", "p2"]);
    assert_eq!(segments["ETS"].produto_ids, vec!["p3"]);
}

#[test]
fn test_order_preserved_within_segment() {
    let classifications = vec![
        SkuClassification::new("z-last", ClasseAbc::B, PadraoDemanda::Regular),
        SkuClassification::new("a-first", ClasseAbc::B, PadraoDemanda::Regular),
    ];
    let weeks = weeks(&[("z-last", 104), ("a-first", 104)]);

    let segments = SkuSegmenter::default().segment(&classifications, &weeks);
    assert_eq!(segments["TFT"].produto_ids, vec!["z-last", "a-first"]);
}

#[test]
fn test_selection_travels_with_each_product() {
    let classifications = vec![
        SkuClassification::new("p1", ClasseAbc::A, PadraoDemanda::Regular),
        SkuClassification::new("p2", ClasseAbc::B, PadraoDemanda::Regular),
    ];
    let weeks = weeks(&[("p1", 104), ("p2", 104)]);

    let segments = SkuSegmenter::default().segment(&classifications, &weeks);
    let tft = &segments["TFT"];

    // Class A carries the ensemble flag, class B does not
    assert!(tft.selections["p1"].ensemble);
    assert!(!tft.selections["p2"].ensemble);
}

#[test]
fn test_override_forces_segment() {
    let classifications = vec![
        SkuClassification::new("p1", ClasseAbc::A, PadraoDemanda::Regular).with_override("NAIVE"),
    ];
    let weeks = weeks(&[("p1", 104)]);

    let segments = SkuSegmenter::default().segment(&classifications, &weeks);
    assert_eq!(segments["NAIVE"].produto_ids, vec!["p1"]);
}

#[test]
fn test_short_history_lands_in_ets_segment() {
    let classifications = vec![
        SkuClassification::new("p1", ClasseAbc::A, PadraoDemanda::Regular),
    ];
    let weeks = weeks(&[("p1", 10)]);

    let segments = SkuSegmenter::default().segment(&classifications, &weeks);
    assert!(segments.contains_key("ETS"));
    assert!(!segments.contains_key("TFT"));
}
