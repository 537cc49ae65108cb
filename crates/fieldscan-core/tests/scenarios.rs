//! End-to-end extraction scenarios over the built-in insurance schema.

use std::sync::Arc;

use fieldscan_core::{
    ExtractionConfig, ExtractionResult, Extractor, FieldSchema, Provenance, RawDocument,
};
use pretty_assertions::assert_eq;

const POLICY_SCHEDULE: &str = "NATIONAL MOTOR INSURANCE CO. LTD.
Private Car Package Policy - Schedule
Policy No: 3001/2345/6789/00
Insured Name: RAMESH KUMAR SHARMA
Period of Insurance: 12/03/2024 to 11/03/2025

Engine No      Chassis No
----------     ----------
K12MN1234567   MA3EXA12345678901

Car Model: Maruti Swift VXI
Body Type: Hatchback
\u{000c}PREMIUM DETAILS
Net OD Premium: Rs. 8,450.00
Net Liability Premium: Rs. 3,416.00
Total Premium: Rs. 11,866.00
GST @ 18%: Rs. 2,135.88
Gross Premium: Rs. 14,001.88

Payment Details
Cheque No | 458812
Bank Name | HDFC Bank Ltd.
Cheque Date | 05-May-2024
";

fn extractor() -> Extractor {
    extractor_with(ExtractionConfig::default())
}

fn extractor_with(config: ExtractionConfig) -> Extractor {
    Extractor::new(Arc::new(FieldSchema::builtin().unwrap()), config)
}

fn extract(text: &str) -> ExtractionResult {
    extractor().extract(&RawDocument::from_text(text)).unwrap()
}

#[test]
fn direct_match_on_labelled_line() {
    let result = extract("Policy No: ABC12345");
    let policy = result.get("policy_no").unwrap();

    assert_eq!(policy.value, "ABC12345");
    assert_eq!(policy.provenance, Provenance::Direct);
    assert!(policy.confidence >= 0.90);
}

#[test]
fn contextual_match_on_next_line() {
    let result = extract("Certificate Number\nABC98765");
    let policy = result.get("policy_no").unwrap();

    assert_eq!(policy.value, "ABC98765");
    assert_eq!(policy.provenance, Provenance::Contextual);
    assert!((0.80..=0.89).contains(&policy.confidence));
}

#[test]
fn table_header_columns() {
    let result = extract("Policy No | Insured Name\nABC111 | John Doe");

    let policy = result.get("policy_no").unwrap();
    assert_eq!(policy.value, "ABC111");
    assert_eq!(policy.provenance, Provenance::Table);
    assert!((0.70..=0.79).contains(&policy.confidence));

    let insured = result.get("insured_name").unwrap();
    assert_eq!(insured.value, "John Doe");
    assert_eq!(insured.provenance, Provenance::Table);
    assert!((0.70..=0.79).contains(&insured.confidence));
}

#[test]
fn fuzzy_match_on_misspelled_label() {
    let result = extract("Polcy No: XYZ555");
    let policy = result.get("policy_no").unwrap();

    assert_eq!(policy.value, "XYZ555");
    assert_eq!(policy.provenance, Provenance::Fuzzy);
    assert!((0.76..=0.78).contains(&policy.confidence));
}

#[test]
fn fuzzy_pass_can_be_disabled() {
    let engine = extractor_with(ExtractionConfig {
        enable_fuzzy: false,
        ..ExtractionConfig::default()
    });
    let result = engine
        .extract(&RawDocument::from_text("Polcy No: XYZ555"))
        .unwrap();
    assert!(result.get("policy_no").is_none());
}

#[test]
fn money_is_normalized() {
    let result = extract("Premium: Rs. 12,345.00");
    assert_eq!(result.value("total_premium"), Some("12345.00"));
}

#[test]
fn unmatched_fields_are_missing() {
    let result = extract("Thank you for your business.");

    assert_eq!(result.found_count(), 0);
    assert_eq!(result.missing.len(), 15);
    assert!(result.get("policy_no").is_none());
}

#[test]
fn full_policy_schedule() {
    let result = extract(POLICY_SCHEDULE);

    let expected = [
        ("policy_no", "3001/2345/6789/00"),
        ("insured_name", "Ramesh Kumar Sharma"),
        ("insurer_name", "National Motor Insurance Co. Ltd."),
        ("engine_no", "K12MN1234567"),
        ("chassis_no", "MA3EXA12345678901"),
        ("cheque_no", "458812"),
        ("cheque_date", "05/05/2024"),
        ("bank_name", "Hdfc Bank Ltd"),
        ("net_od_premium", "8450.00"),
        ("net_liability_premium", "3416.00"),
        ("total_premium", "11866.00"),
        ("gst_amount", "2135.88"),
        ("gross_premium", "14001.88"),
        ("car_model", "Maruti Swift VXI"),
        ("body_type", "Hatchback"),
    ];
    for (field, value) in expected {
        assert_eq!(result.value(field), Some(value), "field {}", field);
    }
    assert!(result.missing.is_empty());

    assert_eq!(result.get("engine_no").unwrap().provenance, Provenance::Table);
    assert_eq!(result.get("cheque_no").unwrap().provenance, Provenance::Contextual);
    assert_eq!(result.get("gross_premium").unwrap().page, 2);
}

#[test]
fn every_candidate_sits_in_its_tier_band() {
    let result = extract(POLICY_SCHEDULE);
    for candidate in &result.candidates {
        let (low, high) = candidate.provenance.confidence_range();
        assert!(
            candidate.confidence >= low && candidate.confidence <= high,
            "{:?}",
            candidate
        );
    }
}

#[test]
fn winners_are_already_clean() {
    let schema = FieldSchema::builtin().unwrap();
    let result = extract(POLICY_SCHEDULE);
    for (field, winner) in &result.fields {
        let validator = schema.lookup(field).unwrap().validator();
        assert_eq!(validator.clean(&winner.value), Some(winner.value.clone()));
    }
}

#[test]
fn extraction_is_deterministic() {
    let engine = extractor();
    let doc = RawDocument::from_text(POLICY_SCHEDULE);
    let first = engine.extract(&doc).unwrap();
    for _ in 0..5 {
        assert_eq!(engine.extract(&doc).unwrap(), first);
    }
}

#[test]
fn empty_document_fails() {
    let engine = extractor();
    assert!(engine.extract(&RawDocument::default()).is_err());
}

#[test]
fn same_line_value_stops_at_next_label() {
    let result = extract("Insured: John Doe Policy No: ABC123");

    assert_eq!(result.value("insured_name"), Some("John Doe"));
    assert_eq!(result.value("policy_no"), Some("ABC123"));
    assert_eq!(result.get("insured_name").unwrap().provenance, Provenance::Contextual);
}

#[test]
fn label_without_value_does_not_borrow_next_label() {
    let result = extract("Engine Number\nChassis No: MA3EXA12345678901");
    assert!(result.get("engine_no").is_none());
    assert_eq!(result.value("chassis_no"), Some("MA3EXA12345678901"));

    let result = extract("PREMIUM DETAILS\nNet OD Premium: Rs. 8,450.00");
    assert!(result.get("total_premium").is_none());
    assert_eq!(result.value("net_od_premium"), Some("8450.00"));
}

#[test]
fn name_label_ignores_code_below() {
    let result = extract("Insured Name\nABC12345");
    assert!(result.get("insured_name").is_none());
}

#[test]
fn single_label_header_reads_its_own_column() {
    let result = extract("Insured Name | Address\nJohn Doe | Mumbai");
    let insured = result.get("insured_name").unwrap();

    assert_eq!(insured.value, "John Doe");
    assert_eq!(insured.provenance, Provenance::Table);
    assert!((insured.confidence - 0.77).abs() < 1e-6);
}

#[test]
fn fuzzy_label_with_dash() {
    let result = extract("Polcy No - XYZ555");
    let policy = result.get("policy_no").unwrap();

    assert_eq!(policy.value, "XYZ555");
    assert_eq!(policy.provenance, Provenance::Fuzzy);
}

#[test]
fn fuzzy_threshold_is_inclusive() {
    // Similarity exactly 0.70.
    let result = extract("Chazzis Mo: MA3EXA12345678901");
    let chassis = result.get("chassis_no").unwrap();
    assert_eq!(chassis.provenance, Provenance::Fuzzy);
    assert!((chassis.confidence - 0.74).abs() < 1e-6);

    let stricter = extractor_with(ExtractionConfig {
        fuzzy_threshold: 0.71,
        ..ExtractionConfig::default()
    });
    let result = stricter
        .extract(&RawDocument::from_text("Chazzis Mo: MA3EXA12345678901"))
        .unwrap();
    assert!(result.get("chassis_no").is_none());

    // Similarity 0.69.
    let result = extract("Chequx Numzzz: 458812");
    assert!(result.get("cheque_no").is_none());
}
