//! End-to-end tests: raw table through normalisation, labelling and resolution

use loanprep::pipeline::columns::{MANDATORY_FEATURES, SENTINEL_FILL_FEATURES, ZERO_FILL_FEATURES};
use loanprep::pipeline::{
    analyze_missing_values, LoanCondition, LoanPreprocessor, MissingValueResolver, RuleGroup,
};
use loanprep::report::{export_resolve_report, load_resolver, save_resolver};
use loanprep::{PrepError, SelectionConfig};
use polars::prelude::*;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

use common::LoanRow;

fn sample_rows() -> Vec<LoanRow> {
    vec![
        LoanRow::clean(),
        LoanRow::clean().status("Charged Off").set("mths_since_last_delinq", Some(12.0)),
        LoanRow::clean().set("mths_since_last_delinq", Some(40.0)),
        // Not individual
        LoanRow::clean().application("Joint App"),
        // Unlabelled
        LoanRow::clean().status("Current"),
        // Scenario A and C
        LoanRow::clean()
            .set("pub_rec", Some(0.0))
            .set("mths_since_last_record", None)
            .set("inq_last_6mths", None)
            .set("inq_last_12m", None)
            .set("inq_fi", Some(5.0)),
        // Dropped: missing income
        LoanRow::clean().status("Default").set("annual_inc", None),
        // Employment length outside the vocabulary
        LoanRow::clean().text("emp_length", Some("15 years")),
    ]
}

#[test]
fn test_fit_transform_end_to_end() {
    let raw = common::raw_frame(&sample_rows());
    let mut preprocessor = LoanPreprocessor::new(SelectionConfig::default());

    let resolved = preprocessor.fit_transform(&raw).unwrap();

    // 8 raw rows, 2 not selected, 1 dropped
    assert_eq!(resolved.features.height(), 5);
    assert_eq!(resolved.labels.len(), 5);
    assert_eq!(
        resolved.labels,
        vec![
            LoanCondition::Good,
            LoanCondition::Bad,
            LoanCondition::Good,
            LoanCondition::Good,
            LoanCondition::Good,
        ]
    );
    assert_eq!(resolved.features.width(), 34 + 7);
    assert!(preprocessor.resolver().is_fitted());
    assert_eq!(preprocessor.resolver().delinquency_age_median(), Some(30.0));

    let record_age: Vec<Option<f64>> = resolved
        .features
        .column("mths_since_last_record")
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(record_age[3], Some(99.0));

    let inquiries: Vec<Option<f64>> = resolved
        .features
        .column("inq_last_12m")
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(inquiries[3], Some(5.0));

    let emp_length = resolved
        .features
        .column("emp_length")
        .unwrap()
        .cast(&DataType::String)
        .unwrap();
    let emp_length: Vec<Option<&str>> = emp_length.str().unwrap().into_iter().collect();
    assert_eq!(emp_length[4], None);
    assert_eq!(emp_length[0], Some("5 years"));
}

#[test]
fn test_resolved_features_have_no_gaps_in_filled_columns() {
    let raw = common::raw_frame(&common::random_gappy_rows(300, 0.1, 42));
    let mut preprocessor = LoanPreprocessor::new(SelectionConfig::default());

    let resolved = preprocessor.fit_transform(&raw).unwrap();

    let ratios = analyze_missing_values(&resolved.features).unwrap();
    for (column, ratio) in ratios {
        let covered = ZERO_FILL_FEATURES
            .iter()
            .chain(SENTINEL_FILL_FEATURES)
            .chain(MANDATORY_FEATURES)
            .any(|&c| c == column);
        if covered {
            assert_eq!(ratio, 0.0, "{} still has missing values", column);
        }
    }
}

#[test]
fn test_transform_before_fit_fails() {
    let raw = common::raw_frame(&sample_rows());
    let preprocessor = LoanPreprocessor::new(SelectionConfig::default());

    let err = preprocessor.transform(&raw).unwrap_err();

    assert!(matches!(err.downcast_ref::<PrepError>(), Some(PrepError::NotFitted)));
}

#[test]
fn test_fitted_resolver_survives_save_and_load() {
    let temp_dir = TempDir::new().unwrap();
    let state = temp_dir.path().join("resolver.json");

    let mut preprocessor = LoanPreprocessor::new(SelectionConfig::default());
    preprocessor
        .fit(&common::raw_frame(&sample_rows()))
        .unwrap();
    save_resolver(preprocessor.resolver(), &state).unwrap();

    let restored = LoanPreprocessor::with_resolver(
        SelectionConfig::default(),
        load_resolver(&state).unwrap(),
    );
    assert_eq!(restored.resolver(), preprocessor.resolver());

    // A later table with a gap that needs the fitted median
    let later = common::raw_frame(&[LoanRow::clean()
        .set("mths_since_last_delinq", None)
        .set("delinq_2yrs", Some(3.0))]);
    let resolved = restored.transform(&later).unwrap();
    let ages: Vec<Option<f64>> = resolved
        .features
        .column("mths_since_last_delinq")
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(ages, vec![Some(30.0)]);
}

#[test]
fn test_summary_counts() {
    let raw = common::raw_frame(&sample_rows());
    let mut preprocessor = LoanPreprocessor::new(SelectionConfig::default());
    preprocessor.fit(&raw).unwrap();

    let (resolved, summary) = preprocessor.transform_with_summary(&raw).unwrap();

    assert_eq!(summary.raw_rows, 8);
    assert_eq!(summary.selected_rows, 6);
    assert_eq!(summary.resolved_rows, resolved.features.height());
    assert_eq!(summary.feature_count, 41);
    assert_eq!((summary.bad_loans, summary.good_loans), (1, 4));
    assert_eq!(summary.delinquency_age_median, Some(30.0));
    assert_eq!(summary.dropped_by_group, vec![(RuleGroup::MandatoryFeatures, 1)]);
    assert!(summary.skipped_fills.is_empty());

    // Six selected rows, one gap each in these columns
    for column in ["annual_inc", "mths_since_last_record", "inq_last_6mths", "emp_length"] {
        let ratio = summary
            .missing_profile
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, ratio)| *ratio);
        assert_eq!(ratio, Some(1.0 / 6.0), "{} missing ratio", column);
    }
    assert!(summary.missing_profile.iter().all(|(_, ratio)| *ratio > 0.0));
    assert!(!summary.missing_profile.iter().any(|(name, _)| name == "dti"));

    // Rendering must not panic
    summary.display();
}

#[test]
fn test_unparsable_numeric_text_stops_transform() {
    let rows = vec![LoanRow::clean(), LoanRow::clean().status("Charged Off")];
    let mut raw = common::raw_frame(&rows);
    raw.with_column(Column::new("pub_rec".into(), ["2", "unknown"]))
        .unwrap();
    let resolver = MissingValueResolver::with_median(30.0);
    let preprocessor = LoanPreprocessor::with_resolver(SelectionConfig::default(), resolver);

    let err = preprocessor.transform(&raw).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<PrepError>(),
        Some(PrepError::NonNumericColumn { column, .. }) if column == "pub_rec"
    ));
}

#[test]
fn test_export_resolve_report() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("report.json");

    let raw = common::raw_frame(&sample_rows());
    let mut preprocessor = LoanPreprocessor::new(SelectionConfig::default());
    preprocessor.fit(&raw).unwrap();
    let (resolved, summary) = preprocessor.transform_with_summary(&raw).unwrap();

    export_resolve_report(&summary, &resolved, &output).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(json["metadata"]["delinquency_age_median"], 30.0);
    assert_eq!(json["metadata"]["loanprep_version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["counts"]["resolved_rows"], 5);

    let outcomes = json["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), resolved.outcomes.len());
    assert_eq!(outcomes[0]["rule"], "1a");
    assert_eq!(outcomes[0]["group"], "public_record");
    assert_eq!(outcomes[0]["effect"], "filled");
    assert_eq!(outcomes[0]["rows"], 1);

    let dropped_income = outcomes
        .iter()
        .find(|o| o["rule"] == "annual_inc")
        .unwrap();
    assert_eq!(dropped_income["group"], "mandatory_features");
    assert_eq!(dropped_income["effect"], "dropped");
}

#[test]
fn test_config_from_json_drives_selection() {
    let config = SelectionConfig::from_json_str(r#"{"exclude": ["pymnt_plan"]}"#).unwrap();
    let raw = common::raw_frame(&sample_rows());
    let mut preprocessor = LoanPreprocessor::new(config);

    let resolved = preprocessor.fit_transform(&raw).unwrap();

    assert_eq!(resolved.features.width(), 34 + 6);
    assert!(resolved.features.column("pymnt_plan").is_err());
}

#[test]
fn test_resolver_reused_without_refit() {
    let raw = common::raw_frame(&sample_rows());
    let resolver = MissingValueResolver::with_median(7.5);
    let preprocessor = LoanPreprocessor::with_resolver(SelectionConfig::default(), resolver);

    let first = preprocessor.transform(&raw).unwrap();
    let second = preprocessor.transform(&raw).unwrap();

    assert!(first.features.equals_missing(&second.features));
    assert_eq!(preprocessor.resolver().delinquency_age_median(), Some(7.5));
}
