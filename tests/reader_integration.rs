//! Integration tests for rule evaluation against MARC-in-JSON records

mod common;

use chrono::NaiveDate;
use marc_mapping::reader::{evaluate, MarcRecordReader, RecordReader};
use marc_mapping::{
    BoolAction, MappingConfig, MappingError, MappingParameters, MappingRule, MergePolicy,
    TenantConfiguration, Value,
};

fn read(rule: &MappingRule) -> Value {
    let record = common::bib_record();
    let parameters = common::parameters();
    let config = MappingConfig::default();
    MarcRecordReader::new(&record, &parameters, &config)
        .read(rule)
        .expect("rule evaluates")
}

#[test]
fn test_title_concatenates_tokens() {
    let rule = MappingRule::new("instance.title", r#"245$a " " 245$b"#);
    assert_eq!(read(&rule), Value::string("Walden; or, Life in the woods"));
}

#[test]
fn test_two_codes_join_with_space() {
    let rule = MappingRule::new("instance.title", "245$a$c");
    assert_eq!(read(&rule), Value::string("Walden; Henry David Thoreau"));
}

#[test]
fn test_else_falls_back_to_next_clause() {
    let rule = MappingRule::new("instance.alternativeTitle", "246$a; else 245$a");
    assert_eq!(read(&rule), Value::string("Walden;"));

    let nothing = MappingRule::new("instance.alternativeTitle", "246$a; else 247$a");
    assert_eq!(read(&nothing), Value::Missing);
}

#[test]
fn test_byte_ranges() {
    assert_eq!(
        read(&MappingRule::new("instance.languages", "008/36-38")),
        Value::string("eng")
    );
    assert_eq!(
        read(&MappingRule::new("instance.dateOfPublication", "008/08-11")),
        Value::string("2020")
    );
    assert_eq!(
        read(&MappingRule::new("instance.modeOfIssuance", "LDR/08")),
        Value::string("m")
    );
    assert_eq!(
        read(&MappingRule::new("instance.x", "008/60-62")),
        Value::Missing
    );
}

#[test]
fn test_array_path_reads_every_occurrence() {
    let rule = MappingRule::new("instance.subjects[]", "650$a");
    assert_eq!(
        read(&rule),
        Value::list(["Nature", "Solitude"], MergePolicy::ExtendExisting)
    );

    let scalar = MappingRule::new("instance.subject", "650$a");
    assert_eq!(read(&scalar), Value::string("Nature"));
}

#[test]
fn test_array_literal_is_single_element() {
    let rule = MappingRule::new("instance.statisticalCodeIds[]", r#""code-1""#)
        .with_repeatable_action(MergePolicy::ExchangeExisting);
    assert_eq!(
        read(&rule),
        Value::list(["code-1"], MergePolicy::ExchangeExisting)
    );
}

#[test]
fn test_placeholders() {
    assert_eq!(
        read(&MappingRule::new("instance.catalogedDate", "###REMOVE###")),
        Value::removal()
    );

    let Value::Str { text, removal } = read(&MappingRule::new("instance.catalogedDate", "###TODAY###")) else {
        panic!("expected a date string");
    };
    assert!(!removal);
    assert!(NaiveDate::parse_from_str(&text, "%Y-%m-%d").is_ok());
}

#[test]
fn test_unresolvable_timezone_is_fatal() {
    let record = common::bib_record();
    let parameters = MappingParameters::new()
        .with_tenant_configuration(TenantConfiguration::with_timezone("Mars/Olympus_Mons"));
    let config = MappingConfig::default();

    let err = evaluate(
        &record,
        &MappingRule::new("instance.catalogedDate", "###TODAY###"),
        &parameters,
        &config,
    )
    .unwrap_err();
    assert!(matches!(err, MappingError::InvalidTimezone(_)));
}

#[test]
fn test_malformed_expression_degrades_to_missing() {
    assert_eq!(
        read(&MappingRule::new("instance.title", r#"245$a "unterminated"#)),
        Value::Missing
    );
    assert_eq!(
        read(&MappingRule::new("instance.title", "not-a-token")),
        Value::Missing
    );
}

#[test]
fn test_boolean_actions() {
    assert_eq!(
        read(&MappingRule::boolean("instance.staffSuppress", BoolAction::AllTrue)),
        Value::Bool(true)
    );
    assert_eq!(
        read(&MappingRule::boolean("instance.staffSuppress", BoolAction::AllFalse)),
        Value::Bool(false)
    );
    assert_eq!(
        read(&MappingRule::boolean("instance.staffSuppress", BoolAction::AsIs)),
        Value::Missing
    );
    assert_eq!(
        read(&MappingRule::boolean("instance.staffSuppress", BoolAction::Remove)),
        Value::removal()
    );
}

#[test]
fn test_accepted_values_from_reference_table() {
    let record = common::item_record(&[("MAIN", "b1"), ("Branch", "b2")]);
    let parameters = common::parameters();
    let config = MappingConfig::default();
    let reader = MarcRecordReader::new(&record, &parameters, &config);
    let locations = parameters.accepted_values("locations");

    let rule = MappingRule::new("holdings.permanentLocationId", "945$h")
        .with_accepted_values(locations.clone());
    assert_eq!(reader.read(&rule).unwrap(), Value::string("loc-main"));

    // Lenient fields pass unmatched values through.
    let lenient = MappingRule::new("holdings.locations[]", "945$h").with_accepted_values(locations.clone());
    assert_eq!(
        reader.read(&lenient).unwrap(),
        Value::list(["loc-main", "Branch"], MergePolicy::ExtendExisting)
    );

    // Strict fields suppress them.
    let strict = MappingRule::new("order.vendors[]", "945$h")
        .with_name("vendor")
        .with_accepted_values(locations);
    assert_eq!(
        reader.read(&strict).unwrap(),
        Value::list(["loc-main"], MergePolicy::ExtendExisting)
    );
}

#[test]
fn test_positional_correlation() {
    let record = common::item_record(&[("MAIN", "b1"), ("ANNEX", "b2")]);
    let parameters = common::parameters();
    let config = MappingConfig::default();
    let reader = MarcRecordReader::new(&record, &parameters, &config);

    let rule = MappingRule::new("item.formerIds[]", "945$i 945$h");
    assert_eq!(
        reader.read(&rule).unwrap(),
        Value::list(["b1MAIN", "b2ANNEX"], MergePolicy::ExtendExisting)
    );

    // One value against two accumulated ones is appended.
    let uneven = MappingRule::new("item.formerIds[]", "945$i 020$a");
    let mut only_one = common::item_record(&[("MAIN", "b1"), ("ANNEX", "b2")]);
    only_one.add_field(
        marc_mapping::DataField::builder("020", ' ', ' ')
            .subfield('a', "isbn")
            .build(),
    );
    let reader = MarcRecordReader::new(&only_one, &parameters, &config);
    assert_eq!(
        reader.read(&uneven).unwrap(),
        Value::list(["b1", "b2", "isbn"], MergePolicy::ExtendExisting)
    );
}

#[test]
fn test_dates_in_subfields_are_normalized() {
    let mut record = common::bib_record();
    record.add_field(
        marc_mapping::DataField::builder("902", ' ', ' ')
            .subfield('a', "03/04/2021")
            .build(),
    );
    let parameters = common::parameters();
    let config = MappingConfig::default();
    assert_eq!(
        evaluate(&record, &MappingRule::new("order.dateOrdered", "902$a"), &parameters, &config).unwrap(),
        Value::string("2021-03-04")
    );

    // Control field data is never treated as a date.
    assert_eq!(
        evaluate(&record, &MappingRule::new("instance.hrid", "001"), &parameters, &config).unwrap(),
        Value::string("in00000001")
    );
}
