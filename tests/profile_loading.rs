//! Loading profiles, configuration and reference data from host documents

mod common;

use marc_mapping::marcjson::{marcjson_str_to_record, record_to_marcjson};
use marc_mapping::{
    EntityType, MappingConfig, MappingError, MappingParameters, MappingPipeline, MappingProfile,
    MergePolicy, RuleKind,
};
use serde_json::{json, Value as Json};
use std::io::Write;
use tempfile::NamedTempFile;

const HOLDINGS_PROFILE: &str = r#"{
  "mappingRules": [
    { "name": "callNumber", "path": "holdings.callNumber", "value": "852$h" },
    {
      "name": "holdingsStatements",
      "path": "holdings.holdingsStatements[]",
      "repeatableFieldAction": "EXTEND_EXISTING",
      "subfields": [
        { "order": 0, "path": "holdings.holdingsStatements[]", "fields": [
          { "name": "statement", "path": "holdings.holdingsStatements[].statement", "value": "866$a" },
          { "name": "note", "path": "holdings.holdingsStatements[].note", "value": "866$z" }
        ] }
      ]
    },
    { "name": "discoverySuppress", "path": "holdings.discoverySuppress", "booleanFieldAction": "ALL_TRUE", "enabled": false }
  ]
}"#;

fn temp_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

#[test]
fn test_profile_from_file() {
    let file = temp_file(HOLDINGS_PROFILE);
    let profile = MappingProfile::from_path(file.path()).unwrap();

    let rules = profile.rules.as_ref().unwrap();
    assert_eq!(rules.len(), 3);
    assert_eq!(rules[1].kind(), RuleKind::Repeatable);
    assert_eq!(rules[1].repeatable_action, Some(MergePolicy::ExtendExisting));
    assert_eq!(profile.enabled_rules().count(), 2);
}

#[test]
fn test_invalid_profile_is_reported() {
    let err = MappingProfile::from_json_str(r#"{"mappingRules": 42}"#).unwrap_err();
    assert!(matches!(err, MappingError::InvalidProfile(_)));

    let missing = MappingProfile::from_path("/nonexistent/profile.json").unwrap_err();
    assert!(matches!(missing, MappingError::IoError(_)));
}

#[test]
fn test_config_from_file() {
    let file = temp_file(r#"{"holdingsGroupingField": "effectiveLocationId", "datePatterns": ["%Y%m%d"]}"#);
    let config = MappingConfig::from_path(file.path()).unwrap();

    assert_eq!(config.holdings_grouping_field, "effectiveLocationId");
    assert_eq!(config.date_patterns, vec!["%Y%m%d".to_string()]);
    assert!(config.requires_accepted_value("vendor"));
}

#[test]
fn test_parameters_from_json() {
    let parameters = MappingParameters::from_json_str(
        r#"{
          "tables": {
            "locations": [
              { "id": "loc-main", "code": "MAIN", "name": "Main Library" },
              { "id": "loc-web", "name": "Online" }
            ]
          },
          "tenantConfiguration": { "dateTimeZone": "Europe/Berlin" }
        }"#,
    )
    .unwrap();

    let accepted = parameters.accepted_values("locations");
    assert_eq!(accepted.get("loc-main").map(String::as_str), Some("Main Library (MAIN)"));
    assert_eq!(accepted.get("loc-web").map(String::as_str), Some("Online"));
    assert!(parameters.tenant_configuration.timezone().is_ok());
}

#[test]
fn test_holdings_from_marcjson() {
    let record = marcjson_str_to_record(
        r#"{
          "leader": "00000nx   2200000 a 4500",
          "fields": [
            { "001": "ho00000001" },
            { "852": { "ind1": "0", "ind2": " ", "subfields": [ { "b": "MAIN" }, { "h": "QA76.73 .R87" } ] } },
            { "866": { "ind1": " ", "ind2": "0", "subfields": [ { "a": "v.1-10" }, { "z": "gaps" } ] } },
            { "866": { "ind1": " ", "ind2": "0", "subfields": [ { "a": "v.11-20" } ] } }
          ]
        }"#,
    )
    .unwrap();
    assert_eq!(record_to_marcjson(&record)["fields"][0], json!({"001": "ho00000001"}));

    let profile = MappingProfile::from_json_str(HOLDINGS_PROFILE).unwrap();
    let outcome = MappingPipeline::default()
        .map(
            EntityType::Holdings,
            &profile,
            &record,
            Json::Null,
            &common::parameters(),
        )
        .unwrap();

    assert_eq!(
        outcome.documents,
        vec![json!({"holdings": {
            "callNumber": "QA76.73 .R87",
            "holdingsStatements": [
                {"statement": "v.1-10", "note": "gaps"},
                {"statement": "v.11-20", "note": "gaps"}
            ]
        }})]
    );
}
