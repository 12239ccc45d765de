//! Common fixtures shared across the integration test suite.

#![allow(dead_code)]

use marc_mapping::marcjson::marcjson_to_record;
use marc_mapping::{MappingParameters, ReferenceEntry, SourceRecord, TenantConfiguration};
use serde_json::json;

pub const BIB_LEADER: &str = "01234cam a2200289 a 4500";

/// A book record with a fixed-length 008, a title and two subject headings.
pub fn bib_record() -> SourceRecord {
    marcjson_to_record(&json!({
        "leader": BIB_LEADER,
        "fields": [
            { "001": "in00000001" },
            { "008": "200101s2020    nyu           000 0 eng d" },
            { "020": { "ind1": " ", "ind2": " ", "subfields": [ { "a": "9780306406157" } ] } },
            { "245": { "ind1": "1", "ind2": "0", "subfields": [
                { "a": "Walden;" }, { "b": "or, Life in the woods" }, { "c": "Henry David Thoreau" }
            ] } },
            { "650": { "ind1": " ", "ind2": "0", "subfields": [ { "a": "Nature" } ] } },
            { "650": { "ind1": " ", "ind2": "0", "subfields": [ { "a": "Solitude" } ] } }
        ]
    }))
    .expect("fixture record is well formed")
}

/// A record carrying one 945 item field per `(location, barcode)` pair.
pub fn item_record(items: &[(&str, &str)]) -> SourceRecord {
    let fields: Vec<_> = items
        .iter()
        .map(|(location, barcode)| {
            json!({ "945": { "ind1": " ", "ind2": " ", "subfields": [
                { "a": "PS3053 .A1" }, { "h": location }, { "i": barcode }, { "s": "Available" }
            ] } })
        })
        .collect();
    marcjson_to_record(&json!({ "leader": "00000nx   2200000 a 4500", "fields": fields }))
        .expect("fixture record is well formed")
}

/// Reference tables used by the fixtures.
pub fn parameters() -> MappingParameters {
    MappingParameters::new()
        .with_table(
            "locations",
            vec![
                ReferenceEntry::new("loc-main", Some("MAIN"), "Main Library"),
                ReferenceEntry::new("loc-annex", Some("ANNEX"), "Annex"),
            ],
        )
        .with_table(
            "itemStatuses",
            vec![ReferenceEntry::new("status-available", None, "Available")],
        )
        .with_tenant_configuration(TenantConfiguration::with_timezone("America/New_York"))
}
