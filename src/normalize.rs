//! Record normalization: stripping provider metadata from raw record trees
//!
//! Salesforce query results decorate every record (and every nested
//! relationship record) with an `attributes` object carrying the sObject
//! type and URL. That metadata must be removed before flattening, or it
//! would leak provider-internal columns into the result table.

use serde_json::Value;

/// Reserved key Salesforce attaches to every returned record object
pub const METADATA_KEY: &str = "attributes";

/// Removes the reserved metadata key from `node` and, recursively, from
/// every mapping reachable through mapping values.
///
/// Non-mapping nodes are left untouched. Sequences are deliberately not
/// recursed into: a mapping nested inside a list keeps its metadata key.
/// Callers iterating a list of records must strip each element themselves,
/// which matches how the upstream extract treats the top-level record list.
///
/// Domain fields are never altered, reordered, or type-converted, and the
/// input is assumed acyclic (Salesforce returns trees, not graphs).
pub fn strip_metadata(node: &mut Value) {
    let Value::Object(map) = node else {
        return;
    };
    map.remove(METADATA_KEY);
    for value in map.values_mut() {
        strip_metadata(value);
    }
}
