//! Flattening nested record trees into a tabular result
//!
//! Converts a sequence of cleaned record trees into a [`Table`]: one row
//! per record, one column per leaf scalar path, column names joined with
//! `.` along the mapping nesting. Mapping nesting fans out into columns;
//! sequences do not — a sequence-valued field stays a single cell.

use std::collections::HashMap;

use serde_json::Value;

use crate::table::Table;

/// Separator between nested keys in a flattened column name
const PATH_SEPARATOR: char = '.';

/// Flattens `records` into a table.
///
/// The column set is the union of all leaf paths across all records, in
/// first-seen order; a record missing a path gets a `None` cell for that
/// column. Flattening is a pure function of its input: the same records
/// always produce an identical table.
///
/// Records that are not mappings contribute an empty row (no leaf paths).
pub fn flatten(records: &[Value]) -> Table {
    let mut columns: Vec<String> = Vec::new();
    let mut column_index: HashMap<String, usize> = HashMap::new();
    let mut sparse_rows: Vec<Vec<(usize, Option<String>)>> = Vec::with_capacity(records.len());

    for record in records {
        let mut leaves = Vec::new();
        collect_leaves(record, String::new(), &mut leaves);

        let mut row = Vec::with_capacity(leaves.len());
        for (path, cell) in leaves {
            let index = *column_index.entry(path.clone()).or_insert_with(|| {
                columns.push(path);
                columns.len() - 1
            });
            row.push((index, cell));
        }
        sparse_rows.push(row);
    }

    let width = columns.len();
    let rows = sparse_rows
        .into_iter()
        .map(|sparse| {
            let mut row = vec![None; width];
            for (index, cell) in sparse {
                row[index] = cell;
            }
            row
        })
        .collect();

    Table::from_parts(columns, rows)
}

/// Walks mapping nesting depth-first, emitting `(path, cell)` pairs for
/// every leaf in source field order.
fn collect_leaves(node: &Value, prefix: String, leaves: &mut Vec<(String, Option<String>)>) {
    let Value::Object(map) = node else {
        return;
    };
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            let mut joined = String::with_capacity(prefix.len() + 1 + key.len());
            joined.push_str(&prefix);
            joined.push(PATH_SEPARATOR);
            joined.push_str(key);
            joined
        };
        match value {
            Value::Object(_) => collect_leaves(value, path, leaves),
            leaf => leaves.push((path, leaf_cell(leaf))),
        }
    }
}

/// Renders a leaf value as a cell.
///
/// Null becomes a missing cell; strings are taken verbatim; numbers and
/// booleans use their canonical text form; sequences are serialized whole
/// as JSON rather than expanded into extra rows or columns.
fn leaf_cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
