use std::fmt::Write;

use serde_json::{Map, Number, Value};

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::types::{Cell, ChangeRecord, ChangeType, ChangelogSchema, TableRow};

/// Converts a JSON value to a [`Cell`].
///
/// Integers that fit an `i64` become [`Cell::I64`], other numbers [`Cell::F64`]. Arrays and
/// objects are kept as [`Cell::Json`].
pub fn cell_from_json(value: Value) -> Cell {
    match value {
        Value::Null => Cell::Null,
        Value::Bool(value) => Cell::Bool(value),
        Value::Number(number) => match number.as_i64() {
            Some(value) => Cell::I64(value),
            None => number.as_f64().map(Cell::F64).unwrap_or(Cell::Json(Value::Number(number))),
        },
        Value::String(value) => Cell::String(value),
        value @ (Value::Array(_) | Value::Object(_)) => Cell::Json(value),
    }
}

/// Converts a [`Cell`] to a JSON value.
///
/// Temporal values are rendered as ISO 8601 strings and bytes as a `\x`-prefixed hex string.
/// Non-finite floats have no JSON representation and become `null`.
pub fn cell_to_json(cell: &Cell) -> Value {
    match cell {
        Cell::Null => Value::Null,
        Cell::Bool(value) => Value::Bool(*value),
        Cell::String(value) => Value::String(value.clone()),
        Cell::I16(value) => Value::from(*value),
        Cell::I32(value) => Value::from(*value),
        Cell::I64(value) => Value::from(*value),
        Cell::F32(value) => Number::from_f64(f64::from(*value))
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Cell::F64(value) => Number::from_f64(*value)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Cell::Date(value) => Value::String(value.to_string()),
        Cell::Time(value) => Value::String(value.to_string()),
        Cell::Timestamp(value) => Value::String(value.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        Cell::TimestampTz(value) => Value::String(value.to_rfc3339()),
        Cell::Uuid(value) => Value::String(value.to_string()),
        Cell::Bytes(value) => Value::String(encode_bytea_hex(value)),
        Cell::Json(value) => value.clone(),
    }
}

/// Decodes a raw changelog record from a JSON object keyed by column name.
///
/// The object must carry the operation tag under the schema's tag column with a value of
/// `INSERT` or `DELETE`. Columns absent from the object are read as [`Cell::Null`], keys that
/// are not part of the schema are rejected.
pub fn record_from_json(schema: &ChangelogSchema, value: Value) -> EtlResult<ChangeRecord> {
    let Value::Object(mut object) = value else {
        bail!(
            ErrorKind::InvalidData,
            "Changelog record must be a JSON object"
        );
    };

    let change_type = match object.remove(schema.change_type_column()) {
        Some(Value::String(tag)) => ChangeType::parse_raw(&tag)?,
        Some(other) => bail!(
            ErrorKind::InvalidData,
            "Change type must be a string",
            format!("received `{other}`")
        ),
        None => bail!(
            ErrorKind::MissingColumn,
            "Changelog record has no change type",
            format!("column `{}`", schema.change_type_column())
        ),
    };

    let values = schema
        .column_names()
        .iter()
        .map(|name| object.remove(name).map(cell_from_json).unwrap_or(Cell::Null))
        .collect();

    if let Some(unknown) = object.keys().next() {
        bail!(
            ErrorKind::InvalidData,
            "Changelog record has a column that is not part of the table",
            format!("column `{unknown}`")
        );
    }

    Ok(ChangeRecord::new(change_type, TableRow::new(values)))
}

/// Encodes a normalized record as a JSON object keyed by column name.
pub fn record_to_json(schema: &ChangelogSchema, record: &ChangeRecord) -> Value {
    let mut object = Map::with_capacity(schema.len() + 1);
    for (name, cell) in schema.column_names().iter().zip(record.values()) {
        object.insert(name.clone(), cell_to_json(cell));
    }
    object.insert(
        schema.change_type_column().to_string(),
        Value::String(record.change_type.as_str().to_string()),
    );

    Value::Object(object)
}

fn encode_bytea_hex(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(2 + bytes.len() * 2);
    result.push_str("\\x");
    for byte in bytes {
        // Writing to a `String` cannot fail.
        let _ = write!(result, "{byte:02x}");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> ChangelogSchema {
        ChangelogSchema::new(["id", "data", "_change_ordinal"])
    }

    #[test]
    fn decodes_record_by_column_name() {
        let record = record_from_json(
            &schema(),
            json!({"data": "a", "id": 1, "_change_type": "DELETE"}),
        )
        .unwrap();

        assert_eq!(record.change_type, ChangeType::Delete);
        assert_eq!(
            record.values(),
            &[Cell::I64(1), Cell::from("a"), Cell::Null]
        );
    }

    #[test]
    fn update_tags_are_rejected_on_input() {
        let err = record_from_json(
            &schema(),
            json!({"id": 1, "_change_type": "UPDATE_BEFORE"}),
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn missing_tag_is_reported() {
        let err = record_from_json(&schema(), json!({"id": 1})).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MissingColumn);
        assert_eq!(err.detail(), Some("column `_change_type`"));
    }

    #[test]
    fn unknown_columns_are_rejected() {
        let err = record_from_json(
            &schema(),
            json!({"id": 1, "name": "x", "_change_type": "INSERT"}),
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_eq!(err.detail(), Some("column `name`"));
    }

    #[test]
    fn encodes_normalized_tags_and_values() {
        let record = ChangeRecord::new(
            ChangeType::UpdatePostimage,
            TableRow::new(vec![Cell::I64(1), Cell::Bytes(vec![0x48, 0x69]), Cell::I64(3)]),
        );

        assert_eq!(
            record_to_json(&schema(), &record),
            json!({
                "id": 1,
                "data": "\\x4869",
                "_change_ordinal": 3,
                "_change_type": "UPDATE_POSTIMAGE",
            })
        );
    }

    #[test]
    fn non_finite_floats_become_null() {
        assert_eq!(cell_to_json(&Cell::F64(f64::NAN)), Value::Null);
        assert_eq!(cell_from_json(json!(1.5)), Cell::F64(1.5));
        assert_eq!(cell_from_json(json!([1, 2])), Cell::Json(json!([1, 2])));
    }
}
