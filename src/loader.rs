use std::{fs, path::Path};

use polars::prelude::{Column, DataFrame};
use serde_json::{Map, Value};
use tracing::info;

use crate::{
    error::{LoadError, PipelineResult},
    polars_ext::polars_err,
};

/// Reads a JSON array of flat record objects into a table.
///
/// Columns are the union of keys observed across all records. No schema is
/// enforced here: a key whose values are all numbers becomes `Float64`, all
/// booleans becomes `Boolean`, and anything else (mixed, textual or entirely null) becomes `String`.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_records(path: impl AsRef<Path>) -> PipelineResult<DataFrame> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let df = records_to_frame(value)?;
    info!(rows = df.height(), columns = df.width(), "Loaded raw records");
    Ok(df)
}

/// Converts an already parsed JSON document into a table.
pub fn records_to_frame(value: Value) -> PipelineResult<DataFrame> {
    let items = match value {
        Value::Array(items) => items,
        other => return Err(LoadError::NotACollection(json_kind(&other)).into()),
    };

    let records = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(map),
            _ => Err(LoadError::NotARecord { index }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut keys: Vec<String> = Vec::new();
    for record in &records {
        for key in record.keys() {
            if !keys.iter().any(|k| k == key) {
                keys.push(key.clone());
            }
        }
    }

    let columns: Vec<Column> = keys
        .iter()
        .map(|key| build_column(key, &records))
        .collect();

    DataFrame::new(columns).map_err(polars_err("load"))
}

fn build_column(key: &str, records: &[Map<String, Value>]) -> Column {
    let values: Vec<&Value> = records
        .iter()
        .map(|r| r.get(key).unwrap_or(&Value::Null))
        .collect();

    let present = || values.iter().filter(|v| !v.is_null());
    let has_values = present().next().is_some();

    if has_values && present().all(|v| v.is_number()) {
        let data: Vec<Option<f64>> = values.iter().map(|v| v.as_f64()).collect();
        Column::new(key.into(), data)
    } else if has_values && present().all(|v| v.is_boolean()) {
        let data: Vec<Option<bool>> = values.iter().map(|v| v.as_bool()).collect();
        Column::new(key.into(), data)
    } else {
        let data: Vec<Option<String>> = values.iter().map(|v| as_text(v)).collect();
        Column::new(key.into(), data)
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
