//! Column access helpers and the serializable table payload sent to clients.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DashError, Result};

/// A table as sent to the renderer: column order plus row records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    /// Rows per page when the renderer paginates; None shows everything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableData {
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let columns: Vec<String> = df
            .get_columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let mut rows = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let mut record = Map::with_capacity(columns.len());
            for column in df.get_columns() {
                record.insert(column.name().to_string(), any_value_to_json(column.get(i)?));
            }
            rows.push(record);
        }
        Ok(Self {
            columns,
            rows,
            page_size: None,
            error: None,
        })
    }

    /// Empty table carrying a message for the preview region.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn page_count(&self) -> usize {
        match self.page_size {
            Some(size) => self.rows.len().div_ceil(size).max(1),
            None => 1,
        }
    }

    /// Rows of the zero-based `page`; empty past the last page.
    pub fn page(&self, page: usize) -> &[Map<String, Value>] {
        let size = self.page_size.unwrap_or(self.rows.len().max(1));
        let start = page.saturating_mul(size).min(self.rows.len());
        let end = start.saturating_add(size).min(self.rows.len());
        &self.rows[start..end]
    }
}

fn float_json(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn any_value_to_json(value: AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        AnyValue::Int32(v) => Value::from(v),
        AnyValue::Int64(v) => Value::from(v),
        AnyValue::UInt32(v) => Value::from(v),
        AnyValue::UInt64(v) => Value::from(v),
        AnyValue::Float32(v) => float_json(v as f64),
        AnyValue::Float64(v) => float_json(v),
        other => Value::String(other.str_value().to_string()),
    }
}

pub(crate) fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

pub(crate) fn require_column(df: &DataFrame, name: &str) -> Result<()> {
    if has_column(df, name) {
        Ok(())
    } else {
        Err(DashError::UnknownColumn(name.to_string()))
    }
}

/// Values of `name` as f64. Nulls, NaN and values that do not parse as numbers become None.
pub(crate) fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    require_column(df, name)?;
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

/// Values of `name` rendered as strings, nulls preserved.
pub(crate) fn category_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    require_column(df, name)?;
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Distinct non-null values in first-seen order.
pub(crate) fn distinct_in_order(values: &[Option<String>]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for v in values.iter().flatten() {
        if !seen.iter().any(|s| s == v) {
            seen.push(v.clone());
        }
    }
    seen
}
