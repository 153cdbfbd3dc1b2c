//! Raw query results and catalog structures.

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Rows and field metadata exactly as the database produced them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawQueryResult {
    pub rows: Vec<Row>,
    pub fields: Vec<FieldInfo>,
}

impl RawQueryResult {
    pub fn new(rows: Vec<Row>, fields: Vec<FieldInfo>) -> Self {
        Self { rows, fields }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Collect a text column from every row, skipping nulls.
    pub fn strings(&self, column: &str) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.get(column).and_then(CellValue::as_str))
            .map(String::from)
            .collect()
    }
}

/// Field metadata: column name and PostgreSQL type OID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    #[serde(rename = "dataTypeID")]
    pub data_type_id: u32,
}

impl FieldInfo {
    pub fn new(name: impl Into<String>, data_type_id: u32) -> Self {
        Self {
            name: name.into(),
            data_type_id,
        }
    }
}

/// Row data keyed by column name, in column order.
pub type Row = IndexMap<String, CellValue>;

/// Cell value that can hold different SQL types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Json(serde_json::Value),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<()> for CellValue {
    fn from(_: ()) -> Self {
        Self::Null
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Column description returned by `list_columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub is_nullable: bool,
}

/// A table on the other side of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedTable {
    pub schema: String,
    pub table: String,
    pub fk_column: String,
    pub pk_column: String,
}
