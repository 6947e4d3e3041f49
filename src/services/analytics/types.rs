use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use super::utils::parse_float;

/// Maximum number of entries kept in a categorical frequency table.
pub const TOP_VALUES: usize = 10;

static EMPTY_CELL: CellValue = CellValue::Empty;

/// A single spreadsheet cell as read from the sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Empty,
}

impl CellValue {
    /// Null, missing and `""` all count as empty. Whitespace does not.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Raw text of the cell, used as grouping and frequency key.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Number(n) => Cow::Owned(n.to_string()),
            CellValue::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            CellValue::Text(s) => Cow::Borrowed(s.as_str()),
            CellValue::Empty => Cow::Borrowed(""),
        }
    }

    /// Same as `as_text`, but `None` for empty cells.
    pub fn key(&self) -> Option<Cow<'_, str>> {
        if self.is_empty() {
            None
        } else {
            Some(self.as_text())
        }
    }

    /// Numeric value of the cell. Booleans and empty cells never parse.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Text(s) => parse_float(s),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

pub type Row = IndexMap<String, CellValue>;

/// A fully materialized sheet: header list plus rows keyed by header.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    pub fn has_column(&self, header: &str) -> bool {
        self.headers.iter().any(|h| h == header)
    }

    /// Every cell of a column, in row order. Rows lacking the key yield `Empty`.
    pub fn column<'a>(&'a self, header: &'a str) -> impl Iterator<Item = &'a CellValue> + 'a {
        self.rows
            .iter()
            .map(move |row| row.get(header).unwrap_or(&EMPTY_CELL))
    }

    pub fn non_empty<'a>(&'a self, header: &'a str) -> impl Iterator<Item = &'a CellValue> + 'a {
        self.column(header).filter(|value| !value.is_empty())
    }

    pub fn cell<'a>(row: &'a Row, header: &str) -> &'a CellValue {
        row.get(header).unwrap_or(&EMPTY_CELL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numerical,
    Date,
    Categorical,
    Unknown,
}

pub type ColumnTypes = IndexMap<String, ColumnType>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ColumnStatistics {
    Numerical {
        min: f64,
        max: f64,
        avg: f64,
        count: usize,
    },
    #[serde(rename_all = "camelCase")]
    Categorical {
        unique_count: usize,
        top_values: SmallVec<[ValueCount; TOP_VALUES]>,
        total_count: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Pie,
    Line,
    Scatter,
}

impl ChartKind {
    /// Accepts the UI aliases `column` and `doughnut`, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "bar" | "column" => Some(ChartKind::Bar),
            "pie" | "doughnut" => Some(ChartKind::Pie),
            "line" => Some(ChartKind::Line),
            "scatter" => Some(ChartKind::Scatter),
            _ => None,
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
            ChartKind::Line => "line",
            ChartKind::Scatter => "scatter",
        };
        f.write_str(name)
    }
}

/// Chart request as sent by the client. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

impl ChartSpec {
    pub fn chart_type(&self) -> Option<&str> {
        present(&self.chart_type)
    }

    pub fn x_column(&self) -> Option<&str> {
        present(&self.x_column)
    }

    pub fn y_column(&self) -> Option<&str> {
        present(&self.y_column)
    }

    pub fn group_by(&self) -> Option<&str> {
        present(&self.group_by)
    }

    pub fn kind(&self) -> Result<ChartKind, AnalysisError> {
        let name = self.chart_type().ok_or(AnalysisError::MissingChartType)?;
        ChartKind::parse(name).ok_or_else(|| AnalysisError::UnsupportedChartType(name.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SeriesData {
    Values(Vec<f64>),
    Points(Vec<Point>),
}

impl SeriesData {
    pub fn len(&self) -> usize {
        match self {
            SeriesData::Values(values) => values.len(),
            SeriesData::Points(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One color for the whole series, or one per data item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Paint {
    Solid(String),
    PerItem(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub data: SeriesData,
    pub background_color: Paint,
    pub border_color: Paint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tension: Option<f64>,
}

/// Chart-ready labels and datasets. `echarts_config` only carries layout
/// hints for the renderer and never any of the numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    pub datasets: Vec<Dataset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub echarts_config: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    // Ranked below medium; none of the current rules emit it
    #[allow(dead_code)]
    Low,
}

impl Priority {
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSuggestion {
    pub chart_type: ChartKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    pub title: String,
    pub description: String,
    pub suitability: Priority,
    pub reason: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("Chart type is required")]
    MissingChartType,
    #[error("Unsupported chart type: {0}")]
    UnsupportedChartType(String),
    #[error("Column '{0}' not found in file")]
    UnknownColumn(String),
    #[error("{0}")]
    InvalidConfiguration(String),
    #[error("No valid data found for the specified configuration")]
    EmptyResult,
}
