use std::cmp::Ordering;

use indexmap::IndexMap;

use super::palette::{colors, primary_fill, PRIMARY_LINE};
use super::presentation;
use super::types::{
    AnalysisError, ChartKind, ChartPayload, ChartSpec, ColumnType, ColumnTypes, Dataset, Paint,
    Point, SeriesData, Table,
};
use super::utils::{parse_date, parse_float};

/// Validates `spec` against the table and builds the chart payload.
///
/// Either a complete payload comes back or an error; a configuration that
/// filters out every row is reported as [`AnalysisError::EmptyResult`].
pub fn build_chart(
    table: &Table,
    types: &ColumnTypes,
    spec: &ChartSpec,
) -> Result<ChartPayload, AnalysisError> {
    let kind = spec.kind()?;

    for column in [spec.x_column(), spec.y_column(), spec.group_by()]
        .into_iter()
        .flatten()
    {
        if !table.has_column(column) {
            return Err(AnalysisError::UnknownColumn(column.to_string()));
        }
    }

    let payload = match kind {
        ChartKind::Bar => match (spec.group_by(), spec.x_column(), spec.y_column()) {
            (Some(group_by), _, y_column) => bar_by_group(table, group_by, y_column),
            (None, Some(x_column), Some(y_column)) => bar_by_x(table, x_column, y_column),
            _ => {
                return Err(AnalysisError::InvalidConfiguration(
                    "Bar charts require either a groupBy column OR both xColumn and yColumn"
                        .to_string(),
                ))
            }
        },
        ChartKind::Pie => {
            let group_by = spec.group_by().ok_or_else(|| {
                AnalysisError::InvalidConfiguration(
                    "groupBy column is required for pie charts".to_string(),
                )
            })?;
            pie(table, group_by)
        }
        ChartKind::Line => {
            let (x_column, y_column) = require_xy(spec, "line charts")?;
            let x_type = types.get(x_column).copied().unwrap_or(ColumnType::Unknown);
            line(table, x_column, y_column, x_type)
        }
        ChartKind::Scatter => {
            let (x_column, y_column) = require_xy(spec, "scatter plots")?;
            scatter(table, x_column, y_column)
        }
    };

    ensure_populated(payload)
}

fn require_xy<'a>(spec: &'a ChartSpec, what: &str) -> Result<(&'a str, &'a str), AnalysisError> {
    match (spec.x_column(), spec.y_column()) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(AnalysisError::InvalidConfiguration(format!(
            "Both xColumn and yColumn are required for {}",
            what
        ))),
    }
}

fn ensure_populated(payload: ChartPayload) -> Result<ChartPayload, AnalysisError> {
    let no_labels = payload.labels.as_ref().map_or(false, Vec::is_empty);
    let no_data = payload.datasets.iter().all(|d| d.data.is_empty());
    if no_labels || no_data {
        tracing::warn!("Chart configuration produced no usable data");
        return Err(AnalysisError::EmptyResult);
    }
    Ok(payload)
}

fn categorical_dataset(label: Option<String>, values: Vec<f64>, border_width: u32) -> Dataset {
    let n = values.len();
    Dataset {
        label,
        data: SeriesData::Values(values),
        background_color: Paint::PerItem(colors(n, 1.0)),
        border_color: Paint::PerItem(colors(n, 0.8)),
        border_width: Some(border_width),
        fill: None,
        tension: None,
    }
}

/// Count per group, or the sum of `y_column` per group when given.
/// Groups whose y values never parse still show up with 0.
fn bar_by_group(table: &Table, group_by: &str, y_column: Option<&str>) -> ChartPayload {
    let mut grouped: IndexMap<String, f64> = IndexMap::new();

    for row in &table.rows {
        let Some(key) = Table::cell(row, group_by).key() else {
            continue;
        };
        let total = grouped.entry(key.into_owned()).or_insert(0.0);
        match y_column {
            Some(y) => {
                if let Some(value) = Table::cell(row, y).as_float() {
                    *total += value;
                }
            }
            None => *total += 1.0,
        }
    }

    let label = match y_column {
        Some(y) => format!("Sum of {} by {}", y, group_by),
        None => format!("Count by {}", group_by),
    };
    let (labels, values): (Vec<String>, Vec<f64>) = grouped.into_iter().unzip();

    ChartPayload {
        echarts_config: Some(presentation::bar_layout(labels.len())),
        labels: Some(labels),
        datasets: vec![categorical_dataset(Some(label), values, 1)],
    }
}

/// Mean of `y_column` per distinct `x_column` value.
fn bar_by_x(table: &Table, x_column: &str, y_column: &str) -> ChartPayload {
    let mut sums: IndexMap<String, (f64, usize)> = IndexMap::new();

    for row in &table.rows {
        let (Some(x), Some(y)) = (
            Table::cell(row, x_column).key(),
            Table::cell(row, y_column).as_float(),
        ) else {
            continue;
        };
        let (sum, count) = sums.entry(x.into_owned()).or_insert((0.0, 0));
        *sum += y;
        *count += 1;
    }

    let (labels, values): (Vec<String>, Vec<f64>) = sums
        .into_iter()
        .map(|(label, (sum, count))| (label, sum / count as f64))
        .unzip();

    ChartPayload {
        echarts_config: Some(presentation::bar_layout(labels.len())),
        labels: Some(labels),
        datasets: vec![categorical_dataset(
            Some(format!("Average {} by {}", y_column, x_column)),
            values,
            1,
        )],
    }
}

fn pie(table: &Table, group_by: &str) -> ChartPayload {
    let mut grouped: IndexMap<String, f64> = IndexMap::new();
    for key in table.column(group_by).filter_map(|cell| cell.key()) {
        *grouped.entry(key.into_owned()).or_insert(0.0) += 1.0;
    }

    let (labels, values): (Vec<String>, Vec<f64>) = grouped.into_iter().unzip();

    ChartPayload {
        labels: Some(labels),
        datasets: vec![categorical_dataset(None, values, 2)],
        echarts_config: Some(presentation::pie_layout(group_by)),
    }
}

/// Orders x labels by the meaning of their column: chronologically for dates,
/// numerically for numbers, lexicographically otherwise. Values that do not
/// parse sort after those that do.
fn compare_x(a: &str, b: &str, x_type: ColumnType) -> Ordering {
    fn parsed_first<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    match x_type {
        ColumnType::Date => parsed_first(parse_date(a), parse_date(b)),
        ColumnType::Numerical => parsed_first(parse_float(a), parse_float(b)),
        _ => a.cmp(b),
    }
}

fn line(table: &Table, x_column: &str, y_column: &str, x_type: ColumnType) -> ChartPayload {
    let mut points: Vec<(String, f64)> = table
        .rows
        .iter()
        .filter_map(|row| {
            let x = Table::cell(row, x_column).key()?;
            let y = Table::cell(row, y_column).as_float()?;
            Some((x.into_owned(), y))
        })
        .collect();

    points.sort_by(|(a, _), (b, _)| compare_x(a, b, x_type));

    let (labels, values): (Vec<String>, Vec<f64>) = points.into_iter().unzip();

    ChartPayload {
        echarts_config: Some(presentation::line_layout(labels.len())),
        labels: Some(labels),
        datasets: vec![Dataset {
            label: Some(format!("{} over {}", y_column, x_column)),
            data: SeriesData::Values(values),
            background_color: Paint::Solid(primary_fill(0.1)),
            border_color: Paint::Solid(PRIMARY_LINE.to_string()),
            border_width: None,
            fill: Some(true),
            tension: Some(0.4),
        }],
    }
}

fn scatter(table: &Table, x_column: &str, y_column: &str) -> ChartPayload {
    let points: Vec<Point> = table
        .rows
        .iter()
        .filter_map(|row| {
            Some(Point {
                x: Table::cell(row, x_column).as_float()?,
                y: Table::cell(row, y_column).as_float()?,
            })
        })
        .collect();

    ChartPayload {
        labels: None,
        datasets: vec![Dataset {
            label: Some(format!("{} vs {}", y_column, x_column)),
            data: SeriesData::Points(points),
            background_color: Paint::Solid(primary_fill(0.6)),
            border_color: Paint::Solid(PRIMARY_LINE.to_string()),
            border_width: Some(1),
            fill: None,
            tension: None,
        }],
        echarts_config: None,
    }
}
