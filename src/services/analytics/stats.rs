use indexmap::IndexMap;
use smallvec::SmallVec;

use super::types::{CellValue, ColumnStatistics, ColumnType, ColumnTypes, Table, ValueCount, TOP_VALUES};

/// Per-column summary, in header order. Columns without any non-empty value
/// are left out.
pub fn compute_stats(table: &Table, types: &ColumnTypes) -> IndexMap<String, ColumnStatistics> {
    let mut summary = IndexMap::with_capacity(table.headers.len());

    for header in &table.headers {
        let values: Vec<&CellValue> = table.non_empty(header).collect();
        if values.is_empty() {
            continue;
        }

        let stats = match types.get(header) {
            Some(ColumnType::Numerical) => numerical_stats(&values),
            _ => None,
        }
        .unwrap_or_else(|| categorical_stats(&values));

        summary.insert(header.clone(), stats);
    }

    summary
}

fn numerical_stats(values: &[&CellValue]) -> Option<ColumnStatistics> {
    let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_float()).collect();
    if numbers.is_empty() {
        return None;
    }

    let (min, max, sum) = numbers.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, 0.0),
        |(min, max, sum), &n| (min.min(n), max.max(n), sum + n),
    );

    Some(ColumnStatistics::Numerical {
        min,
        max,
        avg: sum / numbers.len() as f64,
        count: numbers.len(),
    })
}

fn categorical_stats(values: &[&CellValue]) -> ColumnStatistics {
    let counts = frequency_table(values.iter().copied());
    let unique_count = counts.len();

    let top_values: SmallVec<[ValueCount; TOP_VALUES]> = counts.into_iter().take(TOP_VALUES).collect();

    ColumnStatistics::Categorical {
        unique_count,
        top_values,
        total_count: values.len(),
    }
}

/// Occurrences per raw cell text, most frequent first. Ties keep the order in
/// which values were first seen. Empty cells are ignored.
pub fn frequency_table<'a, I>(values: I) -> Vec<ValueCount>
where
    I: IntoIterator<Item = &'a CellValue>,
{
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for key in values.into_iter().filter_map(CellValue::key) {
        *counts.entry(key.into_owned()).or_insert(0) += 1;
    }

    let mut table: Vec<ValueCount> = counts
        .into_iter()
        .map(|(value, count)| ValueCount { value, count })
        .collect();
    table.sort_by(|a, b| b.count.cmp(&a.count));
    table
}

/// Number of distinct non-empty values in a column.
pub fn distinct_count(table: &Table, header: &str) -> usize {
    let mut seen = std::collections::HashSet::new();
    for key in table.column(header).filter_map(CellValue::key) {
        seen.insert(key);
    }
    seen.len()
}
