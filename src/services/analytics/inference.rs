use super::types::{CellValue, ColumnType, ColumnTypes, Table};
use super::utils::is_date_string;

/// Classifies one column from its non-empty values.
///
/// Numerical wins whenever every value parses to a finite float. Otherwise a
/// single date-looking value is enough to tag the column as a date.
pub fn infer_column_type<'a, I>(values: I) -> ColumnType
where
    I: IntoIterator<Item = &'a CellValue>,
{
    let values: Vec<&CellValue> = values.into_iter().filter(|v| !v.is_empty()).collect();

    if values.is_empty() {
        return ColumnType::Unknown;
    }

    let numerical = values
        .iter()
        .all(|v| v.as_float().map_or(false, f64::is_finite));
    if numerical {
        return ColumnType::Numerical;
    }

    let has_date = values.iter().any(|v| is_date_string(&v.as_text()));
    if has_date {
        ColumnType::Date
    } else {
        ColumnType::Categorical
    }
}

pub fn infer_types(table: &Table) -> ColumnTypes {
    let types: ColumnTypes = table
        .headers
        .iter()
        .map(|header| (header.clone(), infer_column_type(table.column(header))))
        .collect();

    tracing::debug!("Inferred column types: {:?}", types);
    types
}
