use super::stats::distinct_count;
use super::types::{ChartKind, ChartSuggestion, ColumnType, ColumnTypes, Priority, Table};

pub const MAX_SUGGESTIONS: usize = 10;

const BAR_CATEGORY_RANGE: std::ops::RangeInclusive<usize> = 2..=20;
const PIE_CATEGORY_RANGE: std::ops::RangeInclusive<usize> = 2..=8;
const BAR_XY_MAX_CATEGORIES: usize = 15;

fn columns_of(types: &ColumnTypes, wanted: ColumnType) -> Vec<&str> {
    types
        .iter()
        .filter(|(_, t)| **t == wanted)
        .map(|(name, _)| name.as_str())
        .collect()
}

/// Candidate charts for the table, best first, at most [`MAX_SUGGESTIONS`].
///
/// Candidates are generated rule by rule (bar distributions, pies, time
/// series, category comparisons, numeric correlations) and then stably sorted
/// by priority, so equal priorities keep their generation order.
pub fn suggest_charts(table: &Table, types: &ColumnTypes) -> Vec<ChartSuggestion> {
    let categorical = columns_of(types, ColumnType::Categorical);
    let numerical = columns_of(types, ColumnType::Numerical);
    let dates = columns_of(types, ColumnType::Date);

    let category_counts: Vec<(&str, usize)> = categorical
        .iter()
        .map(|&col| (col, distinct_count(table, col)))
        .collect();

    let mut suggestions = Vec::new();

    for &(col, unique) in &category_counts {
        if BAR_CATEGORY_RANGE.contains(&unique) {
            suggestions.push(ChartSuggestion {
                chart_type: ChartKind::Bar,
                x_column: None,
                y_column: None,
                group_by: Some(col.to_string()),
                title: format!("Distribution of {}", col),
                description: format!("Bar chart showing count by {}", col),
                suitability: Priority::High,
                reason: "Good for showing distribution of categorical data".to_string(),
            });
        }
    }

    for &(col, unique) in &category_counts {
        if PIE_CATEGORY_RANGE.contains(&unique) {
            suggestions.push(ChartSuggestion {
                chart_type: ChartKind::Pie,
                x_column: None,
                y_column: None,
                group_by: Some(col.to_string()),
                title: format!("{} Distribution", col),
                description: format!("Pie chart showing distribution by {}", col),
                suitability: Priority::Medium,
                reason: "Good for showing proportions of categorical data".to_string(),
            });
        }
    }

    for &date_col in &dates {
        for &num_col in &numerical {
            suggestions.push(ChartSuggestion {
                chart_type: ChartKind::Line,
                x_column: Some(date_col.to_string()),
                y_column: Some(num_col.to_string()),
                group_by: None,
                title: format!("{} over Time", num_col),
                description: format!("Line chart showing {} trend over {}", num_col, date_col),
                suitability: Priority::High,
                reason: "Excellent for showing trends over time".to_string(),
            });
        }
    }

    for &(cat_col, unique) in &category_counts {
        if unique > BAR_XY_MAX_CATEGORIES {
            continue;
        }
        for &num_col in &numerical {
            suggestions.push(ChartSuggestion {
                chart_type: ChartKind::Bar,
                x_column: Some(cat_col.to_string()),
                y_column: Some(num_col.to_string()),
                group_by: None,
                title: format!("{} by {}", num_col, cat_col),
                description: format!("Bar chart showing average {} by {}", num_col, cat_col),
                suitability: Priority::High,
                reason: "Good for comparing numerical values across categories".to_string(),
            });
        }
    }

    for (i, &x_col) in numerical.iter().enumerate() {
        for &y_col in &numerical[i + 1..] {
            suggestions.push(ChartSuggestion {
                chart_type: ChartKind::Scatter,
                x_column: Some(x_col.to_string()),
                y_column: Some(y_col.to_string()),
                group_by: None,
                title: format!("{} vs {}", y_col, x_col),
                description: format!(
                    "Scatter plot showing relationship between {} and {}",
                    x_col, y_col
                ),
                suitability: Priority::Medium,
                reason: "Good for identifying correlations between numerical variables".to_string(),
            });
        }
    }

    tracing::debug!("Generated {} chart suggestions", suggestions.len());

    suggestions.sort_by(|a, b| b.suitability.rank().cmp(&a.suitability.rank()));
    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}
