use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    error::AppError,
    services::{
        analytics::{
            self,
            types::{
                AnalysisError, ChartPayload, ChartSpec, ChartSuggestion, ColumnStatistics,
                ColumnType, ColumnTypes,
            },
        },
        file_processor,
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analytics/stats/:file_id", get(file_stats))
        .route("/analytics/chart/:file_id", post(chart_data))
        .route("/analytics/suggest/:file_id", get(suggest_charts))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    total_rows: usize,
    total_columns: usize,
    headers: Vec<String>,
    numerical_columns: Vec<String>,
    categorical_columns: Vec<String>,
    summary: IndexMap<String, ColumnStatistics>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfigEcho {
    x_column: Option<String>,
    y_column: Option<String>,
    group_by: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartResponse {
    success: bool,
    chart_type: String,
    chart_data: ChartPayload,
    config: ChartConfigEcho,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionSummary {
    total_columns: usize,
    numerical_columns: usize,
    categorical_columns: usize,
    date_columns: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestResponse {
    suggestions: Vec<ChartSuggestion>,
    column_types: ColumnTypes,
    summary: SuggestionSummary,
}

async fn file_stats(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<Json<StatsResponse>, AppError> {
    let start = std::time::Instant::now();
    tracing::info!("Generating statistics for file {}", file_id);

    let loaded = file_processor::load_file_table(&state, &file_id).await?;
    let table = &loaded.table;

    let types = analytics::infer_types(table);
    let summary = analytics::compute_stats(table, &types);

    let mut numerical_columns = Vec::new();
    let mut categorical_columns = Vec::new();
    for (header, stats) in &summary {
        match stats {
            ColumnStatistics::Numerical { .. } => numerical_columns.push(header.clone()),
            ColumnStatistics::Categorical { .. } => categorical_columns.push(header.clone()),
        }
    }

    tracing::info!(
        "Statistics for {} ready in {:?}: {} numerical, {} categorical",
        file_id,
        start.elapsed(),
        numerical_columns.len(),
        categorical_columns.len()
    );

    Ok(Json(StatsResponse {
        total_rows: table.rows.len(),
        total_columns: table.headers.len(),
        headers: table.headers.clone(),
        numerical_columns,
        categorical_columns,
        summary,
    }))
}

async fn chart_data(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
    body: Result<Json<ChartSpec>, JsonRejection>,
) -> Result<Json<ChartResponse>, AppError> {
    let start = std::time::Instant::now();
    let Json(spec) = body?;

    // Rejected before touching storage
    let chart_type = spec
        .chart_type()
        .ok_or(AnalysisError::MissingChartType)?
        .to_string();
    tracing::info!("Building {} chart for file {}", chart_type, file_id);

    let loaded = file_processor::load_file_table(&state, &file_id).await?;
    let types = analytics::infer_types(&loaded.table);
    let chart_data = analytics::build_chart(&loaded.table, &types, &spec)?;

    tracing::info!("Chart for {} built in {:?}", file_id, start.elapsed());

    Ok(Json(ChartResponse {
        success: true,
        chart_type,
        chart_data,
        config: ChartConfigEcho {
            x_column: spec.x_column().map(str::to_string),
            y_column: spec.y_column().map(str::to_string),
            group_by: spec.group_by().map(str::to_string),
        },
    }))
}

async fn suggest_charts(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<Json<SuggestResponse>, AppError> {
    tracing::info!("Suggesting charts for file {}", file_id);

    let loaded = file_processor::load_file_table(&state, &file_id).await?;
    let column_types = analytics::infer_types(&loaded.table);
    let suggestions = analytics::suggest_charts(&loaded.table, &column_types);

    let count = |wanted: ColumnType| column_types.values().filter(|t| **t == wanted).count();
    let summary = SuggestionSummary {
        total_columns: loaded.table.headers.len(),
        numerical_columns: count(ColumnType::Numerical),
        categorical_columns: count(ColumnType::Categorical),
        date_columns: count(ColumnType::Date),
    };

    tracing::info!("Produced {} suggestions for {}", suggestions.len(), file_id);

    Ok(Json(SuggestResponse {
        suggestions,
        column_types,
        summary,
    }))
}
