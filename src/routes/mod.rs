use std::sync::Arc;

use axum::{http::Method, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod analytics;
pub mod files;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_check))
        .merge(analytics::routes())
        .merge(files::routes(state.config.max_file_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::services::{file_repository::FileRepository, storage::FileStore};

    const BOUNDARY: &str = "sheet-analytics-boundary";
    const SALES_CSV: &str = "region,product,sales,date\n\
        North,Widget,100,2023-01-05\n\
        South,Gadget,150,2023-01-02\n\
        North,Gadget,200,2023-01-03\n\
        East,Widget,50,2023-01-04\n";

    async fn test_app(dir: &tempfile::TempDir, max_file_size: usize) -> Router {
        let config = Config {
            upload_dir: dir.path().join("store"),
            database_path: ":memory:".to_string(),
            max_file_size,
            ..Config::default()
        };
        let state = AppState::new(config).await.unwrap();
        router(Arc::new(state))
    }

    fn multipart_body(filename: &str, contents: &str, user_id: Option<&str>) -> String {
        let mut body = String::new();
        if let Some(user_id) = user_id {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"userId\"\r\n\r\n{user_id}\r\n"
            ));
        }
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n{contents}\r\n--{BOUNDARY}--\r\n"
        ));
        body
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn upload(app: &Router, filename: &str, contents: &str, user_id: Option<&str>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(filename, contents, user_id)))
            .unwrap();
        send(app, request).await
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    async fn post_chart(app: &Router, file_id: &str, spec: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(format!("/analytics/chart/{}", file_id))
            .header("content-type", "application/json")
            .body(Body::from(spec.to_string()))
            .unwrap();
        send(app, request).await
    }

    async fn uploaded_id(app: &Router) -> String {
        let (status, body) = upload(app, "sales.csv", SALES_CSV, Some("alice")).await;
        assert_eq!(status, StatusCode::OK);
        body["fileId"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, 1024 * 1024).await;

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 16).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn upload_returns_rows_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, 1024 * 1024).await;

        let (status, body) = upload(&app, "sales.csv", SALES_CSV, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"].as_array().unwrap().len(), 4);
        assert_eq!(body["data"][0]["region"], "North");
        assert_eq!(body["metadata"]["rows"], 4);
        assert_eq!(body["metadata"]["columns"], 4);
        assert_eq!(body["metadata"]["headers"], json!(["region", "product", "sales", "date"]));
        assert!(body["metadata"]["storageKey"]
            .as_str()
            .unwrap()
            .starts_with("excel-uploads/"));

        let file_id = body["fileId"].as_str().unwrap();
        let (status, file) = get_json(&app, &format!("/upload/files/{}", file_id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(file["file"]["originalName"], "sales.csv");
        assert_eq!(file["file"]["userId"], "anonymous");
        assert_eq!(file["file"]["storage"]["format"], "csv");
    }

    #[tokio::test]
    async fn uploads_are_listed_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, 1024 * 1024).await;

        upload(&app, "a.csv", SALES_CSV, Some("alice")).await;
        upload(&app, "b.csv", SALES_CSV, Some("bob")).await;

        let (_, all) = get_json(&app, "/upload/files").await;
        assert_eq!(all["files"].as_array().unwrap().len(), 2);

        let (_, alice) = get_json(&app, "/upload/files?userId=alice").await;
        let files = alice["files"].as_array().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0]["originalName"], "a.csv");
    }

    #[tokio::test]
    async fn unsupported_and_oversized_uploads_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, 64).await;

        let (status, body) = upload(&app, "notes.txt", "hello", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Only Excel and CSV files are allowed!");

        let (status, _) = upload(&app, "sales.csv", SALES_CSV, None).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        let (_, all) = get_json(&app, "/upload/files").await;
        assert!(all["files"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stats_split_numerical_and_categorical_columns() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, 1024 * 1024).await;
        let file_id = uploaded_id(&app).await;

        let (status, stats) = get_json(&app, &format!("/analytics/stats/{}", file_id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["totalRows"], 4);
        assert_eq!(stats["totalColumns"], 4);
        assert_eq!(stats["numericalColumns"], json!(["sales"]));
        assert_eq!(stats["categoricalColumns"], json!(["region", "product", "date"]));

        let sales = &stats["summary"]["sales"];
        assert_eq!(sales["type"], "numerical");
        assert_eq!(sales["min"].as_f64(), Some(50.0));
        assert_eq!(sales["max"].as_f64(), Some(200.0));
        assert_eq!(sales["avg"].as_f64(), Some(125.0));
        assert_eq!(sales["count"], 4);

        let region = &stats["summary"]["region"];
        assert_eq!(region["type"], "categorical");
        assert_eq!(region["uniqueCount"], 3);
        assert_eq!(region["topValues"][0], json!({"value": "North", "count": 2}));
        assert_eq!(region["totalCount"], 4);
    }

    #[tokio::test]
    async fn grouped_bar_chart_sums_by_category() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, 1024 * 1024).await;
        let file_id = uploaded_id(&app).await;

        let (status, body) = post_chart(
            &app,
            &file_id,
            json!({"chartType": "bar", "groupBy": "region", "yColumn": "sales"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["chartType"], "bar");
        assert_eq!(body["config"]["groupBy"], "region");
        assert_eq!(body["config"]["xColumn"], Value::Null);

        let chart = &body["chartData"];
        assert_eq!(chart["labels"], json!(["North", "South", "East"]));
        let data: Vec<f64> = chart["datasets"][0]["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        assert_eq!(data, vec![300.0, 150.0, 50.0]);
        assert_eq!(chart["datasets"][0]["label"], "Sum of sales by region");
    }

    #[tokio::test]
    async fn line_chart_orders_dates() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, 1024 * 1024).await;
        let file_id = uploaded_id(&app).await;

        let (status, body) = post_chart(
            &app,
            &file_id,
            json!({"chartType": "line", "xColumn": "date", "yColumn": "sales"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["chartData"]["labels"],
            json!(["2023-01-02", "2023-01-03", "2023-01-04", "2023-01-05"])
        );
    }

    #[tokio::test]
    async fn chart_errors_are_client_errors() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, 1024 * 1024).await;
        let file_id = uploaded_id(&app).await;

        let (status, body) = post_chart(&app, "no-such-file", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Chart type is required");

        let (status, body) = post_chart(&app, "no-such-file", json!({"chartType": "bar"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "File not found");

        let (status, body) = post_chart(
            &app,
            &file_id,
            json!({"chartType": "pie", "groupBy": "price"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Column 'price' not found in file");

        let (status, _) = post_chart(&app, &file_id, json!({"chartType": "radar", "groupBy": "region"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = post_chart(&app, &file_id, json!({"chartType": "pie"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "groupBy column is required for pie charts");
    }

    #[tokio::test]
    async fn suggestions_come_with_type_summary() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, 1024 * 1024).await;
        let file_id = uploaded_id(&app).await;

        let (status, body) = get_json(&app, &format!("/analytics/suggest/{}", file_id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["summary"],
            json!({
                "totalColumns": 4,
                "numericalColumns": 1,
                "categoricalColumns": 2,
                "dateColumns": 1
            })
        );
        assert_eq!(body["columnTypes"]["date"], "date");

        let suggestions = body["suggestions"].as_array().unwrap();
        assert!(!suggestions.is_empty() && suggestions.len() <= 10);
        assert_eq!(suggestions[0]["suitability"], "high");
    }

    #[tokio::test]
    async fn same_name_uploads_keep_their_own_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, 1024 * 1024).await;

        let (_, first) = upload(&app, "same.csv", "first\n1\n", None).await;
        let (_, second) = upload(&app, "same.csv", "second\n1\n2\n3\n", None).await;
        assert_ne!(first["metadata"]["storageKey"], second["metadata"]["storageKey"]);

        let (_, stats) = get_json(&app, &format!("/analytics/stats/{}", first["fileId"].as_str().unwrap())).await;
        assert_eq!(stats["headers"], json!(["first"]));
        assert_eq!(stats["totalRows"], 1);

        let (_, stats) = get_json(&app, &format!("/analytics/stats/{}", second["fileId"].as_str().unwrap())).await;
        assert_eq!(stats["headers"], json!(["second"]));
        assert_eq!(stats["totalRows"], 3);
    }

    #[tokio::test]
    async fn malformed_chart_bodies_get_json_errors() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, 1024 * 1024).await;

        let request = Request::builder()
            .method("POST")
            .uri("/analytics/chart/any")
            .header("content-type", "application/json")
            .body(Body::from("{\"chartType\": "))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn remote_files_are_registered_and_analysed() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hosted = Router::new().route("/exports/sales.csv", get(|| async { SALES_CSV }));
        tokio::spawn(async move {
            axum::serve(listener, hosted).await.unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            upload_dir: dir.path().join("store"),
            database_path: ":memory:".to_string(),
            ..Config::default()
        };
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let state = AppState {
            store: FileStore::with_client(&config.upload_dir, client, config.max_file_size)
                .await
                .unwrap(),
            files: FileRepository::open(&config.database_path).unwrap(),
            config,
        };
        let app = router(Arc::new(state));

        let url = format!("http://{}/exports/sales.csv", addr);
        let request = Request::builder()
            .method("POST")
            .uri("/upload/remote")
            .header("content-type", "application/json")
            .body(Body::from(json!({"url": url, "userId": "carol"}).to_string()))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["metadata"]["filename"], "sales.csv");
        assert_eq!(body["metadata"]["storageKey"], url.as_str());
        assert_eq!(body["metadata"]["rows"], 4);

        let file_id = body["fileId"].as_str().unwrap();
        let (status, stats) = get_json(&app, &format!("/analytics/stats/{}", file_id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["numericalColumns"], json!(["sales"]));

        let (_, file) = get_json(&app, &format!("/upload/files/{}", file_id)).await;
        assert_eq!(file["file"]["userId"], "carol");
        assert_eq!(file["file"]["storage"]["format"], "csv");

        let request = Request::builder()
            .method("POST")
            .uri("/upload/remote")
            .header("content-type", "application/json")
            .body(Body::from(json!({"url": "file:///etc/passwd"}).to_string()))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn analytics_for_unknown_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, 1024 * 1024).await;

        let (status, _) = get_json(&app, "/analytics/stats/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get_json(&app, "/analytics/suggest/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get_json(&app, "/upload/files/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
