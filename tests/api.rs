use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use scan_throughput::api::{self, DashboardService};
use scan_throughput::config::DashboardConfig;
use serde_json::Value;
use std::io::Write;
use std::sync::Arc;
use tower::ServiceExt;

const DEFAULT_DATA: &str = "\
Operation time,Operator,Waybill No.,Scan type
09:10:00 06/01/2025,sorter,W1,ARRIVAL
09:20:00 06/01/2025,sorter,W2,ARRIVAL
09:25:00 06/01/2025,JOU001,W3,ARRIVAL
09:40:00 06/01/2025,JOU001,W3,ARRIVAL
10:05:00 06/01/2025,JOU002,W4,ARRIVAL
10:15:00 06/01/2025,RD001,W5,ARRIVAL
16:30:00 06/01/2025,RD002,W6,ARRIVAL
23:30:00 06/01/2025,JOU003,W7,ARRIVAL
00:45:00 07/01/2025,JOU003,W8,ARRIVAL
not a time,JOU001,W9,ARRIVAL
";

fn app_with_default() -> (Router, tempfile::NamedTempFile) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(DEFAULT_DATA.as_bytes()).unwrap();
    let service = DashboardService::new(DashboardConfig {
        default_file_path: file.path().to_path_buf(),
        ..Default::default()
    });
    (api::router(Arc::new(service)), file)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn health_and_shifts() {
    let (app, _file) = app_with_default();

    let (status, body) = get(&app, "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = get(&app, "/api/v1/shifts").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Early (07-15)", "Mid (15-23)", "Night (23-07)"]);
}

#[tokio::test]
async fn default_dashboard_uses_early_shift_over_full_span() {
    let (app, _file) = app_with_default();
    let (status, body) = get(&app, "/api/v1/dashboard").await;
    assert_eq!(status, StatusCode::OK);

    let header = &body["header"];
    assert_eq!(header["shift"], "Early (07-15)");
    assert_eq!(header["date_range"]["start"], "2025-01-06");
    assert_eq!(header["date_range"]["end"], "2025-01-07");
    assert_eq!(header["records"], 6);
    assert_eq!(header["sorting_center"], "MIA.H");

    // JOU001 scanned W3 twice in the 9-10 bucket
    assert_eq!(body["kpis"]["total_volume"], 5);
    assert_eq!(body["kpis"]["sorter_volume"], 2);
    assert_eq!(body["kpis"]["peak_bucket"], "9-10");
}

#[tokio::test]
async fn night_shift_spans_midnight() {
    let (app, _file) = app_with_default();
    let (status, body) = get(
        &app,
        "/api/v1/dashboard?shift=night&start=2025-01-06&end=2025-01-06",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["header"]["records"], 2);
    assert_eq!(body["header"]["time_context"], "2025-01-06 23:30 → 2025-01-07 00:45");
    let buckets: Vec<&str> = body["matrix"]["buckets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b.as_str().unwrap())
        .collect();
    assert_eq!(buckets, vec!["0-1", "23-24"]);
}

#[tokio::test]
async fn session_keeps_filters_between_requests() {
    let (app, _file) = app_with_default();
    let (status, _) = get(&app, "/api/v1/dashboard?session=ops&shift=mid").await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get(&app, "/api/v1/dashboard?session=ops").await;
    assert_eq!(body["header"]["shift"], "Mid (15-23)");

    let (_, body) = get(&app, "/api/v1/dashboard?session=other").await;
    assert_eq!(body["header"]["shift"], "Early (07-15)");
}

#[tokio::test]
async fn upload_then_view_resets_filters() {
    let (app, _file) = app_with_default();
    let (status, _) = get(&app, "/api/v1/dashboard?shift=night").await;
    assert_eq!(status, StatusCode::OK);

    let upload = "Operation time,Operator,Waybill No.\n\
                  08:00:00 10/02/2025,JOU010,X1\n\
                  08:30:00 11/02/2025,RD010,X2\n\
                  ,RD010,X3\n";
    let (status, body) = send(
        &app,
        Request::post("/api/v1/datasets")
            .header("content-type", "text/csv")
            .body(Body::from(upload))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["records"], 2);
    assert_eq!(body["dropped_rows"], 1);
    assert_eq!(body["first_date"], "2025-02-10");
    let dataset_id = body["dataset_id"].as_str().unwrap().to_string();
    assert!(dataset_id.starts_with("upload::"));

    let (status, body) = get(&app, &format!("/api/v1/dashboard?dataset={}", dataset_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dataset_id"], dataset_id);
    assert_eq!(body["header"]["shift"], "Early (07-15)");
    assert_eq!(body["header"]["date_range"]["start"], "2025-02-10");
    assert_eq!(body["header"]["date_range"]["end"], "2025-02-11");
    assert_eq!(body["header"]["records"], 2);
}

#[tokio::test]
async fn upload_missing_columns_is_unprocessable() {
    let (app, _file) = app_with_default();
    let (status, body) = send(
        &app,
        Request::post("/api/v1/datasets")
            .body(Body::from("Operator,Scan type\nJOU001,ARRIVAL\n"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("Operation time"));
    assert!(error.contains("Waybill No."));
}

#[tokio::test]
async fn inverted_range_is_bad_request() {
    let (app, _file) = app_with_default();
    let (status, body) = get(&app, "/api/v1/dashboard?start=2025-01-07&end=2025-01-06").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());

    let (status, _) = get(&app, "/api/v1/dashboard?shift=weekend").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_dataset_and_group_are_not_found() {
    let (app, _file) = app_with_default();
    let (status, _) = get(&app, "/api/v1/dashboard?dataset=upload::0123abcd").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(&app, "/api/v1/groups/XYZ").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("JOU"));
}

#[tokio::test]
async fn group_endpoint_returns_efficiency_frame() {
    let (app, _file) = app_with_default();
    let (status, body) = get(&app, "/api/v1/groups/jou?start=2025-01-06&end=2025-01-06").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "JOU");

    let operators: Vec<&str> = body["frame"]["operators"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o.as_str().unwrap())
        .collect();
    assert_eq!(operators, vec!["JOU001", "JOU002"]);
    // each employee is 2x the mean in one bucket and idle in the other
    for summary in body["frame"]["summaries"].as_array().unwrap() {
        let avg = summary["avg_relative_efficiency"].as_f64().unwrap();
        assert!((avg - 1.0).abs() < 1e-6);
    }
    assert_eq!(body["bottom"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn only_the_configured_default_file_can_be_selected() {
    let (app, file) = app_with_default();

    let mut other = tempfile::NamedTempFile::new().unwrap();
    other
        .write_all(b"Operation time,Operator,Waybill No.\n09:00:00 06/01/2025,SECRET01,X1\n")
        .unwrap();

    let (status, body) = get(
        &app,
        &format!("/api/v1/dashboard?dataset=default::{}", other.path().display()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!body.to_string().contains("SECRET01"));

    let (status, _) = get(&app, "/api/v1/dashboard?dataset=default::/etc/passwd").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(
        &app,
        &format!("/api/v1/dashboard?dataset=default::{}", file.path().display()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&app, "/api/v1/dashboard?dataset=default").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn large_upload_is_accepted() {
    let (app, _file) = app_with_default();

    let mut csv = String::from("Operation time,Operator,Waybill No.,Scan type,Remark\n");
    for i in 0..40_000 {
        csv.push_str(&format!(
            "{:02}:{:02}:00 06/01/2025,JOU{:03},WB{:012},ARRIVAL,inbound dock lane\n",
            7 + (i % 8),
            i % 60,
            i % 50,
            i
        ));
    }
    assert!(csv.len() > 2 * 1024 * 1024);

    let (status, body) = send(
        &app,
        Request::post("/api/v1/datasets")
            .header("content-type", "text/csv")
            .body(Body::from(csv))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["records"], 40_000);
    assert_eq!(body["operators"], 50);
}

#[tokio::test]
async fn malformed_upload_is_unprocessable() {
    let (app, _file) = app_with_default();
    let (status, body) = send(
        &app,
        Request::post("/api/v1/datasets")
            .body(Body::from(
                b"Operation time,Oper\xff\xfeator,Waybill No.\n09:00:00 06/01/2025,JOU001,W1\n".to_vec(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn xlsx_upload_is_cleaned_like_csv() {
    let (app, _file) = app_with_default();

    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    let rows = [
        ["Operation time", "Operator", "Waybill No."],
        ["08:00:00 10/02/2025", "JOU010", "X1"],
        ["08:30:00 11/02/2025", "RD010", "X2"],
        ["yesterday", "RD010", "X3"],
    ];
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            sheet.write_string(r as u32, c as u16, *value).unwrap();
        }
    }
    let bytes = workbook.save_to_buffer().unwrap();

    let (status, body) = send(
        &app,
        Request::post("/api/v1/datasets").body(Body::from(bytes)).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["records"], 2);
    assert_eq!(body["dropped_rows"], 1);
    assert_eq!(body["last_date"], "2025-02-11");
}
