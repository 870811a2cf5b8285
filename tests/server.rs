use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use timetable_solver::server::router;
use tower::ServiceExt;

fn catalog() -> Value {
    json!({
        "days": ["Mon", "Tue"],
        "slots": ["9", "10"],
        "subjects": [
            { "id": "math", "hoursPerWeek": 2 },
            { "id": "art", "hoursPerWeek": 2 }
        ],
        "classes": [
            { "id": "c1", "headcount": 10, "subjects": [{ "subject": "math" }, { "subject": "art" }] }
        ]
    })
}

async fn post(uri: &str, body: Value) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn solve_returns_a_timetable() {
    let body = json!({
        "catalog": catalog(),
        "fixedSlots": [{ "class": "c1", "day": "Mon", "slot": "9", "subject": "art", "fixed": true }],
        "solveOptions": { "engine": "search", "seed": 7 }
    });
    let (status, bytes) = post("/v1/timetable/solve", body).await;
    assert_eq!(status, StatusCode::OK);

    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["status"], "solved");
    assert_eq!(value["objective"], 4.0);
    assert_eq!(value["isOptimal"], true);
    assert_eq!(value["engine"], "search");
    let sessions = value["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 4);
    let monday_nine = sessions
        .iter()
        .find(|s| s["day"] == "Mon" && s["slot"] == "9")
        .unwrap();
    assert_eq!(monday_nine["subject"], "art");
}

#[tokio::test]
async fn infeasible_is_a_status_not_an_error() {
    let mut catalog = catalog();
    catalog["subjects"][0]["hoursPerWeek"] = json!(5);
    let body = json!({ "catalog": catalog, "solveOptions": { "engine": "search" } });
    let (status, bytes) = post("/v1/timetable/solve", body).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["status"], "infeasible");
    assert!(value["reason"].as_str().unwrap().contains("math"));
}

#[tokio::test]
async fn builder_errors_are_bad_requests() {
    let body = json!({
        "catalog": catalog(),
        "preferences": [{ "class": "c9", "day": "Mon", "slot": "9", "subject": "math", "weight": 2.0 }]
    });
    let (status, bytes) = post("/v1/timetable/solve", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8(bytes).unwrap().contains("c9"));
}

#[tokio::test]
async fn solve_all_reports_each_catalog() {
    let mut broken = catalog();
    broken["classes"][0]["subjects"][0]["subject"] = json!("ghost");
    let body = json!({
        "catalogs": [catalog(), broken],
        "solveOptions": { "engine": "search" }
    });
    let (status, bytes) = post("/v1/timetable/solve-all", body).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    let entries = value.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["status"], "solved");
    assert_eq!(entries[1]["status"], "error");
    assert!(entries[1]["error"].as_str().unwrap().contains("ghost"));
}
