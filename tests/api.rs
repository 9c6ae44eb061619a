use derm_lens::{
    ai::{MockGenerativeClient, MockReply},
    app::{App, AppServices},
    models::AnalysisResponse,
    usage::{MockUsageStore, UsageStore},
};
use pretty_assertions::assert_eq;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

const CANDIDATES: &[&str] = &["gemini-a", "gemini-b", "gemini-c"];
const MAX_UPLOAD_BYTES: usize = 256 * 1024;

fn candidates() -> Vec<String> {
    CANDIDATES.iter().map(|m| m.to_string()).collect()
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(16, 16, image::Rgb([210, 160, 140]));
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

fn image_form(field: &str, bytes: Vec<u8>, file_name: &str, mime: &str) -> Form {
    let part = Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(mime)
        .unwrap();
    Form::new().part(field.to_string(), part)
}

async fn spawn_app(mock: &MockGenerativeClient, usage: Option<&MockUsageStore>) -> String {
    let usage = usage.map(|store| Arc::new(store.clone()) as Arc<dyn UsageStore>);
    let app = App::with_services(
        AppServices {
            generative: Arc::new(mock.clone()),
            usage,
        },
        candidates(),
        MAX_UPLOAD_BYTES,
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(app.serve(listener));
    format!("http://{}", addr)
}

async fn post_form(base: &str, form: Form) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(format!("{}/analyze", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

async fn post_png(base: &str) -> (StatusCode, Value) {
    post_form(base, image_form("image", png_bytes(), "lesion.png", "image/png")).await
}

async fn wait_for_records(store: &MockUsageStore, expected: usize) {
    for _ in 0..50 {
        if store.get_attempt_count() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("usage store saw {} writes", store.get_attempt_count());
}

#[tokio::test]
async fn test_first_candidate_answers() {
    let mock = MockGenerativeClient::new()
        .with_reply("gemini-a", MockReply::Text("1. Visual Observations".to_string()));
    let store = MockUsageStore::new();
    let base = spawn_app(&mock, Some(&store)).await;

    let (status, body) = post_png(&base).await;

    assert_eq!(status, StatusCode::OK);
    let response: AnalysisResponse = serde_json::from_value(body.clone()).unwrap();
    assert_eq!(response.analysis, "1. Visual Observations");
    assert_eq!(response.model_used, "gemini-a");
    assert!(body.get("note").is_none());
    assert_eq!(mock.get_models_called(), vec!["gemini-a"]);

    wait_for_records(&store, 1).await;
    let records = store.get_records();
    assert_eq!(records[0].model_used, "gemini-a");
    assert_eq!(records[0].preview, "1. Visual Observations");
}

#[tokio::test]
async fn test_missing_image_field_skips_upstream() {
    let mock = MockGenerativeClient::new();
    let base = spawn_app(&mock, None).await;

    let (status, body) =
        post_form(&base, image_form("photo", png_bytes(), "lesion.png", "image/png")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No image file provided" }));
    assert_eq!(mock.get_call_count(), 0);
}

#[tokio::test]
async fn test_non_multipart_body_is_missing_input() {
    let mock = MockGenerativeClient::new();
    let base = spawn_app(&mock, None).await;

    let response = reqwest::Client::new()
        .post(format!("{}/analyze", base))
        .json(&json!({ "image": "not a file" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No image file provided");
    assert_eq!(mock.get_call_count(), 0);
}

#[tokio::test]
async fn test_text_file_renamed_to_jpg_is_rejected() {
    let mock = MockGenerativeClient::new();
    let base = spawn_app(&mock, None).await;

    let form = image_form(
        "image",
        b"definitely not a picture".to_vec(),
        "notes.jpg",
        "image/jpeg",
    );
    let (status, body) = post_form(&base, form).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid image file:"));
    assert_eq!(mock.get_call_count(), 0);
}

#[tokio::test]
async fn test_auth_failure_returns_401_after_one_call() {
    let mock = MockGenerativeClient::new()
        .with_reply("gemini-a", MockReply::Status(401, "API key expired".to_string()));
    let base = spawn_app(&mock, None).await;

    let (status, body) = post_png(&base).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().is_some());
    assert_eq!(body["details"], "Upstream returned status 401 Unauthorized");
    assert_eq!(mock.get_call_count(), 1);
}

#[tokio::test]
async fn test_outage_returns_503_after_one_call() {
    let mock = MockGenerativeClient::new()
        .with_reply("gemini-a", MockReply::Status(503, "overloaded".to_string()));
    let base = spawn_app(&mock, None).await;

    let (status, body) = post_png(&base).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["details"], "Upstream returned status 503 Service Unavailable");
    assert_eq!(mock.get_models_called(), vec!["gemini-a"]);
}

#[tokio::test]
async fn test_second_candidate_used_after_unsupported_first() {
    let mock = MockGenerativeClient::new()
        .with_reply("gemini-a", MockReply::Status(404, "not found".to_string()))
        .with_reply("gemini-b", MockReply::Text("from b".to_string()));
    let base = spawn_app(&mock, None).await;

    let (status, body) = post_png(&base).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_used"], "gemini-b");
    assert_eq!(mock.get_models_called(), vec!["gemini-a", "gemini-b"]);
}

#[tokio::test]
async fn test_exhaustion_lists_attempted_and_available_models() {
    let mock = MockGenerativeClient::new()
        .with_default_reply(MockReply::Status(404, "not found".to_string()))
        .with_available_models(vec!["gemini-z".to_string()]);
    let base = spawn_app(&mock, None).await;

    let (status, body) = post_png(&base).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["attempted_models"], json!(CANDIDATES));
    assert_eq!(body["available_models"], json!(["gemini-z"]));
    assert_eq!(body["failures"][0]["reason"], "candidate_unsupported");
}

#[tokio::test]
async fn test_every_candidate_rejecting_format_is_400() {
    let mock = MockGenerativeClient::new()
        .with_default_reply(MockReply::Status(400, "Invalid argument".to_string()));
    let base = spawn_app(&mock, None).await;

    let (status, body) = post_png(&base).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["attempted_models"], json!(CANDIDATES));
    assert!(body.get("available_models").is_none());
}

#[tokio::test]
async fn test_degraded_answer_carries_note() {
    let mock = MockGenerativeClient::new()
        .with_reply("gemini-a", MockReply::Status(400, "Invalid argument".to_string()))
        .with_reply("gemini-a", MockReply::Text("general guidance".to_string()));
    let base = spawn_app(&mock, None).await;

    let (status, body) = post_png(&base).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analysis"], "general guidance");
    assert_eq!(body["model_used"], "gemini-a");
    assert!(body["note"].as_str().unwrap().contains("gemini-a"));
}

#[tokio::test]
async fn test_failing_usage_store_does_not_affect_response() {
    let mock = MockGenerativeClient::new();
    let store = MockUsageStore::new().failing();
    let base = spawn_app(&mock, Some(&store)).await;

    let (status, body) = post_png(&base).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analysis"], "Mock educational analysis");
    wait_for_records(&store, 1).await;
    assert!(store.get_records().is_empty());
}

#[tokio::test]
async fn test_db_route_requires_store() {
    let mock = MockGenerativeClient::new();
    let base = spawn_app(&mock, None).await;

    let response = reqwest::get(format!("{}/test-db", base)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_db_route_reports_connectivity() {
    let mock = MockGenerativeClient::new();

    let healthy = MockUsageStore::new();
    let base = spawn_app(&mock, Some(&healthy)).await;
    let response = reqwest::get(format!("{}/test-db", base)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Connected to mock usage store");

    let broken = MockUsageStore::new().failing();
    let base = spawn_app(&mock, Some(&broken)).await;
    let response = reqwest::get(format!("{}/test-db", base)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Usage store connection failed");
    assert!(body["details"].as_str().unwrap().contains("unreachable"));
}
