//! The reqwest merge client against a canned HTTP endpoint.

use formbatch::merge::{HttpMergeClient, MergePayload, MergeService, StagedFile};
use formbatch::{Config, FormBatchError};
use rstest::rstest;
use serde_json::json;

use crate::common::{CannedServer, init_test_logging, pdf_bytes, unreachable_url};

fn config(url: &str) -> Config {
    Config {
        staging_folder_id: "completed".to_string(),
        archive_folder_id: "archive".to_string(),
        merge_service_url: url.to_string(),
        sheet_id: "unused".to_string(),
        timeout_secs: 5,
        ..Config::default()
    }
}

fn payload() -> MergePayload {
    let mut payload = MergePayload::new(10, 1 << 20);
    for name in ["a.pdf", "b.pdf"] {
        payload
            .try_push(StagedFile {
                id: name.to_string(),
                name: name.to_string(),
                bytes: pdf_bytes(),
            })
            .unwrap();
    }
    payload
}

#[tokio::test]
async fn test_request_shape() {
    init_test_logging();
    let server = CannedServer::json_document("JVBERi0=").await;
    let base = format!("{}/", server.base_url());
    let client = HttpMergeClient::new(&config(&base)).unwrap();

    let document = client.merge(&payload()).await.unwrap();
    assert_eq!(document.as_base64(), "JVBERi0=");

    let request = server.request().await;
    assert!(request.head.starts_with("post /merge http/1.1"), "{}", request.head);
    assert!(request.head.contains("content-type: application/json"));
    assert!(request.head.contains("accept: application/json, application/pdf"));

    let body = request.json();
    let output = body["outputName"].as_str().unwrap();
    assert!(output.starts_with("Merged_") && output.ends_with(".pdf"), "{output}");
    assert_eq!(body["files"].as_array().unwrap().len(), 2);
    assert_eq!(body["files"][1]["name"], json!("b.pdf"));
}

#[rstest]
#[case(200, "text/html", "<html>login</html>", "Unexpected merge response type.")]
#[case(200, "application/json", "{}", "Unexpected merge response type.")]
#[case(200, "application/json", "not json", "Merge parse error")]
#[case(404, "text/plain", "no such route", "Merge error 404: no such route")]
#[tokio::test]
async fn test_failure_messages(
    #[case] status: u16,
    #[case] content_type: &str,
    #[case] body: &str,
    #[case] expected_prefix: &str,
) {
    let server = CannedServer::start(status, content_type, body).await;
    let client = HttpMergeClient::new(&config(server.base_url())).unwrap();

    let err = client.merge(&payload()).await.unwrap_err();
    assert!(
        err.to_string().starts_with(expected_prefix),
        "got {err}, expected {expected_prefix}"
    );
}

#[tokio::test]
async fn test_error_preview_is_truncated() {
    let server = CannedServer::start(503, "text/plain", "x".repeat(1000)).await;
    let client = HttpMergeClient::new(&config(server.base_url())).unwrap();

    match client.merge(&payload()).await.unwrap_err() {
        FormBatchError::MergeHttp { status, preview } => {
            assert_eq!(status, 503);
            assert_eq!(preview.chars().count(), 200);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unreachable() {
    let client = HttpMergeClient::new(&config(&unreachable_url().await)).unwrap();
    let err = client.merge(&payload()).await.unwrap_err();
    assert!(err.to_string().starts_with("Merge service unreachable:"));
    assert!(err.is_fatal());
}
