//! End-to-end merge runs over a real folder tree, a JSON workbook and a
//! canned merge endpoint.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use formbatch::api::{self, file_ids_from_json};
use formbatch::merge::{MergePayload, MergeService, MergedDocument};
use formbatch::sheet::{MemorySheet, MemoryWorkbook};
use formbatch::store::MemoryStore;
use formbatch::{FormBatchError, Orchestrator};
use serde_json::{Value, json};

use crate::common::{
    ARCHIVE, CannedServer, Fixture, SHEET_NAME, STAGING, pdf_bytes, unreachable_url,
};

const ANN: &str = "PetPantryForm_Ann_Lee_100000000001_20251030_1819.pdf";
const BOB: &str = "PetPantryForm_Bob_Stone_100000000002_20251030_1820.pdf";

fn tracking_headers() -> [&'static str; 4] {
    ["Timestamp", "First Name", "FormID", "Printed At"]
}

fn seed(fixture: &Fixture) {
    fixture.put(STAGING, ANN, &pdf_bytes());
    fixture.put(STAGING, BOB, &pdf_bytes());
    fixture.write_sheet(
        &tracking_headers(),
        vec![
            json!([{"date": "2025-10-30T18:19:00"}, "Ann", "100000000001", null]),
            json!([{"date": "2025-10-30T18:20:00"}, "Bob", "100000000002", "earlier"]),
            json!([{"date": "2025-10-30T18:21:00"}, "Cy", "100000000003", null]),
        ],
    );
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn test_json_response_archives_both_files() {
    let fixture = Fixture::new();
    seed(&fixture);
    let server = CannedServer::json_document("JVBERi0xLjQK").await;
    let orchestrator = fixture.orchestrator(server.base_url());

    let reply = api::get_merged_pdf_and_archive(&orchestrator, &ids(&[ANN, BOB])).await;
    let value = serde_json::to_value(&reply).unwrap();

    assert_eq!(value["ok"], json!(true));
    assert_eq!(value["countMerged"], json!(2));
    assert_eq!(value["archivedIds"], json!([ANN, BOB]));
    assert_eq!(value["base64"], json!("JVBERi0xLjQK"));

    for name in [ANN, BOB] {
        assert!(fixture.exists(ARCHIVE, name));
        assert!(!fixture.exists(STAGING, name));
    }

    let rows = fixture.read_sheet();
    assert!(rows[1][3].get("date").is_some(), "Ann not stamped: {}", rows[1]);
    assert!(rows[2][3].get("date").is_some(), "Bob not stamped: {}", rows[2]);
    assert_eq!(rows[3][3], Value::Null);

    let request = server.request().await.json();
    let files = request["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["name"], json!(ANN));
    assert_eq!(
        BASE64.decode(files[0]["contentBase64"].as_str().unwrap()).unwrap(),
        pdf_bytes()
    );
}

#[tokio::test]
async fn test_http_500_leaves_files_in_staging() {
    let fixture = Fixture::new();
    seed(&fixture);
    let server = CannedServer::start(500, "text/plain", "merge backend exploded").await;
    let orchestrator = fixture.orchestrator(server.base_url());

    let reply = api::get_merged_pdf_and_archive(&orchestrator, &ids(&[ANN, BOB])).await;
    let value = serde_json::to_value(&reply).unwrap();

    assert_eq!(value["ok"], json!(false));
    assert_eq!(value["message"], json!("Merge error 500: merge backend exploded"));
    assert!(fixture.exists(STAGING, ANN));
    assert!(fixture.exists(STAGING, BOB));
    assert!(!fixture.exists(ARCHIVE, ANN));
    assert_eq!(fixture.read_sheet()[1][3], Value::Null);
}

#[tokio::test]
async fn test_unreachable_service_changes_nothing() {
    let fixture = Fixture::new();
    seed(&fixture);
    let orchestrator = fixture.orchestrator(&unreachable_url().await);

    let err = orchestrator
        .merge_and_archive(&ids(&[ANN]))
        .await
        .unwrap_err();
    assert!(matches!(err, FormBatchError::MergeUnreachable { .. }));
    assert!(fixture.exists(STAGING, ANN));
}

#[tokio::test]
async fn test_binary_pdf_response() {
    let fixture = Fixture::new();
    seed(&fixture);
    let merged = pdf_bytes();
    let server = CannedServer::start(200, "application/pdf", merged.clone()).await;
    let orchestrator = fixture.orchestrator(server.base_url());

    let report = orchestrator.merge_and_archive(&ids(&[BOB])).await.unwrap();
    let decoded = report.document.decode().unwrap();
    assert_eq!(decoded, merged);
    assert!(lopdf::Document::load_mem(&decoded).is_ok());
    assert_eq!(report.rows_marked, 1);
}

#[tokio::test]
async fn test_second_run_finds_nothing_eligible() {
    let fixture = Fixture::new();
    seed(&fixture);
    let server = CannedServer::json_document("JVBERi0=").await;
    let orchestrator = fixture.orchestrator(server.base_url());
    orchestrator.merge_and_archive(&ids(&[ANN])).await.unwrap();

    let again = orchestrator.merge_and_archive(&ids(&[ANN])).await.unwrap_err();
    assert_eq!(again.to_string(), "No eligible files under size cap.");
}

#[tokio::test]
async fn test_missing_printed_at_column_touches_nothing() {
    let fixture = Fixture::new();
    fixture.put(STAGING, ANN, &pdf_bytes());
    fixture.write_sheet(&["Timestamp", "FormID"], vec![]);
    let orchestrator = fixture.orchestrator(&unreachable_url().await);

    let reply = api::get_merged_pdf_and_archive(&orchestrator, &ids(&[ANN])).await;
    assert!(!reply.ok);
    assert_eq!(
        reply.message.as_deref(),
        Some("Missing Printed At column in sheet.")
    );
    assert!(fixture.exists(STAGING, ANN));
}

#[tokio::test]
async fn test_empty_selection_has_no_side_effects() {
    let store = MemoryStore::new();
    let workbook = MemoryWorkbook::new().with_sheet(
        "Form Responses 1",
        MemorySheet::new(&tracking_headers(), vec![]),
    );
    let fixture = Fixture::new();
    let config = fixture.config("http://127.0.0.1:9");
    let orchestrator = Orchestrator::new(
        config.clone(),
        Arc::new(store.clone()),
        Arc::new(workbook.clone()),
        Arc::new(formbatch::merge::HttpMergeClient::new(&config).unwrap()),
    )
    .unwrap();

    let reply = api::get_merged_pdf_and_archive(&orchestrator, &[]).await;
    assert_eq!(
        serde_json::to_value(&reply).unwrap(),
        json!({"ok": false, "message": "No files selected."})
    );
    assert!(store.operations().is_empty());
    assert_eq!(workbook.opens(), 0);

    assert!(file_ids_from_json(&json!({"ids": []})).is_err());
}

#[tokio::test]
async fn test_listing_only_shows_staging_pdfs() {
    let fixture = Fixture::new();
    seed(&fixture);
    fixture.put(STAGING, "scan.png", b"\x89PNG");
    fixture.put(STAGING, "Dup_100000000009_.pdf", &pdf_bytes());
    fixture.put(ARCHIVE, "Dup_100000000009_.pdf", &pdf_bytes());
    fixture.put(ARCHIVE, "Old_100000000008_.pdf", &pdf_bytes());
    let orchestrator = fixture.orchestrator("http://127.0.0.1:9");

    let value = serde_json::to_value(api::list_new_forms(&orchestrator).await).unwrap();
    assert_eq!(value["ok"], json!(true));
    assert_eq!(value["count"], json!(2));

    let mut names: Vec<&str> = value["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec![ANN, BOB]);

    let first = &value["files"][0];
    assert_eq!(first["size"], json!(pdf_bytes().len()));
    let created = first["created"].as_str().unwrap();
    assert!(
        chrono::NaiveDateTime::parse_from_str(created, "%Y-%m-%d %H:%M").is_ok(),
        "unexpected created format: {created}"
    );
}

/// Merge service that appends a submission to the workbook while the merge
/// is in flight, like a form arriving mid-run.
struct SubmissionDuringMerge {
    workbook: PathBuf,
}

#[async_trait]
impl MergeService for SubmissionDuringMerge {
    async fn merge(&self, _payload: &MergePayload) -> formbatch::Result<MergedDocument> {
        let raw = std::fs::read(&self.workbook).unwrap();
        let mut workbook: Value = serde_json::from_slice(&raw).unwrap();
        workbook["sheets"][SHEET_NAME]
            .as_array_mut()
            .unwrap()
            .push(json!([{"date": "2025-10-30T18:30:00"}, "Dee", "100000000099", null]));
        std::fs::write(&self.workbook, serde_json::to_vec(&workbook).unwrap()).unwrap();
        Ok(MergedDocument::from_base64("JVBERi0="))
    }
}

#[tokio::test]
async fn test_rows_added_during_merge_survive() {
    let fixture = Fixture::new();
    seed(&fixture);
    let merger = SubmissionDuringMerge {
        workbook: fixture.workbook_path(),
    };
    let orchestrator =
        fixture.orchestrator_with(fixture.config("http://127.0.0.1:9"), Arc::new(merger));

    let report = orchestrator.merge_and_archive(&ids(&[ANN])).await.unwrap();
    assert_eq!(report.rows_marked, 1);

    let rows = fixture.read_sheet();
    assert_eq!(rows.len(), 5);
    assert!(rows[1][3].get("date").is_some());
    assert_eq!(rows[2][3], json!("earlier"));
    assert_eq!(rows[4][2], json!("100000000099"));
    assert_eq!(rows[4][3], Value::Null);
}
