//! Recreate search against a JSON workbook on disk.

use formbatch::SearchQuery;
use formbatch::api;
use serde_json::json;

use crate::common::Fixture;

const HEADERS: [&str; 6] = [
    "Timestamp",
    "First Name",
    "Last Name",
    "FormID",
    "Generated At",
    "Printed At",
];

fn seed(fixture: &Fixture) {
    let at = |value: &str| json!({ "date": value });
    fixture.write_sheet(
        &HEADERS,
        vec![
            json!([
                at("2025-10-01T09:00:00"),
                "ann",
                "LEE",
                "100000000001",
                at("2025-10-02T08:00:00"),
                null
            ]),
            json!([
                at("2025-10-30T18:19:00"),
                "Bob",
                "Stone",
                "100000000002",
                at("2025-10-31T08:00:00"),
                null
            ]),
            json!([at("2025-10-15T12:00:00"), "Cy", "Ray", "100000000003", null, null]),
            json!([
                "garbage",
                "Dee",
                "Lee",
                "100000000004",
                at("2025-10-02T08:00:00"),
                null
            ]),
            json!([
                at("2025-10-20T07:30:00"),
                "Eve",
                "lee",
                100000000005_u64,
                "manual",
                null
            ]),
        ],
    );
}

#[tokio::test]
async fn test_search_envelope_newest_first() {
    let fixture = Fixture::new();
    seed(&fixture);
    let orchestrator = fixture.orchestrator("http://127.0.0.1:9");

    let reply = api::search_forms_for_recreate(&orchestrator, &SearchQuery::default()).await;
    let value = serde_json::to_value(&reply).unwrap();

    assert_eq!(
        value,
        json!({
            "ok": true,
            "rows": [
                {
                    "timestamp": "10/30/2025",
                    "name": "Bob Stone",
                    "generatedAt": "10/31/2025",
                    "formId": "100000000002"
                },
                {
                    "timestamp": "10/20/2025",
                    "name": "Eve Lee",
                    "generatedAt": "manual",
                    "formId": "100000000005"
                },
                {
                    "timestamp": "10/1/2025",
                    "name": "Ann Lee",
                    "generatedAt": "10/2/2025",
                    "formId": "100000000001"
                }
            ]
        })
    );
}

#[tokio::test]
async fn test_search_combines_filters() {
    let fixture = Fixture::new();
    seed(&fixture);
    let orchestrator = fixture.orchestrator("http://127.0.0.1:9");

    let query = SearchQuery {
        start: Some("2025-10-01".to_string()),
        end: Some("2025-10-20".to_string()),
        last: Some("lee".to_string()),
        ..SearchQuery::default()
    };
    let rows = orchestrator.search(&query).await.unwrap();
    let found: Vec<&str> = rows.iter().map(|r| r.form_id.as_str()).collect();
    assert_eq!(found, vec!["100000000005", "100000000001"]);
}

#[tokio::test]
async fn test_search_does_not_write() {
    let fixture = Fixture::new();
    seed(&fixture);
    let before = std::fs::read(fixture.workbook_path()).unwrap();
    let orchestrator = fixture.orchestrator("http://127.0.0.1:9");

    orchestrator.search(&SearchQuery::default()).await.unwrap();
    assert_eq!(std::fs::read(fixture.workbook_path()).unwrap(), before);
}

#[tokio::test]
async fn test_search_failures_become_envelopes() {
    let fixture = Fixture::new();
    fixture.write_sheet(&["Timestamp", "First Name"], vec![]);
    let orchestrator = fixture.orchestrator("http://127.0.0.1:9");

    let reply = api::search_forms_for_recreate(&orchestrator, &SearchQuery::default()).await;
    assert_eq!(
        serde_json::to_value(&reply).unwrap(),
        json!({"ok": false, "message": "Missing Last Name column in sheet."})
    );

    let bad_date = SearchQuery {
        end: Some("yesterday".to_string()),
        ..SearchQuery::default()
    };
    let reply = api::search_forms_for_recreate(&orchestrator, &bad_date).await;
    assert!(!reply.ok);
}
