//! Shared fixtures for formbatch integration tests.
//!
//! Provides a temporary store root with staging and archive folders, a JSON
//! tracking workbook, minimal PDFs built with lopdf, and a one-shot HTTP
//! server that answers the merge request with a canned response.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use formbatch::Config;
use formbatch::Orchestrator;
use formbatch::merge::{HttpMergeClient, MergeService};
use formbatch::sheet::JsonWorkbook;
use formbatch::store::LocalFolderStore;
use lopdf::{Document, Object, Stream, dictionary};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const STAGING: &str = "completed";
pub const ARCHIVE: &str = "archive";
pub const SHEET_NAME: &str = "Form Responses 1";

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("formbatch=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}

/// A single-page PDF.
pub fn pdf_bytes() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");

    let content_id = doc.add_object(Object::Stream(Stream::new(dictionary! {}, vec![])));
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => Object::Name(b"Page".to_vec()),
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
        "Contents" => Object::Reference(content_id),
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => Object::Name(b"Pages".to_vec()),
            "Kids" => Object::Array(vec![Object::Reference(page_id)]),
            "Count" => Object::Integer(1),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => Object::Name(b"Catalog".to_vec()),
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize fixture PDF");
    bytes
}

/// Temporary store root plus tracking workbook.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        init_test_logging();
        let dir = TempDir::new().expect("create temp dir");
        std::fs::create_dir(dir.path().join(STAGING)).expect("create staging");
        std::fs::create_dir(dir.path().join(ARCHIVE)).expect("create archive");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn workbook_path(&self) -> PathBuf {
        self.dir.path().join("tracking.json")
    }

    /// Writes `bytes` as `name` in `folder`.
    pub fn put(&self, folder: &str, name: &str, bytes: &[u8]) {
        std::fs::write(self.root().join(folder).join(name), bytes).expect("write fixture file");
    }

    pub fn exists(&self, folder: &str, name: &str) -> bool {
        self.root().join(folder).join(name).is_file()
    }

    /// Writes the tracking sheet: a header row followed by `rows`.
    pub fn write_sheet(&self, headers: &[&str], rows: Vec<Value>) {
        let mut grid = vec![json!(headers)];
        grid.extend(rows);
        let workbook = json!({ "sheets": { SHEET_NAME: grid } });
        std::fs::write(
            self.workbook_path(),
            serde_json::to_vec_pretty(&workbook).expect("encode workbook"),
        )
        .expect("write workbook");
    }

    /// Rows of the tracking sheet as stored on disk, header row included.
    pub fn read_sheet(&self) -> Vec<Value> {
        let raw = std::fs::read(self.workbook_path()).expect("read workbook");
        let workbook: Value = serde_json::from_slice(&raw).expect("decode workbook");
        workbook["sheets"][SHEET_NAME]
            .as_array()
            .cloned()
            .unwrap_or_default()
    }

    pub fn config(&self, merge_service_url: &str) -> Config {
        Config {
            staging_folder_id: STAGING.to_string(),
            archive_folder_id: ARCHIVE.to_string(),
            merge_service_url: merge_service_url.to_string(),
            sheet_id: self.workbook_path().display().to_string(),
            sheet_name: SHEET_NAME.to_string(),
            timeout_secs: 5,
            ..Config::default()
        }
    }

    /// Orchestrator over the local store and JSON workbook with the HTTP
    /// merge client.
    pub fn orchestrator(&self, merge_service_url: &str) -> Orchestrator {
        let config = self.config(merge_service_url);
        let client = HttpMergeClient::new(&config).expect("build client");
        self.orchestrator_with(config, Arc::new(client))
    }

    pub fn orchestrator_with(&self, config: Config, merger: Arc<dyn MergeService>) -> Orchestrator {
        Orchestrator::new(
            config,
            Arc::new(LocalFolderStore::new(self.root())),
            Arc::new(JsonWorkbook::new()),
            merger,
        )
        .expect("valid config")
    }
}

/// What the canned server received.
#[derive(Debug)]
pub struct CapturedRequest {
    /// Request line and headers, lowercased.
    pub head: String,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("request body is JSON")
    }
}

/// One-shot HTTP server bound to `127.0.0.1:0`.
pub struct CannedServer {
    base_url: String,
    task: JoinHandle<CapturedRequest>,
}

impl CannedServer {
    /// Answers the first request with `status`, `content_type` and `body`.
    pub async fn start(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let content_type = content_type.to_string();
        let body = body.into();

        let task = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let request = read_request(&mut socket).await;

            let head = format!(
                "HTTP/1.1 {status} Canned\r\n\
                 Content-Type: {content_type}\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.expect("write head");
            socket.write_all(&body).await.expect("write body");
            let _ = socket.shutdown().await;
            request
        });

        Self {
            base_url: format!("http://{addr}"),
            task,
        }
    }

    /// Starts a server that answers `200 application/json` with the document.
    pub async fn json_document(base64: &str) -> Self {
        Self::start(
            200,
            "application/json; charset=utf-8",
            json!({ "contentBase64": base64 }).to_string(),
        )
        .await
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Waits for the server task and returns the request it saw.
    pub async fn request(self) -> CapturedRequest {
        self.task.await.expect("server task")
    }
}

/// Base URL of a port nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}

async fn read_request(socket: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.expect("read request");
        assert!(n > 0, "connection closed before headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + length {
        let n = socket.read(&mut chunk).await.expect("read body");
        assert!(n > 0, "connection closed before body");
        buf.extend_from_slice(&chunk[..n]);
    }

    CapturedRequest {
        head,
        body: buf[header_end..header_end + length].to_vec(),
    }
}
