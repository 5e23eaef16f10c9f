//! Merge service client.
//!
//! Staged files are sent to a remote merge endpoint in a single request and
//! the answer is normalized into one base64-encoded PDF:
//!
//! - [`MergePayload`]: staged files, bounded by count and cumulative size
//! - [`MergeRequest`]: the JSON wire body
//! - [`MergeResponse`]: tagged union over what the endpoint can answer
//! - [`HttpMergeClient`]: the reqwest-backed [`MergeService`]

pub mod client;
pub mod response;

pub use client::{HttpMergeClient, merge_endpoint, output_name};
pub use response::{MergeResponse, PDF_BASE64_SIGNATURE};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::error::{FormBatchError, Result};

/// A file read from the store and queued for merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Store identifier.
    pub id: String,
    /// Display name, forwarded to the merge service.
    pub name: String,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

/// Why a file could not be added to a [`MergePayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityExceeded {
    /// The payload already holds the maximum number of files.
    Count,
    /// Adding the file would push the payload over the byte cap.
    Bytes,
}

/// Ordered files for one merge request.
///
/// Never holds more than `max_files` files nor more than `max_total_bytes`
/// bytes in total.
#[derive(Debug, Clone)]
pub struct MergePayload {
    files: Vec<StagedFile>,
    total_bytes: u64,
    max_files: usize,
    max_total_bytes: u64,
}

impl MergePayload {
    /// Creates an empty payload with the given caps.
    pub fn new(max_files: usize, max_total_bytes: u64) -> Self {
        Self {
            files: Vec::new(),
            total_bytes: 0,
            max_files,
            max_total_bytes,
        }
    }

    /// Appends a file if both caps still hold afterwards.
    ///
    /// On rejection the payload is unchanged.
    pub fn try_push(&mut self, file: StagedFile) -> std::result::Result<(), CapacityExceeded> {
        if self.files.len() >= self.max_files {
            return Err(CapacityExceeded::Count);
        }
        let total = self.total_bytes.saturating_add(file.bytes.len() as u64);
        if total > self.max_total_bytes {
            return Err(CapacityExceeded::Bytes);
        }
        self.total_bytes = total;
        self.files.push(file);
        Ok(())
    }

    /// Staged files in order.
    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    /// Number of staged files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Cumulative size of the staged files.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Builds the wire body.
    pub fn to_request(&self, output_name: impl Into<String>) -> MergeRequest {
        MergeRequest {
            output_name: output_name.into(),
            files: self
                .files
                .iter()
                .map(|file| MergeRequestFile {
                    name: file.name.clone(),
                    content_base64: BASE64.encode(&file.bytes),
                })
                .collect(),
        }
    }
}

/// JSON body of `POST {base}/merge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    /// Suggested name of the merged file.
    pub output_name: String,
    /// Files in merge order.
    pub files: Vec<MergeRequestFile>,
}

/// One file of a [`MergeRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequestFile {
    /// Display name.
    pub name: String,
    /// File content, base64-encoded.
    pub content_base64: String,
}

/// A merged PDF, base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedDocument {
    base64: String,
}

impl MergedDocument {
    /// Wraps an already-encoded document.
    pub fn from_base64(base64: impl Into<String>) -> Self {
        Self {
            base64: base64.into(),
        }
    }

    /// The encoded document.
    pub fn as_base64(&self) -> &str {
        &self.base64
    }

    /// Consumes the document, returning the encoded form.
    pub fn into_base64(self) -> String {
        self.base64
    }

    /// Decodes the document into raw PDF bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(self.base64.as_bytes())
            .map_err(|err| FormBatchError::MergeParse {
                reason: err.to_string(),
            })
    }
}

/// Something that can merge a payload into a single PDF.
#[async_trait]
pub trait MergeService: Send + Sync {
    /// Merges the payload.
    ///
    /// Every failure, including transport failures, is returned as an error
    /// value.
    async fn merge(&self, payload: &MergePayload) -> Result<MergedDocument>;
}
