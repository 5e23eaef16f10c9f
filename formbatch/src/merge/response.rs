//! Classification of merge endpoint responses.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;

use super::MergedDocument;
use crate::error::{FormBatchError, Result};

/// Base64 encoding of `%PDF-`, the prefix of every PDF file.
pub const PDF_BASE64_SIGNATURE: &str = "JVBERi0";

/// Maximum number of characters of an error body kept for diagnostics.
pub const ERROR_PREVIEW_CHARS: usize = 200;

/// Preview used when an error body is not text.
pub(crate) const NON_TEXT_PREVIEW: &str = "<non-text response>";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonBody {
    #[serde(default)]
    content_base64: Option<String>,
}

/// What the merge endpoint answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeResponse {
    /// A 2xx JSON body, with the document field if it was present.
    Json(Option<String>),
    /// A 2xx body of any other content type.
    Binary(Vec<u8>),
    /// A non-2xx status.
    Error {
        /// HTTP status code.
        status: u16,
        /// Truncated body text.
        preview: String,
    },
}

impl MergeResponse {
    /// Classifies a raw HTTP response.
    ///
    /// # Errors
    ///
    /// Returns `MergeParse` if the content type declares JSON but the body
    /// does not parse.
    pub fn classify(status: u16, content_type: &str, body: &[u8]) -> Result<Self> {
        if !(200..300).contains(&status) {
            return Ok(Self::Error {
                status,
                preview: preview(body),
            });
        }

        if content_type.to_ascii_lowercase().contains("json") {
            let parsed: JsonBody =
                serde_json::from_slice(body).map_err(|err| FormBatchError::MergeParse {
                    reason: err.to_string(),
                })?;
            return Ok(Self::Json(parsed.content_base64));
        }

        Ok(Self::Binary(body.to_vec()))
    }

    /// Resolves the response into a document or a service error.
    ///
    /// Binary bodies are only accepted when they carry the PDF signature.
    pub fn into_document(self) -> Result<MergedDocument> {
        match self {
            Self::Json(Some(encoded)) if !encoded.is_empty() => {
                Ok(MergedDocument::from_base64(encoded))
            }
            Self::Json(_) => Err(FormBatchError::UnexpectedMergeResponse),
            Self::Binary(bytes) => {
                let encoded = BASE64.encode(&bytes);
                if encoded.starts_with(PDF_BASE64_SIGNATURE) {
                    Ok(MergedDocument::from_base64(encoded))
                } else {
                    Err(FormBatchError::UnexpectedMergeResponse)
                }
            }
            Self::Error { status, preview } => Err(FormBatchError::MergeHttp { status, preview }),
        }
    }
}

/// First [`ERROR_PREVIEW_CHARS`] characters of a body, if it is text.
pub(crate) fn preview(body: &[u8]) -> String {
    match std::str::from_utf8(body) {
        Ok(text) => text.chars().take(ERROR_PREVIEW_CHARS).collect(),
        Err(_) => NON_TEXT_PREVIEW.to_string(),
    }
}
