//! Partition request contract and the backend trait.

use bytes::Bytes;
use thiserror::Error;

use crate::Element;

/// A single uploaded file from the multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied filename.
    pub filename: String,
    /// Declared MIME type of the part, when the client sent one.
    pub content_type: Option<String>,
    /// Raw file content.
    pub data: Bytes,
}

/// Parameters accepted by the partition operation.
///
/// Mirrors the public multipart field set. `None` means "backend default";
/// array parameters default to empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionParams {
    /// Partitioning strategy for PDF/image input: fast, hi_res, or auto.
    pub strategy: Option<String>,
    /// Content type to assume after decompressing a gzipped upload.
    pub gz_uncompressed_content_type: Option<String>,
    /// Response format requested by the client.
    pub output_format: Option<String>,
    /// Whether to include element coordinates.
    pub coordinates: Option<bool>,
    /// Text encoding used to decode the input.
    pub encoding: Option<String>,
    /// Inference model name when strategy is hi_res.
    pub hi_res_model_name: Option<String>,
    /// Whether to emit page-break elements.
    pub include_page_breaks: Option<bool>,
    /// Languages present in the document, for partitioning and OCR.
    pub languages: Vec<String>,
    /// Whether to extract table structure from PDFs.
    pub pdf_infer_table_structure: Option<bool>,
    /// Document types to skip table extraction for.
    pub skip_infer_table_types: Vec<String>,
    /// Whether to retain XML tags in the output.
    pub xml_keep_tags: Option<bool>,
    /// Chunking strategy applied to the returned elements.
    pub chunking_strategy: Option<String>,
    /// Whether chunked sections may span multiple pages.
    pub multipage_sections: Option<bool>,
    /// Combine elements until a section reaches this length.
    pub combine_under_n_chars: Option<u32>,
    /// Soft maximum section length when chunking.
    pub new_after_n_chars: Option<u32>,
    /// Hard maximum section length when chunking.
    pub max_characters: Option<u32>,
}

/// A complete partition request: uploaded files plus parsed parameters.
#[derive(Debug, Clone, Default)]
pub struct PartitionRequest {
    pub files: Vec<UploadedFile>,
    pub params: PartitionParams,
}

/// Failure surface of a partitioning backend.
#[derive(Error, Debug)]
pub enum PartitionError {
    /// Deliberate rejection carrying the HTTP status the gateway should
    /// return (unsupported file type, undecodable input, ...).
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// Any other backend failure. The gateway reports these as 500s.
    #[error("{0}")]
    Backend(String),
}

impl PartitionError {
    /// Construct a deliberate rejection with an intended HTTP status.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Construct an unexpected backend failure.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// The seam between the gateway and the partitioning engine.
///
/// Implementations may suspend on I/O; the gateway awaits them without
/// blocking other in-flight requests. Cancellation and timeouts are the
/// caller's concern, not part of this contract.
#[async_trait::async_trait]
pub trait Partitioner: Send + Sync {
    /// Partition the uploaded documents into an ordered element list.
    async fn partition(&self, request: PartitionRequest) -> Result<Vec<Element>, PartitionError>;
}
