//! # Partition Operation
//!
//! `POST /general/v0/general` — the multipart entry point. The handler owns
//! request shape only: it drains the multipart stream into the backend
//! contract (`lamina-core`) and hands off. Partitioning itself happens
//! behind the `Partitioner` seam; without a configured backend the
//! operation answers 503.

use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use lamina_core::{Element, PartitionParams, PartitionRequest, UploadedFile};

use crate::error::{ApiError, ErrorEnvelope};
use crate::state::AppState;

/// Build the partition router.
pub fn router() -> Router<AppState> {
    Router::new().route("/general/v0/general", post(partition))
}

/// Multipart form accepted by the partition operation.
///
/// Baseline schema generation only — the handler reads the multipart stream
/// directly, and the published description replaces this component's
/// properties with the hand-authored `partition_parameters` fragment.
#[derive(Debug, ToSchema)]
pub struct PartitionForm {
    /// The file to extract.
    #[schema(format = Binary)]
    pub files: String,
    /// Partitioning strategy for PDF/image input: fast, hi_res, or auto.
    pub strategy: Option<String>,
    /// Content type to assume after decompressing a gzipped upload.
    pub gz_uncompressed_content_type: Option<String>,
    /// Response format.
    pub output_format: Option<String>,
    /// Whether to include element coordinates.
    pub coordinates: Option<bool>,
    /// Text encoding used to decode the input.
    pub encoding: Option<String>,
    /// Inference model name when strategy is hi_res.
    pub hi_res_model_name: Option<String>,
    /// Whether to emit page-break elements.
    pub include_page_breaks: Option<bool>,
    /// Languages present in the document.
    pub languages: Option<Vec<String>>,
    /// Whether to extract table structure from PDFs.
    pub pdf_infer_table_structure: Option<bool>,
    /// Document types to skip table extraction for.
    pub skip_infer_table_types: Option<Vec<String>>,
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

/// Response element shape for baseline schema generation.
///
/// The published description replaces this with the `Elements` component;
/// exact element typing is owned by the partitioning backend.
#[derive(Debug, Serialize, ToSchema)]
pub struct PartitionedElement {
    /// Element category.
    #[serde(rename = "type")]
    pub element_type: String,
    /// Stable element identifier.
    pub element_id: String,
    /// Backend-defined metadata.
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    /// Extracted text content.
    pub text: String,
}

/// Handle `POST /general/v0/general`.
#[utoipa::path(
    post,
    path = "/general/v0/general",
    tag = "general",
    operation_id = "partition",
    request_body(content = PartitionForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Partitioned elements", body = inline(Vec<PartitionedElement>)),
        (status = 422, description = "Invalid multipart request", body = ErrorEnvelope),
        (status = 503, description = "No partitioning backend configured", body = ErrorEnvelope)
    )
)]
pub async fn partition(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Vec<Element>>, ApiError> {
    let request = read_request(multipart).await?;
    if request.files.is_empty() {
        return Err(ApiError::unprocessable(
            "no file part found in the multipart request",
        ));
    }

    let partitioner = state
        .partitioner
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("no partitioning backend is configured"))?;

    let elements = partitioner.partition(request).await?;
    Ok(Json(elements))
}

/// Drain the multipart stream into the backend request contract.
async fn read_request(mut multipart: Multipart) -> Result<PartitionRequest, ApiError> {
    let mut files = Vec::new();
    let mut params = PartitionParams::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::unprocessable(format!("malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if name == "files" {
            let filename = field.file_name().unwrap_or("upload").to_owned();
            let content_type = field.content_type().map(str::to_owned);
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::unprocessable(format!("failed to read file part: {e}")))?;
            files.push(UploadedFile {
                filename,
                content_type,
                data,
            });
        } else {
            let value = field.text().await.map_err(|e| {
                ApiError::unprocessable(format!("failed to read form field {name}: {e}"))
            })?;
            apply_param(&mut params, &name, &value)?;
        }
    }

    Ok(PartitionRequest { files, params })
}

/// Apply one form field to the parameter set. Unknown fields are ignored.
fn apply_param(params: &mut PartitionParams, name: &str, value: &str) -> Result<(), ApiError> {
    match name {
        "strategy" => params.strategy = Some(value.to_owned()),
        "gz_uncompressed_content_type" => {
            params.gz_uncompressed_content_type = Some(value.to_owned());
        }
        "output_format" => params.output_format = Some(value.to_owned()),
        "coordinates" => params.coordinates = Some(parse_bool(name, value)?),
        "encoding" => params.encoding = Some(value.to_owned()),
        "hi_res_model_name" => params.hi_res_model_name = Some(value.to_owned()),
        "include_page_breaks" => params.include_page_breaks = Some(parse_bool(name, value)?),
        "languages" => params.languages.push(value.to_owned()),
        "pdf_infer_table_structure" => {
            params.pdf_infer_table_structure = Some(parse_bool(name, value)?);
        }
        "skip_infer_table_types" => params.skip_infer_table_types.push(value.to_owned()),
        "xml_keep_tags" => params.xml_keep_tags = Some(parse_bool(name, value)?),
        "chunking_strategy" => params.chunking_strategy = Some(value.to_owned()),
        "multipage_sections" => params.multipage_sections = Some(parse_bool(name, value)?),
        "combine_under_n_chars" => params.combine_under_n_chars = Some(parse_u32(name, value)?),
        "new_after_n_chars" => params.new_after_n_chars = Some(parse_u32(name, value)?),
        "max_characters" => params.max_characters = Some(parse_u32(name, value)?),
        _ => tracing::debug!(field = name, "ignoring unrecognized form field"),
    }
    Ok(())
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ApiError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ApiError::unprocessable(format!(
            "{name} must be a boolean, got '{value}'"
        ))),
    }
}

fn parse_u32(name: &str, value: &str) -> Result<u32, ApiError> {
    value.parse().map_err(|_| {
        ApiError::unprocessable(format!("{name} must be an integer, got '{value}'"))
    })
}
