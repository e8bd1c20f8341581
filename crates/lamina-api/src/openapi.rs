//! # OpenAPI Synthesis
//!
//! Builds the published API description: a utoipa-generated baseline that is
//! then hand-mutated before anyone sees it. The generic generator cannot
//! express the partition operation's multipart body precisely enough for SDK
//! consumers, so the synthesizer swaps in hand-authored component schemas
//! under stable public names, declares the API-key scheme, and attaches
//! client retry guidance.
//!
//! The result is cached in [`SchemaCache`] for the process lifetime and
//! served verbatim at `/general/openapi.json`; an interactive viewer lives
//! at `/general/docs`. Synthesis is idempotent, so a race between concurrent
//! first requests is tolerated: the first successful build wins.

use std::sync::OnceLock;

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use thiserror::Error;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the declared (not enforced) API key.
pub const API_KEY_HEADER: &str = "lamina-api-key";

/// Path of the partition operation in the route table.
const PARTITION_PATH: &str = "/general/v0/general";

/// Public component name for the partition request body schema.
const PARAMETERS_SCHEMA: &str = "partition_parameters";

/// Public component name for the partition response schema.
const ELEMENTS_SCHEMA: &str = "Elements";

/// Auto-generated component the synthesizer renames to [`PARAMETERS_SCHEMA`].
const GENERATED_BODY_SCHEMA: &str = "PartitionForm";

/// Adds the API-key security scheme to the generated document.
///
/// Declarative only; no handler validates the header. Enforcement belongs
/// to the deployment boundary in front of this service.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "ApiKeyAuth",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    API_KEY_HEADER,
                    "API key issued for hosted deployments.",
                ))),
            );
        }
    }
}

/// Baseline description generated from the live route table.
///
/// The health probe and metrics scrape endpoints are deliberately absent:
/// they are operational surface, not API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lamina Partition API",
        version = "0.1.0",
        description = "Partition documents into structured elements."
    ),
    servers(
        (url = "https://api.lamina.dev", description = "Hosted API"),
        (url = "http://localhost:8000", description = "Development server")
    ),
    paths(crate::routes::partition::partition),
    components(schemas(
        crate::routes::partition::PartitionForm,
        crate::error::ErrorEnvelope
    )),
    modifiers(&SecurityAddon),
    tags((name = "general", description = "Document partitioning operations"))
)]
struct ApiDoc;

/// Raised when the baseline document is missing a key a mutation relies on.
///
/// This is a configuration defect — a renamed or removed partition route —
/// not a runtime condition, so the bootstrapper surfaces it at startup
/// instead of publishing a half-mutated document.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("API description missing expected key: {0}")]
    MissingKey(String),

    #[error("API description failed to serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Walk nested JSON objects, failing with the partial path on a missing key.
fn descend<'a>(root: &'a mut Value, segments: &[&str]) -> Result<&'a mut Value, SchemaError> {
    let mut cursor = root;
    let mut walked = String::new();
    for segment in segments {
        walked.push('/');
        walked.push_str(segment);
        cursor = cursor
            .get_mut(*segment)
            .ok_or_else(|| SchemaError::MissingKey(walked.clone()))?;
    }
    Ok(cursor)
}

/// Build the published API description from the baseline route table.
///
/// Applied once per process; [`SchemaCache`] holds the result. The mutation
/// order matches the shape of the document: root extensions first, then the
/// partition operation's `$ref` redirects, then the component swap.
pub fn synthesize() -> Result<Value, SchemaError> {
    let mut doc = serde_json::to_value(ApiDoc::openapi())?;

    {
        let root = doc
            .as_object_mut()
            .ok_or_else(|| SchemaError::MissingKey("/".to_string()))?;

        // Root security requirement referencing the declared API-key scheme.
        root.insert("security".to_string(), json!([{"ApiKeyAuth": []}]));

        // Client retry guidance: exponential backoff on 5xx and connection
        // errors. Advisory metadata for generated SDKs; the server never
        // retries anything.
        root.insert(
            "x-speakeasy-retries".to_string(),
            json!({
                "strategy": "backoff",
                "backoff": {
                    "initialInterval": 500,
                    "maxInterval": 60000,
                    "maxElapsedTime": 3600000,
                    "exponent": 1.5,
                },
                "statusCodes": ["5xx"],
                "retryConnectionErrors": true,
            }),
        );
    }

    // Stable server identifiers for SDK generation.
    let servers = descend(&mut doc, &["servers"])?
        .as_array_mut()
        .ok_or_else(|| SchemaError::MissingKey("/servers".to_string()))?;
    for (server, id) in servers.iter_mut().zip(["prod", "local"]) {
        if let Some(server) = server.as_object_mut() {
            server.insert("x-speakeasy-server-id".to_string(), json!(id));
        }
    }

    // Redirect the partition operation's request body to the stable public
    // component name instead of the auto-generated one.
    let request_schema = descend(
        &mut doc,
        &[
            "paths",
            PARTITION_PATH,
            "post",
            "requestBody",
            "content",
            "multipart/form-data",
            "schema",
        ],
    )?;
    *request_schema = json!({"$ref": format!("#/components/schemas/{PARAMETERS_SCHEMA}")});

    // Same for the 200 response body.
    let response_schema = descend(
        &mut doc,
        &[
            "paths",
            PARTITION_PATH,
            "post",
            "responses",
            "200",
            "content",
            "application/json",
            "schema",
        ],
    )?;
    *response_schema = json!({"$ref": format!("#/components/schemas/{ELEMENTS_SCHEMA}")});

    // Rename the auto-generated request body component and replace its
    // properties with the hand-authored field set.
    let schemas = descend(&mut doc, &["components", "schemas"])?
        .as_object_mut()
        .ok_or_else(|| SchemaError::MissingKey("/components/schemas".to_string()))?;
    let mut parameters = schemas.remove(GENERATED_BODY_SCHEMA).ok_or_else(|| {
        SchemaError::MissingKey(format!("/components/schemas/{GENERATED_BODY_SCHEMA}"))
    })?;
    {
        let parameters = parameters.as_object_mut().ok_or_else(|| {
            SchemaError::MissingKey(format!("/components/schemas/{GENERATED_BODY_SCHEMA}"))
        })?;
        parameters.insert("title".to_string(), json!("Partition Parameters"));
        parameters.insert("properties".to_string(), partition_parameters_properties());
    }
    schemas.insert(PARAMETERS_SCHEMA.to_string(), parameters);
    schemas.insert(ELEMENTS_SCHEMA.to_string(), elements_schema());

    Ok(doc)
}

/// Hand-authored multipart field set for the partition operation.
///
/// The generic generator cannot express file-upload fields, per-field
/// defaults, and examples precisely enough for SDK consumers, so the
/// published schema is written out by hand.
fn partition_parameters_properties() -> Value {
    json!({
        "files": {
            "type": "string",
            "format": "binary",
            "description": "The file to extract",
            "examples": [{
                "summary": "File to be partitioned",
                "externalValue": "https://docs.lamina.dev/example-docs/layout-analysis.pdf"
            }]
        },
        "strategy": {
            "type": "string",
            "title": "Strategy",
            "description": "The strategy to use for partitioning PDF/image. Options are fast, hi_res, auto. Default: auto",
            "examples": ["hi_res"]
        },
        "gz_uncompressed_content_type": {
            "type": "string",
            "title": "Uncompressed Content Type",
            "description": "If file is gzipped, use this content type after unzipping",
            "examples": ["application/pdf"]
        },
        "output_format": {
            "type": "string",
            "title": "Output Format",
            "description": "The format of the response. Supported formats are application/json and text/csv. Default: application/json.",
            "examples": ["application/json"]
        },
        "coordinates": {
            "type": "boolean",
            "title": "Coordinates",
            "description": "If true, return coordinates for each element. Default: false"
        },
        "encoding": {
            "type": "string",
            "title": "Encoding",
            "description": "The encoding method used to decode the text input. Default: utf-8",
            "examples": ["utf-8"]
        },
        "hi_res_model_name": {
            "type": "string",
            "title": "Hi Res Model Name",
            "description": "The name of the inference model used when strategy is hi_res",
            "examples": ["yolox"]
        },
        "include_page_breaks": {
            "type": "boolean",
            "title": "Include Page Breaks",
            "description": "If True, the output will include page breaks if the filetype supports it. Default: false"
        },
        "languages": {
            "items": {
                "type": "string",
                "examples": ["eng"]
            },
            "type": "array",
            "title": "OCR Languages",
            "default": [],
            "description": "The languages present in the document, for use in partitioning and/or OCR",
            "examples": ["[eng]"]
        },
        "pdf_infer_table_structure": {
            "type": "boolean",
            "title": "Pdf Infer Table Structure",
            "description": "If True and strategy=hi_res, any Table Elements extracted from a PDF will include an additional metadata field, 'text_as_html', where the value (string) is a transformation of the data into an HTML table."
        },
        "skip_infer_table_types": {
            "items": {
                "type": "string",
                "examples": ["pdf"]
            },
            "type": "array",
            "title": "Skip Infer Table Types",
            "description": "The document types that you want to skip table extraction with. Default: ['pdf', 'jpg', 'png']"
        },
        "xml_keep_tags": {
            "type": "boolean",
            "title": "Xml Keep Tags",
            "description": "If True, will retain the XML tags in the output. Otherwise it will simply extract the text from within the tags. Only applies to XML input."
        },
        "chunking_strategy": {
            "type": "string",
            "title": "Chunking Strategy",
            "description": "Use one of the supported strategies to chunk the returned elements. Currently supports: by_title",
            "examples": ["by_title"]
        },
        "multipage_sections": {
            "type": "boolean",
            "title": "Multipage Sections",
            "description": "If chunking strategy is set, determines if sections can span multiple pages. Default: true"
        },
        "combine_under_n_chars": {
            "type": "integer",
            "title": "Combine Under N Chars",
            "description": "If chunking strategy is set, combine elements until a section reaches a length of n chars. Default: 500",
            "examples": [500]
        },
        "new_after_n_chars": {
            "type": "integer",
            "title": "New after n chars",
            "description": "If chunking strategy is set, cut off new sections after reaching a length of n chars (soft max). Default: 1500",
            "examples": [1500]
        },
        "max_characters": {
            "type": "integer",
            "title": "Max Characters",
            "description": "If chunking strategy is set, cut off new sections after reaching a length of n chars (hard max). Default: 1500",
            "examples": [1500]
        }
    })
}

/// Declared response shape for a successful partition call.
///
/// Element fields are untyped placeholders at this layer — exact typing
/// belongs to the partitioning backend's contract.
fn elements_schema() -> Value {
    json!({
        "type": "array",
        "items": {
            "Element": {
                "type": "object",
                "properties": {
                    "type": {},
                    "element_id": {},
                    "metadata": {},
                    "text": {}
                }
            }
        }
    })
}

/// Process-lifetime holder for the synthesized description.
///
/// Owned by the application state and passed explicitly to the routes that
/// serve it. Written logically once; concurrent first accesses may both
/// compute, and the first store wins; the documents are equal either way.
#[derive(Debug, Default)]
pub struct SchemaCache {
    doc: OnceLock<Value>,
}

impl SchemaCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            doc: OnceLock::new(),
        }
    }

    /// Return the cached document, synthesizing it on first access.
    pub fn get_or_build(&self) -> Result<&Value, SchemaError> {
        if let Some(doc) = self.doc.get() {
            return Ok(doc);
        }
        let doc = synthesize()?;
        Ok(self.doc.get_or_init(|| doc))
    }
}

/// Build the description and documentation router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/general/openapi.json", get(openapi_json))
        .route("/general/docs", get(docs))
}

/// GET /general/openapi.json — the synthesized API description.
async fn openapi_json(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let doc = state
        .schema
        .get_or_build()
        .map_err(|e| ApiError::unexpected(e.to_string()))?;
    Ok(Json(doc.clone()))
}

/// GET /general/docs — interactive documentation viewer.
async fn docs() -> Html<&'static str> {
    Html(DOCS_HTML)
}

const DOCS_HTML: &str = r##"<!DOCTYPE html>
<html>
<head>
    <title>Lamina Partition API</title>
    <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
        SwaggerUIBundle({
            url: "/general/openapi.json",
            dom_id: "#swagger-ui",
            presets: [SwaggerUIBundle.presets.apis],
        });
    </script>
</body>
</html>
"##;
