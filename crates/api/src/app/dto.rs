//! Envelope and payload DTOs.
//!
//! The remote-call envelope carries an opcode plus a JSON payload
//! re-encoded as text. Missing envelope or payload fields deserialize to
//! their zero values and are caught by validation, never by the decoder.

use serde::{Deserialize, Serialize};

use kilim_catalog::{ProductDraft, ProductRecord};
use kilim_core::{CatalogError, CatalogResult, CompanyId};

/// Generic remote-call request envelope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RequestMessage {
    pub op_code: i32,
    pub language: String,
    pub username: String,
    pub company_id: i64,
    pub company_name: String,
    /// JSON re-encoded as text; decoded per opcode.
    pub payload: String,
}

/// Generic remote-call response envelope.
///
/// Always carried over HTTP 200; the status fields inside the envelope
/// report the outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub status_code: u16,
    pub status_message: String,
    pub payload: String,
}

impl ResponseMessage {
    /// Success envelope with the JSON-encoded result as payload text.
    pub fn ok<T: Serialize>(result: &T) -> CatalogResult<Self> {
        let payload = serde_json::to_string(result)
            .map_err(|e| CatalogError::internal(format!("failed to encode payload: {e}")))?;
        Ok(Self { status_code: 200, status_message: "ok".to_string(), payload })
    }
}

/// Product shape submitted by a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewProductPayload {
    pub company_id: i64,
    pub company_name: String,
    pub design_code: String,
    pub description: String,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
}

impl NewProductPayload {
    pub fn into_draft(self) -> ProductDraft {
        ProductDraft {
            company_id: CompanyId::new(self.company_id),
            design_code: self.design_code,
            description: self.description,
            sizes: self.sizes,
            colors: self.colors,
        }
    }
}

/// Payload of the create-product opcode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNewProductRequest {
    pub new_product: NewProductPayload,
}

/// One product in a listing payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPayload {
    pub id: i64,
    pub company_id: i64,
    pub design_code: String,
    pub description: String,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
}

impl From<&ProductRecord> for ProductPayload {
    fn from(record: &ProductRecord) -> Self {
        Self {
            id: record.id.as_i64(),
            company_id: record.company_id.as_i64(),
            design_code: record.design_code.clone(),
            description: record.description.clone(),
            sizes: record.sizes().map(str::to_string).collect(),
            colors: record.colors().map(str::to_string).collect(),
        }
    }
}

/// Reply of the create-product opcode: the company's full live listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNewProductResponse {
    pub products: Vec<ProductPayload>,
}
