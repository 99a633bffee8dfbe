//! Generic remote-call endpoint.
//!
//! One POST route accepts an opcode plus a JSON payload re-encoded as
//! text. Only the create-product opcode is wired; every other opcode
//! answers `not_implemented`. Outcomes travel inside the envelope, so the
//! HTTP status is always 200 once the envelope itself decodes.

use axum::{Json, extract::Extension};
use tracing::{Span, instrument};

use kilim_core::{CatalogError, CatalogResult};

use crate::app::AppState;
use crate::app::dto::{
    CreateNewProductRequest, CreateNewProductResponse, ProductPayload, RequestMessage,
    ResponseMessage,
};
use crate::app::errors;

/// Opcode dispatched to `CatalogService::create_new_product`.
pub const NEW_PRODUCT_OP_CODE: i32 = 1;

#[instrument(skip(state, req), fields(request_id = tracing::field::Empty, op_code = req.op_code))]
pub async fn general_call(
    Extension(state): Extension<AppState>,
    Json(req): Json<RequestMessage>,
) -> Json<ResponseMessage> {
    let request_id = uuid::Uuid::now_v7();
    Span::current().record("request_id", request_id.to_string().as_str());

    // The deadline covers the whole dispatch; expiry drops the in-flight
    // future, which rolls back any open transaction.
    let outcome = tokio::time::timeout(state.call_timeout, dispatch(&state, &req)).await;
    let envelope = match outcome {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            tracing::warn!(op_code = req.op_code, error = %err, "remote call failed");
            errors::error_envelope(&err)
        }
        Err(_) => {
            tracing::warn!(op_code = req.op_code, "remote call timed out");
            errors::error_envelope(&CatalogError::Timeout)
        }
    };
    Json(envelope)
}

async fn dispatch(state: &AppState, req: &RequestMessage) -> CatalogResult<ResponseMessage> {
    match req.op_code {
        NEW_PRODUCT_OP_CODE => create_new_product(state, &req.payload).await,
        _ => Err(CatalogError::NotImplemented),
    }
}

async fn create_new_product(state: &AppState, payload: &str) -> CatalogResult<ResponseMessage> {
    let request: CreateNewProductRequest =
        serde_json::from_str(payload).map_err(|_| CatalogError::BadRequest)?;

    let products = state
        .catalog
        .create_new_product(request.new_product.into_draft())
        .await?;

    let response = CreateNewProductResponse {
        products: products.iter().map(ProductPayload::from).collect(),
    };
    ResponseMessage::ok(&response)
}
