//! Error-to-envelope mapping.

use kilim_core::CatalogError;

use super::dto::ResponseMessage;

/// Build the failure envelope for a service error.
///
/// The envelope's numeric code and snake_case message come from the error
/// taxonomy; the payload is an empty JSON object so callers can always
/// decode it.
pub fn error_envelope(err: &CatalogError) -> ResponseMessage {
    ResponseMessage {
        status_code: err.status_code(),
        status_message: err.status_label().to_string(),
        payload: "{}".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_code_and_label() {
        let envelope = error_envelope(&CatalogError::ProductNotFound);
        assert_eq!(envelope.status_code, 404);
        assert_eq!(envelope.status_message, "product_not_found");
        assert_eq!(envelope.payload, "{}");

        let envelope = error_envelope(&CatalogError::duplicate_key("design code taken"));
        assert_eq!(envelope.status_code, 409);
        assert_eq!(envelope.status_message, "duplicate_key");

        let envelope = error_envelope(&CatalogError::Timeout);
        assert_eq!(envelope.status_code, 504);
        assert_eq!(envelope.status_message, "time_out");
    }
}
