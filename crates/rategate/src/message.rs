//! JSON status payload shared by the endpoint and the admission middleware.

use crate::error::AdmissionError;
use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// `{"status": ..., "body": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub status: String,
    pub body: String,
}

impl Message {
    pub fn new(status: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            body: body.into(),
        }
    }

    /// Payload of the wrapped informational endpoint.
    pub fn greeting() -> Self {
        Self::new("Successful", "Hi! You've reached the API. How may I help you?")
    }

    pub fn request_ok() -> Self {
        Self::new("Request OK", "OK")
    }

    pub fn at_capacity() -> Self {
        Self::new("Request Failed", "The API is at capacity, try again later.")
    }
}

/// Serialize `message` as an `application/json` response with `status`.
///
/// The status is decided before encoding, so an encoding failure cannot turn
/// into a different status: it is logged and the body is left empty.
pub fn json_response(status: StatusCode, message: &Message) -> Response {
    match serde_json::to_vec(message) {
        Ok(bytes) => {
            let mut response = (status, Body::from(bytes)).into_response();
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            response
        }
        Err(err) => encoding_failure(status, err),
    }
}

/// Response for a payload that failed to encode: `status` is kept, the
/// body is empty and the error is logged.
pub fn encoding_failure(status: StatusCode, err: serde_json::Error) -> Response {
    let err = AdmissionError::from(err);
    error!(status = status.as_u16(), error = %err, "response body dropped");
    status.into_response()
}
