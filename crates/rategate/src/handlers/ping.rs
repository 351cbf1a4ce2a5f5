//! Informational endpoint
//!
//! ANY /ping - canned greeting payload

use axum::{http::StatusCode, response::Response};

use crate::message::{Message, json_response};

/// ANY /ping
///
/// Always returns 200 with the greeting payload. Reached only for requests
/// the admission middleware forwards.
pub async fn endpoint() -> Response {
    json_response(StatusCode::OK, &Message::greeting())
}
