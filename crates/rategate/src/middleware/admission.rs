//! Per-client admission control middleware
//!
//! Each request is keyed by its source host (port discarded) and charged one
//! token from that client's bucket. Outcomes:
//!
//! | Condition | Status | Payload |
//! |-----------|--------|---------|
//! | source address unparsable | `500` | empty |
//! | bucket empty | `429` | `Request Failed` + `Retry-After` |
//! | admitted, [`AdmissionMode::Respond`] | `200` | `Request OK` |
//! | admitted, [`AdmissionMode::Forward`] | wrapped endpoint's response | |

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::config::AdmissionMode;
use crate::error::{AdmissionError, AdmissionResult};
use crate::message::{Message, json_response};
use crate::state::AdmissionState;

/// Axum middleware enforcing the per-client token bucket.
///
/// Install with `axum::middleware::from_fn_with_state`. The source address
/// comes from the `ConnectInfo<SocketAddr>` extension, so the service must
/// be served with `into_make_service_with_connect_info::<SocketAddr>()`.
pub async fn admission(
    State(state): State<AdmissionState>,
    req: Request,
    next: Next,
) -> Response {
    let remote = remote_addr(&req);
    let identity = match client_identity(&remote) {
        Ok(identity) => identity,
        Err(err) => {
            error!(error = %err, "rejecting request");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let now = Instant::now();
    let client = state.registry.get_or_create(&identity, now);
    state.registry.touch(&identity, now);

    if !client.allow(now) {
        let retry_after = client.retry_after(now);
        warn!(
            client = %identity,
            retry_after_ms = retry_after.as_millis() as u64,
            "rate limit exceeded"
        );
        let mut response = json_response(StatusCode::TOO_MANY_REQUESTS, &Message::at_capacity());
        let secs = retry_after.as_secs_f64().ceil().max(1.0) as u64;
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        return response;
    }

    debug!(client = %identity, "request admitted");
    match state.mode {
        AdmissionMode::Respond => json_response(StatusCode::OK, &Message::request_ok()),
        AdmissionMode::Forward => next.run(req).await,
    }
}

/// Source address as `host:port`, or an empty string when the connection
/// info is missing.
fn remote_addr(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default()
}

/// Client identity for `addr`: the host part, port discarded.
pub fn client_identity(addr: &str) -> AdmissionResult<String> {
    split_host_port(addr).map(|(host, _port)| host.to_string())
}

/// Split `host:port` or `[host]:port` into its parts.
///
/// A bare IPv6 literal must be bracketed. The port may be empty but the
/// colon separating it may not be missing.
pub fn split_host_port(addr: &str) -> AdmissionResult<(&str, &str)> {
    let fail = |reason| AdmissionError::AddressParse {
        addr: addr.to_string(),
        reason,
    };

    let colon = addr.rfind(':').ok_or_else(|| fail("missing port in address"))?;

    let (host, host_start, host_end) = if let Some(rest) = addr.strip_prefix('[') {
        let close = rest.find(']').ok_or_else(|| fail("missing ']' in address"))? + 1;
        match addr.as_bytes().get(close + 1).copied() {
            None => return Err(fail("missing port in address")),
            Some(b':') if close + 1 == colon => {}
            Some(b':') => return Err(fail("too many colons in address")),
            Some(_) => return Err(fail("missing port in address")),
        }
        (&addr[1..close], 1, close + 1)
    } else {
        let host = &addr[..colon];
        if host.contains(':') {
            return Err(fail("too many colons in address"));
        }
        (host, 0, 0)
    };

    if addr[host_start..].contains('[') {
        return Err(fail("unexpected '[' in address"));
    }
    if addr[host_end..].contains(']') {
        return Err(fail("unexpected ']' in address"));
    }

    Ok((host, &addr[colon + 1..]))
}
