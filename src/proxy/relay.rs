//! Turns the captured default response into the caller's response.

use axum::body::Body;
use axum::response::Response;

use super::dispatch::CapturedResponse;
use super::headers::strip_response_hop_by_hop;

/// Status and body are passed through untouched, even for error statuses.
/// Headers are passed through minus the framing headers that no longer
/// apply to a buffered body.
#[must_use]
pub fn relay(captured: CapturedResponse) -> Response {
    let CapturedResponse {
        status,
        mut headers,
        body,
    } = captured;
    strip_response_hop_by_hop(&mut headers);

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
