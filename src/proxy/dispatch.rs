//! Concurrent replay of one inbound request to every eligible destination.
//!
//! [`select`] filters the directory snapshot and picks the default.
//! [`dispatch`] then spawns one replay per eligible destination on a
//! [`JoinSet`] owned by a detached task, narrates each outcome to the [`Hub`] the moment it
//! finishes, and waits for all of them before returning. The default
//! replay hands its fully drained response back through a oneshot slot;
//! every other replay only contributes a broadcast line.
//!
//! A failing non-default destination never fails the request. A failing
//! default always does, whatever the others did.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, Method, StatusCode, Uri};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use tokio::sync::oneshot;
use tokio::task::JoinSet;

use super::compose::compose_url;
use super::headers::build_replay_headers;
use crate::broadcast::Hub;
use crate::directory::Destination;
use crate::error::DispatchError;
use crate::server::HttpClient;

/// The default destination's response, body fully buffered.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Result of a single replay, as reported to observers.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub url: String,
    pub status: Option<StatusCode>,
    pub latency_ms: u64,
    pub error: Option<String>,
}

impl Outcome {
    #[must_use]
    pub fn line(&self, method: &Method) -> String {
        match (&self.error, self.status) {
            (Some(err), _) => format!("error forwarding {method} to {}: {err}", self.url),
            (None, Some(status)) => format!(
                "forwarded {method} to {} -> {status} ({}ms)",
                self.url, self.latency_ms
            ),
            (None, None) => format!("forwarded {method} to {} -> no status", self.url),
        }
    }
}

/// Eligible destinations in directory order, plus the index of the default among them.
#[derive(Debug)]
pub struct Selection<'a> {
    pub eligible: Vec<&'a Destination>,
    pub default_idx: usize,
}

impl Selection<'_> {
    #[must_use]
    pub fn default_destination(&self) -> &Destination {
        self.eligible[self.default_idx]
    }
}

/// Apply the eligibility filter and pick the default.
///
/// When several eligible destinations are marked default, the first in
/// directory order wins.
pub fn select<'a>(
    destinations: &'a [Destination],
    method: &str,
) -> Result<Selection<'a>, DispatchError> {
    let eligible: Vec<&Destination> = destinations.iter().filter(|d| d.accepts(method)).collect();
    if eligible.is_empty() {
        return Err(DispatchError::NoEligibleDestinations);
    }

    let mut defaults = eligible
        .iter()
        .enumerate()
        .filter(|(_, d)| d.is_default)
        .map(|(idx, _)| idx);
    let default_idx = defaults.next().ok_or(DispatchError::NoDefaultDestination)?;

    let extra = defaults.count();
    if extra > 0 {
        tracing::warn!(
            chosen = %eligible[default_idx].url,
            ignored = extra,
            "several eligible destinations are marked default, using the first"
        );
    }

    if eligible[default_idx].url.is_empty() {
        return Err(DispatchError::EmptyDefaultUrl);
    }

    Ok(Selection {
        eligible,
        default_idx,
    })
}

pub struct DispatchRequest<'a> {
    pub client: &'a HttpClient,
    pub hub: &'a Arc<Hub>,
    pub destinations: &'a [Destination],
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub headers: &'a HeaderMap,
    pub body: &'a Bytes,
    pub timeout: Option<Duration>,
    pub strip_hop_by_hop: bool,
    pub correlation_id: &'a str,
}

type DefaultSlot = oneshot::Sender<Result<CapturedResponse, String>>;

/// One replay, owning everything it needs so it can outlive the caller.
struct Replay {
    client: HttpClient,
    hub: Arc<Hub>,
    method: Method,
    target: url::Url,
    headers: HeaderMap,
    body: Bytes,
    timeout: Option<Duration>,
    correlation_id: Arc<str>,
    slot: Option<DefaultSlot>,
}

/// Replays the request to every eligible destination and returns the
/// default's response once all of them have finished.
///
/// The replays run on a detached task: if the caller goes away while
/// this future is pending, every destination is still contacted and
/// still narrated to the hub.
pub async fn dispatch(req: DispatchRequest<'_>) -> Result<CapturedResponse, DispatchError> {
    let selection = select(req.destinations, req.method.as_str())?;

    let (default_tx, default_rx) = oneshot::channel();
    let mut default_slot = Some(default_tx);
    let mut default_url = selection.default_destination().url.clone();
    let correlation_id: Arc<str> = Arc::from(req.correlation_id);

    let mut replays = Vec::with_capacity(selection.eligible.len());
    for (idx, destination) in selection.eligible.iter().enumerate() {
        let slot = if idx == selection.default_idx {
            default_slot.take()
        } else {
            None
        };

        let target = match compose_url(&destination.url, req.uri.path(), req.uri.query()) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(
                    correlation_id = %correlation_id,
                    destination = %destination.id,
                    error = %e,
                    "skipping destination"
                );
                req.hub.broadcast(&format!(
                    "error forwarding {} to {}: {e}",
                    req.method, destination.url
                ));
                if let Some(slot) = slot {
                    let _ = slot.send(Err(e.to_string()));
                }
                continue;
            }
        };

        if slot.is_some() {
            default_url = target.to_string();
        }

        replays.push(Replay {
            client: req.client.clone(),
            hub: Arc::clone(req.hub),
            method: req.method.clone(),
            headers: build_replay_headers(req.headers, &target, req.strip_hop_by_hop),
            target,
            body: req.body.clone(),
            timeout: req.timeout,
            correlation_id: Arc::clone(&correlation_id),
            slot,
        });
    }

    let fan_out = tokio::spawn(join_all(replays, Arc::clone(&correlation_id)));
    if let Err(e) = fan_out.await {
        tracing::error!(correlation_id = %correlation_id, error = %e, "fan-out task failed");
    }

    match default_rx.await {
        Ok(Ok(captured)) => Ok(captured),
        Ok(Err(reason)) => Err(DispatchError::DefaultDestinationUnreachable {
            url: default_url,
            reason,
        }),
        Err(_) => Err(DispatchError::DefaultDestinationUnreachable {
            url: default_url,
            reason: "replay ended without a result".to_string(),
        }),
    }
}

/// Barrier: returns once every replay has been attempted.
async fn join_all(replays: Vec<Replay>, correlation_id: Arc<str>) {
    let mut set = JoinSet::new();
    for replay in replays {
        set.spawn(run_replay(replay));
    }
    while let Some(joined) = set.join_next().await {
        if let Err(e) = joined {
            tracing::error!(
                correlation_id = %correlation_id,
                error = %e,
                "replay task panicked"
            );
        }
    }
}

async fn run_replay(replay: Replay) {
    let Replay {
        client,
        hub,
        method,
        target,
        headers,
        body,
        timeout,
        correlation_id,
        slot,
    } = replay;
    let is_default = slot.is_some();

    let (outcome, captured) = send(&client, method.clone(), target, headers, body, timeout).await;

    if let Some(err) = &outcome.error {
        tracing::warn!(
            correlation_id = %correlation_id,
            target = %outcome.url,
            default = is_default,
            error = %err,
            latency_ms = outcome.latency_ms,
            "replay failed"
        );
    } else {
        tracing::info!(
            correlation_id = %correlation_id,
            target = %outcome.url,
            default = is_default,
            status = outcome.status.map_or(0, |s| s.as_u16()),
            latency_ms = outcome.latency_ms,
            "replay completed"
        );
    }
    hub.broadcast(&outcome.line(&method));

    if let Some(slot) = slot {
        let result = captured.ok_or_else(|| {
            outcome
                .error
                .unwrap_or_else(|| "no response".to_string())
        });
        let _ = slot.send(result);
    }
}

#[allow(clippy::cast_possible_truncation)]
async fn send(
    client: &HttpClient,
    method: Method,
    target: url::Url,
    headers: HeaderMap,
    body: Bytes,
    timeout: Option<Duration>,
) -> (Outcome, Option<CapturedResponse>) {
    let start = Instant::now();
    let url = target.to_string();

    let mut request = match hyper::Request::builder()
        .method(method)
        .uri(url.as_str())
        .body(Full::new(body))
    {
        Ok(r) => r,
        Err(e) => {
            return (
                Outcome {
                    url,
                    status: None,
                    latency_ms: start.elapsed().as_millis() as u64,
                    error: Some(e.to_string()),
                },
                None,
            );
        }
    };
    *request.headers_mut() = headers;

    let exchange = async {
        let response = client.request(request).await.map_err(|e| error_chain(&e))?;
        let status = response.status();
        let headers = response.headers().clone();
        // Drained even when discarded so the pooled connection can be reused.
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| format!("body read error: {}", error_chain(&e)))?
            .to_bytes();
        Ok::<_, String>(CapturedResponse {
            status,
            headers,
            body,
        })
    };

    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, exchange)
            .await
            .unwrap_or_else(|_| Err(format!("timed out after {}ms", limit.as_millis()))),
        None => exchange.await,
    };
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(captured) => (
            Outcome {
                url,
                status: Some(captured.status),
                latency_ms,
                error: None,
            },
            Some(captured),
        ),
        Err(error) => (
            Outcome {
                url,
                status: None,
                latency_ms,
                error: Some(error),
            },
            None,
        ),
    }
}

/// Render an error with its sources, e.g. `client error (Connect): tcp connect error: Connection refused`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        // thiserror messages often already embed their source.
        let text = cause.to_string();
        if !rendered.ends_with(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dest(url: &str, method: &str, active: bool, default: bool) -> Destination {
        Destination {
            id: url.to_string(),
            url: url.into(),
            method: method.into(),
            is_active: active,
            is_default: default,
        }
    }

    #[test]
    fn no_active_destinations() {
        let dests = vec![dest("http://a", "", false, true)];
        assert!(matches!(
            select(&dests, "GET"),
            Err(DispatchError::NoEligibleDestinations)
        ));
        assert!(matches!(
            select(&[], "GET"),
            Err(DispatchError::NoEligibleDestinations)
        ));
    }

    #[test]
    fn method_filter_applies_to_eligibility() {
        let dests = vec![
            dest("http://a", "", true, true),
            dest("http://b", "POST", true, false),
        ];
        let get = select(&dests, "GET").unwrap();
        assert_eq!(get.eligible.len(), 1);

        let post = select(&dests, "POST").unwrap();
        assert_eq!(post.eligible.len(), 2);
    }

    #[test]
    fn only_method_mismatched_destinations_is_no_eligible() {
        let dests = vec![dest("http://a", "POST", true, true)];
        assert!(matches!(
            select(&dests, "GET"),
            Err(DispatchError::NoEligibleDestinations)
        ));
    }

    #[test]
    fn missing_default() {
        let dests = vec![
            dest("http://a", "", true, false),
            dest("http://b", "", true, false),
        ];
        assert!(matches!(
            select(&dests, "GET"),
            Err(DispatchError::NoDefaultDestination)
        ));
    }

    #[test]
    fn ineligible_default_counts_as_missing() {
        let dests = vec![
            dest("http://a", "POST", true, true),
            dest("http://b", "", true, false),
        ];
        assert!(matches!(
            select(&dests, "GET"),
            Err(DispatchError::NoDefaultDestination)
        ));
    }

    #[test]
    fn empty_default_url() {
        let dests = vec![dest("", "", true, true), dest("http://b", "", true, false)];
        assert!(matches!(
            select(&dests, "GET"),
            Err(DispatchError::EmptyDefaultUrl)
        ));
    }

    #[test]
    fn first_default_wins() {
        let dests = vec![
            dest("http://a", "", true, false),
            dest("http://b", "", true, true),
            dest("http://c", "", true, true),
        ];
        let selection = select(&dests, "GET").unwrap();
        assert_eq!(selection.default_idx, 1);
        assert_eq!(selection.default_destination().url, "http://b");
    }

    #[test]
    fn outcome_lines() {
        let ok = Outcome {
            url: "http://a/x".into(),
            status: Some(StatusCode::CREATED),
            latency_ms: 7,
            error: None,
        };
        assert_eq!(
            ok.line(&Method::POST),
            "forwarded POST to http://a/x -> 201 Created (7ms)"
        );

        let failed = Outcome {
            url: "http://b/x".into(),
            status: None,
            latency_ms: 1,
            error: Some("connection refused".into()),
        };
        assert_eq!(
            failed.line(&Method::GET),
            "error forwarding GET to http://b/x: connection refused"
        );
    }

    #[derive(Debug, thiserror::Error)]
    #[error("client error (Connect)")]
    struct ConnectFailed(#[source] std::io::Error);

    #[test]
    fn error_chain_appends_sources() {
        let err = ConnectFailed(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert_eq!(
            error_chain(&err),
            "client error (Connect): connection refused"
        );
    }

    #[test]
    fn error_chain_skips_sources_already_in_the_message() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "inner");
        let outer = crate::error::HopperError::HttpRequest {
            source: Box::new(io),
        };
        assert_eq!(error_chain(&outer), "HTTP request failed: inner");
    }
}
