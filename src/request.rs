//! The request envelope: a throttled, retrying HTTP client shared by every
//! backend, grounded on `unftp-sbe-gcs`'s `GcsClient::http_raw` (status
//! mapping, bearer-token injection) generalized to arbitrary backends and
//! wrapped with the throttle/retry/signed-URL machinery specification §6
//! ("Request envelope") calls for.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tracing::{instrument, warn};

use crate::error::{Error, ErrorKind, Result};
use crate::metrics;
use crate::settings::Settings;

/// HTTP status codes the envelope retries automatically, with exponential
/// backoff — request timeout and the three "backend is overloaded /
/// restarting" gateway statuses.
const RETRYABLE_STATUSES: [u16; 4] = [408, 502, 503, 504];

/// A callback that produces a fresh pre-signed URL, invoked when a stored
/// signed URL has expired mid-operation. Boxed so backends can close over
/// whatever credentials/HTTP client they need to mint one.
pub type SignedUrlProvider =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<String>> + Send>> + Send + Sync>;

/// Bounds concurrent outbound requests to at most `concurrency` in flight
/// within any `interval`-wide sliding window, the same shape as the
/// teacher's token/connection-reuse pooling but generalized from "one FTP
/// data connection" to "N concurrent backend calls".
///
/// This is process-global per [`RequestEnvelope`], not per-request: every
/// call through one envelope shares the same gate, mirroring the
/// specification's "process-global throttle gate keyed by
/// concurrency/interval".
struct Throttle {
    semaphore: Arc<Semaphore>,
    interval: Duration,
}

impl Throttle {
    fn new(concurrency: u32, interval: Duration) -> Self {
        Throttle {
            semaphore: Arc::new(Semaphore::new(concurrency.max(1) as usize)),
            interval,
        }
    }

    /// Acquires a throttle slot, releasing it automatically after
    /// `interval` has elapsed (not when the caller's request finishes) so
    /// the gate enforces "at most N starts per window" rather than "at most
    /// N concurrent requests".
    async fn acquire(&self) {
        if self.semaphore.available_permits() == 0 {
            metrics::record_throttle_wait();
        }
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore is never closed");
        let interval = self.interval;
        tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            drop(permit);
        });
    }
}

/// A session pool keyed by an arbitrary provider-chosen key (e.g. account
/// id), so separate credentials/hosts don't contend for the same
/// `reqwest::Client` connection pool. `reqwest::Client` already pools its
/// own connections internally, so one entry per key is enough.
struct SessionPool {
    sessions: Mutex<HashMap<String, reqwest::Client>>,
    timeout: Duration,
}

impl SessionPool {
    fn new(timeout: Duration) -> Self {
        SessionPool {
            sessions: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    async fn client_for(&self, key: &str) -> reqwest::Client {
        let mut sessions = self.sessions.lock().await;
        if let Some(client) = sessions.get(key) {
            return client.clone();
        }
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .expect("client construction with only a timeout override never fails");
        sessions.insert(key.to_string(), client.clone());
        client
    }
}

/// Shared, throttled, retrying HTTP client used by every backend.
pub struct RequestEnvelope {
    throttle: Throttle,
    sessions: SessionPool,
    max_retries: u32,
}

impl RequestEnvelope {
    /// Builds an envelope from gateway-wide [`Settings`].
    pub fn new(settings: &Settings) -> Self {
        RequestEnvelope {
            throttle: Throttle::new(settings.throttle_concurrency, settings.throttle_interval),
            sessions: SessionPool::new(settings.request_timeout),
            max_retries: 5,
        }
    }

    /// Returns the pooled `reqwest::Client` for `session_key`, constructing
    /// one on first use. Callers typically key by provider name plus
    /// account id so distinct credentials never share a connection pool.
    pub async fn client(&self, session_key: &str) -> reqwest::Client {
        self.sessions.client_for(session_key).await
    }

    /// Executes `build_request` (a closure so the request can be rebuilt
    /// identically on each retry — `reqwest::Request` bodies aren't
    /// generally cloneable once consumed) through the throttle gate, with
    /// exponential-backoff retry on [`RETRYABLE_STATUSES`].
    ///
    /// `signed_url` is consulted only if every attempt fails with 401/403;
    /// when present, the caller's `build_request` closure is expected to
    /// pick up the refreshed URL on its next invocation (typically via a
    /// shared `Arc<Mutex<..>>` the closure and the provider both hold).
    #[instrument(skip(self, build_request, signed_url), fields(verb))]
    pub async fn execute<F>(
        &self,
        verb: &str,
        mut build_request: F,
        signed_url: Option<&SignedUrlProvider>,
    ) -> Result<reqwest::Response>
    where
        F: FnMut() -> reqwest::RequestBuilder,
    {
        metrics::record_request(verb);
        let mut attempt = 0u32;
        let mut refreshed_once = false;

        loop {
            self.throttle.acquire().await;
            let response = build_request().send().await;

            match response {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status().as_u16();

                    if (status == 401 || status == 403) && !refreshed_once {
                        if let Some(provider) = signed_url {
                            refreshed_once = true;
                            provider().await?;
                            continue;
                        }
                    }

                    if RETRYABLE_STATUSES.contains(&status) && attempt < self.max_retries {
                        attempt += 1;
                        metrics::record_retry(&status.to_string());
                        warn!(status, attempt, "retrying backend request");
                        backoff(attempt).await;
                        continue;
                    }

                    metrics::record_request_error(verb, status);
                    let body = response.bytes().await.unwrap_or_default();
                    return Err(Error::from_response(status, &body, ErrorKind::from_code(status)));
                }
                Err(err) if attempt < self.max_retries && err.is_timeout() => {
                    attempt += 1;
                    metrics::record_retry("timeout");
                    warn!(attempt, "retrying backend request after timeout");
                    backoff(attempt).await;
                    continue;
                }
                Err(err) => {
                    metrics::record_request_error(verb, 0);
                    return Err(Error::new(ErrorKind::SessionClosed, "backend request failed").with_source(err));
                }
            }
        }
    }
}

/// `1s, 2s, 4s, 8s, ...` backoff used between retry attempts.
async fn backoff(attempt: u32) {
    let delay = Duration::from_secs(1) << attempt.min(6).saturating_sub(1);
    tokio::time::sleep(delay).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn succeeds_immediately_on_a_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let envelope = RequestEnvelope::new(&Settings::default());
        let client = envelope.client("test").await;
        let url = format!("{}/ok", server.uri());
        let response = envelope
            .execute("get", || client.get(&url), None)
            .await
            .unwrap();
        assert!(response.status().is_success());
    }

    #[tokio::test]
    async fn maps_a_404_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"message": "gone"}"#))
            .mount(&server)
            .await;

        let envelope = RequestEnvelope::new(&Settings::default());
        let client = envelope.client("test").await;
        let url = format!("{}/missing", server.uri());
        let err = envelope.execute("get", || client.get(&url), None).await.unwrap_err();
        assert_eq!(err.code(), 404);
    }
}
