//! HTTP exchanges raced against cancellation and the query deadline.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use trino_transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};

use crate::cancel::CancelHandle;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::base_headers;

/// Everything a query needs to talk to the coordinator.
#[derive(Debug, Clone)]
pub(crate) struct Exchange {
    transport: Arc<dyn Transport>,
    config: Arc<Config>,
    cancel: CancelHandle,
    deadline: Option<Instant>,
    timeout: Option<Duration>,
}

impl Exchange {
    /// Start the clock: the deadline is `timeout` from now.
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        config: Arc<Config>,
        cancel: CancelHandle,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            transport,
            config,
            cancel,
            deadline: timeout.map(|t| Instant::now() + t),
            timeout,
        }
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    fn deadline_error(&self) -> Error {
        Error::DeadlineExceeded {
            timeout: self.timeout.unwrap_or_default(),
        }
    }

    /// The pending interruption, if cancellation was signaled or the
    /// deadline has passed.
    pub(crate) fn interruption(&self) -> Option<Error> {
        if self.cancel.is_canceled() {
            Some(Error::Canceled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(self.deadline_error())
        } else {
            None
        }
    }

    /// Run `fut` unless cancellation or the deadline comes first.
    async fn race<F: Future>(&self, fut: F) -> Result<F::Output> {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            biased;
            () = self.cancel.canceled() => Err(Error::Canceled),
            () = deadline => Err(self.deadline_error()),
            output = fut => Ok(output),
        }
    }

    /// Send `request`, retrying gateway statuses and transient transport
    /// failures per the retry policy.
    ///
    /// A statement `POST` that timed out may already be running on the
    /// coordinator, so for submissions only connection failures are retried.
    /// Non-200 responses that are not retried are returned as-is.
    pub(crate) async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let policy = &self.config.retry;
        let mut attempt = 0;
        loop {
            let outcome = self.race(self.transport.send(request.clone())).await?;
            let retryable = match &outcome {
                Ok(response) => response.is_retryable_status(),
                Err(e) => retryable_error(request.method, e),
            };
            if !retryable || !policy.should_retry(attempt) {
                return outcome.map_err(Error::from);
            }

            attempt += 1;
            let backoff = policy.backoff_for_attempt(attempt);
            match &outcome {
                Ok(response) => tracing::warn!(
                    method = %request.method,
                    uri = %request.url,
                    status = response.status,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "retrying request"
                ),
                Err(e) => tracing::warn!(
                    method = %request.method,
                    uri = %request.url,
                    error = %e,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "retrying request"
                ),
            }
            self.race(tokio::time::sleep(backoff)).await?;
        }
    }

    /// Ask the coordinator to drop the query behind `uri`, without waiting.
    ///
    /// Outside a tokio runtime (e.g. a stream dropped after its runtime shut
    /// down) the request is skipped; the coordinator expires abandoned
    /// queries on its own.
    pub(crate) fn spawn_cancel(&self, uri: String) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(uri = %uri, "no runtime available, skipping cancel request");
            return;
        };
        let transport = Arc::clone(&self.transport);
        let request = HttpRequest::new(Method::Delete, uri).with_headers(base_headers(&self.config));
        let limit = self.config.timeouts.cancel_timeout;
        runtime.spawn(async move {
            let uri = request.url.clone();
            match tokio::time::timeout(limit, transport.send(request)).await {
                Ok(Ok(response)) => {
                    tracing::debug!(uri = %uri, status = response.status, "cancel request sent");
                }
                Ok(Err(e)) => tracing::debug!(uri = %uri, error = %e, "cancel request failed"),
                Err(_) => tracing::debug!(uri = %uri, "cancel request timed out"),
            }
        });
    }
}

fn retryable_error(method: Method, error: &TransportError) -> bool {
    match method {
        Method::Post => matches!(error, TransportError::Connect(_)),
        _ => error.is_transient(),
    }
}
