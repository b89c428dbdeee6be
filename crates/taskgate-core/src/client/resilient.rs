//! ResilientClient - timeout / retry 分類 / exponential backoff
//!
//! 1 つの論理リクエストを「時間制限つき試行」の有限列として実行します。
//!
//! # フロー
//! 1. 試行ごとに `timeout` の deadline を張る（期限切れ → RetryableFailure）
//! 2. レスポンスを `AttemptOutcome` に分類
//! 3. Success → 返す / TerminalFailure → 即エラー / RetryableFailure → backoff して再試行
//! 4. 試行を使い切ったら、最後の原因を含む `TransportError` を返す
//!
//! 呼び出し側が見るのは最終結果ひとつだけです。個々の試行の失敗は外に漏れません。

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};
use ulid::Ulid;

use super::outcome::{AttemptOutcome, FailureCause};
use super::retry::RetryPolicy;
use crate::domain::{ApiError, TransportError};
use crate::ports::{HttpRequest, HttpResponse, Transport};

/// Cheap to clone: the transport is shared.
#[derive(Clone)]
pub struct ResilientClient {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl ResilientClient {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Default policy used by [`ResilientClient::execute`] and the JSON helpers.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// A client sharing this transport but with a different default policy.
    pub fn with_policy(&self, policy: RetryPolicy) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            policy,
        }
    }

    /// Execute with the client's default policy.
    pub async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.execute_with(request, &self.policy).await
    }

    /// Execute with an explicit policy.
    pub async fn execute_with(
        &self,
        request: &HttpRequest,
        policy: &RetryPolicy,
    ) -> Result<HttpResponse, ApiError> {
        let request_id = Ulid::new();
        let max_attempts = policy.max_attempts.max(1);
        let mut last_cause: Option<FailureCause> = None;

        for attempt in 1..=max_attempts {
            match self.attempt(request, policy.timeout).await {
                AttemptOutcome::Success(response) => {
                    debug!(
                        %request_id,
                        method = %request.method,
                        url = %request.url,
                        attempt,
                        status = response.status,
                        "request succeeded"
                    );
                    return Ok(response);
                }
                AttemptOutcome::TerminalFailure(cause) => {
                    debug!(
                        %request_id,
                        method = %request.method,
                        url = %request.url,
                        attempt,
                        %cause,
                        "terminal failure, not retrying"
                    );
                    return Err(cause.into());
                }
                AttemptOutcome::RetryableFailure(cause) => {
                    if attempt < max_attempts {
                        let delay = policy.next_delay(attempt);
                        warn!(
                            %request_id,
                            method = %request.method,
                            url = %request.url,
                            attempt,
                            max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            %cause,
                            "attempt failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_cause = Some(cause);
                }
            }
        }

        let last = last_cause
            .map(|c| c.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        error!(
            %request_id,
            method = %request.method,
            url = %request.url,
            max_attempts,
            last_cause = %last,
            "retries exhausted"
        );
        Err(TransportError::new(format!(
            "Request failed after {max_attempts} attempts: {last}"
        ))
        .into())
    }

    /// One timed attempt. The deadline future is dropped when this returns.
    async fn attempt(&self, request: &HttpRequest, timeout: Duration) -> AttemptOutcome {
        match tokio::time::timeout(timeout, self.transport.send(request)).await {
            Err(_elapsed) => AttemptOutcome::from_transport(TransportError::new(format!(
                "Request timeout after {}ms",
                timeout.as_millis()
            ))),
            Ok(Err(e)) => AttemptOutcome::from_transport(e),
            Ok(Ok(response)) => AttemptOutcome::from_response(response),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use crate::testing::{ScriptedTransport, Step};
    use tokio::time::Instant;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(100),
            max_attempts,
            Duration::from_millis(1_000),
        )
    }

    fn client(transport: Arc<ScriptedTransport>, max_attempts: u32) -> ResilientClient {
        ResilientClient::new(transport, policy(max_attempts))
    }

    /// Paused-clock timers fire on millisecond ticks.
    fn within(actual: Duration, expected: Duration) -> bool {
        actual >= expected && actual < expected + Duration::from_millis(10)
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_n_minus_one_server_errors() {
        let n = 4;
        let mut steps: Vec<Step> = (0..n - 1)
            .map(|_| Step::Respond(500, String::new()))
            .collect();
        steps.push(Step::Respond(200, "[]".into()));
        let transport = ScriptedTransport::new(steps);

        let resp = client(transport.clone(), n)
            .execute(&HttpRequest::get("http://upstream/todos/inbox"))
            .await
            .unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(transport.call_count(), n as usize);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_delays_double_between_attempts() {
        let transport = ScriptedTransport::new([
            Step::Respond(503, String::new()),
            Step::Respond(429, String::new()),
            Step::Fail("connection reset"),
            Step::Respond(200, "{}".into()),
        ]);

        client(transport.clone(), 4)
            .execute(&HttpRequest::get("http://upstream/health"))
            .await
            .unwrap();

        let at: Vec<Instant> = transport.calls().iter().map(|c| c.at).collect();
        let gaps: Vec<Duration> = at.windows(2).map(|w| w[1] - w[0]).collect();
        let expected = [1_000, 2_000, 4_000].map(Duration::from_millis);
        assert_eq!(gaps.len(), expected.len());
        for (gap, want) in gaps.iter().zip(expected) {
            assert!(within(*gap, want), "gap {gap:?}, expected {want:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn client_error_is_terminal_without_sleep() {
        let transport = ScriptedTransport::new([
            Step::Respond(404, r#"{"error":"Task not found"}"#.into()),
            Step::Respond(200, "{}".into()),
        ]);

        let start = Instant::now();
        let err = client(transport.clone(), 3)
            .execute(&HttpRequest::get("http://upstream/todos/missing"))
            .await
            .unwrap_err();

        assert_eq!(transport.call_count(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        match err {
            ApiError::Upstream(e) => {
                assert_eq!(e.status_code(), 404);
                assert_eq!(e.message(), "Task not found");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn always_timing_out_exhausts_into_transport_error() {
        let transport = ScriptedTransport::new([Step::Hang, Step::Hang, Step::Hang]);

        let start = Instant::now();
        let err = client(transport.clone(), 3)
            .execute(&HttpRequest::get("http://upstream/todos/today"))
            .await
            .unwrap_err();
        let elapsed = start.elapsed();

        // 3 x timeout + base + 2 x base
        let expected = Duration::from_millis(3 * 100 + 1_000 + 2_000);
        assert!(within(elapsed, expected), "elapsed {elapsed:?}");

        assert_eq!(transport.call_count(), 3);
        assert_eq!(err.kind(), ErrorKind::ConnectionLost);
        let msg = err.to_string();
        assert!(msg.contains("after 3 attempts"), "{msg}");
        assert!(msg.contains("Request timeout after 100ms"), "{msg}");
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_server_errors_report_as_transport() {
        let transport = ScriptedTransport::new([
            Step::Respond(500, String::new()),
            Step::Respond(502, r#"{"error":"upstream down"}"#.into()),
        ]);

        let err = client(transport.clone(), 2)
            .execute(&HttpRequest::get("http://upstream/todos/inbox"))
            .await
            .unwrap_err();

        match err {
            ApiError::Transport(e) => {
                assert!(e.message().contains("after 2 attempts"));
                assert!(e.message().contains("HTTP 502: upstream down"));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn single_attempt_policy_never_sleeps() {
        let transport = ScriptedTransport::new([Step::Respond(500, String::new())]);

        let start = Instant::now();
        let err = client(transport.clone(), 1)
            .execute(&HttpRequest::get("http://upstream/health"))
            .await
            .unwrap_err();

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_policy_overrides_default() {
        let transport = ScriptedTransport::new([Step::Hang]);
        let c = client(transport.clone(), 3);

        let start = Instant::now();
        let short = policy(1).with_timeout(Duration::from_millis(5_000));
        let err = c
            .execute_with(&HttpRequest::get("http://upstream/health"), &short)
            .await
            .unwrap_err();

        assert!(within(start.elapsed(), Duration::from_millis(5_000)));
        assert!(err.to_string().contains("after 1 attempts"));
        assert_eq!(c.policy().max_attempts, 3);
    }
}
