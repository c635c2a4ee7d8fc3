//! Request-rate limiting for completion providers.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use tracing::warn;

use super::{CompletionProvider, CompletionRequest, CompletionResponse};
use crate::error::AnalysisError;

/// Wraps a provider so at most `rpm` requests start per minute. Up to `rpm`
/// requests may go out back to back; later ones wait for the quota to refill.
pub struct RateLimitedProvider {
    inner: Arc<dyn CompletionProvider>,
    rpm: NonZeroU32,
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl RateLimitedProvider {
    /// An `rpm` of 0 is treated as 1; [`super::create_provider`] skips the wrapper for 0.
    pub fn new(inner: Arc<dyn CompletionProvider>, rpm: u32) -> Self {
        let rpm = NonZeroU32::new(rpm).unwrap_or(NonZeroU32::MIN);
        Self {
            inner,
            rpm,
            limiter: RateLimiter::direct(Quota::per_minute(rpm)),
        }
    }

    pub fn requests_per_minute(&self) -> u32 {
        self.rpm.get()
    }
}

#[async_trait]
impl CompletionProvider for RateLimitedProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, AnalysisError> {
        self.limiter.until_ready().await;
        let result = self.inner.complete(request).await;
        if let Err(e) = &result {
            if e.is_rate_limited() {
                warn!("{} is rate limiting at {} rpm", self.inner.name(), self.rpm);
            }
        }
        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;
    use crate::test_support::MockProvider;
    use std::time::Duration;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "m".into(),
            messages: vec![Message::user("hello")],
            max_tokens: 16,
            temperature: 0.0,
            json_mode: false,
        }
    }

    struct ThrottledProvider;

    #[async_trait]
    impl CompletionProvider for ThrottledProvider {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, AnalysisError> {
            Err(AnalysisError::rate_limited("throttled", "429 too many requests"))
        }

        fn name(&self) -> &str {
            "throttled"
        }
    }

    #[tokio::test]
    async fn test_passes_requests_through() {
        let mock = Arc::new(MockProvider::new(r#"{"summary":"ok"}"#));
        let limited = RateLimitedProvider::new(mock.clone(), 60);

        let response = limited.complete(request()).await.unwrap();
        assert_eq!(response.content, r#"{"summary":"ok"}"#);
        assert_eq!(limited.name(), "mock");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_blocks_once_quota_is_spent() {
        let mock = Arc::new(MockProvider::new("{}"));
        let limited = RateLimitedProvider::new(mock.clone(), 2);

        limited.complete(request()).await.unwrap();
        limited.complete(request()).await.unwrap();

        // the next slot opens 30s later
        let third =
            tokio::time::timeout(Duration::from_millis(400), limited.complete(request())).await;
        assert!(third.is_err());
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_rate_limited_errors_pass_through() {
        let limited = RateLimitedProvider::new(Arc::new(ThrottledProvider), 10);
        let err = limited.complete(request()).await.unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_zero_rpm_is_clamped() {
        let limited = RateLimitedProvider::new(Arc::new(ThrottledProvider), 0);
        assert_eq!(limited.requests_per_minute(), 1);
    }
}
