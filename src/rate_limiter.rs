use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use governor::{clock::DefaultClock, state::keyed::DashMapStateStore, Quota, RateLimiter};
use std::{convert::Infallible, net::IpAddr, sync::Arc, time::Duration};
use tower::{Layer, Service};

type KeyedLimiter = RateLimiter<String, DashMapStateStore<String>, DefaultClock>;

/// Per-client quota, keyed on the first `x-forwarded-for` address.
#[derive(Clone)]
pub struct RateLimiterLayer {
    rate_limiter: Arc<KeyedLimiter>,
    quota: Quota,
}

impl RateLimiterLayer {
    pub fn new(quota: Quota) -> Self {
        RateLimiterLayer {
            rate_limiter: Arc::new(RateLimiter::dashmap(quota)),
            quota,
        }
    }

    /// Drop keys whose quota has fully replenished, on a fixed period.
    pub fn spawn_pruning(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let rate_limiter = self.rate_limiter.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                prune(&rate_limiter);
            }
        })
    }
}

fn prune(rate_limiter: &KeyedLimiter) {
    rate_limiter.retain_recent();
    rate_limiter.shrink_to_fit();
    tracing::debug!(keys = rate_limiter.len(), "Pruned rate limiter.");
}

impl<S> Layer<S> for RateLimiterLayer {
    type Service = RateLimiterMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimiterMiddleware {
            rate_limiter: self.rate_limiter.clone(),
            inner,
            quota: self.quota,
        }
    }
}

#[derive(Clone)]
pub struct RateLimiterMiddleware<S> {
    rate_limiter: Arc<KeyedLimiter>,
    inner: S,
    quota: Quota,
}

/// Only well-formed addresses become keys; anything else shares one bucket.
fn client_key(req: &Request<Body>) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|d| d.to_str().ok())
        .and_then(|d| d.split(',').next())
        .and_then(|d| d.trim().parse::<IpAddr>().ok())
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

impl<S> Service<Request<Body>> for RateLimiterMiddleware<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;

    type Error = Infallible;

    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // https://github.com/tower-rs/tower/issues/547
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let rate_limiter = self.rate_limiter.clone();
        let quota = self.quota;

        Box::pin(async move {
            let ip = client_key(&req);

            if rate_limiter.check_key(&ip).is_err() {
                tracing::warn!(%ip, "Rate limited.");

                return Ok((
                    StatusCode::TOO_MANY_REQUESTS,
                    format!("Rate limit of API calls exceeded. {:?}", quota),
                )
                    .into_response());
            }

            inner.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::{routing::get, Router};
    use nonzero_ext::nonzero;
    use tower::ServiceExt;

    use super::*;

    fn request(ip: &str) -> Request<Body> {
        Request::builder()
            .uri("/")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn limits_per_client() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(RateLimiterLayer::new(Quota::per_minute(nonzero!(2u32))));

        for _ in 0..2 {
            let res = app.clone().oneshot(request("10.0.0.1, 10.0.0.9")).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }
        let res = app.clone().oneshot(request("10.0.0.1")).await.unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

        let res = app.oneshot(request("10.0.0.2")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn junk_forwarded_values_share_one_key() {
        let layer = RateLimiterLayer::new(Quota::per_minute(nonzero!(100u32)));
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(layer.clone());

        let long = "b".repeat(4096);
        for junk in ["a", long.as_str(), "999.1.1.1", "not-an-ip"] {
            let res = app.clone().oneshot(request(junk)).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }
        app.oneshot(request("2001:db8::1")).await.unwrap();

        assert_eq!(layer.rate_limiter.len(), 2);
        prune(&layer.rate_limiter);
        assert!(layer.rate_limiter.len() <= 2);
    }
}
