//! Intercepts every request and answers it through the cache worker.

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::extract::State;
use axum::http::Uri;
use shellcache_core::message::strip_hop_by_hop;
use shellcache_core::{Network, Request, Response};
use shellcache_worker::CacheWorker;
use url::Url;

use crate::control::HostControl;
use crate::error::ProxyError;

#[derive(Clone)]
pub struct AppState {
    pub worker: Arc<CacheWorker>,
    pub control: Arc<HostControl>,
    pub network: Arc<dyn Network>,
    pub origin: Url,
    pub max_body_bytes: usize,
}

pub fn router(state: AppState) -> axum::Router {
    axum::Router::new().fallback(intercept).with_state(state)
}

async fn intercept(
    State(state): State<AppState>, request: axum::extract::Request,
) -> Result<axum::response::Response, ProxyError> {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|e| ProxyError::InvalidRequest(format!("request body: {e}")))?;

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);

    let url = upstream_url(&state.origin, &parts.uri);
    let request = Request::new(parts.method, url).with_headers(headers).with_body(body);

    let outcome = if state.control.is_controlling() {
        state.worker.handle(request).await
    } else {
        tracing::debug!(url = %request.url, "not yet controlling, passing through");
        state.network.fetch(&request).await.map(Some)
    };

    match outcome? {
        Some(response) => Ok(into_http(response)),
        None => Err(ProxyError::NoResponse),
    }
}

/// Rebase the incoming path and query onto the origin. The host of the
/// origin never changes, whatever the path looks like.
fn upstream_url(origin: &Url, uri: &Uri) -> Url {
    let mut url = origin.clone();
    url.set_path(uri.path());
    url.set_query(uri.query());
    url
}

fn into_http(response: Response) -> axum::response::Response {
    let Response { status, mut headers, body } = response;
    strip_hop_by_hop(&mut headers);

    let mut out = axum::response::Response::new(Body::from(body));
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use axum::http::{Method, StatusCode, header};
    use shellcache_core::{AppConfig, Error, MemoryStorage};
    use shellcache_worker::{ClientControl, WorkerConfig};
    use tower::ServiceExt;

    use super::*;

    /// Answers from a fixed table keyed by absolute URL and records what it saw.
    #[derive(Default)]
    struct StubNetwork {
        replies: HashMap<String, Response>,
        seen: Mutex<Vec<Request>>,
    }

    impl StubNetwork {
        fn reply(mut self, url: &str, status: StatusCode, body: &'static str) -> Self {
            self.replies.insert(url.to_string(), Response::new(status, body));
            self
        }

        fn seen(&self) -> Vec<Request> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Network for StubNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            self.seen.lock().unwrap().push(request.clone());
            self.replies.get(request.url.as_str()).cloned().ok_or_else(|| Error::Network("offline".into()))
        }
    }

    fn app(network: StubNetwork, claimed: bool) -> (axum::Router, Arc<StubNetwork>) {
        let config = AppConfig { origin: "http://game.test".into(), ..Default::default() };
        let network = Arc::new(network);
        let control = Arc::new(HostControl::new());
        if claimed {
            control.claim();
        }

        let worker = CacheWorker::new(
            WorkerConfig::from_app_config(&config).unwrap(),
            Arc::new(MemoryStorage::new()),
            network.clone(),
        )
        .with_control(control.clone());

        let state = AppState {
            worker: Arc::new(worker),
            control,
            network: network.clone(),
            origin: Url::parse(&config.origin).unwrap(),
            max_body_bytes: 1024,
        };
        (router(state), network)
    }

    fn request(method: Method, uri: &str) -> axum::extract::Request {
        axum::http::Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_upstream_url_keeps_origin_host() {
        let origin = Url::parse("http://game.test").unwrap();
        let uri: Uri = "/api/score?level=2".parse().unwrap();
        assert_eq!(upstream_url(&origin, &uri).as_str(), "http://game.test/api/score?level=2");

        let sneaky: Uri = "//elsewhere.test/steal".parse().unwrap();
        assert_eq!(upstream_url(&origin, &sneaky).host_str(), Some("game.test"));
    }

    #[tokio::test]
    async fn test_controlled_request_goes_through_worker() {
        let network = StubNetwork::default().reply("http://game.test/api/asset/player", StatusCode::OK, "sprite");
        let (app, network) = app(network, true);

        let first = app.clone().oneshot(request(Method::GET, "/api/asset/player")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(body_text(first).await, "sprite");

        let second = app.oneshot(request(Method::GET, "/api/asset/player")).await.unwrap();
        assert_eq!(body_text(second).await, "sprite");
        assert_eq!(network.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_uncontrolled_request_bypasses_cache() {
        let network = StubNetwork::default().reply("http://game.test/api/asset/player", StatusCode::OK, "sprite");
        let (app, network) = app(network, false);

        for _ in 0..2 {
            let response = app.clone().oneshot(request(Method::GET, "/api/asset/player")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(network.seen().len(), 2);
    }

    #[tokio::test]
    async fn test_absent_response_is_gateway_timeout() {
        let (app, _network) = app(StubNetwork::default(), true);

        let response = app.oneshot(request(Method::GET, "/api/score")).await.unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_engine_error_is_bad_gateway() {
        let (app, _network) = app(StubNetwork::default(), true);

        let response = app.oneshot(request(Method::GET, "/hangar")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_text(response).await, "NETWORK_ERROR: offline");
    }

    #[tokio::test]
    async fn test_upstream_status_and_body_are_forwarded() {
        let network = StubNetwork::default().reply("http://game.test/api/score", StatusCode::CREATED, "saved");
        let (app, network) = app(network, true);

        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/api/score")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONNECTION, "keep-alive")
            .body(Body::from(r#"{"score":1200}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_text(response).await, "saved");

        let seen = network.seen();
        assert_eq!(seen[0].method, Method::POST);
        assert_eq!(&seen[0].body[..], br#"{"score":1200}"#);
        assert_eq!(seen[0].headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
        assert!(seen[0].headers.get(header::CONNECTION).is_none());
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let (app, network) = app(StubNetwork::default(), true);

        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/api/score")
            .body(Body::from(vec![b'x'; 4096]))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(network.seen().is_empty());
    }
}
