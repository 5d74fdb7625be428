//! HTTP implementation of the cache engine's network seam.
//!
//! ### Forwarding
//! - Method, headers and body are forwarded as received
//! - Hop-by-hop headers are stripped in both directions
//! - `CacheMode::Reload` adds `Cache-Control: no-cache` and `Pragma: no-cache`
//!
//! ### Limits
//! - Request timeout: 20s (configurable)
//! - Max redirects: 5
//! - Max body bytes: 50MB (configurable)
//!
//! Every response the upstream sends is returned, including non-2xx
//! statuses; only transport failures become errors.

use std::time::{Duration, Instant};

use reqwest::{Client, header};
use shellcache_core::message::strip_hop_by_hop;
use shellcache_core::{AppConfig, CacheMode, Error, Network, Request, Response};

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string sent when the client supplied none (default: "shellcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 50MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "shellcache/0.1".to_string(),
            max_bytes: 50 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// Network backed by a reqwest client.
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new HTTP network with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn map_send_error(&self, url: &str, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::FetchTimeout(format!("{} after {}ms", url, self.config.timeout.as_millis()))
        } else {
            Error::Network(format!("{}: {}", url, err))
        }
    }
}

#[async_trait::async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();

        let mut headers = request.headers.clone();
        strip_hop_by_hop(&mut headers);
        if request.cache_mode == CacheMode::Reload {
            headers.insert(header::CACHE_CONTROL, header::HeaderValue::from_static("no-cache"));
            headers.insert(header::PRAGMA, header::HeaderValue::from_static("no-cache"));
        }

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(headers);
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_send_error(request.url.as_str(), e))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let mut headers = response.headers().clone();
        strip_hop_by_hop(&mut headers);

        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_send_error(request.url.as_str(), e))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use reqwest::{Method, Url};

    async fn serve(app: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    async fn echo_cache_control(headers: HeaderMap) -> String {
        headers
            .get("cache-control")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none")
            .to_string()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "shellcache/0.1");
        assert_eq!(config.max_bytes, 50 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { timeout_ms: 1500, user_agent: "skyace/2".into(), ..Default::default() };
        let config = FetchConfig::from_app_config(&app);
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.user_agent, "skyace/2");
    }

    #[tokio::test]
    async fn test_http_network_new() {
        assert!(HttpNetwork::new(FetchConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_returns_non_ok_responses() {
        let origin = serve(Router::new().route("/missing", get(|| async { (StatusCode::NOT_FOUND, "gone") }))).await;
        let network = HttpNetwork::new(FetchConfig::default()).unwrap();

        let response = network.fetch(&Request::get(origin.join("/missing").unwrap())).await.unwrap();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(!response.is_ok());
        assert_eq!(&response.body[..], b"gone");
    }

    #[tokio::test]
    async fn test_reload_mode_bypasses_caches() {
        let origin = serve(Router::new().route("/index.html", get(echo_cache_control))).await;
        let network = HttpNetwork::new(FetchConfig::default()).unwrap();
        let url = origin.join("/index.html").unwrap();

        let plain = network.fetch(&Request::get(url.clone())).await.unwrap();
        assert_eq!(&plain.body[..], b"none");

        let reload = network
            .fetch(&Request::get(url).with_cache_mode(CacheMode::Reload))
            .await
            .unwrap();
        assert_eq!(&reload.body[..], b"no-cache");
    }

    #[tokio::test]
    async fn test_forwards_method_and_body() {
        let origin = serve(Router::new().route("/api/score", post(|body: String| async move { format!("got {body}") })))
            .await;
        let network = HttpNetwork::new(FetchConfig::default()).unwrap();

        let request = Request::new(Method::POST, origin.join("/api/score").unwrap()).with_body("1200");
        let response = network.fetch(&request).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(&response.body[..], b"got 1200");
    }

    #[tokio::test]
    async fn test_body_limit() {
        let origin = serve(Router::new().route("/big", get(|| async { "0123456789" }))).await;
        let network = HttpNetwork::new(FetchConfig { max_bytes: 4, ..Default::default() }).unwrap();

        let result = network.fetch(&Request::get(origin.join("/big").unwrap())).await;
        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let network = HttpNetwork::new(FetchConfig::default()).unwrap();
        let url = Url::parse(&format!("http://{addr}/")).unwrap();
        let err = network.fetch(&Request::get(url)).await.unwrap_err();
        assert!(err.is_network());
    }
}
