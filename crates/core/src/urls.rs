//! URL resolution for manifests, cache keys and the upstream origin.

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Parse the upstream origin every relative URL is resolved against.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Require an `http` or `https` scheme
/// 3. Remove fragment (#...)
pub fn parse_origin(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    check_scheme(&parsed)?;
    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve a manifest entry or request path against `origin`.
///
/// Absolute URLs are kept as they are; paths are joined onto the origin.
/// Fragments never take part in cache identity and are removed. The query
/// string is preserved untouched.
pub fn resolve(origin: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut resolved = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    check_scheme(&resolved)?;
    resolved.set_fragment(None);

    Ok(resolved)
}

fn check_scheme(url: &Url) -> Result<(), UrlError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }
}
