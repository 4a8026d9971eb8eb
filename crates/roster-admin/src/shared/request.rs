//! Request inspection helpers for the admin handlers.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

/// Whether the client asked for data rather than a page
/// (`X-Requested-With: XMLHttpRequest`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsyncRequest(pub bool);

impl<S> FromRequestParts<S> for AsyncRequest
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let flagged = parts
            .headers
            .get("x-requested-with")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
            .unwrap_or(false);
        Ok(Self(flagged))
    }
}

/// The `Referer` header when it is a usable redirect target.
pub fn referer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    async fn extract(req: Request<()>) -> AsyncRequest {
        let (mut parts, _) = req.into_parts();
        AsyncRequest::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_async_request_flag() {
        let req = Request::builder().header("X-Requested-With", "XMLHttpRequest").body(()).unwrap();
        assert_eq!(extract(req).await, AsyncRequest(true));

        let req = Request::builder().body(()).unwrap();
        assert_eq!(extract(req).await, AsyncRequest(false));
    }

    #[test]
    fn test_referer() {
        let mut headers = HeaderMap::new();
        assert_eq!(referer(&headers), None);

        headers.insert(header::REFERER, HeaderValue::from_static("http://localhost/admin/auth/user/create"));
        assert_eq!(referer(&headers).as_deref(), Some("http://localhost/admin/auth/user/create"));
    }
}
