use std::fmt;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Method, StatusCode};

/// An inbound request as seen by the gateway, independent of the HTTP
/// server in front of it. The body is already buffered.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    /// Request path without the query string, e.g. `/api/image/upload`.
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Caller address, used only for usage reporting.
    pub client_ip: Option<String>,
}

impl ProxyRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            client_ip: None,
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into()).filter(|q: &String| !q.is_empty());
        self
    }

    /// Add a header. Invalid names or values are ignored.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    /// A header value as text, if present and valid UTF-8.
    pub fn header_str(&self, name: impl reqwest::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.header_str(USER_AGENT)
    }
}

/// Streamed response body chunks.
pub type BodyStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

/// A response body: either fully in memory or streamed from upstream.
pub enum ProxyBody {
    Full(Bytes),
    Stream(BodyStream),
}

impl ProxyBody {
    pub fn empty() -> Self {
        Self::Full(Bytes::new())
    }

    /// Collect the whole body into memory.
    pub async fn collect(self) -> Result<Bytes, std::io::Error> {
        match self {
            Self::Full(bytes) => Ok(bytes),
            Self::Stream(stream) => {
                let chunks: Vec<Bytes> = stream.try_collect().await?;
                Ok(chunks.concat().into())
            }
        }
    }
}

impl From<reqwest::Response> for ProxyBody {
    fn from(response: reqwest::Response) -> Self {
        Self::Stream(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(std::io::Error::other))
                .boxed(),
        )
    }
}

impl fmt::Debug for ProxyBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// The response the gateway hands back to the HTTP server.
#[derive(Debug)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ProxyBody,
}

impl ProxyResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: ProxyBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, HeaderMap::new(), ProxyBody::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_ignores_invalid_headers() {
        let req = ProxyRequest::new(Method::GET, "/x")
            .with_header("X-Ok", "1")
            .with_header("bad header", "1")
            .with_header("X-Bad-Value", "line\nbreak");
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.header_str("x-ok"), Some("1"));
    }

    #[test]
    fn empty_query_is_dropped() {
        let req = ProxyRequest::new(Method::GET, "/x").with_query("");
        assert!(req.query.is_none());
    }

    #[tokio::test]
    async fn collects_streamed_body() {
        let stream = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ])
        .boxed();
        let body = ProxyBody::Stream(stream).collect().await.unwrap();
        assert_eq!(&body[..], b"hello world");
    }
}
