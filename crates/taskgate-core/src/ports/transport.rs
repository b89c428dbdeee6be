//! Transport port - 1 回の HTTP 往復
//!
//! Transport はリトライもタイムアウトも持たない「生の」送受信です。
//! 試行ごとの deadline と再試行の判断は `client::ResilientClient` が持ちます。

use async_trait::async_trait;
use http::{HeaderMap, HeaderValue, Method, StatusCode, header};

use crate::domain::TransportError;

/// Target descriptor for one logical request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_header(mut self, name: header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

/// A received response, fully buffered.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Canonical reason phrase for the status ("Not Found", ...), or "" when unknown.
    pub fn status_text(&self) -> &'static str {
        StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
    }
}

/// Transport は 1 回分の送受信を行う
///
/// # 契約
/// - レスポンスを受け取れたら（ステータスに関係なく）`Ok(HttpResponse)`
/// - 接続失敗など、レスポンスが無い場合だけ `Err(TransportError)`
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_uses_canonical_reason() {
        assert_eq!(HttpResponse::new(404, Vec::new()).status_text(), "Not Found");
        assert_eq!(HttpResponse::new(599, Vec::new()).status_text(), "");
    }

    #[test]
    fn request_builder_sets_fields() {
        let req = HttpRequest::new(Method::PUT, "http://upstream/todos/1/complete")
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(b"{}".to_vec());
        assert_eq!(req.method, Method::PUT);
        assert_eq!(req.headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(req.body.as_deref(), Some(b"{}".as_slice()));
    }
}
