//! ReqwestTransport - 本番用の HTTP transport
//!
//! 1 回の send = 1 回の HTTP 交換です。deadline と retry は ResilientClient 側の責務なので、
//! ここでは reqwest の timeout を設定しません。

use async_trait::async_trait;

use crate::domain::TransportError;
use crate::ports::{HttpRequest, HttpResponse, Transport};

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Translate into a reqwest request without sending it.
    pub fn build(&self, request: &HttpRequest) -> Result<reqwest::Request, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.as_str())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        builder
            .build()
            .map_err(|e| TransportError::new(format!("invalid request: {e}")))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let built = self.build(request)?;
        let response = self
            .client
            .execute(built)
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::new(format!("failed to read response body: {e}")))?;

        let mut out = HttpResponse::new(status, body.to_vec());
        out.headers = headers;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, Method, header};

    #[test]
    fn build_carries_method_headers_and_body() {
        let transport = ReqwestTransport::default();
        let request = HttpRequest::new(Method::PUT, "http://upstream:8000/todos/t1/complete")
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(br#"{"status":"completed"}"#.to_vec());

        let built = transport.build(&request).unwrap();

        assert_eq!(built.method(), &Method::PUT);
        assert_eq!(built.url().as_str(), "http://upstream:8000/todos/t1/complete");
        assert_eq!(built.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(
            built.body().and_then(|b| b.as_bytes()),
            Some(br#"{"status":"completed"}"#.as_slice())
        );
    }

    #[test]
    fn malformed_url_is_a_transport_error() {
        let transport = ReqwestTransport::default();
        let err = transport.build(&HttpRequest::get("not a url")).unwrap_err();
        assert!(err.message().contains("invalid request"));
    }

    #[tokio::test]
    async fn connection_refused_is_a_transport_error() {
        let transport = ReqwestTransport::default();
        let err = transport
            .send(&HttpRequest::get("http://127.0.0.1:9/health"))
            .await
            .unwrap_err();
        assert!(!err.message().is_empty());
    }
}
