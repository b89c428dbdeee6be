//! Typed JSON helpers over [`ResilientClient`].
//!
//! These only encode, decode and set headers; retrying belongs to the client.
//! Errors raised by the client pass through unchanged.

use http::{HeaderValue, Method, header};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::resilient::ResilientClient;
use crate::domain::{ApiError, TransportError};
use crate::ports::HttpRequest;

const APPLICATION_JSON: &str = "application/json";

impl ResilientClient {
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        self.send_json(Method::GET, url, None).await
    }

    pub async fn post_json<Req, Resp>(&self, url: &str, body: &Req) -> Result<Resp, ApiError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        self.send_json(Method::POST, url, Some(encode(body)?)).await
    }

    pub async fn put_json<Req, Resp>(&self, url: &str, body: &Req) -> Result<Resp, ApiError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        self.send_json(Method::PUT, url, Some(encode(body)?)).await
    }

    pub async fn patch_json<Req, Resp>(&self, url: &str, body: &Req) -> Result<Resp, ApiError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        self.send_json(Method::PATCH, url, Some(encode(body)?)).await
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        self.send_json(Method::DELETE, url, None).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T, ApiError> {
        let mut request = HttpRequest::new(method, url)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON))
            .with_header(header::ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
        request.body = body;

        let response = self.execute(&request).await?;
        decode(&response.body)
    }
}

fn encode<T: Serialize + ?Sized>(body: &T) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec(body)
        .map_err(|e| TransportError::new(format!("failed to encode request body: {e}")).into())
}

/// An empty body decodes as JSON `null`.
fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"null".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body)
        .map_err(|e| TransportError::new(format!("unusable response body: {e}")).into())
}
