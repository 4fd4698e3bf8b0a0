use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::Result;
use crate::headers::HeaderSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// Either absolute or relative to the transport's origin.
    pub url: String,
    pub headers: HeaderSet,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>, headers: HeaderSet) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers,
            body: None,
        }
    }

    pub fn put_json(url: impl Into<String>, mut headers: HeaderSet, body: Value) -> Self {
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            method: Method::Put,
            url: url.into(),
            headers,
            body: Some(body),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Reason phrase of the status line, e.g. "Not Found". May be empty.
    pub reason: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, reason: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            reason: reason.into(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// The adapter's only route to the network. Implementations must not retry;
/// every failure is reported once and the adapter decides what to do.
pub trait HttpTransport: Send + Sync {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse>>;
}

#[cfg(feature = "http")]
pub use self::reqwest_transport::ReqwestTransport;

#[cfg(feature = "http")]
mod reqwest_transport {
    use super::*;
    use crate::error::AdapterError;
    use log::debug;
    use reqwest::Client;
    use std::time::Duration;

    /// `reqwest`-backed transport. Relative URLs are resolved against `origin`,
    /// the way a browser resolves them against the page.
    #[derive(Clone)]
    pub struct ReqwestTransport {
        client: Client,
        origin: Option<String>,
    }

    impl ReqwestTransport {
        pub fn new(origin: Option<String>) -> Self {
            Self {
                client: Client::new(),
                origin,
            }
        }

        /// Bounds every request by `timeout`. A timed-out request is an
        /// ordinary transport failure and is not retried.
        pub fn with_timeout(origin: Option<String>, timeout: Duration) -> Result<Self> {
            let client = Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| AdapterError::Transport(e.to_string()))?;
            Ok(Self { client, origin })
        }

        fn absolute_url(&self, url: &str) -> Result<String> {
            let lower = url.to_ascii_lowercase();
            if lower.starts_with("http://") || lower.starts_with("https://") {
                return Ok(url.to_string());
            }
            let origin = self.origin.as_deref().ok_or_else(|| {
                AdapterError::Transport(format!("Relative URL '{}' without an origin", url))
            })?;
            Ok(format!(
                "{}/{}",
                origin.trim_end_matches('/'),
                url.trim_start_matches('/')
            ))
        }
    }

    impl HttpTransport for ReqwestTransport {
        fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse>> {
            Box::pin(async move {
                let url = self.absolute_url(&request.url)?;
                debug!("{} {}", request.method.as_str(), url);

                let method = match request.method {
                    Method::Get => reqwest::Method::GET,
                    Method::Put => reqwest::Method::PUT,
                };
                let mut builder = self.client.request(method, &url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                if let Some(body) = &request.body {
                    builder = builder.body(serde_json::to_vec(body)?);
                }

                let res = builder
                    .send()
                    .await
                    .map_err(|e| AdapterError::Transport(e.to_string()))?;
                let status = res.status();
                let body = res
                    .bytes()
                    .await
                    .map_err(|e| AdapterError::Transport(e.to_string()))?;

                Ok(HttpResponse {
                    status: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or_default().to_string(),
                    body: body.to_vec(),
                })
            })
        }
    }

}
