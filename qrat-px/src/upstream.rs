//! Client for the remote attendance service
//!
//! Forwards requests and returns the raw status and body text. The proxy
//! routes decide how to interpret them.

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::Value;
use tracing::debug;

const USER_AGENT: &str = concat!("QRAT-Proxy/", env!("CARGO_PKG_VERSION"));

/// Status and body text of one upstream reply
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: String,
}

impl UpstreamReply {
    /// Body as JSON
    pub fn json(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.body)
    }
}

/// HTTP client bound to one upstream base URL
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `POST {base}{path}` with a JSON body
    pub async fn post_json(
        &self,
        path: &str,
        body: &Value,
        authorization: Option<&str>,
    ) -> Result<UpstreamReply, reqwest::Error> {
        let mut request = self.http_client.post(self.url(path)).json(body);
        if let Some(auth) = authorization {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }
        send(path, request).await
    }

    /// `GET {base}{path}?{query}`
    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
        authorization: Option<&str>,
    ) -> Result<UpstreamReply, reqwest::Error> {
        let mut request = self.http_client.get(self.url(path)).query(query);
        if let Some(auth) = authorization {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }
        send(path, request).await
    }
}

async fn send(path: &str, request: reqwest::RequestBuilder) -> Result<UpstreamReply, reqwest::Error> {
    let response = request.send().await?;

    // reqwest and axum are on different `http` major versions
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let body = response.text().await?;

    debug!(path, status = status.as_u16(), body_len = body.len(), "Upstream replied");

    Ok(UpstreamReply { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let client = UpstreamClient::new("https://api.example.test/dev/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "https://api.example.test/dev");
        assert_eq!(
            client.url("/attendance/record"),
            "https://api.example.test/dev/attendance/record"
        );
    }

    #[test]
    fn test_reply_json() {
        let reply = UpstreamReply {
            status: StatusCode::OK,
            body: r#"{"success":true}"#.to_string(),
        };
        assert_eq!(reply.json().unwrap()["success"], true);

        let broken = UpstreamReply {
            status: StatusCode::BAD_GATEWAY,
            body: "<html>".to_string(),
        };
        assert!(broken.json().is_err());
    }
}
