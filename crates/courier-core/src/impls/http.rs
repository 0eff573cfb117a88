//! `http.request` handler - outbound HTTP via reqwest.
//!
//! # フロー
//! 1. `url` を variables でテンプレート展開（escape なし）
//! 2. method / headers / body を設定して送信
//! 3. status, body, Content-Type を `http.response` に詰める

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use reqwest::{Client, Method, Url};

use crate::domain::{HandlerError, HttpRequestMessage, HttpResponseMessage};
use crate::template::{self, Escape};
use crate::typed::Handler;

#[derive(Debug, Clone)]
pub struct HttpRequestHandler {
    client: Client,
}

impl HttpRequestHandler {
    /// Handler with its own client; `timeout` bounds each whole request.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn parse_method(method: &str) -> Result<Method, HandlerError> {
    if method.is_empty() {
        return Ok(Method::GET);
    }
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| HandlerError::InvalidRequest(format!("invalid method {method:?}")))
}

#[async_trait]
impl Handler<HttpRequestMessage> for HttpRequestHandler {
    async fn handle(&self, request: HttpRequestMessage) -> Result<HttpResponseMessage, HandlerError> {
        let url = template::render(&request.url, request.variables.as_ref(), Escape::None)?;
        let url = Url::parse(&url)
            .map_err(|e| HandlerError::InvalidRequest(format!("invalid url {url:?}: {e}")))?;
        let method = parse_method(&request.method)?;

        let mut builder = self.client.request(method, url);
        for (key, value) in &request.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| HandlerError::InvalidRequest(format!("invalid header name {key:?}")))?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                HandlerError::InvalidRequest(format!("invalid value for header {key:?}"))
            })?;
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HandlerError::Upstream(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| HandlerError::Upstream(e.to_string()))?;

        Ok(HttpResponseMessage {
            status,
            body: (!body.is_empty()).then_some(body),
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// One-shot HTTP/1.1 server: captures the raw request and replies with
    /// `response`.
    async fn serve_once(response: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            let _ = tx.send(String::from_utf8_lossy(&buf).to_string());
        });
        (format!("http://{addr}"), rx)
    }

    fn handler() -> HttpRequestHandler {
        HttpRequestHandler::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn sends_request_and_maps_response() {
        let (base, captured) = serve_once(
            "HTTP/1.1 201 Created\r\nContent-Type: application/json\r\nContent-Length: 11\r\nConnection: close\r\n\r\n{\"ok\":true}",
        )
        .await;

        let request = HttpRequestMessage {
            method: "post".into(),
            url: format!("{base}/items/{{{{.id}}}}"),
            headers: HashMap::from([("X-Token".to_string(), "secret".to_string())]),
            body: Some("payload".into()),
            variables: json!({ "id": 42 }).as_object().cloned(),
        };
        let response = handler().handle(request).await.unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(response.body.as_deref(), Some("{\"ok\":true}"));
        assert_eq!(response.content_type.as_deref(), Some("application/json"));

        let raw = captured.await.unwrap();
        assert!(raw.starts_with("POST /items/42 HTTP/1.1\r\n"));
        assert!(raw.to_ascii_lowercase().contains("x-token: secret"));
        assert!(raw.ends_with("payload"));
    }

    #[tokio::test]
    async fn empty_body_and_method_default() {
        let (base, captured) =
            serve_once("HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n").await;

        let request = HttpRequestMessage {
            method: String::new(),
            url: base,
            ..Default::default()
        };
        let response = handler().handle(request).await.unwrap();
        assert_eq!(
            response,
            HttpResponseMessage {
                status: 204,
                body: None,
                content_type: None,
            }
        );
        assert!(captured.await.unwrap().starts_with("GET / HTTP/1.1"));
    }

    #[rstest]
    #[case::bad_url("not a url", HashMap::new())]
    #[case::bad_header(
        "http://127.0.0.1:1",
        HashMap::from([("bad header".to_string(), "x".to_string())])
    )]
    #[tokio::test]
    async fn invalid_requests_fail_before_sending(
        #[case] url: &str,
        #[case] headers: HashMap<String, String>,
    ) {
        let request = HttpRequestMessage {
            method: "GET".into(),
            url: url.into(),
            headers,
            ..Default::default()
        };
        let err = handler().handle(request).await.unwrap_err();
        assert!(matches!(err, HandlerError::InvalidRequest(_)));
    }

    #[test]
    fn method_parsing() {
        assert_eq!(parse_method("").unwrap(), Method::GET);
        assert_eq!(parse_method("delete").unwrap(), Method::DELETE);
        assert!(parse_method("GE T").is_err());
    }
}
