//! reqwest-backed transport to the public service.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use tracing::debug;

use crate::conversation::ChatPayload;
use crate::streaming::response_lines;
use crate::token_log::Token;
use crate::DuckError;

use super::config::ClientConfig;
use super::transport::{ChatReply, ChatTransport, ReplyBody, TOKEN_HEADER};

const EVENT_STREAM: &str = "text/event-stream";

pub struct HttpTransport {
    config: ClientConfig,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Result<Self, DuckError> {
        let mut builder = reqwest::Client::builder()
            .default_headers(browser_headers(&config)?)
            .connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| DuckError::TransportError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// Headers the web front end sends with every request.
fn browser_headers(config: &ClientConfig) -> Result<HeaderMap, DuckError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&config.user_agent)
            .map_err(|_| DuckError::TransportError("invalid user agent header".into()))?,
    );
    headers.insert(ACCEPT, HeaderValue::from_static(EVENT_STREAM));
    headers.insert("accept-language", HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert("referer", HeaderValue::from_static("https://duckduckgo.com/"));
    headers.insert("origin", HeaderValue::from_static("https://duckduckgo.com"));
    headers.insert("dnt", HeaderValue::from_static("1"));
    headers.insert("sec-gpc", HeaderValue::from_static("1"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("same-origin"));
    Ok(headers)
}

fn token_from(headers: &HeaderMap) -> Option<Token> {
    headers
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(Token::new)
}

fn network(e: reqwest::Error) -> DuckError {
    DuckError::TransportError(e.to_string())
}

/// Throttled handshake: the JSON body's `type` names the reason.
fn handshake_throttled(body: &str) -> DuckError {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => DuckError::RateLimited(
            json.get("type")
                .and_then(|t| t.as_str())
                .unwrap_or_default()
                .to_string(),
        ),
        Err(_) => DuckError::ProtocolError(body.to_string()),
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn fetch_token(&self) -> Result<Token, DuckError> {
        debug!(url = %self.config.status_url(), "token handshake");

        let response = self
            .http
            .get(self.config.status_url())
            .header("x-vqd-accept", "1")
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        let token = token_from(response.headers());

        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(handshake_throttled(&body));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text = text.chars().take(200).collect::<String>();
            return Err(DuckError::ProtocolError(format!("HTTP {status}: {text}")));
        }

        token.ok_or_else(|| {
            DuckError::ProtocolError(format!("handshake response carried no {TOKEN_HEADER} header"))
        })
    }

    async fn submit(
        &self,
        payload: &ChatPayload,
        token: &Token,
        stream: bool,
    ) -> Result<ChatReply, DuckError> {
        debug!(
            model = %payload.model,
            turns = payload.messages.len(),
            stream,
            "chat request"
        );

        let response = self
            .http
            .post(self.config.chat_url())
            .header(CONTENT_TYPE, "application/json")
            .header(TOKEN_HEADER, token.as_str())
            .json(payload)
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        let token = token_from(response.headers());
        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with(EVENT_STREAM));

        if token.is_none() {
            debug!(%status, "chat response carried no rotated token");
        }

        let body = if stream && status.is_success() && is_event_stream {
            ReplyBody::Stream(response_lines(response))
        } else {
            ReplyBody::Batch(response.text().await.map_err(network)?)
        };

        Ok(ChatReply {
            status: status.as_u16(),
            token,
            body,
        })
    }
}
