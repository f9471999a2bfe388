// src/notify/slack.rs

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("API error: {0}")]
    ApiError(String),
}

/// Delivery channel for formatted listings. Fire-and-forget: no retries.
pub trait Notifier: Send + Sync {
    fn send(&self, channel: &str, text: &str) -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct SlackPayload<'a> {
    channel: &'a str,
    text: &'a str,
    username: &'a str,
    icon_emoji: &'a str,
}

#[derive(Deserialize)]
struct SlackResponse {
    ok: bool,
    error: Option<String>,
}

pub struct SlackNotifier {
    token: String,
    base_url: String,
    username: String,
    icon_emoji: String,
    client: Client,
}

impl SlackNotifier {
    pub fn new(
        token: String,
        base_url: &str,
        username: String,
        icon_emoji: String,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::RequestFailed(e.to_string()))?;

        Ok(Self {
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            icon_emoji,
            client,
        })
    }
}

impl Notifier for SlackNotifier {
    fn send(&self, channel: &str, text: &str) -> Result<(), NotifyError> {
        let payload = SlackPayload {
            channel,
            text,
            username: &self.username,
            icon_emoji: &self.icon_emoji,
        };

        let resp = self
            .client
            .post(format!("{}/api/chat.postMessage", self.base_url))
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .map_err(|e| NotifyError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_else(|_| "(no body)".to_string());
            return Err(NotifyError::ApiError(format!("{status}: {body}")));
        }

        // Slack answers 200 even on failure; the verdict is in the body.
        let body: SlackResponse = resp
            .json()
            .map_err(|e| NotifyError::ApiError(format!("unreadable response: {e}")))?;

        if !body.ok {
            return Err(NotifyError::ApiError(
                body.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        Ok(())
    }
}

/// Logs instead of posting. Used for `--dry-run`.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, channel: &str, text: &str) -> Result<(), NotifyError> {
        tracing::info!(channel, "dry run, not posting:\n{text}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn notifier(server: &mockito::Server) -> SlackNotifier {
        SlackNotifier::new(
            "xoxb-test".into(),
            &server.url(),
            "cl_rooms".into(),
            ":house:".into(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn posts_message_with_token() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/chat.postMessage")
            .match_header("authorization", "Bearer xoxb-test")
            .match_body(Matcher::PartialJson(json!({
                "channel": "#apartments",
                "text": "hello",
                "username": "cl_rooms",
                "icon_emoji": ":house:"
            })))
            .with_body(r#"{"ok":true}"#)
            .create();

        notifier(&server).send("#apartments", "hello").unwrap();
        mock.assert();
    }

    #[test]
    fn slack_level_failure_is_an_api_error() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/api/chat.postMessage")
            .with_body(r#"{"ok":false,"error":"channel_not_found"}"#)
            .create();

        let err = notifier(&server).send("#nowhere", "hello").unwrap_err();
        assert!(matches!(err, NotifyError::ApiError(msg) if msg == "channel_not_found"));
    }
}
