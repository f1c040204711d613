//! Chat-webhook sink (`send_to_slack` in the original `runner.py`): POSTs a
//! Slack-attachment-shaped payload, tagged with a [`Severity`] color, to the
//! configured `slack-web-hook` URL. Honors the same optional HTTPS proxy the
//! feed client does (§6, "proxy-host"/"proxy-port").
//!
//! The POST runs on a spawned task rather than blocking [`Sink::deliver`]
//! itself: the evaluation thread that calls `deliver` must keep moving even
//! if the webhook endpoint is slow or unreachable (§5, "implementations must
//! document this or offload long-running sinks off the core thread").

use crate::severity::Severity;
use alert_engine::Sink;
use reqwest::Client;
use serde::Serialize;
use slog::{error, Logger};

#[derive(Serialize)]
struct Attachment {
    color: &'static str,
    text: String,
    fallback: &'static str,
}

#[derive(Serialize)]
struct SlackPayload {
    text: &'static str,
    attachments: Vec<Attachment>,
}

pub struct WebhookSink {
    client: Client,
    url: String,
    severity: Severity,
    log: Logger,
}

impl WebhookSink {
    pub fn new(client: Client, url: impl Into<String>, severity: Severity, log: Logger) -> Self {
        Self {
            client,
            url: url.into(),
            severity,
            log,
        }
    }
}

impl Sink for WebhookSink {
    fn deliver(&self, message: &str) {
        let payload = SlackPayload {
            text: "",
            attachments: vec![Attachment {
                color: self.severity.color(),
                text: message.to_string(),
                fallback: "",
            }],
        };
        let client = self.client.clone();
        let url = self.url.clone();
        let log = self.log.clone();

        tokio::spawn(async move {
            match client.post(&url).json(&payload).send().await {
                Ok(response) if !response.status().is_success() => {
                    error!(log, "send_to_slack() failed"; "status" => response.status().as_u16());
                }
                Ok(_) => {}
                Err(e) => error!(log, "send_to_slack() threw exception"; "error" => %e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_colors_match_slack_attachment_convention() {
        assert_eq!(Severity::Danger.color(), "danger");
        assert_eq!(Severity::Warning.color(), "warning");
        assert_eq!(Severity::Good.color(), "good");
    }

    #[tokio::test]
    async fn deliver_does_not_block_on_an_unreachable_endpoint() {
        let client = Client::builder().build().unwrap();
        let log = Logger::root(slog::Discard, slog::o!());
        let sink = WebhookSink::new(client, "http://127.0.0.1:1", Severity::Danger, log);
        sink.deliver("unreachable webhook");
    }
}
