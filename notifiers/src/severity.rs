//! Webhook color coding (§6's notification-routing supplement): the original
//! `send_to_slack` tags each message with a Slack attachment color; this enum
//! is the typed equivalent wired up by the `hijack`/`low-visibility`/
//! `difference` event kinds.

/// Attachment color sent with a chat-webhook payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Good,
    Warning,
    Danger,
}

impl Severity {
    pub fn color(self) -> &'static str {
        match self {
            Severity::Good => "good",
            Severity::Warning => "warning",
            Severity::Danger => "danger",
        }
    }
}
