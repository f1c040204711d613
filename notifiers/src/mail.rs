//! SMTP sink (`send_email` in the original `runner.py`): delivers an alert
//! message as a "BGP alert" email from `sender-notifications-email` to the
//! `notified-emails` recipient list.
//!
//! [`lettre::SmtpTransport::send`] is a blocking network call; it runs on a
//! spawned blocking task for the same reason the webhook sink offloads its
//! POST (§5).

use alert_engine::Sink;
use lettre::message::Mailbox;
use lettre::{Message, SmtpTransport, Transport};
use slog::{error, Logger};

pub struct MailSink {
    mailer: SmtpTransport,
    from: Mailbox,
    to: Vec<Mailbox>,
    log: Logger,
}

impl MailSink {
    pub fn new(mailer: SmtpTransport, from: Mailbox, to: Vec<Mailbox>, log: Logger) -> Self {
        Self { mailer, from, to, log }
    }
}

impl Sink for MailSink {
    fn deliver(&self, message: &str) {
        let mut builder = Message::builder().from(self.from.clone()).subject("BGP alert");
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }

        let email = match builder.body(message.to_string()) {
            Ok(email) => email,
            Err(e) => {
                error!(self.log, "failed to build alert email"; "error" => %e);
                return;
            }
        };

        let mailer = self.mailer.clone();
        let log = self.log.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = mailer.send(&email) {
                error!(log, "send_email() failed"; "error" => %e);
            }
        });
    }
}
