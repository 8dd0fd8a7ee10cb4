//! Outbound email notifications.
//!
//! Dispatch never fails the caller: [`NotificationDispatcher::send`] returns
//! `false` and the saga records the step as partially completed. Recipient
//! addresses only appear in logs in masked form.

use dtrust_core::Email;
use parking_lot::Mutex;
use serde::Serialize;

use crate::config::{trimmed, ConfigError, MailRelayConfig};
use crate::error::GatewayError;
use crate::retry::retry_send;

/// A rendered email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Recipient.
    pub to: Email,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub text_body: String,
    /// HTML body.
    pub html_body: String,
}

impl Notification {
    fn is_sendable(&self) -> bool {
        !self.subject.trim().is_empty()
    }
}

/// Sends notifications.
pub trait NotificationDispatcher: Send + Sync {
    /// Deliver `notification`. Returns whether the relay accepted it.
    fn send(&self, notification: &Notification) -> bool;

    /// Dispatcher name for logs.
    fn dispatcher_name(&self) -> &str;
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

/// Posts notifications as JSON to `<relay_url>/send`.
#[derive(Debug)]
pub struct HttpMailDispatcher {
    client: reqwest::Client,
    endpoint: String,
    from_header: String,
}

impl HttpMailDispatcher {
    /// Build a dispatcher from configuration.
    pub fn new(config: &MailRelayConfig) -> Result<Self, GatewayError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let auth = reqwest::header::HeaderValue::from_str(&format!(
            "Bearer {}",
            config.token.as_str()
        ))
        .map_err(|_| ConfigError::InvalidHeader("MAIL_RELAY_TOKEN"))?;
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|source| GatewayError::Http {
                operation: "build_client",
                source,
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/send", trimmed(&config.relay_url)),
            from_header: config.from_header(),
        })
    }

    async fn post(&self, notification: &Notification) -> Result<(), GatewayError> {
        const OP: &str = "send_mail";
        let message = RelayMessage {
            from: &self.from_header,
            to: notification.to.as_str(),
            subject: &notification.subject,
            text: &notification.text_body,
            html: &notification.html_body,
        };
        let resp = retry_send(OP, || self.client.post(&self.endpoint).json(&message).send())
            .await
            .map_err(|source| {
                if source.is_timeout() {
                    GatewayError::Timeout { operation: OP }
                } else {
                    GatewayError::Http {
                        operation: OP,
                        source,
                    }
                }
            })?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        Err(GatewayError::Api {
            operation: OP,
            status: status.as_u16(),
            body: crate::error::excerpt(resp.text().await.unwrap_or_default()),
        })
    }
}

impl NotificationDispatcher for HttpMailDispatcher {
    fn send(&self, notification: &Notification) -> bool {
        let recipient = notification.to.masked();
        if !notification.is_sendable() {
            tracing::warn!(recipient, "refusing to send mail without a subject");
            return false;
        }
        let rt = match tokio::runtime::Handle::try_current() {
            Ok(rt) => rt,
            Err(_) => {
                tracing::error!(recipient, "no async runtime available for mail relay");
                return false;
            }
        };
        match rt.block_on(self.post(notification)) {
            Ok(()) => {
                tracing::info!(recipient, subject = %notification.subject, "mail sent");
                true
            }
            Err(e) => {
                tracing::error!(recipient, error = %e, "mail relay rejected message");
                false
            }
        }
    }

    fn dispatcher_name(&self) -> &str {
        "mail-relay"
    }
}

/// Logs notifications instead of sending them. Used when no relay is
/// configured.
#[derive(Debug, Default)]
pub struct TracingNotificationDispatcher;

impl NotificationDispatcher for TracingNotificationDispatcher {
    fn send(&self, notification: &Notification) -> bool {
        if !notification.is_sendable() {
            return false;
        }
        tracing::info!(
            recipient = notification.to.masked(),
            subject = %notification.subject,
            "mail relay not configured; notification logged only"
        );
        true
    }

    fn dispatcher_name(&self) -> &str {
        "tracing"
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotificationDispatcher {
    sent: Mutex<Vec<Notification>>,
    failing: Mutex<bool>,
}

impl RecordingNotificationDispatcher {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every send while `failing` is set. Rejected mail is not
    /// recorded.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    /// Everything accepted so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    /// Accepted mail addressed to `email`.
    pub fn sent_to(&self, email: &Email) -> Vec<Notification> {
        self.sent
            .lock()
            .iter()
            .filter(|n| &n.to == email)
            .cloned()
            .collect()
    }
}

impl NotificationDispatcher for RecordingNotificationDispatcher {
    fn send(&self, notification: &Notification) -> bool {
        if *self.failing.lock() || !notification.is_sendable() {
            return false;
        }
        self.sent.lock().push(notification.clone());
        true
    }

    fn dispatcher_name(&self) -> &str {
        "recording"
    }
}
