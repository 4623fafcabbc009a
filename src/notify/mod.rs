//! Outcome notification by mail.
//!
//! The [`Notifier`] composes a plain-text message and hands it to a
//! [`MailTransport`]; [`smtp::SmtpMailer`] is the production transport.
//! Header recipients and envelope recipients are built independently: the
//! headers list To and Cc as given, the envelope gets every distinct address.
//!
//! ```no_run
//! use s3_backup_transfer::notify::{MailAuth, Notifier, Recipients};
//! use s3_backup_transfer::notify::smtp::SmtpMailer;
//!
//! let notifier = Notifier::new(SmtpMailer::new());
//! let recipients = Recipients::new(vec!["ops@example.com".into()], vec![]);
//! notifier.notify(&recipients, "subject", "body", "backup@local", "127.0.0.1:25", &MailAuth::NoAuth)?;
//! # Ok::<(), s3_backup_transfer::errors::MailError>(())
//! ```

pub mod report;
pub mod smtp;

use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use log::debug;

use crate::errors::{MailError, MailErrorKind};

/// Mail credentials.
#[derive(Clone, PartialEq, Eq)]
pub enum MailAuth {
    NoAuth,
    Authenticated { user: String, secret: String },
}

impl MailAuth {
    /// `Authenticated` only when both parts are present and non-empty.
    pub fn from_parts(user: Option<&str>, secret: Option<&str>) -> Self {
        match (user, secret) {
            (Some(user), Some(secret)) if !user.is_empty() && !secret.is_empty() => {
                MailAuth::Authenticated {
                    user: user.to_string(),
                    secret: secret.to_string(),
                }
            }
            _ => MailAuth::NoAuth,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, MailAuth::Authenticated { .. })
    }
}

impl std::fmt::Debug for MailAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MailAuth::NoAuth => write!(f, "NoAuth"),
            MailAuth::Authenticated { user, .. } => {
                write!(f, "Authenticated {{ user: {:?}, secret: \"***\" }}", user)
            }
        }
    }
}

/// Header recipients of a notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipients {
    pub to: Vec<String>,
    pub cc: Vec<String>,
}

impl Recipients {
    pub fn new(to: Vec<String>, cc: Vec<String>) -> Self {
        Self { to, cc }
    }

    pub fn is_empty(&self) -> bool {
        self.to.is_empty() && self.cc.is_empty()
    }

    /// Every distinct address, To first, in the order given.
    pub fn envelope_addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = Vec::new();
        for address in self.to.iter().chain(self.cc.iter()) {
            if !addresses.contains(address) {
                addresses.push(address.clone());
            }
        }
        addresses
    }
}

/// SMTP envelope: who the server is told the mail is from and to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailEnvelope {
    pub from: String,
    pub recipients: Vec<String>,
}

/// Delivers an already formatted message.
///
/// Implementations must close their connection on every return path.
#[cfg_attr(test, mockall::automock)]
pub trait MailTransport {
    fn deliver(
        &self,
        endpoint: &str,
        auth: &MailAuth,
        envelope: &MailEnvelope,
        message: &[u8],
    ) -> Result<(), MailError>;
}

impl<T: MailTransport + ?Sized> MailTransport for &T {
    fn deliver(
        &self,
        endpoint: &str,
        auth: &MailAuth,
        envelope: &MailEnvelope,
        message: &[u8],
    ) -> Result<(), MailError> {
        (**self).deliver(endpoint, auth, envelope, message)
    }
}

/// Composes notifications and sends them through a transport.
pub struct Notifier<T: MailTransport> {
    transport: T,
}

impl<T: MailTransport> Notifier<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Send `body` as a plain-text mail.
    ///
    /// With `MailAuth::Authenticated` the transport upgrades the connection to
    /// TLS and logs in before sending.
    pub fn notify(
        &self,
        recipients: &Recipients,
        subject: &str,
        body: &str,
        sender: &str,
        endpoint: &str,
        auth: &MailAuth,
    ) -> Result<(), MailError> {
        let message = compose_message(recipients, subject, body, sender)?;
        let envelope = MailEnvelope {
            from: sender.to_string(),
            recipients: recipients.envelope_addresses(),
        };
        debug!("Sending '{}' to {:?} via {}", subject, envelope.recipients, endpoint);
        self.transport.deliver(endpoint, auth, &envelope, &message)
    }
}

/// Format a plain-text message with To/Cc/From/Subject headers.
pub fn compose_message(
    recipients: &Recipients,
    subject: &str,
    body: &str,
    sender: &str,
) -> Result<Vec<u8>, MailError> {
    if recipients.is_empty() {
        return Err(MailError::new(MailErrorKind::RecipientsRefused, "no recipients configured"));
    }

    let mut builder = Message::builder()
        .from(parse_mailbox(sender)?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN);
    for address in &recipients.to {
        builder = builder.to(parse_mailbox(address)?);
    }
    for address in &recipients.cc {
        builder = builder.cc(parse_mailbox(address)?);
    }

    let message = builder
        .body(body.to_string())
        .map_err(|e| MailError::new(MailErrorKind::DataError, e.to_string()))?;
    Ok(message.formatted())
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse::<Mailbox>().map_err(|e| {
        MailError::new(
            MailErrorKind::DataError,
            format!("invalid address '{}': {}", address, e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::*;

    fn recipients() -> Recipients {
        Recipients::new(
            vec!["ops@example.com".to_string(), "dba@example.com".to_string()],
            vec!["ops@example.com".to_string(), "lead@example.com".to_string()],
        )
    }

    #[test]
    fn test_mail_auth_from_parts() {
        assert_eq!(MailAuth::from_parts(None, None), MailAuth::NoAuth);
        assert_eq!(MailAuth::from_parts(Some("user"), None), MailAuth::NoAuth);
        assert_eq!(MailAuth::from_parts(Some("user"), Some("")), MailAuth::NoAuth);
        assert_eq!(MailAuth::from_parts(Some(""), Some("secret")), MailAuth::NoAuth);
        assert_eq!(
            MailAuth::from_parts(Some("user"), Some("secret")),
            MailAuth::Authenticated { user: "user".to_string(), secret: "secret".to_string() }
        );
    }

    #[test]
    fn test_mail_auth_debug_hides_secret() {
        let auth = MailAuth::from_parts(Some("user"), Some("hunter2"));
        let printed = format!("{:?}", auth);
        assert!(printed.contains("user"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn test_envelope_addresses_are_distinct() {
        assert_eq!(
            recipients().envelope_addresses(),
            vec!["ops@example.com", "dba@example.com", "lead@example.com"]
        );
    }

    #[test]
    fn test_compose_message_headers() {
        let message = compose_message(&recipients(), "[SUCCESS] report", "line one\nline two", "host@local").unwrap();
        let text = String::from_utf8(message).unwrap();

        assert!(text.contains("To: ops@example.com, dba@example.com"));
        assert!(text.contains("Cc: ops@example.com, lead@example.com"));
        assert!(text.contains("From: host@local"));
        assert!(text.contains("Subject: [SUCCESS] report"));
        assert!(text.contains("Content-Type: text/plain"));
        assert!(text.contains("line one"));
        assert!(text.contains("line two"));
    }

    #[test]
    fn test_compose_message_rejects_bad_address() {
        let recipients = Recipients::new(vec!["not an address".to_string()], vec![]);
        let err = compose_message(&recipients, "s", "b", "host@local").unwrap_err();
        assert_eq!(err.kind, MailErrorKind::DataError);
    }

    #[test]
    fn test_compose_message_requires_recipients() {
        let err = compose_message(&Recipients::default(), "s", "b", "host@local").unwrap_err();
        assert_eq!(err.kind, MailErrorKind::RecipientsRefused);
    }

    #[test]
    fn test_notify_passes_envelope_to_transport() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_deliver()
            .with(
                eq("smtp.example.com:25"),
                eq(MailAuth::NoAuth),
                eq(MailEnvelope {
                    from: "host@local".to_string(),
                    recipients: vec![
                        "ops@example.com".to_string(),
                        "dba@example.com".to_string(),
                        "lead@example.com".to_string(),
                    ],
                }),
                always(),
            )
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let notifier = Notifier::new(transport);
        notifier
            .notify(&recipients(), "subject", "body", "host@local", "smtp.example.com:25", &MailAuth::NoAuth)
            .unwrap();
    }

    #[test]
    fn test_notify_surfaces_transport_error() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_deliver()
            .returning(|_, _, _, _| Err(MailError::new(MailErrorKind::HeloRejected, "554 go away")));

        let notifier = Notifier::new(transport);
        let err = notifier
            .notify(&recipients(), "subject", "body", "host@local", "127.0.0.1", &MailAuth::NoAuth)
            .unwrap_err();
        assert_eq!(err.kind, MailErrorKind::HeloRejected);
    }
}
