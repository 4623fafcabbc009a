use std::time::Duration;

use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{SmtpConnection, TlsParameters};
use lettre::transport::smtp::commands::{Data, Mail, Rcpt};
use lettre::transport::smtp::extension::ClientId;
use lettre::Address;
use log::{debug, warn};

use crate::constants::{DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_SMTP_PORT};
use crate::errors::{MailError, MailErrorKind};
use crate::notify::{MailAuth, MailEnvelope, MailTransport};

/// Failure of a session stage with no dedicated error kind, named by stage.
fn stage_failure(stage: &str, detail: impl std::fmt::Display) -> MailError {
    MailError::new(MailErrorKind::Other, format!("{} failed: {}", stage, detail))
}

/// SMTP transport speaking to a single relay per delivery.
///
/// Each delivery opens a connection, optionally upgrades it with STARTTLS and
/// logs in, runs one MAIL/RCPT/DATA transaction and quits.
pub struct SmtpMailer {
    hello_name: String,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new() -> Self {
        let hello_name = hostname::get()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|_| "localhost".to_string());
        Self {
            hello_name,
            timeout: Duration::from_secs(DEFAULT_CONNECTION_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for SmtpMailer {
    fn default() -> Self {
        Self::new()
    }
}

/// Open connection; QUIT is sent when it goes out of scope.
struct SmtpSession {
    conn: SmtpConnection,
}

impl Drop for SmtpSession {
    fn drop(&mut self) {
        if let Err(e) = self.conn.quit() {
            debug!("SMTP QUIT failed: {}", e);
        }
    }
}

impl MailTransport for SmtpMailer {
    fn deliver(
        &self,
        endpoint: &str,
        auth: &MailAuth,
        envelope: &MailEnvelope,
        message: &[u8],
    ) -> Result<(), MailError> {
        let (host, port) = split_endpoint(endpoint)?;
        let hello = ClientId::Domain(self.hello_name.clone());

        let conn = SmtpConnection::connect((host.as_str(), port), Some(self.timeout), &hello, None, None)
            .map_err(|e| {
                if e.is_permanent() || e.is_transient() {
                    MailError::new(MailErrorKind::HeloRejected, e.to_string())
                } else {
                    stage_failure(&format!("connection to {}", endpoint), e)
                }
            })?;
        let mut session = SmtpSession { conn };

        if let MailAuth::Authenticated { user, secret } = auth {
            if !session.conn.can_starttls() {
                return Err(MailError::new(MailErrorKind::UnsupportedExtension, "STARTTLS"));
            }
            let tls = TlsParameters::new(host.clone())
                .map_err(|e| stage_failure("TLS setup", e))?;
            session
                .conn
                .starttls(&tls, &hello)
                .map_err(|e| stage_failure("STARTTLS", e))?;
            session
                .conn
                .auth(&[Mechanism::Plain, Mechanism::Login], &Credentials::new(user.clone(), secret.clone()))
                .map_err(|e| stage_failure("authentication", e))?;
            debug!("Authenticated to {} as {}", endpoint, user);
        }

        let from = envelope
            .from
            .parse::<Address>()
            .map_err(|e| MailError::new(MailErrorKind::SenderRefused, format!("{}: {}", envelope.from, e)))?;
        session
            .conn
            .command(Mail::new(Some(from), vec![]))
            .map_err(|e| MailError::new(MailErrorKind::SenderRefused, format!("{}: {}", envelope.from, e)))?;

        let mut refused = Vec::new();
        for recipient in &envelope.recipients {
            let accepted = match recipient.parse::<Address>() {
                Ok(address) => match session.conn.command(Rcpt::new(address, vec![])) {
                    Ok(_) => true,
                    Err(e) => {
                        debug!("Recipient {} refused: {}", recipient, e);
                        false
                    }
                },
                Err(_) => false,
            };
            if !accepted {
                refused.push(recipient.clone());
            }
        }
        if refused.len() == envelope.recipients.len() {
            return Err(MailError::new(MailErrorKind::RecipientsRefused, refused.join(", ")));
        }
        if !refused.is_empty() {
            warn!("The mail was not sent to {}", refused.join(", "));
        }

        session
            .conn
            .command(Data)
            .map_err(|e| MailError::new(MailErrorKind::DataError, e.to_string()))?;
        session
            .conn
            .message(message)
            .map_err(|e| MailError::new(MailErrorKind::DataError, e.to_string()))?;

        Ok(())
    }
}

/// Split `host[:port]`, defaulting the port to 25.
pub fn split_endpoint(endpoint: &str) -> Result<(String, u16), MailError> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(MailError::new(MailErrorKind::Other, "no SMTP server configured"));
    }

    match endpoint.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => {
            let port = port.parse::<u16>().map_err(|_| {
                MailError::new(MailErrorKind::Other, format!("invalid SMTP port in '{}'", endpoint))
            })?;
            Ok((host.to_string(), port))
        }
        _ => Ok((endpoint.to_string(), DEFAULT_SMTP_PORT)),
    }
}
