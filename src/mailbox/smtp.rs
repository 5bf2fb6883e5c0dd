use lettre::address::Envelope;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use log::info;

use crate::mailbox::error::{Channel, MailboxError};

pub type SmtpTransport = AsyncSmtpTransport<Tokio1Executor>;

// Plain connection probe used at construction time: reaches the server and
// issues a NOOP without authenticating
pub async fn probe_server(host: &str, port: u16) -> Result<(), MailboxError> {
    let transport: SmtpTransport =
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .build();

    match transport.test_connection().await {
        Ok(true) => {
            info!("-- SMTP server {}:{} is reachable", host, port);
            Ok(())
        }
        Ok(false) => Err(MailboxError::Connection {
            channel: Channel::Smtp,
            reason: "server did not answer the connection probe".to_string(),
        }),
        Err(err) => Err(MailboxError::Connection {
            channel: Channel::Smtp,
            reason: err.to_string(),
        }),
    }
}

// The transport upgrades to TLS with STARTTLS and logs in when it opens its
// connection, so authentication errors surface on the first probe
pub fn build_authenticated(
    host: &str,
    port: u16,
    username: &str,
    password: &str,
) -> Result<SmtpTransport, MailboxError> {
    let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(|err| {
        MailboxError::Connection {
            channel: Channel::Smtp,
            reason: err.to_string(),
        }
    })?;

    Ok(builder
        .port(port)
        .credentials(Credentials::new(username.to_string(), password.to_string()))
        .build())
}

// Force the transport to open its connection: STARTTLS, AUTH, then NOOP
pub async fn authenticate(transport: &SmtpTransport, username: &str) -> Result<(), MailboxError> {
    match transport.test_connection().await {
        Ok(true) => {
            info!("-- SMTP authenticated as {}", username);
            Ok(())
        }
        Ok(false) => Err(MailboxError::Authentication {
            channel: Channel::Smtp,
            reason: "server did not answer after login".to_string(),
        }),
        Err(err) => Err(MailboxError::Authentication {
            channel: Channel::Smtp,
            reason: err.to_string(),
        }),
    }
}

// Liveness probe used by the connectivity guard
pub async fn probe(transport: &SmtpTransport) -> bool {
    matches!(transport.test_connection().await, Ok(true))
}

// Hand a fully built message to the server with an explicit envelope, so the
// recipient set is exactly what the caller decided on
pub async fn deliver(
    transport: &SmtpTransport,
    envelope: &Envelope,
    raw_message: &[u8],
) -> Result<(), MailboxError> {
    transport
        .send_raw(envelope, raw_message)
        .await
        .map_err(|err| MailboxError::Delivery {
            reason: err.to_string(),
        })?;
    Ok(())
}
