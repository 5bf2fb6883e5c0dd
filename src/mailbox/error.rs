use std::fmt;
use thiserror::Error;

/// Which of the two protocol channels an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Smtp,
    Imap,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Smtp => write!(f, "SMTP"),
            Channel::Imap => write!(f, "IMAP"),
        }
    }
}

/// Reason the connectivity guard refused an operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GuardFailure {
    #[error("provider '{0}' is not in the allowed provider list")]
    ProviderNotAllowed(String),
    #[error("SMTP connection is no longer responsive")]
    SmtpUnresponsive,
    #[error("IMAP connection is no longer responsive")]
    ImapUnresponsive,
    #[error("session is not authenticated")]
    NotAuthenticated,
    #[error("session is closed")]
    SessionClosed,
}

#[derive(Debug, Error)]
pub enum MailboxError {
    #[error("cannot establish {channel} connection: {reason}")]
    Connection { channel: Channel, reason: String },

    #[error("login rejected on {channel} channel: {reason}")]
    Authentication { channel: Channel, reason: String },

    #[error("connection check failed: {0}")]
    Guard(GuardFailure),

    #[error("IMAP command failed: {reason}")]
    Protocol { reason: String },

    #[error("message delivery rejected: {reason}")]
    Delivery { reason: String },
}
