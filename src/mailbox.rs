use log::{info, warn};

pub mod credentials;
pub mod error;
pub mod imap;
pub mod message;
pub mod outgoing;
pub mod smtp;

use crate::mailbox::error::{GuardFailure, MailboxError};
use crate::mailbox::imap::{ImapClient, ImapSession};
use crate::mailbox::message::InboxEntry;
use crate::mailbox::outgoing::OutgoingMessage;
use crate::mailbox::smtp::SmtpTransport;
use crate::settings::Settings;

pub const DEFAULT_LIST_LIMIT: usize = 5;

enum ImapState {
    Connected(ImapClient),
    Authenticated(ImapSession),
    Closed,
}

/// One account's mailbox session. Owns the SMTP and IMAP channels and walks
/// them through connected, authenticated and closed together.
///
/// Operations are strictly sequential: every call takes `&mut self` and
/// blocks the task until the transport answers.
pub struct Mailbox {
    settings: Settings,
    credential: String,
    provider: String,
    smtp: Option<SmtpTransport>,
    imap: ImapState,
}

/// The provider label of an account address: the domain label right after
/// the '@', lower-cased. `user@Mail.Example.COM` gives `mail`.
pub fn derive_provider(address: &str) -> String {
    address
        .split('@')
        .nth(1)
        .unwrap_or("")
        .split('.')
        .next()
        .unwrap_or("")
        .to_lowercase()
}

pub(crate) fn provider_allowed(provider: &str, allowed: &Option<Vec<String>>) -> bool {
    match allowed {
        None => true,
        Some(list) => list.iter().any(|entry| entry.eq_ignore_ascii_case(provider)),
    }
}

impl Mailbox {
    /// Opens both channels without authenticating: verifies the SMTP server
    /// answers a plain probe and establishes the IMAP-over-TLS connection.
    pub async fn connect(settings: &Settings, credential: &str) -> Result<Self, MailboxError> {
        smtp::probe_server(&settings.smtp_server, settings.smtp_port).await?;
        let client = imap::connect(&settings.imap_server, settings.imap_port).await?;

        Ok(Self {
            provider: derive_provider(&settings.email_address),
            settings: settings.clone(),
            credential: credential.to_string(),
            smtp: None,
            imap: ImapState::Connected(client),
        })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Logs in on both channels. If one login succeeds and the other is
    /// rejected, the succeeded channel is rolled back so the session is
    /// never half-authenticated; the error names the failing channel.
    pub async fn authenticate(&mut self) -> Result<(), MailboxError> {
        let transport = smtp::build_authenticated(
            &self.settings.smtp_server,
            self.settings.smtp_port,
            &self.settings.email_address,
            &self.credential,
        )?;
        smtp::authenticate(&transport, &self.settings.email_address).await?;

        let client = match std::mem::replace(&mut self.imap, ImapState::Closed) {
            ImapState::Connected(client) => client,
            ImapState::Authenticated(session) => {
                // Already fully authenticated; just refresh the SMTP handle
                self.imap = ImapState::Authenticated(session);
                self.smtp = Some(transport);
                return Ok(());
            }
            ImapState::Closed => {
                return Err(MailboxError::Guard(GuardFailure::SessionClosed));
            }
        };

        match imap::login(client, &self.settings.email_address, &self.credential).await {
            Ok(session) => {
                self.imap = ImapState::Authenticated(session);
                self.smtp = Some(transport);
                Ok(())
            }
            Err((err, client)) => {
                // The SMTP transport is dropped here, rolling back the
                // half-authenticated state; login can be retried
                self.imap = ImapState::Connected(client);
                Err(err)
            }
        }
    }

    // Connectivity guard run before every operation: the provider must be
    // allowed and both channels must answer a liveness probe
    async fn check_connection(&mut self) -> Result<(), MailboxError> {
        if !provider_allowed(&self.provider, &self.settings.allowed_providers) {
            return Err(MailboxError::Guard(GuardFailure::ProviderNotAllowed(
                self.provider.clone(),
            )));
        }

        let transport = self.smtp_transport()?;
        if !smtp::probe(transport).await {
            return Err(MailboxError::Guard(GuardFailure::SmtpUnresponsive));
        }

        let session = match &mut self.imap {
            ImapState::Authenticated(session) => session,
            ImapState::Connected(_) => {
                return Err(MailboxError::Guard(GuardFailure::NotAuthenticated))
            }
            ImapState::Closed => return Err(MailboxError::Guard(GuardFailure::SessionClosed)),
        };
        if !imap::probe(session).await {
            return Err(MailboxError::Guard(GuardFailure::ImapUnresponsive));
        }

        Ok(())
    }

    fn lifecycle_failure(&self) -> GuardFailure {
        match self.imap {
            ImapState::Closed => GuardFailure::SessionClosed,
            _ => GuardFailure::NotAuthenticated,
        }
    }

    fn smtp_transport(&self) -> Result<&SmtpTransport, MailboxError> {
        self.smtp
            .as_ref()
            .ok_or(MailboxError::Guard(self.lifecycle_failure()))
    }

    fn authenticated_session(&mut self) -> Result<&mut ImapSession, MailboxError> {
        match &mut self.imap {
            ImapState::Authenticated(session) => Ok(session),
            ImapState::Connected(_) => Err(MailboxError::Guard(GuardFailure::NotAuthenticated)),
            ImapState::Closed => Err(MailboxError::Guard(GuardFailure::SessionClosed)),
        }
    }

    /// Releases both channels: drops the SMTP transport and logs out of
    /// IMAP. A second call fails the guard with `SessionClosed`.
    pub async fn close(&mut self) -> Result<(), MailboxError> {
        self.check_connection().await?;

        self.smtp = None;
        if let ImapState::Authenticated(session) =
            std::mem::replace(&mut self.imap, ImapState::Closed)
        {
            imap::logout(session).await?;
        }

        info!("-- session closed for {}", self.settings.email_address);
        Ok(())
    }

    /// The account's folder names, in server order, quoting stripped.
    pub async fn list_folders(&mut self) -> Result<Vec<String>, MailboxError> {
        self.check_connection().await?;

        let session = self.authenticated_session()?;
        imap::list_folders(session).await
    }

    /// Builds the MIME form of `outgoing` and delivers it. The envelope
    /// recipient set is `to` plus `bcc`; bcc never appears in a header.
    pub async fn send_message(&mut self, outgoing: &OutgoingMessage) -> Result<(), MailboxError> {
        self.check_connection().await?;

        let (envelope, raw_message) = outgoing.build_mime(&self.settings.email_address)?;
        let transport = self.smtp_transport()?;
        smtp::deliver(transport, &envelope, &raw_message).await?;

        info!(
            "-- '{}' delivered to {} recipient(s)",
            outgoing.subject,
            envelope.to().len()
        );
        Ok(())
    }

    /// The most recent `limit` messages of `folder`, newest first, shaped
    /// into entries. A message the parser cannot shape is skipped with a
    /// warning instead of failing the whole listing.
    pub async fn list_messages(
        &mut self,
        folder: &str,
        limit: usize,
    ) -> Result<Vec<InboxEntry>, MailboxError> {
        self.check_connection().await?;

        let session = self.authenticated_session()?;
        let ids = imap::search_ids_descending(session, folder).await?;

        let mut entries = Vec::new();
        for id in ids.into_iter().take(limit) {
            let raw = match imap::fetch_raw(session, id).await? {
                Some(raw) => raw,
                None => {
                    warn!("message {} came back without a body, skipping", id);
                    continue;
                }
            };
            match message::shape_entry(&raw) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!("skipping message {}: {}", id, err),
            }
        }

        Ok(entries)
    }
}
