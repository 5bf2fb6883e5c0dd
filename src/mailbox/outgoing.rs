use std::path::Path;

use lettre::address::{Address, Envelope};
use lettre::message::header::{ContentDisposition, ContentType};
use lettre::message::{Mailbox as AddressHeader, MultiPart, SinglePart};
use lettre::Message;

use crate::mailbox::error::MailboxError;

/// A message to be sent, together with everything needed to build its MIME
/// form. Transient: built, handed to the transport, then dropped.
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    /// Body text, always sent as an HTML part.
    pub body_html: String,
    pub attachment: Option<OutgoingAttachment>,
}

#[derive(Debug, Clone)]
pub struct OutgoingAttachment {
    pub filename: String,
    pub content: Vec<u8>,
}

impl OutgoingAttachment {
    /// Reads the full file content and names the attachment after the base
    /// filename of the path.
    pub async fn from_path(path: &Path) -> Result<Self, MailboxError> {
        let content = tokio::fs::read(path).await.map_err(|err| bad_message(format!(
            "cannot read attachment {}: {}",
            path.display(),
            err
        )))?;
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| bad_message(format!("attachment path {} has no file name", path.display())))?
            .to_string();

        Ok(Self { filename, content })
    }
}

fn bad_message(reason: String) -> MailboxError {
    MailboxError::Delivery { reason }
}

fn parse_header_address(addr: &str) -> Result<AddressHeader, MailboxError> {
    addr.parse::<AddressHeader>()
        .map_err(|err| bad_message(format!("invalid address '{}': {}", addr, err)))
}

fn parse_envelope_address(addr: &str) -> Result<Address, MailboxError> {
    addr.parse::<Address>()
        .map_err(|err| bad_message(format!("invalid address '{}': {}", addr, err)))
}

impl OutgoingMessage {
    /// Builds the MIME form and the transport envelope. Bcc recipients go
    /// into the envelope only, never into a visible header; cc recipients go
    /// into the headers only. The envelope recipient set is `to` plus `bcc`.
    pub fn build_mime(&self, from: &str) -> Result<(Envelope, Vec<u8>), MailboxError> {
        let mut builder = Message::builder()
            .from(parse_header_address(from)?)
            .subject(self.subject.clone());
        for addr in &self.to {
            builder = builder.to(parse_header_address(addr)?);
        }
        for addr in &self.cc {
            builder = builder.cc(parse_header_address(addr)?);
        }

        let mut parts = MultiPart::mixed().singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(self.body_html.clone()),
        );
        if let Some(attachment) = &self.attachment {
            let mime = mime_guess::from_path(&attachment.filename)
                .first_or_octet_stream()
                .to_string();
            let content_type = ContentType::parse(&mime)
                .map_err(|err| bad_message(format!("attachment content type: {}", err)))?;
            parts = parts.singlepart(
                SinglePart::builder()
                    .header(content_type)
                    .header(ContentDisposition::attachment(&attachment.filename))
                    .body(attachment.content.clone()),
            );
        }

        let message = builder
            .multipart(parts)
            .map_err(|err| bad_message(err.to_string()))?;

        Ok((self.envelope(from)?, message.formatted()))
    }

    fn envelope(&self, from: &str) -> Result<Envelope, MailboxError> {
        let sender = parse_envelope_address(from)?;
        let mut recipients = Vec::with_capacity(self.to.len() + self.bcc.len());
        for addr in self.to.iter().chain(self.bcc.iter()) {
            recipients.push(parse_envelope_address(addr)?);
        }

        Envelope::new(Some(sender), recipients).map_err(|err| bad_message(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_without_recipients_is_rejected() {
        let outgoing = OutgoingMessage {
            subject: "empty".to_string(),
            body_html: "<p>empty</p>".to_string(),
            ..Default::default()
        };

        assert!(outgoing.build_mime("me@example.com").is_err());
    }

    #[test]
    fn bad_recipient_address_is_rejected() {
        let outgoing = OutgoingMessage {
            to: vec!["not an address".to_string()],
            subject: "x".to_string(),
            body_html: "<p>x</p>".to_string(),
            ..Default::default()
        };

        assert!(outgoing.build_mime("me@example.com").is_err());
    }
}
