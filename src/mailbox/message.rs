use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use mailparse::{parse_mail, MailHeaderMap, ParsedMail};
use serde::{Deserialize, Serialize};

use crate::mailbox::error::MailboxError;

/// Read-only snapshot of one fetched message. Holds no relation back to the
/// live server state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxEntry {
    pub from: String,
    pub to: Option<String>,
    pub cc: Option<String>,
    pub subject: String,
    pub date: Option<DateTime<FixedOffset>>,
    pub body: String,
    pub attachments: Vec<FetchedAttachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedAttachment {
    pub filename: String,
    pub content: Vec<u8>,
}

fn unparseable(err: impl ToString) -> MailboxError {
    MailboxError::Protocol {
        reason: format!("cannot parse fetched message: {}", err.to_string()),
    }
}

/// Shapes the raw RFC 822 bytes of one fetched message into an entry.
pub fn shape_entry(raw: &[u8]) -> Result<InboxEntry, MailboxError> {
    let parsed = parse_mail(raw).map_err(unparseable)?;

    let from = parsed.headers.get_first_value("From").unwrap_or_default();
    let to = parsed.headers.get_first_value("To");
    let cc = parsed.headers.get_first_value("Cc");
    let subject = parsed
        .headers
        .get_first_header("Subject")
        .map(|header| decode_subject(&String::from_utf8_lossy(header.get_value_raw())))
        .unwrap_or_default();
    let date = parsed
        .headers
        .get_first_value("Date")
        .and_then(|value| parse_date(&value));

    let body = extract_body_text(&parsed)?;
    let attachments = collect_attachments(&parsed)?;

    Ok(InboxEntry {
        from,
        to,
        cc,
        subject,
        date,
        body,
        attachments,
    })
}

// Decodes only the first fragment of the Subject header: a leading encoded
// word, or the plain text before the first encoded word. Trailing fragments
// of a multi-fragment subject are dropped.
pub(crate) fn decode_subject(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.find("=?") {
        None => decode_fragment(trimmed),
        Some(0) => {
            // Encoded words cannot contain whitespace (RFC 2047)
            let word = trimmed.split_whitespace().next().unwrap_or(trimmed);
            decode_fragment(word)
        }
        Some(pos) => trimmed[..pos].trim_end().to_string(),
    }
}

// Run a single fragment through the header decoder to resolve its declared
// character encoding
fn decode_fragment(fragment: &str) -> String {
    let synthetic = format!("Subject: {}\n", fragment);
    match mailparse::parse_header(synthetic.as_bytes()) {
        Ok((header, _)) => header.get_value(),
        Err(_) => fragment.to_string(),
    }
}

pub(crate) fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(date) = DateTime::parse_from_rfc2822(raw.trim()) {
        return Some(date);
    }
    // The lenient fallback answers epoch zero for arbitrary text, so only
    // consult it when the header carries at least one digit
    if !raw.bytes().any(|byte| byte.is_ascii_digit()) {
        return None;
    }
    mailparse::dateparse(raw)
        .ok()
        .and_then(|epoch| Utc.timestamp_opt(epoch, 0).single())
        .map(|date| date.fixed_offset())
}

// The primary text body lives down the first sub-part chain: descend into the
// first sub-part of every multipart level until a leaf is found
fn extract_body_text(parsed: &ParsedMail) -> Result<String, MailboxError> {
    let mut part = parsed;
    while !part.subparts.is_empty() {
        part = &part.subparts[0];
    }

    let bytes = part.get_body_raw().map_err(unparseable)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => latin1(err.as_bytes()),
    })
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| byte as char).collect()
}

// Every part carrying a Content-Disposition header counts as an attachment
fn collect_attachments(parsed: &ParsedMail) -> Result<Vec<FetchedAttachment>, MailboxError> {
    fn walk(part: &ParsedMail, out: &mut Vec<FetchedAttachment>) -> Result<(), MailboxError> {
        if part
            .headers
            .get_first_header("Content-Disposition")
            .is_some()
        {
            let filename = part
                .get_content_disposition()
                .params
                .get("filename")
                .cloned()
                .unwrap_or_else(|| "unnamed_attachment".to_string());
            let content = part.get_body_raw().map_err(unparseable)?;
            out.push(FetchedAttachment { filename, content });
        }

        for subpart in &part.subparts {
            walk(subpart, out)?;
        }
        Ok(())
    }

    let mut attachments = Vec::new();
    walk(parsed, &mut attachments)?;
    Ok(attachments)
}
