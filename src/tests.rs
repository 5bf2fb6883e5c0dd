#[cfg(test)]
mod tests {

    use crate::mailbox::imap::descending;
    use crate::mailbox::message::{decode_subject, parse_date, shape_entry};
    use crate::mailbox::outgoing::{OutgoingAttachment, OutgoingMessage};
    use crate::mailbox::{derive_provider, provider_allowed};

    #[test]
    fn test_provider_is_first_domain_label_lowercased() {
        assert_eq!(derive_provider("user@gmail.com"), "gmail");
        assert_eq!(derive_provider("user@Mail.Example.COM"), "mail");
        assert_eq!(derive_provider("User@YAHOO.co.uk"), "yahoo");
    }

    #[test]
    fn test_provider_of_malformed_address_is_empty() {
        assert_eq!(derive_provider("no-at-sign"), "");
    }

    #[test]
    fn test_guard_rejects_provider_outside_allow_list() {
        let gmail_only = Some(vec!["gmail".to_string()]);

        // A healthy connection does not help a provider off the list
        assert!(provider_allowed("gmail", &gmail_only));
        assert!(!provider_allowed("yahoo", &gmail_only));
        assert!(!provider_allowed("outlook", &gmail_only));
    }

    #[test]
    fn test_guard_without_allow_list_accepts_any_provider() {
        assert!(provider_allowed("yahoo", &None));
        assert!(provider_allowed("", &None));
        assert!(provider_allowed("Gmail", &Some(vec!["gmail".to_string()])));
    }

    #[test]
    fn test_subject_single_utf8_encoded_word_decodes_exactly() {
        assert_eq!(decode_subject("=?utf-8?B?SGVsbG8gd29ybGQ=?="), "Hello world");
    }

    #[test]
    fn test_subject_keeps_only_first_fragment() {
        // Trailing fragments of a multi-fragment subject are dropped
        assert_eq!(
            decode_subject("=?utf-8?B?SGVsbG8=?= =?utf-8?B?IHdvcmxk?="),
            "Hello"
        );
        assert_eq!(decode_subject("Invoice =?utf-8?B?SGVsbG8=?="), "Invoice");
    }

    #[test]
    fn test_plain_subject_passes_through() {
        assert_eq!(decode_subject("  Weekly report  "), "Weekly report");
    }

    #[test]
    fn test_body_falls_back_to_latin1() {
        let mut raw = b"From: a@example.com\r\nSubject: hi\r\n\r\ncaf".to_vec();
        raw.push(0xE9); // 'é' in Latin-1, invalid on its own in UTF-8

        let entry = shape_entry(&raw).expect("message should parse");
        assert_eq!(entry.body, "caf\u{e9}");
    }

    #[test]
    fn test_bcc_is_in_envelope_but_not_in_headers() {
        let outgoing = OutgoingMessage {
            to: vec!["dest@example.com".to_string()],
            cc: vec!["copy@example.com".to_string()],
            bcc: vec!["hidden@example.com".to_string()],
            subject: "quarterly numbers".to_string(),
            body_html: "<p>numbers attached</p>".to_string(),
            attachment: None,
        };

        let (envelope, raw) = outgoing.build_mime("me@example.com").expect("build");
        let text = String::from_utf8(raw).expect("all-ascii message");

        assert!(!text.contains("hidden@example.com"));
        assert!(!text.to_lowercase().contains("bcc:"));
        assert!(text.contains("Cc: copy@example.com"));

        let recipients: Vec<String> = envelope.to().iter().map(|a| a.to_string()).collect();
        assert!(recipients.contains(&"dest@example.com".to_string()));
        assert!(recipients.contains(&"hidden@example.com".to_string()));
        // cc stays a header, it is not added to the envelope
        assert_eq!(recipients.len(), 2);
    }

    #[test]
    fn test_attachment_round_trips_byte_identical() {
        let payload = vec![0x25u8, 0x50, 0x44, 0x46, 0x2d, 0xff, 0x00, 0x7f, 0x10];
        let outgoing = OutgoingMessage {
            to: vec!["dest@example.com".to_string()],
            subject: "report".to_string(),
            body_html: "<p>see attached</p>".to_string(),
            attachment: Some(OutgoingAttachment {
                filename: "report.pdf".to_string(),
                content: payload.clone(),
            }),
            ..Default::default()
        };

        let (_envelope, raw) = outgoing.build_mime("me@example.com").expect("build");
        let entry = shape_entry(&raw).expect("parse back what was built");

        assert_eq!(entry.subject, "report");
        assert_eq!(entry.body.trim_end(), "<p>see attached</p>");
        assert_eq!(entry.attachments.len(), 1);
        assert_eq!(entry.attachments[0].filename, "report.pdf");
        assert_eq!(entry.attachments[0].content, payload);
    }

    #[test]
    fn test_message_ids_sort_newest_first() {
        assert_eq!(descending(vec![3, 11, 7]), vec![11, 7, 3]);
        assert_eq!(descending(Vec::new()), Vec::<u32>::new());

        let sorted = descending(vec![8, 1024, 512, 9]);
        assert!(sorted.windows(2).all(|pair| pair[0] > pair[1]));
    }

    #[test]
    fn test_date_header_parses_with_offset() {
        let date = parse_date("Tue, 1 Jul 2003 10:52:37 +0200").expect("valid date");
        assert_eq!(date.offset().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn test_garbage_date_header_yields_no_date() {
        // Must not be fabricated into the epoch by the lenient parser
        assert!(parse_date("not a date").is_none());
        assert!(parse_date("").is_none());
        assert!(parse_date("   ").is_none());
    }
}
