use crate::mailbox::message::InboxEntry;
use log::{info, error};

pub fn display_entries(entries: &[InboxEntry]) {
    entries
        .iter()
        .for_each(|entry| {
            match serde_json::to_string_pretty(entry) {
                Ok(json) => info!("{}", json),
                Err(e) => error!("Error converting to JSON: {}", e),
            }
            info!("---");
        });
}
