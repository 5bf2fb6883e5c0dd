mod display;
mod mailbox;
mod settings;
mod tests;

use anyhow::Result;
use log::info;

use std::path::PathBuf;

use crate::mailbox::credentials;
use crate::mailbox::outgoing::{OutgoingAttachment, OutgoingMessage};
use crate::mailbox::{Mailbox, DEFAULT_LIST_LIMIT};

fn setup_logging() -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(std::io::stdout())
        .apply()
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let settings = settings::load_settings()?;
    let credential = credentials::obtain_credential()?;

    let mut mailbox = Mailbox::connect(&settings, &credential).await?;
    mailbox.authenticate().await?;

    info!("-- provider: {}", mailbox.provider());
    info!("-- folders: {:?}", mailbox.list_folders().await?);

    // Self-addressed round trip: send one message, then list the newest ones.
    // A file path given as the first argument is attached.
    let attachment = match std::env::args().nth(1) {
        Some(path) => Some(OutgoingAttachment::from_path(&PathBuf::from(path)).await?),
        None => None,
    };
    let outgoing = OutgoingMessage {
        to: vec![settings.email_address.clone()],
        subject: "mailbridge connectivity test".to_string(),
        body_html: "<html><body><p>mailbridge is set up.</p></body></html>".to_string(),
        attachment,
        ..Default::default()
    };
    mailbox.send_message(&outgoing).await?;

    let entries = mailbox.list_messages("INBOX", DEFAULT_LIST_LIMIT).await?;
    display::display_entries(&entries);

    mailbox.close().await?;
    Ok(())
}
