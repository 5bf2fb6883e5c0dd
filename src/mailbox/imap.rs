use async_imap::{Client, Session};
use futures::TryStreamExt;
use log::info;
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

use crate::mailbox::error::{Channel, MailboxError};

pub type ImapStream = Compat<tokio_native_tls::TlsStream<TcpStream>>;
pub type ImapClient = Client<ImapStream>;
pub type ImapSession = Session<ImapStream>;

fn protocol(err: async_imap::error::Error) -> MailboxError {
    MailboxError::Protocol {
        reason: err.to_string(),
    }
}

fn unreachable_server(err: impl ToString) -> MailboxError {
    MailboxError::Connection {
        channel: Channel::Imap,
        reason: err.to_string(),
    }
}

// Establish a TLS-encrypted connection to the IMAP server, without logging in
pub async fn connect(server: &str, port: u16) -> Result<ImapClient, MailboxError> {
    let imap_addr = (server, port);
    let tcp_stream = TcpStream::connect(imap_addr)
        .await
        .map_err(unreachable_server)?;
    let tls = tokio_native_tls::TlsConnector::from(
        native_tls::TlsConnector::new().map_err(unreachable_server)?,
    );
    let tls_stream = tls
        .connect(server, tcp_stream)
        .await
        .map_err(unreachable_server)?;

    info!("-- connected to {}:{}", server, port);
    Ok(Client::new(tls_stream.compat()))
}

// Upgrade the client to an authenticated session. On rejection the still
// connected client is handed back so login can be retried.
pub async fn login(
    client: ImapClient,
    username: &str,
    password: &str,
) -> Result<ImapSession, (MailboxError, ImapClient)> {
    match client.login(username, password).await {
        Ok(session) => {
            info!("-- logged in as {}", username);
            Ok(session)
        }
        Err((err, client)) => Err((
            MailboxError::Authentication {
                channel: Channel::Imap,
                reason: err.to_string(),
            },
            client,
        )),
    }
}

// Liveness probe used by the connectivity guard
pub async fn probe(session: &mut ImapSession) -> bool {
    session.noop().await.is_ok()
}

// Query the folder list and strip it down to the display names
pub async fn list_folders(session: &mut ImapSession) -> Result<Vec<String>, MailboxError> {
    let names_stream = session.list(Some(""), Some("*")).await.map_err(protocol)?;
    let names: Vec<_> = names_stream.try_collect().await.map_err(protocol)?;

    Ok(names.iter().map(|name| name.name().to_string()).collect())
}

// Select the folder and return every message id it holds, newest first
pub async fn search_ids_descending(
    session: &mut ImapSession,
    folder: &str,
) -> Result<Vec<u32>, MailboxError> {
    session.select(folder).await.map_err(protocol)?;
    info!("-- {} selected", folder);

    let ids = session.search("ALL").await.map_err(protocol)?;
    Ok(descending(ids))
}

// Provider-assigned ids grow with arrival, so numeric descending is newest-first
pub(crate) fn descending(ids: impl IntoIterator<Item = u32>) -> Vec<u32> {
    let mut ids: Vec<u32> = ids.into_iter().collect();
    ids.sort_unstable_by(|a, b| b.cmp(a));
    ids
}

// Fetch the full content of a single message. PEEK keeps the listing from
// flagging the message as seen.
pub async fn fetch_raw(
    session: &mut ImapSession,
    id: u32,
) -> Result<Option<Vec<u8>>, MailboxError> {
    let fetch_stream = session
        .fetch(id.to_string(), "BODY.PEEK[]")
        .await
        .map_err(protocol)?;
    let fetches: Vec<_> = fetch_stream.try_collect().await.map_err(protocol)?;

    Ok(fetches
        .first()
        .and_then(|fetch| fetch.body().map(|body| body.to_vec())))
}

// Be nice to the server and log out
pub async fn logout(mut session: ImapSession) -> Result<(), MailboxError> {
    session.logout().await.map_err(protocol)
}
