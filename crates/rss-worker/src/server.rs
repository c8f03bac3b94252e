//! TCP accept loops binding the wire protocol to the push handler and the
//! fetch server.

use std::sync::Arc;

use rss_protocol::Message;
use rss_transport::Connection;
use rss_types::ShuffleId;
use tokio::net::TcpListener;
use tracing::{debug, warn};

use crate::error::ServerError;
use crate::fetch_server::FetchServer;
use crate::push_handler::PushHandler;

/// Splits a `shuffle_key` of the form `{app_id}/{shuffle_id}` (any further
/// `/`-separated components, such as a partition id, are ignored) into a
/// [`ShuffleId`].
pub fn parse_shuffle_key(key: &str) -> Result<ShuffleId, ServerError> {
    let mut parts = key.splitn(3, '/');
    let app_id = parts.next().filter(|s| !s.is_empty()).ok_or_else(|| ServerError::MalformedShuffleKey { key: key.to_string() })?;
    let shuffle_id = parts
        .next()
        .ok_or_else(|| ServerError::MalformedShuffleKey { key: key.to_string() })?;
    let shuffle_id: u32 = shuffle_id
        .parse()
        .map_err(|_| ServerError::MalformedShuffleId { key: key.to_string() })?;
    Ok(ShuffleId::new(app_id, shuffle_id))
}

/// Accepts connections on `listener`, dispatching every `PushData`/
/// `PushMergedData` frame to `handler` and replying with its `Ack`.
///
/// Runs until `listener` is dropped or a bind-level error occurs; each
/// accepted connection is handled on its own spawned task so one slow
/// producer cannot stall another.
pub async fn run_push_listener(listener: TcpListener, handler: Arc<PushHandler>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(error = %err, "push listener accept failed");
                continue;
            }
        };
        let handler = handler.clone();
        tokio::spawn(async move {
            if let Err(err) = serve_push_connection(stream, peer.to_string(), handler).await {
                debug!(peer = %peer, error = %err, "push connection ended");
            }
        });
    }
}

async fn serve_push_connection(
    stream: tokio::net::TcpStream,
    peer: String,
    handler: Arc<PushHandler>,
) -> Result<(), ServerError> {
    let mut conn = Connection::from_accepted(stream, peer.clone())?;
    loop {
        let message = conn.recv().await?;
        let ack = match message {
            Message::PushData(request) => {
                let shuffle_id = parse_shuffle_key(&request.shuffle_key)?;
                handler.handle_push_data(&shuffle_id, request).await
            }
            Message::PushMergedData(request) => {
                let shuffle_id = parse_shuffle_key(&request.shuffle_key)?;
                handler.handle_push_merged_data(&shuffle_id, request).await
            }
            _ => return Err(ServerError::UnexpectedMessage { peer }),
        };
        conn.send(Message::Ack(ack)).await?;
    }
}

/// Accepts connections on `listener`, dispatching `OpenStream`/
/// `ReadAddCredit` frames to `fetch` and streaming back `ChunkData` frames
/// as credit allows.
pub async fn run_fetch_listener(listener: TcpListener, fetch: Arc<FetchServer>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(error = %err, "fetch listener accept failed");
                continue;
            }
        };
        let fetch = fetch.clone();
        tokio::spawn(async move {
            if let Err(err) = serve_fetch_connection(stream, peer.to_string(), fetch).await {
                debug!(peer = %peer, error = %err, "fetch connection ended");
            }
        });
    }
}

async fn serve_fetch_connection(
    stream: tokio::net::TcpStream,
    peer: String,
    fetch: Arc<FetchServer>,
) -> Result<(), ServerError> {
    let mut conn = Connection::from_accepted(stream, peer.clone())?;
    let mut open_stream_id = None;

    loop {
        let message = conn.recv().await?;
        match message {
            Message::OpenStream(request) => {
                let handle = fetch
                    .open_stream(&request)
                    .map_err(|_| ServerError::UnexpectedMessage { peer: peer.clone() })?;
                open_stream_id = Some(handle.stream_id);
                conn.send(Message::StreamHandle(handle)).await?;
            }
            Message::ReadAddCredit(request) => {
                let _ = fetch.add_credit(request);
            }
            _ => return Err(ServerError::UnexpectedMessage { peer }),
        }

        if let Some(stream_id) = open_stream_id {
            drain_available_chunks(&mut conn, &fetch, stream_id).await?;
        }
    }
}

async fn drain_available_chunks(conn: &mut Connection, fetch: &Arc<FetchServer>, stream_id: u64) -> Result<(), ServerError> {
    loop {
        let fetch = fetch.clone();
        let chunk = tokio::task::spawn_blocking(move || fetch.next_chunk(stream_id))
            .await
            .expect("fetch read task panicked")
            .map_err(|_| ServerError::UnexpectedMessage {
                peer: conn.endpoint().to_string(),
            })?;
        match chunk {
            Some(chunk) => conn.send(Message::ChunkData(chunk)).await?,
            None => return Ok(()),
        }
    }
}
