//! Per-connection handler: decode, route to a room, pump outbound.
//!
//! Each connection runs this handler in its own task. Inbound frames
//! are decoded into [`ClientEvent`]s and routed to the room named in
//! the event; outbound events arrive on an unbounded channel filled by
//! the room actor and are written back as JSON text frames.

use std::sync::Arc;

use bunker_protocol::{
    ClientEvent, Codec, ConnectionId, ErrorReason, JsonCodec, ServerEvent,
};
use bunker_room::{RoomHandle, RoomRegistry};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info};

use crate::ServerError;

type WsStream = WebSocketStream<TcpStream>;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    ws: WsStream,
    conn: ConnectionId,
    registry: Arc<RoomRegistry>,
) -> Result<(), ServerError> {
    let (mut sink, mut stream) = ws.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerEvent>();
    let codec = JsonCodec;

    // Outbound pump: room actor events → JSON text frames.
    let writer = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let bytes = match codec.encode(&event) {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!(error = %e, "failed to encode outbound event");
                    continue;
                }
            };
            let text = String::from_utf8_lossy(&bytes).into_owned();
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    // The room this connection is seated in, set by the first join.
    let mut joined: Option<RoomHandle> = None;
    let mut fatal: Option<tungstenite::Error> = None;

    while let Some(frame) = stream.next().await {
        let data = match frame {
            Ok(Message::Text(text)) => text.as_bytes().to_vec(),
            Ok(Message::Binary(data)) => data.into(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue, // ping/pong/frame
            Err(e) => {
                debug!(%conn, error = %e, "recv error");
                fatal = Some(e);
                break;
            }
        };

        let event: ClientEvent = match codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                debug!(%conn, error = %e, "failed to decode event, ignoring");
                continue;
            }
        };

        match event {
            ClientEvent::Join {
                room_id,
                nick,
                client_id,
            } => {
                // Joining a room creates it if the code is new.
                let handle = registry.get_or_create(&room_id).await;
                match handle
                    .join(conn, client_id.clone(), nick, out_tx.clone())
                    .await
                {
                    Ok(()) => {
                        info!(%conn, room = %room_id, client = %client_id, "seated");
                        joined = Some(handle);
                    }
                    Err(e) => {
                        // The room already told the client why.
                        debug!(%conn, room = %room_id, error = %e, "join rejected");
                    }
                }
            }
            event => {
                let handle = match &joined {
                    Some(handle) if handle.code() == event.room_id() => Some(handle.clone()),
                    _ => registry.get(event.room_id()).await,
                };
                match handle {
                    Some(handle) => {
                        if handle.event(conn, event).await.is_err() {
                            debug!(%conn, "room gone, dropping event");
                        }
                    }
                    None => {
                        let _ = out_tx.send(ServerEvent::Error {
                            room_id: Some(event.room_id().clone()),
                            reason: ErrorReason::NotFound,
                        });
                    }
                }
            }
        }
    }

    // Socket gone: let the room park the player for the grace window.
    if let Some(handle) = joined {
        let _ = handle.disconnect(conn).await;
    }
    drop(out_tx);
    let _ = writer.await;
    info!(%conn, "connection closed");
    match fatal {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
