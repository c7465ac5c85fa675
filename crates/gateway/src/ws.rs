//! WebSocket connection lifecycle (§4.6.3): one read-task and one
//! write-task per connection. The read-task enforces read deadlines, resets
//! them on pong, applies a per-message size cap, and drops stray client
//! messages (the wire format is currently server→client only, reserved for
//! future subscribe/unsubscribe framing). The write-task drains the
//! connection's outbound queue, enforces write deadlines, and pings on a
//! heartbeat interval. Either task ending tears down the whole connection.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::StreamExt;
use futures::SinkExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::subscription::SubscriptionManager;

const READ_DEADLINE: Duration = Duration::from_secs(90);
const WRITE_DEADLINE: Duration = Duration::from_secs(10);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const MAX_MESSAGE_SIZE: usize = 16 * 1024;

/// Drive a single upgraded connection until either side closes it.
pub async fn handle_socket(socket: WebSocket, draft_id: Uuid, subscriptions: SubscriptionManager) {
    let mut handle = subscriptions.subscribe(draft_id).await;
    let connection_id = handle.connection_id;

    let (mut sink, mut stream) = socket.split();

    let write_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await; // first tick fires immediately; consume it

        loop {
            tokio::select! {
                envelope = handle.rx.recv() => {
                    let Some(envelope) = envelope else { break };
                    let json = match envelope.to_json() {
                        Ok(json) => json,
                        Err(err) => {
                            warn!(connection_id = %connection_id, error = %err, "failed to serialize event envelope");
                            continue;
                        }
                    };
                    match tokio::time::timeout(WRITE_DEADLINE, sink.send(Message::Text(json.into()))).await {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => {
                            debug!(connection_id = %connection_id, error = %err, "write failed, closing connection");
                            break;
                        }
                        Err(_) => {
                            warn!(connection_id = %connection_id, "write deadline exceeded, closing connection");
                            break;
                        }
                    }
                }
                _ = heartbeat.tick() => {
                    if tokio::time::timeout(WRITE_DEADLINE, sink.send(Message::Ping(Vec::new().into()))).await.is_err() {
                        warn!(connection_id = %connection_id, "ping write deadline exceeded, closing connection");
                        break;
                    }
                }
            }
        }

        let _ = sink.close().await;
    });

    let read_connection_id = connection_id;
    let read_task = tokio::spawn(async move {
        loop {
            let next = tokio::time::timeout(READ_DEADLINE, stream.next()).await;
            let message = match next {
                Ok(Some(Ok(message))) => message,
                Ok(Some(Err(err))) => {
                    debug!(connection_id = %read_connection_id, error = %err, "read error, closing connection");
                    break;
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(connection_id = %read_connection_id, "read deadline exceeded, closing connection");
                    break;
                }
            };

            match message {
                Message::Close(_) => break,
                Message::Pong(_) => {
                    // Reaching this arm at all resets the read deadline (the
                    // `timeout` above re-arms every iteration); nothing else
                    // to do.
                }
                Message::Ping(_) | Message::Text(_) | Message::Binary(_) => {
                    let size = match &message {
                        Message::Text(text) => text.len(),
                        Message::Binary(bytes) => bytes.len(),
                        _ => 0,
                    };
                    if size > MAX_MESSAGE_SIZE {
                        warn!(connection_id = %read_connection_id, size, "message exceeds size cap, closing connection");
                        break;
                    }
                    // Client->server framing is reserved for future
                    // subscribe/unsubscribe use; today every inbound
                    // message (including stray `ping` frames from old
                    // clients) is parsed-and-dropped, never an error.
                }
            }
        }
    });

    tokio::select! {
        _ = write_task => {}
        _ = read_task => {}
    }

    subscriptions.unsubscribe(connection_id).await;
    info!(%connection_id, %draft_id, "connection closed");
}
