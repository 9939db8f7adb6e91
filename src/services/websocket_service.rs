use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    services::sync_service,
    state::{Listener, SharedState},
};

/// Handle the full lifecycle of a session viewer connected over WebSocket.
///
/// The socket is registered as a listener of `session_id` and immediately
/// receives the current snapshot. Inbound text is ignored; snapshots only flow
/// from the server.
pub async fn handle_socket(state: SharedState, session_id: Uuid, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (listener, mut snapshots) = Listener::channel();
    let (control_tx, mut control_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps snapshots flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                Some(payload) = snapshots.recv() => Message::Text(payload.to_string().into()),
                Some(message) = control_rx.recv() => message,
                else => break,
            };
            let closing = matches!(message, Message::Close(_));
            if sender.send(message).await.is_err() || closing {
                break;
            }
        }
    });

    if let Err(err) = sync_service::attach_listener(&state, session_id, &listener).await {
        warn!(session_id = %session_id, error = %err, "rejecting websocket listener");
        let _ = control_tx.send(Message::Close(None));
        finalize(writer_task, listener, control_tx).await;
        return;
    }

    info!(session_id = %session_id, listener_id = listener.id, "websocket listener connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Ping(payload)) => {
                let _ = control_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = control_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Text(_)) | Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(session_id = %session_id, listener_id = listener.id, error = %err, "websocket error");
                break;
            }
        }
    }

    sync_service::detach_listener(&state, session_id, &listener);
    info!(session_id = %session_id, listener_id = listener.id, "websocket listener disconnected");

    finalize(writer_task, listener, control_tx).await;
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(
    writer_task: JoinHandle<()>,
    listener: Listener,
    control_tx: mpsc::UnboundedSender<Message>,
) {
    drop(listener);
    drop(control_tx);
    let _ = writer_task.await;
}
