use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::ServiceError,
    services::sync_service,
    state::{Listener, SharedState},
};

/// Name of the SSE event carrying a session snapshot.
pub const SNAPSHOT_EVENT: &str = "snapshot";

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Register a new SSE viewer of `session_id` and build its response stream.
///
/// The current snapshot is the first event of the stream. The listener is
/// removed from the registry once the client goes away.
pub async fn open_stream(
    state: &SharedState,
    session_id: Uuid,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + use<>>, ServiceError> {
    let (listener, mut snapshots) = Listener::channel();
    sync_service::attach_listener(state, session_id, &listener).await?;
    info!(session_id = %session_id, listener_id = listener.id, "SSE listener connected");

    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);
    let state = state.clone();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                payload = snapshots.recv() => match payload {
                    Some(payload) => {
                        let event = Event::default().event(SNAPSHOT_EVENT).data(payload);
                        if tx.send(Ok(event)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }

        sync_service::detach_listener(&state, session_id, &listener);
        info!(session_id = %session_id, listener_id = listener.id, "SSE listener disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    ))
}
