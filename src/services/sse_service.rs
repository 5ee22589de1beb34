use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dao::models::EventEntity,
    dto::sse::{EventClosedEvent, Handshake, ServerEvent},
    services::public_service,
    state::{QueueChange, SharedState},
};

const EVENT_HANDSHAKE: &str = "handshake";
const EVENT_QUEUE: &str = "queue";
const EVENT_CLOSED: &str = "event.closed";

/// Subscribe to the operator SSE stream.
pub fn subscribe_admin(state: &SharedState) -> broadcast::Receiver<ServerEvent> {
    state.admin_sse().subscribe()
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// logging once the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    handshake: Option<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(hello) = handshake
            && tx.send(Ok(to_event(hello))).await.is_err()
        {
            return;
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "admin SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        info!("Admin SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(keep_alive())
}

/// Live public queue of one event: the full projection is pushed on connect
/// and recomputed from a fresh snapshot after every committed change.
pub fn queue_stream(
    state: SharedState,
    event: EventEntity,
    degraded: bool,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Register before the first snapshot so no change slips between the two.
    let mut subscription = state.queue_feed().subscribe(event.id);
    let event_id = event.id;
    let event_code = event.join_code;

    let stream = async_stream::stream! {
        if let Some(hello) = handshake("queue", "queue stream connected", degraded) {
            yield Ok(to_event(hello));
        }

        let mut pending = Some(QueueChange::Resync);
        while let Some(change) = pending.take() {
            if change == QueueChange::EventDeleted {
                if let Some(closed) = json_event(EVENT_CLOSED, &EventClosedEvent { event_code: event_code.clone() }) {
                    yield Ok(to_event(closed));
                }
                break;
            }

            match public_service::queue_for_event(&state, event_id).await {
                Ok(Some(queue)) => {
                    if let Some(update) = json_event(EVENT_QUEUE, &queue) {
                        yield Ok(to_event(update));
                    }
                }
                Ok(None) => {
                    pending = Some(QueueChange::EventDeleted);
                    continue;
                }
                Err(err) => warn!(%event_id, error = %err, "failed to rebuild queue projection"),
            }

            pending = subscription.recv().await;
        }

        subscription.cancel();
        info!(%event_id, "Queue SSE stream disconnected");
    };

    Sse::new(stream).keep_alive(keep_alive())
}

/// Handshake payload sent first on every stream.
pub fn handshake(stream: &str, message: &str, degraded: bool) -> Option<ServerEvent> {
    json_event(
        EVENT_HANDSHAKE,
        &Handshake {
            stream: stream.to_owned(),
            message: message.to_owned(),
            degraded,
        },
    )
}

fn json_event(name: &str, payload: &impl serde::Serialize) -> Option<ServerEvent> {
    match ServerEvent::json(Some(name.to_string()), payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event = name, error = %err, "failed to serialize SSE payload");
            None
        }
    }
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}

fn keep_alive() -> KeepAlive {
    KeepAlive::new()
        .interval(Duration::from_secs(15))
        .text("keep-alive")
}
