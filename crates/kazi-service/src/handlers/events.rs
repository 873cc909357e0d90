//! The entitlement-changed SSE feed.
//!
//! Other open views (tabs, header badges, guards) subscribe here and
//! re-run the access evaluation on each event instead of polling.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use tokio::sync::broadcast::error::RecvError;

use crate::state::AppState;

/// Event name on the wire.
const EVENT_NAME: &str = "entitlement-changed";

/// Stream entitlement changes as server-sent events.
pub async fn stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(change) => {
                    let Ok(data) = serde_json::to_string(&change) else {
                        tracing::error!("failed to serialize entitlement change");
                        continue;
                    };
                    let event = Event::default().event(EVENT_NAME).data(data);
                    return Some((Ok(event), rx));
                }
                // A lagged consumer just misses events; it re-reads the
                // decision on the next one.
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "SSE consumer lagged behind the event bus");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
