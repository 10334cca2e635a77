//! Server-Sent Events (SSE) handler

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::warn;

use super::AppState;

/// Stream of `patch` events, one per changed anchor
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.bus.subscribe();
    let stream = BroadcastStream::new(rx);

    let event_stream = stream.filter_map(|result| match result {
        Ok(patch) => {
            let json = serde_json::to_string(&*patch).ok()?;
            Some(Ok(Event::default().data(json).event("patch")))
        }
        Err(e) => {
            // Lagged client: it missed patches, tell it to refetch the view
            warn!("SSE client lagging: {}", e);
            Some(Ok(Event::default().data("{}").event("resync")))
        }
    });

    Sse::new(event_stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
