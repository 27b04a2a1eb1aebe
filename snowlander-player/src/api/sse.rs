//! Server-Sent Events endpoint
//!
//! Each client gets its own fan-out subscription. The SSE event name is the
//! envelope `type` and the data is the JSON envelope. A client that
//! disconnects drops its receiver and is pruned on the next broadcast.

use crate::api::server::AppContext;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use snowlander_common::events::SnowEvent;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, warn};

/// GET /events
///
/// Opens with the current status so a fresh client does not wait for the
/// next change. Status frames that follow are always newer than it.
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (subscription, snapshot) = ctx.player.subscribe_with_snapshot().await;
    debug!("New SSE client connected ({})", subscription.id());

    let initial = match snapshot {
        Ok(view) => Some(SnowEvent::status(view)),
        Err(e) => {
            warn!("Failed to build initial snapshot for SSE client: {}", e);
            None
        }
    };

    let stream = stream::iter(initial)
        .chain(subscription.into_stream())
        .filter_map(|event| async move { to_sse_event(&event).map(Ok) });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_sse_event(event: &SnowEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event.event_type()).data(json)),
        Err(e) => {
            warn!("Failed to serialize {} event: {}", event.event_type(), e);
            None
        }
    }
}
