// Server-sent event stream of bus events

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::web::AppState;

pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();

    let events = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok((kind, json)) => {
                    return Some((Ok(Event::default().event(kind).data(json)), rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event stream client lagged, skipped {} event(s)", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
