//! Server-sent events endpoint.
//!
//! # Data Flow
//! ```text
//! GET /sse
//!     → interval timer (first tick one period after subscribe)
//!     → "SSE event - <local time>" with id 0, 1, 2, ...
//!     → ends on client disconnect or server shutdown
//! ```
//!
//! The timer fires at a fixed rate. A slow client does not slow it down;
//! missed ticks are delivered in a burst.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use chrono::{Local, NaiveTime};
use futures_util::stream::{self, Stream, StreamExt};
use tokio::time::{interval_at, Instant};

use crate::http::server::AppState;
use crate::net::ConnectionKind;

/// Data line for an event produced at `time`.
pub fn event_message(time: NaiveTime) -> String {
    format!("SSE event - {time}")
}

/// Sequence numbers yielded once per `period`, starting one period from now.
pub fn ticks(period: Duration) -> impl Stream<Item = u64> + Send + 'static {
    let interval = interval_at(Instant::now() + period, period);
    stream::unfold((interval, 0u64), |(mut interval, seq)| async move {
        interval.tick().await;
        Some((seq, (interval, seq + 1)))
    })
}

pub async fn sse_handler(State(state): State<AppState>) -> impl IntoResponse {
    let guard = state.connections.track(ConnectionKind::EventStream);
    tracing::info!(connection_id = %guard.id(), "Event stream opened");

    let shutdown = state.shutdown.clone();
    let events = ticks(Duration::from_millis(state.sse.interval_ms))
        .take_until(async move { shutdown.wait().await })
        .map(move |seq| {
            // The guard lives as long as the stream.
            let _ = &guard;
            Ok::<_, Infallible>(
                Event::default()
                    .id(seq.to_string())
                    .data(event_message(Local::now().time())),
            )
        });

    Sse::new(events).keep_alive(
        KeepAlive::new().interval(Duration::from_secs(state.sse.keep_alive_secs)),
    )
}
