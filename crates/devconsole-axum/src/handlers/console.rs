//! Console handlers - dev-server output for remote observers.
//!
//! Every observer connection subscribes to the log hub on open, receives the
//! buffered backlog followed by live lines, and unsubscribes when the
//! connection ends. Each line travels as a `{"type":"log","content":...}`
//! JSON frame.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use devconsole_core::{ConsoleFrame, LogLine};
use devconsole_runtime::{LogHub, SubscriberId, Subscription};
use futures_util::stream::{SplitSink, Stream};
use futures_util::{SinkExt, StreamExt};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Unsubscribes from the hub when the connection's stream is dropped.
struct ObserverGuard {
    hub: Arc<LogHub>,
    id: SubscriberId,
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
        info!(subscriber_id = %self.id, "Console observer disconnected");
    }
}

fn encode(line: &LogLine) -> Option<String> {
    match ConsoleFrame::from(line).to_json() {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(seq = line.seq, "Failed to serialize console frame: {}", e);
            None
        }
    }
}

/// `GET /api/console` - WebSocket console feed.
pub async fn socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_console_socket(socket, state))
}

async fn handle_console_socket(socket: WebSocket, state: AppState) {
    let Subscription {
        id,
        backlog,
        receiver,
    } = state.hub.subscribe();
    let _guard = ObserverGuard {
        hub: Arc::clone(&state.hub),
        id,
    };
    info!(subscriber_id = %id, backlog = backlog.len(), "Console observer connected");

    let (ws_sender, mut ws_receiver) = socket.split();

    // Backlog first, then live lines until the hub detaches us
    let mut egress = tokio::spawn(async move {
        let mut ws_sender = ws_sender;
        let mut lines = tokio_stream::iter(backlog).chain(ReceiverStream::new(receiver));

        while let Some(line) = lines.next().await {
            if send_line(&mut ws_sender, &line).await.is_err() {
                return;
            }
        }
        let _ = ws_sender.close().await;
    });

    // Observers only listen; drain their frames to notice the close
    let mut ingest = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut egress => { ingest.abort(); }
        _ = &mut ingest => { egress.abort(); }
    }
    debug!(subscriber_id = %id, "Console socket closed");
}

async fn send_line(
    sender: &mut SplitSink<WebSocket, Message>,
    line: &LogLine,
) -> Result<(), axum::Error> {
    match encode(line) {
        Some(json) => sender.send(Message::Text(json.into())).await,
        None => Ok(()),
    }
}

/// `GET /api/console/stream` - SSE console feed.
///
/// Same frames as the WebSocket feed, one per `data:` event, with a
/// keep-alive ping every 30 seconds to prevent proxy timeouts.
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    let Subscription {
        id,
        backlog,
        receiver,
    } = state.hub.subscribe();
    let guard = ObserverGuard {
        hub: Arc::clone(&state.hub),
        id,
    };
    info!(subscriber_id = %id, backlog = backlog.len(), "Console SSE observer connected");

    let stream = tokio_stream::iter(backlog)
        .chain(ReceiverStream::new(receiver))
        .filter_map(move |line| {
            let _keep_subscribed = &guard;
            std::future::ready(
                encode(&line).map(|json| Ok::<_, Infallible>(Event::default().data(json))),
            )
        });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}

/// `GET /api/console/logs` - buffered lines as JSON.
pub async fn logs(State(state): State<AppState>) -> Json<Vec<LogLine>> {
    Json(state.hub.snapshot())
}
