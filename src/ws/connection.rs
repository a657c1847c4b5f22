//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding filtered events.

use std::str::FromStr;

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::EventFilter;
use crate::app_state::AppState;
use crate::domain::{BookingEvent, CompanyId, DragController, ResourceId, WeekGrid};

/// Per-connection state: event filter and the drag gesture.
#[derive(Debug, Default)]
struct ConnectionState {
    filter: EventFilter,
    drag: Option<DragController>,
}

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and dispatches them.
/// - Forwards matching events from the [`broadcast::Receiver`] to the client.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<BookingEvent>,
    state: AppState,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut conn = ConnectionState::default();

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &mut conn, &state).await;
                        if let Some(resp_json) = response
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            // Event from EventBus
            event = event_rx.recv() => {
                match event {
                    Ok(booking_event) => {
                        if conn.filter.accepts(&booking_event) {
                            let msg = WsMessage::new(
                                uuid::Uuid::new_v4().to_string(),
                                WsMessageType::Event,
                                serde_json::to_value(&booking_event).unwrap_or_default(),
                            );
                            let json = serde_json::to_string(&msg).unwrap_or_default();
                            if ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

fn encode(msg: &WsMessage) -> Option<String> {
    serde_json::to_string(msg).ok()
}

fn respond(id: String, payload: serde_json::Value) -> Option<String> {
    encode(&WsMessage::new(id, WsMessageType::Response, payload))
}

fn week_missing(id: String) -> Option<String> {
    encode(&WsMessage::error(id, 409, "set_week must precede pointer commands"))
}

/// Splits raw ids into parsed ids and the `"*"` wildcard flag.
/// Unparseable entries are skipped.
fn parse_ids<T: FromStr>(raw: &[String]) -> (Vec<T>, bool) {
    let mut ids = Vec::new();
    let mut wildcard = false;
    for s in raw {
        if s == "*" {
            wildcard = true;
        } else if let Ok(id) = s.parse::<T>() {
            ids.push(id);
        }
    }
    (ids, wildcard)
}

fn id_strings<T: ToString>(ids: &[T]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}

/// Handles a text message from the client, returning an optional JSON response.
async fn handle_text_message(
    text: &str,
    conn: &mut ConnectionState,
    state: &AppState,
) -> Option<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return encode(&WsMessage::error("", 400, "malformed JSON"));
    };

    let command = match serde_json::from_value::<WsCommand>(msg.payload) {
        Ok(command) => command,
        Err(e) => {
            return encode(&WsMessage::error(msg.id, 404, format!("unknown command: {e}")));
        }
    };

    match command {
        WsCommand::Subscribe {
            resource_ids,
            company_ids,
        } => {
            let (rooms, everything) = parse_ids::<ResourceId>(&resource_ids);
            let (companies, _) = parse_ids::<CompanyId>(&company_ids);
            conn.filter.watch_rooms(&rooms, everything);
            conn.filter.watch_companies(&companies);
            respond(
                msg.id,
                serde_json::json!({
                    "rooms": id_strings(&rooms),
                    "companies": id_strings(&companies),
                    "room_count": conn.filter.room_count(),
                    "company_count": conn.filter.company_count(),
                    "wildcard": conn.filter.watches_every_room(),
                }),
            )
        }
        WsCommand::Unsubscribe {
            resource_ids,
            company_ids,
        } => {
            let (rooms, everything) = parse_ids::<ResourceId>(&resource_ids);
            let (companies, _) = parse_ids::<CompanyId>(&company_ids);
            conn.filter.unwatch_rooms(&rooms, everything);
            conn.filter.unwatch_companies(&companies);
            respond(
                msg.id,
                serde_json::json!({
                    "room_count": conn.filter.room_count(),
                    "company_count": conn.filter.company_count(),
                    "wildcard": conn.filter.watches_every_room(),
                }),
            )
        }
        WsCommand::SetWeek { days } => {
            if days.is_empty() {
                return encode(&WsMessage::error(
                    msg.id,
                    400,
                    "week must have at least one day",
                ));
            }
            let config = &state.config;
            let grid = WeekGrid {
                days,
                hours: config.business_hours,
                hour_height: config.hour_height_px,
                snap_minutes: config.snap_minutes,
            };
            let columns = grid.days.len();
            conn.drag = Some(DragController::new(grid, config.drag_threshold_px));
            respond(msg.id, serde_json::json!({ "columns": columns }))
        }
        WsCommand::PointerDown {
            booking_id,
            pointer,
            rect,
        } => {
            let Some(drag) = conn.drag.as_mut() else {
                return week_missing(msg.id);
            };
            let booking = match state.booking_service.draggable(booking_id).await {
                Ok(booking) => booking,
                Err(e) => {
                    return encode(&WsMessage::error(
                        msg.id,
                        e.status_code().as_u16(),
                        e.to_string(),
                    ));
                }
            };
            let now = Utc::now()
                .with_timezone(&state.booking_service.time_zone())
                .naive_local();
            match drag.pointer_down(booking, pointer, rect, now) {
                Ok(()) => respond(msg.id, serde_json::json!({ "armed": true })),
                Err(reason) => respond(
                    msg.id,
                    serde_json::json!({ "armed": false, "reason": reason }),
                ),
            }
        }
        WsCommand::PointerMove { pointer } => {
            let Some(drag) = conn.drag.as_mut() else {
                return week_missing(msg.id);
            };
            let dragging = drag.pointer_move(pointer);
            let live = drag
                .drag_state()
                .map(|s| serde_json::json!({ "top": s.live_top, "day": s.live_day }));
            respond(
                msg.id,
                serde_json::json!({ "dragging": dragging, "live": live }),
            )
        }
        WsCommand::PointerUp { pointer } => {
            let Some(drag) = conn.drag.as_mut() else {
                return week_missing(msg.id);
            };
            let now = Utc::now()
                .with_timezone(&state.booking_service.time_zone())
                .naive_local();
            let outcome = drag.pointer_up(pointer, now);
            let commit = state.booking_service.commit_drag(&outcome).await;
            respond(
                msg.id,
                serde_json::json!({ "outcome": outcome, "commit": commit }),
            )
        }
        WsCommand::Escape => {
            let aborted = conn.drag.as_mut().is_some_and(DragController::escape);
            respond(msg.id, serde_json::json!({ "aborted": aborted }))
        }
    }
}
