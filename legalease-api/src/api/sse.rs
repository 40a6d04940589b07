//! Server-Sent Events for document status updates

use axum::{
    extract::State,
    response::{sse::Event, Sse},
};
use futures::stream::Stream;
use legalease_common::sse::create_event_sse_stream;
use std::convert::Infallible;

use super::auth::CurrentUser;
use crate::AppState;

/// GET /api/events
///
/// Streams the caller's own document events only.
pub async fn event_stream(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.event_bus.subscribe();
    let user_id = user.id;
    create_event_sse_stream("legalease-api", rx, move |event| event.user_id() == user_id)
}
