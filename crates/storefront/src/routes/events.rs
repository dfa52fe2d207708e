//! Server-sent event feeds.
//!
//! Customers receive their own order, ticket and chat events plus
//! store-wide stock and settings changes. Admins receive everything.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};

use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::CurrentUser;
use crate::services::events::StoreEvent;
use crate::state::AppState;

fn to_sse(event: &StoreEvent) -> Event {
    Event::default()
        .event(event.name())
        .json_data(event)
        .unwrap_or_else(|e| {
            tracing::warn!(event = event.name(), error = %e, "failed to encode event");
            Event::default().event(event.name())
        })
}

fn feed(
    state: &AppState,
    viewer: CurrentUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + use<>> {
    tracing::debug!(user_id = %viewer.id, admin = viewer.is_admin(), "event stream opened");
    let stream = state
        .events()
        .stream_for(viewer)
        .map(|event| Ok(to_sse(&event)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /api/events
pub async fn customer_events(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    feed(&state, user)
}

/// GET /api/admin/events
pub async fn admin_events(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    feed(&state, admin)
}
