use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{create_session, get_records, get_sessions, record_attendance};

pub fn init_attendance_router() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(create_session).get(get_sessions))
        .route(
            "/sessions/{id}/records",
            post(record_attendance).get(get_records),
        )
}
