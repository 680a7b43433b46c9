use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::get_audit_entries;

pub fn init_audit_router() -> Router<AppState> {
    Router::new().route("/", get(get_audit_entries))
}
