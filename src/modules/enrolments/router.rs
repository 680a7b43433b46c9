use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

use super::controller::{enrol, get_enrolments, unenrol};

pub fn init_enrolments_router() -> Router<AppState> {
    Router::new()
        .route("/", post(enrol).get(get_enrolments))
        .route("/{id}", delete(unenrol))
}
