use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use super::controller::{
    create_guardian, delete_guardian, get_guardian_by_id, get_guardians, update_guardian,
};

pub fn init_guardians_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_guardian).get(get_guardians))
        .route("/{id}", get(get_guardian_by_id).delete(delete_guardian))
        .route("/{id}", put(update_guardian))
}
