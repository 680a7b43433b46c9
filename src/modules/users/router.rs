use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use super::controller::{
    change_password, create_user, delete_user, get_user_by_id, get_users, update_user,
};

pub fn init_users_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user).get(get_users))
        .route("/change-password", post(change_password))
        .route("/{id}", get(get_user_by_id).delete(delete_user))
        .route("/{id}", put(update_user))
}
