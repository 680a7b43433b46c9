use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{forgot_password, login, logout, me, reset_password};

pub fn init_auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/me", get(me))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}
