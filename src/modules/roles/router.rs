use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use super::controller::{
    create_role, delete_role, get_permissions, get_role_by_id, get_role_by_name, get_roles,
    update_role,
};

pub fn init_roles_router() -> Router<AppState> {
    Router::new()
        // Permission catalogue
        .route("/permissions", get(get_permissions))
        // Role endpoints
        .route("/", post(create_role).get(get_roles))
        .route("/by-name/{name}", get(get_role_by_name))
        .route("/{id}", get(get_role_by_id).delete(delete_role))
        .route("/{id}", put(update_role))
}
