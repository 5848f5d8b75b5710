use std::sync::Arc;

use crate::controllers::user;
use crate::ServiceState;
use axum::routing::{get, put};

pub fn add_routers(router: axum::Router<Arc<ServiceState>>) -> axum::Router<Arc<ServiceState>> {
    router.route("/users", get(user::list)).route(
        "/users/by-username/:username",
        put(user::update).delete(user::delete),
    )
}
