use std::sync::Arc;

use crate::controllers::{action, action_center, rule};
use crate::ServiceState;
use axum::routing::{delete, get, post, put};

pub fn add_routers(router: axum::Router<Arc<ServiceState>>) -> axum::Router<Arc<ServiceState>> {
    let router = router
        .route("/actions", get(action::list).post(action::create))
        .route("/actions/:id", delete(action::delete))
        .route(
            "/actions/matches",
            get(action_center::matches).delete(action_center::delete_matches),
        )
        .route("/actions/confirm", post(action_center::confirm))
        .route("/actions/unconfirm", post(action_center::unconfirm))
        .route("/actions/assign", post(action_center::assign));

    ["/rules", "/inspection-rules"]
        .into_iter()
        .fold(router, |router, base| {
            router
                .route(base, get(rule::list).post(rule::create))
                .route(&format!("{base}/:id"), put(rule::update).delete(rule::delete))
        })
}
