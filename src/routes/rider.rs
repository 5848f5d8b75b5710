use std::sync::Arc;

use crate::controllers::rider;
use crate::ServiceState;
use axum::routing::{get, put};

pub fn add_routers(router: axum::Router<Arc<ServiceState>>) -> axum::Router<Arc<ServiceState>> {
    router
        .route("/riders", get(rider::list).post(rider::create))
        .route("/riders/:rider_id", put(rider::update).delete(rider::delete))
}
