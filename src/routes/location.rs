use std::sync::Arc;

use crate::controllers::location;
use crate::ServiceState;
use axum::routing::get;

pub fn add_routers(router: axum::Router<Arc<ServiceState>>) -> axum::Router<Arc<ServiceState>> {
    router
        .route(
            "/api/locations",
            get(location::history).post(location::record),
        )
        .route("/api/last-locations", get(location::last_locations))
}
