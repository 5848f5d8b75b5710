use std::sync::Arc;

use crate::controllers::inspection;
use crate::ServiceState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, put},
};

pub fn add_routers(
    router: axum::Router<Arc<ServiceState>>,
    max_upload_bytes: usize,
) -> axum::Router<Arc<ServiceState>> {
    router
        .route(
            "/inspections",
            get(inspection::list)
                .post(inspection::create)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/inspections/search", get(inspection::search))
        .route(
            "/inspections/:id",
            put(inspection::update)
                .delete(inspection::delete)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}
