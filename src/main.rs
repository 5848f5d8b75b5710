use rider_inspection::{
    client::db::{DatabaseClient, DatabaseClientExt},
    config::{tracing::subscribe_tracing, ServiceConfig},
    routes::create_router,
    utils::bootstrap,
    ServiceState,
};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), String> {
    subscribe_tracing();

    let mut service_config = ServiceConfig::default();
    service_config.init_from_env()?;

    let db_client = DatabaseClient::build_from_config(&service_config)
        .await
        .map_err(|e| {
            error!("💥 Error in database connection: {}", e);
            "Failed to build database client"
        })?;

    db_client.init_schema().await.map_err(|e| {
        error!("💥 Failed to prepare the schema: {}", e);
        "Failed to prepare the database schema"
    })?;

    bootstrap::ensure_admin(&db_client, &service_config)
        .await
        .map_err(|e| {
            error!("💥 Failed to create the bootstrap admin: {}", e);
            "Failed to create the bootstrap admin"
        })?;

    tokio::fs::create_dir_all(&service_config.upload.dir)
        .await
        .map_err(|e| {
            error!("💥 Failed to create upload dir: {}", e);
            "Failed to create the upload directory"
        })?;

    let service_state = Arc::new(ServiceState {
        config: Arc::new(service_config.clone()),
        db: Arc::new(db_client),
    });

    let listener_addr = service_config.server.get_socket_addr().map_err(|e| {
        error!("💥 Failed to get socket address: {}", e);
        "Invalid socket address"
    })?;
    let tcp_listener = tokio::net::TcpListener::bind(listener_addr)
        .await
        .map_err(|e| {
            error!("💥 Failed to bind TCP listener: {}", e);
            "Failed to bind TCP listener"
        })?;

    let addr = tcp_listener.local_addr().map_err(|e| {
        error!("💥 Failed to get addr of the listener: {}", e);
        "Failed to get local listener address"
    })?;

    info!("🚀 The server is listening on: {}", addr);

    let router = create_router(service_state);
    axum::serve(tcp_listener, router).await.map_err(|e| {
        error!("💥 Server error: {}", e);
        "Server error occurred"
    })?;

    Ok(())
}
