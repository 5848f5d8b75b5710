pub mod client;
pub mod config;
pub mod controllers;
pub mod dto;
pub mod entity;
pub mod error;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use crate::{client::db::DatabaseClient, config::ServiceConfig};

#[derive(Clone)]
pub struct ServiceState {
    pub config: Arc<ServiceConfig>,
    pub db: Arc<DatabaseClient>,
}
