pub mod api;
pub mod api_error;
pub mod db;
pub mod request;
pub mod session_store;
