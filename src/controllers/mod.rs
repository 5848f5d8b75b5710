pub mod action;
pub mod action_center;
pub mod auth;
pub mod inspection;
pub mod location;
pub mod rider;
pub mod rule;
pub mod user;
