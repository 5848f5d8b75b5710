pub mod action;
pub mod action_match;
pub mod inspection;
pub mod location;
pub mod refresh_session;
pub mod rider;
pub mod rule;
pub mod user;
