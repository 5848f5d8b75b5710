pub mod bootstrap;
pub mod cookie;
pub mod current_user;
pub mod jwt;
pub mod mail;
pub mod password;
pub mod upload;
