pub mod auth;
pub mod data;
pub mod plans;
pub mod server;
