pub mod auth;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod store;
pub mod sync;
pub mod terminal;
pub mod tracking;
