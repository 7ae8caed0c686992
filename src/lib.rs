// Library exports for VibeCheck
// Integration tests drive the router and the client through these modules

pub mod analytics;
pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod state;
