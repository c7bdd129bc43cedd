pub mod admin;
pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod export;
pub mod serializers;
pub mod server;
pub mod services;
