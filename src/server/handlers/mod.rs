pub mod admin;
pub mod aois;
pub mod auth;
pub mod health;
pub mod lookups;
pub mod observations;
pub mod photos;
pub mod uploads;
pub mod users;
pub mod zones;
