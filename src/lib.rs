pub mod audit;
pub mod auth;
pub mod backend;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod navbar;
pub mod profile;
pub mod templates_structs;
