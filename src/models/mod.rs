pub mod activity;
pub mod admin;
