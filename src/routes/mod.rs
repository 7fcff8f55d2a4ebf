pub mod admin;
pub mod attempt;
pub mod auth;
pub mod health;
pub mod profile;
pub mod quiz;
