pub mod auth;
pub mod dashboard;
pub mod expense;
pub mod sale;
pub mod supplier;
pub mod user;
