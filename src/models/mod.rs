pub mod expense;
pub mod sale;
pub mod setting;
pub mod supplier;
pub mod user;
