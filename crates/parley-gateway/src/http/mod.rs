pub mod admin;
pub mod bot;
pub mod error;
pub mod extract;
pub mod health;
