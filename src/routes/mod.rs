pub mod admin;
pub mod auth;
pub mod health;
pub mod messages;
pub mod staff;
pub mod student;
