pub mod auth;
pub mod classify;
pub mod notify;
pub mod progress;
pub mod services;
