pub mod backend;
pub mod client;
pub mod models;
pub mod query;
pub mod realtime;
