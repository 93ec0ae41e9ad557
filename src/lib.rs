pub mod config;
pub mod database;
pub mod error;
pub mod extract;
pub mod feed;
pub mod search;
pub mod server;
