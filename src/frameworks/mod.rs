pub mod client;
pub mod config;
pub mod runtime;
pub mod server;
