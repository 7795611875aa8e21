pub mod config;
pub mod credentials;
pub mod documents;
pub mod error;
pub mod server;
pub mod session;
