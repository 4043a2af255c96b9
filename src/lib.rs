pub mod collector;
pub mod config;
pub mod metrics;
pub mod report;
pub mod server;
