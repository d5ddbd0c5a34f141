// Remote Job Sync - Server Core
//
// Pulls remote job listings from external job boards, sanitizes their
// descriptions and keeps a Postgres table in sync. One cron trigger per
// board calls the central sync endpoint.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
