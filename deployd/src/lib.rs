//! deployd library
//!
//! Turns GitHub deployment events into checkouts and deploy step runs on
//! this host, with automatic rollback when a step fails.

pub mod app;
pub mod authn;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod server;
pub mod storage;
pub mod utils;
pub mod workers;
