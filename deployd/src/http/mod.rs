//! GitHub REST API client

pub mod client;
pub mod deployments;
pub mod installations;
