//! GitHub payload models
//!
//! Only the fields deployd reads or writes are modelled; everything else in
//! the upstream payloads is ignored on deserialization.

pub mod models;

pub use models::*;
