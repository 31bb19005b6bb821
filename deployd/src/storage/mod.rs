//! Configuration storage

pub mod layout;
pub mod services;
pub mod settings;
