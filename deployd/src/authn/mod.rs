//! GitHub App authentication

pub mod app_jwt;
pub mod token_mngr;
