//! Deployment module

pub mod channel;
pub mod dispatcher;
pub mod executor;
pub mod fsm;
pub mod git;
pub mod reporter;
pub mod steps;
