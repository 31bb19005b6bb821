//! Server state

use std::sync::Arc;

use secrecy::SecretString;

use crate::authn::token_mngr::InstallationTokenProvider;
use crate::deploy::dispatcher::Dispatcher;
use crate::deploy::reporter::StatusReporterFactory;
use crate::models::deployment::Endpoints;
use crate::storage::services::ServiceConfig;

/// Server state shared across handlers
pub struct ServerState {
    /// Verifies `X-Hub-Signature-256` when set
    pub webhook_secret: Option<SecretString>,
    pub services: Vec<ServiceConfig>,
    /// Handed to workers for status reports and fetches
    pub endpoints: Endpoints,
    pub token_provider: Arc<dyn InstallationTokenProvider>,
    pub reporters: Arc<dyn StatusReporterFactory>,
    pub dispatcher: Arc<Dispatcher>,
}
