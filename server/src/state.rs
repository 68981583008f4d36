use std::sync::Arc;

use crate::{
    auth_token::AuthTokenService,
    config::{ServerConfig, TokenCarrier},
    store::PollStore,
};

/// Request-authorization knobs that handlers and middleware consult.
#[derive(Debug, Clone, Copy)]
pub struct AuthSettings {
    pub carrier: TokenCarrier,
    pub csrf_protect_reads: bool,
    pub bcrypt_cost: u32,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            carrier: TokenCarrier::Cookie,
            csrf_protect_reads: false,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl From<&ServerConfig> for AuthSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            carrier: config.auth.carrier,
            csrf_protect_reads: config.auth.csrf_protect_reads,
            bcrypt_cost: config.auth.bcrypt_cost,
        }
    }
}

/// Everything a request may touch. Built once at startup and never mutated.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PollStore>,
    pub tokens: AuthTokenService,
    pub auth: AuthSettings,
}

impl AppState {
    pub fn new(store: Arc<dyn PollStore>, tokens: AuthTokenService, auth: AuthSettings) -> Self {
        Self {
            store,
            tokens,
            auth,
        }
    }
}
