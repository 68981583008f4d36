#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use actix_web::{cookie::Cookie, test, web};
use poll_protocol::{CSRF_COOKIE, CSRF_HEADER, SESSION_COOKIE};
use poll_server::{
    auth_token::{now_secs, AuthTokenService},
    config::{TokenCarrier, BCRYPT_MIN_COST},
    routes,
    state::{AppState, AuthSettings},
    store::MemoryStore,
};

pub const SECRET: &[u8] = b"integration-test-passphrase";
pub const CSRF: &str = "test-csrf-token";

pub fn tokens() -> AuthTokenService {
    AuthTokenService::new(SECRET.to_vec(), Duration::from_secs(3600)).expect("token service")
}

pub fn settings(carrier: TokenCarrier) -> AuthSettings {
    AuthSettings {
        carrier,
        csrf_protect_reads: false,
        bcrypt_cost: BCRYPT_MIN_COST,
    }
}

pub fn state(store: &MemoryStore, auth: AuthSettings) -> web::Data<AppState> {
    web::Data::new(AppState::new(Arc::new(store.clone()), tokens(), auth))
}

/// Route table over `store`, for `App::new().configure(..)`.
pub fn configure(store: &MemoryStore, auth: AuthSettings) -> impl FnOnce(&mut web::ServiceConfig) {
    let state = state(store, auth);
    move |cfg| routes::configure(cfg, state)
}

pub fn session_token(username: &str) -> String {
    tokens()
        .issue_session_token(username, now_secs())
        .expect("session token")
}

/// A request carrying a valid session cookie plus a matching CSRF pair.
pub fn authed(req: test::TestRequest, username: &str) -> test::TestRequest {
    req.cookie(Cookie::new(SESSION_COOKIE, session_token(username)))
        .cookie(Cookie::new(CSRF_COOKIE, CSRF))
        .insert_header((CSRF_HEADER, CSRF))
}
