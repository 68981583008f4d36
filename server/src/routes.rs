//! Route table. Each path gets its own chain, method guard first, then the
//! session check, then the CSRF check, then the endpoint.

use actix_web::{http::Method, web};

use crate::{
    handlers::{self, endpoint},
    middleware::{allow_method, compose, mount, require_csrf, require_session, CsrfScope, Middleware},
    state::AppState,
};

/// Which guards sit in front of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Public,
    Session,
    SessionWithCsrf,
}

fn guards(state: &AppState, method: Method, access: Access) -> Vec<Middleware> {
    let mut chain = vec![allow_method(method)];
    if access != Access::Public {
        chain.push(require_session(state.tokens.clone(), state.auth.carrier));
    }
    if access == Access::SessionWithCsrf {
        chain.push(require_csrf(CsrfScope::from_protect_reads(
            state.auth.csrf_protect_reads,
        )));
    }
    chain
}

macro_rules! route {
    ($cfg:expr, $state:expr, $method:expr, $path:literal, $access:expr, $handler:path) => {
        mount(
            $cfg,
            $path,
            compose(
                endpoint($state.clone(), $handler),
                &guards(&$state, $method, $access),
            ),
        )
    };
}

pub fn configure(cfg: &mut web::ServiceConfig, state: web::Data<AppState>) {
    cfg.app_data(state.clone());

    route!(cfg, state, Method::GET, "/", Access::Public, handlers::index);
    route!(cfg, state, Method::POST, "/login", Access::Public, handlers::login);
    route!(cfg, state, Method::POST, "/signup", Access::Public, handlers::signup);
    route!(cfg, state, Method::POST, "/logout", Access::SessionWithCsrf, handlers::logout);
    route!(
        cfg,
        state,
        Method::GET,
        "/get-token-details",
        Access::Session,
        handlers::token_details
    );
    route!(cfg, state, Method::GET, "/my-polls", Access::SessionWithCsrf, handlers::my_polls);
    route!(
        cfg,
        state,
        Method::POST,
        "/create-poll",
        Access::SessionWithCsrf,
        handlers::create_poll
    );
    route!(
        cfg,
        state,
        Method::GET,
        "/poll-details",
        Access::Public,
        handlers::poll_details
    );
    route!(
        cfg,
        state,
        Method::GET,
        "/polls-i-participated-in",
        Access::SessionWithCsrf,
        handlers::polls_i_participated_in
    );
    route!(
        cfg,
        state,
        Method::GET,
        "/most-popular-polls",
        Access::Public,
        handlers::most_popular_polls
    );
    route!(
        cfg,
        state,
        Method::GET,
        "/has-voted",
        Access::SessionWithCsrf,
        handlers::has_voted
    );
    route!(
        cfg,
        state,
        Method::POST,
        "/cast-vote",
        Access::SessionWithCsrf,
        handlers::cast_vote
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth_token::AuthTokenService, state::AuthSettings, store::MemoryStore};
    use std::{sync::Arc, time::Duration};

    fn state(protect_reads: bool) -> AppState {
        let tokens = AuthTokenService::new(b"routes".to_vec(), Duration::from_secs(60)).unwrap();
        AppState::new(
            Arc::new(MemoryStore::new()),
            tokens,
            AuthSettings {
                csrf_protect_reads: protect_reads,
                ..AuthSettings::default()
            },
        )
    }

    #[test]
    fn guard_stack_depends_on_access() {
        let state = state(false);
        assert_eq!(guards(&state, Method::GET, Access::Public).len(), 1);
        assert_eq!(guards(&state, Method::GET, Access::Session).len(), 2);
        assert_eq!(guards(&state, Method::POST, Access::SessionWithCsrf).len(), 3);
    }
}
