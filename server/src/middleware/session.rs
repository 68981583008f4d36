use actix_web::{
    dev::ServiceRequest,
    http::header::{self, HeaderMap},
    HttpMessage, HttpRequest,
};
use poll_protocol::SESSION_COOKIE;

use super::chain::{from_fn, Middleware};
use crate::{
    auth_token::{now_secs, AuthTokenService, SessionClaims},
    config::TokenCarrier,
    error::{ApiError, Result},
};

/// Verified caller of the current request, placed in the request extensions
/// by [`require_session`].
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub username: String,
    pub claims: SessionClaims,
}

impl From<SessionClaims> for Identity {
    fn from(claims: SessionClaims) -> Self {
        Self {
            username: claims.username.clone(),
            claims,
        }
    }
}

impl Identity {
    /// The identity attached to `req`. Missing means the route was mounted
    /// without the session middleware, which is answered like a missing token.
    pub fn of(req: &HttpRequest) -> Result<Identity> {
        req.extensions()
            .get::<Identity>()
            .cloned()
            .ok_or(ApiError::MissingToken)
    }
}

/// Raw token as presented by the client, before any verification.
#[derive(Debug, PartialEq, Eq)]
pub enum PresentedToken {
    Missing,
    Malformed,
    Present(String),
}

pub fn extract_token(req: &HttpRequest, carrier: TokenCarrier) -> PresentedToken {
    match carrier {
        TokenCarrier::Cookie => match req.cookie(SESSION_COOKIE) {
            Some(cookie) if !cookie.value().is_empty() => {
                PresentedToken::Present(cookie.value().to_string())
            }
            _ => PresentedToken::Missing,
        },
        TokenCarrier::Header => bearer_token(req.headers()),
    }
}

fn bearer_token(headers: &HeaderMap) -> PresentedToken {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return PresentedToken::Missing;
    };
    let Ok(value) = value.to_str() else {
        return PresentedToken::Malformed;
    };
    let value = value.trim();
    if value.is_empty() {
        return PresentedToken::Missing;
    }

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            PresentedToken::Present(token.trim().to_string())
        }
        _ => PresentedToken::Malformed,
    }
}

/// Rejects requests without a valid session token (401) and attaches the
/// caller's [`Identity`] otherwise.
pub fn require_session(tokens: AuthTokenService, carrier: TokenCarrier) -> Middleware {
    from_fn(move |req: ServiceRequest, next| {
        let tokens = tokens.clone();
        async move {
            let raw = match extract_token(req.request(), carrier) {
                PresentedToken::Present(raw) => raw,
                PresentedToken::Missing => {
                    log::debug!("{} {}: no session token", req.method(), req.path());
                    return req.error_response(ApiError::MissingToken);
                }
                PresentedToken::Malformed => {
                    log::debug!("{} {}: malformed authorization header", req.method(), req.path());
                    return req.error_response(ApiError::InvalidToken);
                }
            };

            match tokens.verify(&raw, now_secs()) {
                Ok(claims) => {
                    req.extensions_mut().insert(Identity::from(claims));
                    next(req).await
                }
                Err(err) => {
                    log::info!("{} {}: rejected session token: {}", req.method(), req.path(), err);
                    req.error_response(ApiError::InvalidToken)
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::chain::{compose, handler_fn, Handler};
    use actix_web::{cookie::Cookie, http::StatusCode, test, HttpResponse};
    use std::time::Duration;

    fn tokens() -> AuthTokenService {
        AuthTokenService::new(b"session-secret".to_vec(), Duration::from_secs(3600))
            .expect("service")
    }

    fn echo_identity() -> Handler {
        handler_fn(|req: ServiceRequest| async move {
            let username = Identity::of(req.request())
                .map(|identity| identity.username)
                .unwrap_or_default();
            req.into_response(HttpResponse::Ok().body(username))
        })
    }

    #[actix_web::test]
    async fn missing_cookie_is_rejected() {
        let chain = compose(
            echo_identity(),
            &[require_session(tokens(), TokenCarrier::Cookie)],
        );

        let resp = chain(test::TestRequest::get().to_srv_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn valid_cookie_attaches_identity() {
        let token = tokens().issue_session_token("alice", now_secs()).unwrap();
        let chain = compose(
            echo_identity(),
            &[require_session(tokens(), TokenCarrier::Cookie)],
        );

        let req = test::TestRequest::get()
            .cookie(Cookie::new(SESSION_COOKIE, token))
            .to_srv_request();
        let resp = chain(req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        assert_eq!(body, "alice");
    }

    #[actix_web::test]
    async fn expired_token_is_rejected() {
        let token = tokens()
            .issue_session_token("alice", now_secs() - 7200)
            .unwrap();
        let chain = compose(
            echo_identity(),
            &[require_session(tokens(), TokenCarrier::Cookie)],
        );

        let req = test::TestRequest::get()
            .cookie(Cookie::new(SESSION_COOKIE, token))
            .to_srv_request();
        assert_eq!(chain(req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn header_carrier_reads_bearer_token() {
        let token = tokens().issue_session_token("bob", now_secs()).unwrap();
        let chain = compose(
            echo_identity(),
            &[require_session(tokens(), TokenCarrier::Header)],
        );

        let req = test::TestRequest::get()
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_srv_request();
        let resp = chain(req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, "bob");
    }

    #[actix_web::test]
    async fn header_carrier_ignores_cookie() {
        let token = tokens().issue_session_token("bob", now_secs()).unwrap();
        let chain = compose(
            echo_identity(),
            &[require_session(tokens(), TokenCarrier::Header)],
        );

        let req = test::TestRequest::get()
            .cookie(Cookie::new(SESSION_COOKIE, token))
            .to_srv_request();
        assert_eq!(chain(req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[::core::prelude::v1::test]
    fn bearer_parsing() {
        let req = test::TestRequest::default().to_http_request();
        assert_eq!(bearer_token(req.headers()), PresentedToken::Missing);

        let req = test::TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwdw=="))
            .to_http_request();
        assert_eq!(bearer_token(req.headers()), PresentedToken::Malformed);

        let req = test::TestRequest::default()
            .insert_header((header::AUTHORIZATION, "bearer abc.def.ghi"))
            .to_http_request();
        assert_eq!(
            bearer_token(req.headers()),
            PresentedToken::Present("abc.def.ghi".to_string())
        );
    }
}
