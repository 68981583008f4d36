use actix_web::{dev::ServiceRequest, http::Method};
use poll_protocol::{CSRF_COOKIE, CSRF_HEADER};

use super::chain::{from_fn, Middleware};
use crate::{csrf, error::ApiError};

/// Which requests on a protected route must carry a matching CSRF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrfScope {
    /// Only state-changing methods (anything but GET, HEAD, OPTIONS, TRACE).
    MutatingOnly,
    /// Every request, reads included.
    AllMethods,
}

impl CsrfScope {
    pub fn from_protect_reads(protect_reads: bool) -> Self {
        if protect_reads {
            Self::AllMethods
        } else {
            Self::MutatingOnly
        }
    }

    pub fn applies_to(self, method: &Method) -> bool {
        match self {
            Self::AllMethods => true,
            Self::MutatingOnly => ![Method::GET, Method::HEAD, Method::OPTIONS, Method::TRACE]
                .contains(method),
        }
    }
}

/// Double-submit check: `X-CSRF-Token` must equal the `csrf_token` cookie,
/// otherwise 403 and the rest of the chain never runs.
pub fn require_csrf(scope: CsrfScope) -> Middleware {
    from_fn(move |req: ServiceRequest, next| async move {
        if !scope.applies_to(req.method()) {
            return next(req).await;
        }

        let cookie = req
            .cookie(CSRF_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .unwrap_or_default();
        let header = req
            .headers()
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !csrf::verify(&header, &cookie) {
            log::warn!("{} {}: CSRF token mismatch", req.method(), req.path());
            return req.error_response(ApiError::CsrfMismatch);
        }

        next(req).await
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::chain::{compose, handler_fn, Handler};
    use actix_web::{cookie::Cookie, http::StatusCode, test, HttpResponse};

    fn ok() -> Handler {
        handler_fn(|req: ServiceRequest| async move { req.into_response(HttpResponse::Ok().finish()) })
    }

    #[actix_web::test]
    async fn matching_header_and_cookie_pass() {
        let chain = compose(ok(), &[require_csrf(CsrfScope::MutatingOnly)]);
        let req = test::TestRequest::post()
            .cookie(Cookie::new(CSRF_COOKIE, "tok"))
            .insert_header((CSRF_HEADER, "tok"))
            .to_srv_request();

        assert_eq!(chain(req).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn mismatch_is_forbidden() {
        let chain = compose(ok(), &[require_csrf(CsrfScope::MutatingOnly)]);
        let req = test::TestRequest::post()
            .cookie(Cookie::new(CSRF_COOKIE, "tok"))
            .insert_header((CSRF_HEADER, "other"))
            .to_srv_request();

        assert_eq!(chain(req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn missing_header_or_cookie_is_forbidden() {
        let chain = compose(ok(), &[require_csrf(CsrfScope::MutatingOnly)]);

        let no_header = test::TestRequest::post()
            .cookie(Cookie::new(CSRF_COOKIE, "tok"))
            .to_srv_request();
        assert_eq!(chain(no_header).await.status(), StatusCode::FORBIDDEN);

        let no_cookie = test::TestRequest::post()
            .insert_header((CSRF_HEADER, "tok"))
            .to_srv_request();
        assert_eq!(chain(no_cookie).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn reads_pass_unless_protected() {
        let relaxed = compose(ok(), &[require_csrf(CsrfScope::MutatingOnly)]);
        let strict = compose(ok(), &[require_csrf(CsrfScope::AllMethods)]);

        let req = test::TestRequest::get().to_srv_request();
        assert_eq!(relaxed(req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get().to_srv_request();
        assert_eq!(strict(req).await.status(), StatusCode::FORBIDDEN);
    }

    #[::core::prelude::v1::test]
    fn scope_classifies_methods() {
        let scope = CsrfScope::from_protect_reads(false);
        assert!(!scope.applies_to(&Method::GET));
        assert!(!scope.applies_to(&Method::HEAD));
        assert!(scope.applies_to(&Method::POST));
        assert!(scope.applies_to(&Method::DELETE));
        assert!(CsrfScope::from_protect_reads(true).applies_to(&Method::GET));
    }
}
