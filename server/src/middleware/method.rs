use actix_web::{dev::ServiceRequest, http::Method};

use super::chain::{from_fn, Middleware};
use crate::error::ApiError;

/// Answers 405 for any verb other than `method`. Goes first in every chain so
/// a wrong verb never reaches authentication.
pub fn allow_method(method: Method) -> Middleware {
    from_fn(move |req: ServiceRequest, next| {
        let allowed = req.method() == method;
        async move {
            if !allowed {
                return req.error_response(ApiError::MethodNotAllowed);
            }
            next(req).await
        }
    })
}
