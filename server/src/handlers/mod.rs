pub mod health;
pub mod polls;
pub mod users;
pub mod votes;

use std::future::Future;

use actix_web::{
    dev::{Payload, ServiceRequest, ServiceResponse},
    web, FromRequest, HttpRequest, HttpResponse, ResponseError,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    error::{ApiError, Result},
    middleware::{handler_fn, Handler},
    state::AppState,
};

pub use health::index;
pub use polls::{create_poll, most_popular_polls, my_polls, poll_details, polls_i_participated_in};
pub use users::{login, logout, signup, token_details};
pub use votes::{cast_vote, has_voted};

const INVALID_BODY: &str = "Invalid request body";

/// Wraps an `async fn(state, req, payload) -> Result<HttpResponse>` as the
/// terminal [`Handler`] of a chain. Errors become their JSON responses here.
pub fn endpoint<F, Fut>(state: web::Data<AppState>, f: F) -> Handler
where
    F: Fn(web::Data<AppState>, HttpRequest, Payload) -> Fut + 'static,
    Fut: Future<Output = Result<HttpResponse>> + 'static,
{
    handler_fn(move |req: ServiceRequest| {
        let (http_req, payload) = req.into_parts();
        let response = f(state.clone(), http_req.clone(), payload);
        async move {
            let response = response.await.unwrap_or_else(|err| err.error_response());
            ServiceResponse::new(http_req, response)
        }
    })
}

/// Reads the whole body as JSON, whatever the declared content type.
async fn read_json<T: DeserializeOwned>(req: &HttpRequest, payload: &mut Payload) -> Result<T> {
    let body = web::Bytes::from_request(req, payload).await.map_err(|err| {
        log::debug!("failed to read request body: {}", err);
        ApiError::Validation(INVALID_BODY.to_string())
    })?;

    serde_json::from_slice(&body).map_err(|err| {
        log::debug!("rejected request body: {}", err);
        ApiError::Validation(INVALID_BODY.to_string())
    })
}

#[derive(Debug, Default, Deserialize)]
struct PollIdQuery {
    #[serde(default)]
    pollid: String,
}

fn poll_id(req: &HttpRequest) -> Result<String> {
    let query = web::Query::<PollIdQuery>::from_query(req.query_string())
        .map(web::Query::into_inner)
        .unwrap_or_default();
    let pollid = query.pollid.trim().to_string();
    if pollid.is_empty() {
        return Err(ApiError::Validation("pollid is required".to_string()));
    }
    Ok(pollid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;

    #[::core::prelude::v1::test]
    fn poll_id_is_required() {
        let req = test::TestRequest::get().uri("/poll-details").to_http_request();
        assert!(matches!(poll_id(&req), Err(ApiError::Validation(_))));

        let req = test::TestRequest::get()
            .uri("/poll-details?pollid=")
            .to_http_request();
        assert!(matches!(poll_id(&req), Err(ApiError::Validation(_))));

        let req = test::TestRequest::get()
            .uri("/poll-details?pollid=42")
            .to_http_request();
        assert_eq!(poll_id(&req).unwrap(), "42");
    }
}
