use actix_web::{dev::Payload, web, HttpRequest, HttpResponse};
use poll_protocol::{MessageResponse, Poll, PollDetailsResponse};
use serde_json::json;

use super::{poll_id, read_json};
use crate::{
    error::{ApiError, Result},
    middleware::Identity,
    state::AppState,
    store::{decode_rows, expect_array},
};

const POLLS_TABLE: &str = "polls";

/// Runs a stored procedure whose result is a JSON array and returns it as is.
async fn procedure_listing(state: &AppState, function: &str, args: serde_json::Value) -> Result<HttpResponse> {
    let rows = expect_array(state.store.rpc(function, args).await?)?;
    Ok(HttpResponse::Ok().json(rows))
}

pub async fn my_polls(
    state: web::Data<AppState>,
    req: HttpRequest,
    _payload: Payload,
) -> Result<HttpResponse> {
    let identity = Identity::of(&req)?;
    procedure_listing(&state, "pollsICreated", json!({ "uname": identity.username })).await
}

pub async fn polls_i_participated_in(
    state: web::Data<AppState>,
    req: HttpRequest,
    _payload: Payload,
) -> Result<HttpResponse> {
    let identity = Identity::of(&req)?;
    procedure_listing(
        &state,
        "getPollsIParticipatedIn",
        json!({ "uname": identity.username }),
    )
    .await
}

pub async fn most_popular_polls(
    state: web::Data<AppState>,
    _req: HttpRequest,
    _payload: Payload,
) -> Result<HttpResponse> {
    procedure_listing(&state, "mostPopularPolls", json!({})).await
}

pub async fn create_poll(
    state: web::Data<AppState>,
    req: HttpRequest,
    mut payload: Payload,
) -> Result<HttpResponse> {
    let identity = Identity::of(&req)?;
    let mut poll: Poll = read_json(&req, &mut payload).await?;

    if poll.title.trim().is_empty() || poll.options.is_empty() {
        return Err(ApiError::Validation(
            "A poll needs a title and at least one option".to_string(),
        ));
    }

    // Ownership comes from the session; ids are assigned by the store.
    poll.created_by = identity.username;
    poll.id = None;

    state
        .store
        .insert(POLLS_TABLE, serde_json::to_value(&poll)?)
        .await?;

    log::info!("Poll '{}' created by {}", poll.title, poll.created_by);

    Ok(HttpResponse::Ok().json(MessageResponse::new("Poll created successfully")))
}

pub async fn poll_details(
    state: web::Data<AppState>,
    req: HttpRequest,
    _payload: Payload,
) -> Result<HttpResponse> {
    let pollid = poll_id(&req)?;

    let rows = state
        .store
        .select_eq(POLLS_TABLE, "*", &[("id", pollid.as_str())])
        .await?;
    let poll = decode_rows::<Poll>(rows)?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound("Poll not found".to_string()))?;

    let option_votes = expect_array(
        state
            .store
            .rpc("polloptioncounts", json!({ "pid": pollid }))
            .await?,
    )?;

    Ok(HttpResponse::Ok().json(PollDetailsResponse { poll, option_votes }))
}
