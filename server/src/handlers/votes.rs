use actix_web::{dev::Payload, web, HttpRequest, HttpResponse};
use poll_protocol::{HasVotedResponse, MessageResponse, Vote};

use super::{poll_id, read_json};
use crate::{
    error::{ApiError, Result},
    middleware::Identity,
    state::AppState,
    store::{decode_rows, StoreError},
};

const VOTES_TABLE: &str = "votes";

pub async fn cast_vote(
    state: web::Data<AppState>,
    req: HttpRequest,
    mut payload: Payload,
) -> Result<HttpResponse> {
    let identity = Identity::of(&req)?;
    let mut vote: Vote = read_json(&req, &mut payload).await?;
    vote.votername = identity.username;

    match state
        .store
        .insert(VOTES_TABLE, serde_json::to_value(&vote)?)
        .await
    {
        Ok(()) => {}
        Err(StoreError::Conflict(_)) => {
            return Err(ApiError::Conflict(
                "You have already voted in this poll".to_string(),
            ))
        }
        Err(err) => return Err(err.into()),
    }

    log::debug!(
        "{} voted for option {} in poll {}",
        vote.votername,
        vote.optionid,
        vote.pollid
    );

    Ok(HttpResponse::Ok().json(MessageResponse::new("Vote cast successfully")))
}

/// Whether the caller has a ballot in `?pollid=`, and which option it chose.
pub async fn has_voted(
    state: web::Data<AppState>,
    req: HttpRequest,
    _payload: Payload,
) -> Result<HttpResponse> {
    let identity = Identity::of(&req)?;
    let pollid = poll_id(&req)?;

    let rows = state
        .store
        .select_eq(
            VOTES_TABLE,
            "*",
            &[
                ("pollid", pollid.as_str()),
                ("votername", identity.username.as_str()),
            ],
        )
        .await?;

    let response = decode_rows::<Vote>(rows)?
        .first()
        .map(HasVotedResponse::from_vote)
        .unwrap_or_else(HasVotedResponse::not_voted);

    Ok(HttpResponse::Ok().json(response))
}
