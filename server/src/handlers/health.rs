use actix_web::{dev::Payload, web, HttpRequest, HttpResponse};
use poll_protocol::MessageResponse;

use crate::{error::Result, state::AppState};

/// Liveness probe. Public, no store access.
pub async fn index(
    _state: web::Data<AppState>,
    _req: HttpRequest,
    _payload: Payload,
) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(MessageResponse::new("All Good!")))
}
