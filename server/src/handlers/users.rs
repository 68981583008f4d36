use actix_web::{
    cookie::{Cookie, SameSite},
    dev::Payload,
    web, HttpRequest, HttpResponse,
};
use poll_protocol::{Credentials, LoginResponse, MessageResponse, CSRF_COOKIE, SESSION_COOKIE};

use super::read_json;
use crate::{
    auth_token::now_secs,
    config::TokenCarrier,
    csrf,
    error::{ApiError, Result},
    middleware::Identity,
    state::AppState,
    store::{decode_rows, StoreError},
};

const USERS_TABLE: &str = "usercreds";
const USERNAME_TAKEN: &str = "Username already taken";

/// Cookie attributes shared by issue and removal so browsers match them up.
fn auth_cookie(name: &'static str, value: String, http_only: bool) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(http_only)
        .secure(true)
        .same_site(SameSite::None)
        .finish()
}

fn removal_cookie(name: &'static str, http_only: bool) -> Cookie<'static> {
    let mut cookie = auth_cookie(name, String::new(), http_only);
    cookie.make_removal();
    cookie
}

fn require_credentials(creds: &Credentials) -> Result<()> {
    if creds.username.trim().is_empty() || creds.password.is_empty() {
        return Err(ApiError::Validation(
            "Username and password are required".to_string(),
        ));
    }
    Ok(())
}

async fn find_user(state: &AppState, username: &str) -> Result<Option<Credentials>> {
    let rows = state
        .store
        .select_eq(USERS_TABLE, "username,password", &[("username", username)])
        .await?;
    Ok(decode_rows::<Credentials>(rows)?.into_iter().next())
}

pub async fn login(
    state: web::Data<AppState>,
    req: HttpRequest,
    mut payload: Payload,
) -> Result<HttpResponse> {
    let creds: Credentials = read_json(&req, &mut payload).await?;
    require_credentials(&creds)?;

    let Some(stored) = find_user(&state, &creds.username).await? else {
        log::warn!("Failed login attempt for unknown user: {}", creds.username);
        return Err(ApiError::InvalidCredentials);
    };

    let password = creds.password.clone();
    let hash = stored.password;
    let matches = web::block(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|err| ApiError::Internal(format!("password check did not complete: {err}")))??;
    if !matches {
        log::warn!("Failed login attempt for user: {}", creds.username);
        return Err(ApiError::InvalidCredentials);
    }

    let token = state
        .tokens
        .issue_session_token(&creds.username, now_secs())?;
    let csrf_token = csrf::generate()?;

    log::info!("Successful login for user: {}", creds.username);

    let mut response = HttpResponse::Ok();
    response.cookie(auth_cookie(CSRF_COOKIE, csrf_token, false));

    let body = match state.auth.carrier {
        TokenCarrier::Cookie => {
            response.cookie(auth_cookie(SESSION_COOKIE, token, true));
            LoginResponse {
                message: "Logged in successfully".to_string(),
                username: creds.username,
                token: None,
            }
        }
        TokenCarrier::Header => LoginResponse {
            message: "Logged in successfully".to_string(),
            username: creds.username,
            token: Some(token),
        },
    };

    Ok(response.json(body))
}

pub async fn signup(
    state: web::Data<AppState>,
    req: HttpRequest,
    mut payload: Payload,
) -> Result<HttpResponse> {
    let creds: Credentials = read_json(&req, &mut payload).await?;
    require_credentials(&creds)?;

    if find_user(&state, &creds.username).await?.is_some() {
        return Err(ApiError::Conflict(USERNAME_TAKEN.to_string()));
    }

    let cost = state.auth.bcrypt_cost;
    let password = creds.password;
    let hash = web::block(move || bcrypt::hash(password, cost))
        .await
        .map_err(|err| ApiError::Internal(format!("password hashing did not complete: {err}")))??;

    let record = serde_json::to_value(Credentials::new(creds.username.clone(), hash))?;
    match state.store.insert(USERS_TABLE, record).await {
        Ok(()) => {}
        // Lost a race with a concurrent signup for the same name.
        Err(StoreError::Conflict(_)) => return Err(ApiError::Conflict(USERNAME_TAKEN.to_string())),
        Err(err) => return Err(err.into()),
    }

    log::info!("New account created: {}", creds.username);

    Ok(HttpResponse::Ok().json(MessageResponse::new("Signed up successfully")))
}

pub async fn logout(
    _state: web::Data<AppState>,
    req: HttpRequest,
    _payload: Payload,
) -> Result<HttpResponse> {
    let identity = Identity::of(&req)?;
    log::info!("Logout for user: {}", identity.username);

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie(SESSION_COOKIE, true))
        .cookie(removal_cookie(CSRF_COOKIE, false))
        .json(MessageResponse::new("Logged out successfully")))
}

/// Echoes the verified claim set of the caller's session token.
pub async fn token_details(
    _state: web::Data<AppState>,
    req: HttpRequest,
    _payload: Payload,
) -> Result<HttpResponse> {
    let identity = Identity::of(&req)?;
    Ok(HttpResponse::Ok().json(identity.claims.to_value()))
}
