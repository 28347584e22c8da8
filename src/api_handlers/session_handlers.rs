use std::sync::Arc;
use poem::{handler, Error, IntoResponse, Request};
use poem::http::StatusCode;
use poem::web::{Data, Json};
use serde::Deserialize;
use crate::api_handlers::{client_address, log_access};
use crate::auth::USER_PERMISSION;
use crate::auth::jwt::{create_jwt, Claims};
use crate::config::Config;

#[derive(Deserialize)]
pub struct LoginInfo {
    #[serde(default)]
    password: String,
}

// Exchanges the shared password for a bearer token carrying the "user"
// permission. Wrong or missing passwords get 401.
#[handler]
pub async fn login(
    req: &Request,
    Json(payload): Json<LoginInfo>,
    config: Data<&Arc<Config>>,
) -> poem::Result<impl IntoResponse> {
    if payload.password.is_empty() || !config.verify_password(&payload.password) {
        log_access(req, "LOGIN_FAILED", None);
        return Err(Error::from_string("Invalid password", StatusCode::UNAUTHORIZED));
    }

    let claims = Claims::new(
        client_address(req),
        vec![USER_PERMISSION.to_string()],
        config.token_hours,
    )
    .ok_or_else(|| Error::from_string("Invalid token lifetime", StatusCode::INTERNAL_SERVER_ERROR))?;
    let jwt = create_jwt(&claims, &config.jwt_secret)
        .map_err(|e| Error::from_string(e.to_string(), StatusCode::INTERNAL_SERVER_ERROR))?;

    log_access(req, "LOGIN_SUCCESS", None);
    Ok(Json(serde_json::json!({ "token": jwt })))
}

// Tokens are stateless, so logging out only records the event; the client
// drops its token.
#[poem_grants::protect("user")]
#[handler]
pub async fn logout(req: &Request) -> poem::Result<StatusCode> {
    log_access(req, "LOGOUT", None);
    Ok(StatusCode::OK)
}
