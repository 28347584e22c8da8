use chrono::{Duration, Utc};
use jsonwebtoken::{self, DecodingKey, EncodingKey, Header, Validation};
use poem_grants::error::AccessError::UnauthorizedRequest;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub client: String,
    pub permissions: Vec<String>,
    pub exp: i64,
}

impl Claims {
    /// `None` when `valid_hours` pushes the expiry past what a timestamp can hold.
    pub fn new(client: String, permissions: Vec<String>, valid_hours: i64) -> Option<Self> {
        let expires = Utc::now().checked_add_signed(Duration::try_hours(valid_hours)?)?;
        Some(Self {
            client,
            permissions,
            exp: expires.timestamp(),
        })
    }
}

pub fn create_jwt(claims: &Claims, secret: &str) -> poem::Result<String> {
    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    jsonwebtoken::encode(&Header::default(), claims, &encoding_key).map_err(|err| {
        tracing::error!("Could not sign session token: {}", err);
        UnauthorizedRequest.into()
    })
}

pub fn decode_jwt(token: &str, secret: &str) -> poem::Result<Claims> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    match jsonwebtoken::decode::<Claims>(token, &decoding_key, &Validation::default()) {
        Ok(token_data) => Ok(token_data.claims),
        Err(err) => {
            tracing::debug!("Rejected session token: {}", err);
            Err(UnauthorizedRequest.into())
        }
    }
}
