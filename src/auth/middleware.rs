use std::sync::Arc;

use poem::http::header::AUTHORIZATION;
use poem::{
    Endpoint, Middleware, Request, Result
};
use poem_grants::authorities::AttachAuthorities;
use crate::auth::AuthUser;

/// Verifies `Authorization: Bearer <jwt>` and attaches the token's
/// permissions for `poem_grants`. Requests without a token pass through and
/// are turned away by the protected handlers.
pub struct JwtMiddleware {
    secret: Arc<str>,
}

impl JwtMiddleware {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Arc::from(secret),
        }
    }
}

impl<E: Endpoint> Middleware<E> for JwtMiddleware {
    type Output = JwtMiddlewareImpl<E>;

    fn transform(&self, ep: E) -> Self::Output{
        JwtMiddlewareImpl {
            ep,
            secret: self.secret.clone(),
        }
    }
}

pub struct JwtMiddlewareImpl<E> {
    ep: E,
    secret: Arc<str>,
}

impl<E: Endpoint> Endpoint for JwtMiddlewareImpl<E> {
    type Output = E::Output;

    async fn call(&self, mut req: Request) -> Result<Self::Output> {
        if let Some(value) = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_owned)
        {
            let claims = crate::auth::jwt::decode_jwt(&value, &self.secret)?;

            req.attach(claims.permissions.clone());

            req.extensions_mut().insert(AuthUser {
                client: claims.client,
            });
        }
        self.ep.call(req).await
    }
}
