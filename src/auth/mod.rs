pub mod jwt;
pub mod middleware;

pub const USER_PERMISSION: &str = "user";

/// Identity attached to a request once its bearer token has been verified.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub client: String,
}
