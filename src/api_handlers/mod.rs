pub mod file_handlers;
pub mod session_handlers;
use std::sync::Arc;
use poem::{get, post, Endpoint, EndpointExt, Request, Route, http::StatusCode, Result};
use poem::middleware::Tracing;
use crate::auth::AuthUser;
use crate::auth::middleware::JwtMiddleware;
use crate::config::Config;
use crate::storage::{DirectoryIndex, FileStore};

fn extract_user(req: &Request) -> Result<AuthUser> {
    req.extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or(StatusCode::UNAUTHORIZED.into())
}

// X-Forwarded-For wins over the socket address.
fn client_address(req: &Request) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| req.remote_addr().to_string())
}

fn log_access(req: &Request, action: &str, filename: Option<&str>) {
    let session = extract_user(req)
        .map(|user| user.client)
        .unwrap_or_else(|_| "-".to_string());
    match filename {
        Some(name) => tracing::info!(
            action,
            client = %client_address(req),
            session = %session,
            file = name,
            "access"
        ),
        None => tracing::info!(
            action,
            client = %client_address(req),
            session = %session,
            "access"
        ),
    }
}

/// Builds the HTTP surface over one shared root.
pub fn routes(config: Arc<Config>) -> impl Endpoint {
    let index = Arc::new(DirectoryIndex::new(&config));
    let store = Arc::new(FileStore::new(&config));

    Route::new()
        .at("/login", post(session_handlers::login))
        .at("/logout", post(session_handlers::logout))
        .at("/api/files", get(file_handlers::list_files))
        .at("/upload", post(file_handlers::upload_files))
        .at("/download/:filename", get(file_handlers::download_file))
        .at("/preview/:filename", get(file_handlers::preview_file))
        .at("/delete/:filename", post(file_handlers::delete_file))
        .at("/rename/:filename", post(file_handlers::rename_file))
        .with(JwtMiddleware::new(&config.jwt_secret))
        .with(Tracing)
        .data(index)
        .data(store)
        .data(config)
}
