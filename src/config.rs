use std::collections::HashSet;
use std::path::PathBuf;

use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "txt", "pdf", "png", "jpg", "jpeg", "gif", "bmp", "svg", "webp", "ico",
    "mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "3gp", "mpg", "mpeg",
    "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "odp",
    "zip", "rar", "7z", "tar", "gz", "bz2", "xz",
    "mp3", "wav", "flac", "aac", "ogg", "wma", "m4a",
    "html", "htm", "css", "js", "json", "xml", "csv",
    "py", "java", "cpp", "c", "cs", "php", "rb", "go",
    "md", "rtf", "log", "ini", "cfg", "conf", "yml", "yaml",
];

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024 * 1024;

/// Server-wide settings, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub host: String,
    pub port: u16,
    pub fallback_port: u16,
    pub password_digest: String,
    pub jwt_secret: String,
    pub token_hours: i64,
    pub allowed_extensions: HashSet<String>,
    pub max_upload_bytes: u64,
}

impl Config {
    pub fn new(root: impl Into<PathBuf>, password: &str, jwt_secret: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            fallback_port: 3000,
            password_digest: digest_password(password),
            jwt_secret: jwt_secret.into(),
            token_hours: 24,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn verify_password(&self, candidate: &str) -> bool {
        digest_password(candidate) == self.password_digest
    }
}

/// Random signing secret for a run without a configured one: tokens then
/// only live until the process restarts.
pub fn ephemeral_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn digest_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}
