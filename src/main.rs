mod api_handlers;
mod auth;
mod config;
mod error;
mod logging;
mod models;
mod storage;

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use poem::{listener::TcpListener, Server};

use crate::config::{Config, ephemeral_secret};

#[derive(Parser, Debug)]
#[command(name = "wdrive", version, about = "Share a folder with every device on your local network")]
struct Args {
    /// Folder to share; created if missing
    #[arg(long, default_value = "shared")]
    root: PathBuf,

    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Port tried when binding `port` is not permitted
    #[arg(long, default_value_t = 3000)]
    fallback_port: u16,

    #[arg(long, env = "WDRIVE_PASSWORD", default_value = "wdrive123", hide_env_values = true)]
    password: String,

    /// Token signing secret; a random one per run when unset
    #[arg(long, env = "WDRIVE_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Login lifetime, at most one year
    #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(i64).range(1..=24 * 366))]
    token_hours: i64,

    #[arg(long, default_value_t = 16 * 1024)]
    max_upload_mb: u64,

    /// Where the rotating access log is written
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

impl Args {
    fn into_config(self) -> Config {
        let secret = self.secret.unwrap_or_else(ephemeral_secret);
        let mut config = Config::new(self.root, &self.password, secret);
        config.host = self.host;
        config.port = self.port;
        config.fallback_port = self.fallback_port;
        config.token_hours = self.token_hours;
        config.max_upload_bytes = self.max_upload_mb.saturating_mul(1024 * 1024);
        config
    }
}

// Address other devices on the LAN can reach us at. Connecting a UDP socket
// sends nothing; it only makes the OS pick the outbound interface.
fn local_ip() -> IpAddr {
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let args = Args::parse();
    let _log_guard = logging::init(&args.log_dir)?;
    let config = Arc::new(args.into_config());

    std::fs::create_dir_all(&config.root)?;
    let shared = std::fs::canonicalize(&config.root)?;
    tracing::info!("Shared folder ready: {}", shared.display());

    let ip = local_ip();
    tracing::info!("Server URL: http://{}:{}/", ip, config.port);

    let address = format!("{}:{}", config.host, config.port);
    let result = Server::new(TcpListener::bind(address))
        .run(api_handlers::routes(config.clone()))
        .await;

    match result {
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            tracing::warn!(
                "Permission denied for port {}. Trying port {}...",
                config.port,
                config.fallback_port
            );
            tracing::info!("Server URL: http://{}:{}/", ip, config.fallback_port);
            let address = format!("{}:{}", config.host, config.fallback_port);
            Server::new(TcpListener::bind(address))
                .run(api_handlers::routes(config.clone()))
                .await
        }
        other => other,
    }
}
