//! Preview of the built distribution.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use axum::Router;
use tower_http::services::ServeDir;

use crate::config::ServerConfig;

/// Serve `dir` on the configured host until interrupted.
pub async fn run(server: &ServerConfig, port: u16, dir: PathBuf, open: bool) -> Result<()> {
    ensure_built(&dir)?;
    let addr = preview_addr(&server.host, port)?;

    let app = Router::new().fallback_service(ServeDir::new(&dir));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Previewing {} at http://{}", dir.display(), addr);

    if open && server.open {
        let _ = open::that(format!("http://{}", addr));
    }

    axum::serve(listener, app).await?;
    Ok(())
}

fn ensure_built(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!(
            "Nothing to preview at {}. Run 'trowel build' first.",
            dir.display()
        );
    }
    Ok(())
}

fn preview_addr(host: &str, port: u16) -> Result<SocketAddr> {
    format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid preview address {}:{}", host, port))
}
