//! Development server command.

use anyhow::Result;
use trowel_server::{DevServer, DevServerConfig};

use crate::config::Project;

/// Run the dev server.
pub async fn run(project: &Project, port: Option<u16>, open: bool) -> Result<()> {
    let server = &project.file.server;
    let port = port.unwrap_or(server.port);

    tracing::info!("Starting development server on port {}", port);

    let config = DevServerConfig {
        pipeline: project.pipeline(),
        port,
        host: server.host.clone(),
        open: open && server.open,
    };

    DevServer::new(config).start().await?;

    Ok(())
}
