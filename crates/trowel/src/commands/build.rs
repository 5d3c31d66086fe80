//! Production build command.

use std::path::PathBuf;

use anyhow::Result;
use trowel_pipeline::{BuildMode, Pipeline};

use crate::config::Project;

/// Run the build command.
pub async fn run(project: &Project, output: Option<PathBuf>, images: bool) -> Result<()> {
    let mode = if images {
        BuildMode::Full
    } else {
        BuildMode::NoImages
    };
    tracing::info!("Building site ({:?})...", mode);

    let mut config = project.pipeline();
    if let Some(output) = output {
        config.dist_dir = output;
    }

    let result = Pipeline::new(config).build(mode).await?;

    let written: usize = result.tasks.iter().map(|t| t.files).sum();
    tracing::info!(
        "Built {} tasks, {} files in {}ms",
        result.tasks.len(),
        written,
        result.duration_ms
    );

    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
