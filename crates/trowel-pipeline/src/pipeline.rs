//! Task orchestration for dev and production builds.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{with_map_extension, Destination, PipelineConfig};
use crate::error::PipelineError;
use crate::files::{self, list_files, write_file};
use crate::images;
use crate::scripts::{self, CompiledScript};
use crate::sprite;
use crate::styles;
use crate::views::ViewRenderer;

/// A single pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Render page templates to HTML
    Views,
    /// Bundle and minify the stylesheet
    Styles,
    /// Bundle and minify vendor scripts
    VendorScripts,
    /// Minify the page script
    Scripts,
    /// Re-encode raster images into the distribution
    Images,
    /// Convert top-level raster images to WebP
    Webp(Destination),
    /// Bundle icons into a sprite
    Sprite(Destination),
    /// Delete the dev sprite
    CleanSprite,
    /// Empty the distribution, optionally keeping images
    Clean { keep_images: bool },
    /// Copy publishable files into the distribution
    CopyToDist,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Views => write!(f, "views"),
            Task::Styles => write!(f, "styles"),
            Task::VendorScripts => write!(f, "scripts:vendor"),
            Task::Scripts => write!(f, "scripts"),
            Task::Images => write!(f, "images"),
            Task::Webp(Destination::Source) => write!(f, "webp:dev"),
            Task::Webp(Destination::Dist) => write!(f, "webp"),
            Task::Sprite(Destination::Source) => write!(f, "sprite:dev"),
            Task::Sprite(Destination::Dist) => write!(f, "sprite"),
            Task::CleanSprite => write!(f, "clean:sprite"),
            Task::Clean { keep_images: true } => write!(f, "clean:keep-images"),
            Task::Clean { keep_images: false } => write!(f, "clean"),
            Task::CopyToDist => write!(f, "copy"),
        }
    }
}

/// Production build flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Clean everything and process images
    Full,
    /// Keep `dist/img` and skip image processing
    NoImages,
}

impl BuildMode {
    /// Task phases run in order; tasks inside a phase run concurrently.
    pub fn phases(self) -> Vec<Vec<Task>> {
        let compile = vec![Task::Views, Task::Styles, Task::VendorScripts, Task::Scripts];
        match self {
            BuildMode::Full => vec![
                vec![Task::Clean { keep_images: false }],
                compile,
                vec![Task::Images],
                vec![Task::Webp(Destination::Dist)],
                vec![Task::Sprite(Destination::Dist)],
                vec![Task::CopyToDist],
            ],
            BuildMode::NoImages => vec![
                vec![Task::Clean { keep_images: true }],
                compile,
                vec![Task::Sprite(Destination::Dist)],
                vec![Task::CopyToDist],
            ],
        }
    }
}

/// What a task produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutput {
    pub task: Task,
    /// Number of files written (or removed, for clean tasks)
    pub files: usize,
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Per-task outputs in completion order
    pub tasks: Vec<TaskOutput>,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

impl BuildResult {
    /// Files written by one kind of task.
    pub fn files_for(&self, task: Task) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.task == task)
            .map(|t| t.files)
            .sum()
    }
}

/// Runs pipeline tasks against a project layout.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Arc<PipelineConfig>,
}

impl Pipeline {
    /// Create a new pipeline.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run a production build.
    pub async fn build(&self, mode: BuildMode) -> Result<BuildResult, PipelineError> {
        let start = Instant::now();
        let mut outputs = Vec::new();

        for phase in mode.phases() {
            outputs.extend(self.run_phase(&phase).await?);
        }

        Ok(BuildResult {
            tasks: outputs,
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir: self.config.dist_dir.clone(),
        })
    }

    /// Compile views, styles and scripts into the source tree, as the dev
    /// server needs before it starts serving.
    pub async fn compile(&self) -> Result<Vec<TaskOutput>, PipelineError> {
        self.run_phase(&[Task::Views, Task::Styles, Task::VendorScripts, Task::Scripts])
            .await
    }

    /// Run tasks concurrently, failing on the first error.
    pub async fn run_phase(&self, tasks: &[Task]) -> Result<Vec<TaskOutput>, PipelineError> {
        let handles: Vec<_> = tasks
            .iter()
            .map(|&task| {
                let pipeline = self.clone();
                tokio::spawn(async move { pipeline.run(task).await })
            })
            .collect();

        let mut outputs = Vec::with_capacity(handles.len());
        for handle in handles {
            let output = handle
                .await
                .map_err(|e| PipelineError::JoinError(e.to_string()))??;
            outputs.push(output);
        }
        Ok(outputs)
    }

    /// Run one task on the blocking pool.
    pub async fn run(&self, task: Task) -> Result<TaskOutput, PipelineError> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.run_blocking(task))
            .await
            .map_err(|e| PipelineError::JoinError(e.to_string()))?
    }

    /// Run one task on the current thread.
    pub fn run_blocking(&self, task: Task) -> Result<TaskOutput, PipelineError> {
        let start = Instant::now();
        let files = match task {
            Task::Views => self.views()?,
            Task::Styles => self.styles()?,
            Task::VendorScripts => self.vendor_scripts()?,
            Task::Scripts => self.scripts()?,
            Task::Images => self.images()?,
            Task::Webp(destination) => self.webp(destination)?,
            Task::Sprite(destination) => self.sprite(destination)?,
            Task::CleanSprite => {
                usize::from(files::remove_file(&self.config.src(self.config.sprite_path()))?)
            }
            Task::Clean { keep_images } => {
                files::clean_dist(&self.config, keep_images)?;
                0
            }
            Task::CopyToDist => files::copy_to_dist(&self.config)?,
        };

        tracing::info!(
            "[{}] {} file(s) in {}ms",
            task,
            files,
            start.elapsed().as_millis()
        );

        Ok(TaskOutput { task, files })
    }

    fn views(&self) -> Result<usize, PipelineError> {
        Ok(ViewRenderer::new(&self.config).render_all()?.len())
    }

    fn styles(&self) -> Result<usize, PipelineError> {
        let entry = self.config.src(&self.config.style_entry);
        if !entry.exists() {
            tracing::warn!("No stylesheet entry at {}", entry.display());
            return Ok(0);
        }

        let output = self.config.src(&self.config.style_output);
        let compiled =
            styles::compile_stylesheet(&entry, &file_name(&output), &self.config.browser_targets)?;

        write_file(&output, compiled.css)?;
        write_file(&with_map_extension(&output), compiled.map)?;
        Ok(2)
    }

    fn vendor_scripts(&self) -> Result<usize, PipelineError> {
        let sources = if self.config.vendor_scripts.is_empty() {
            list_files(&self.config.src(&self.config.vendor_dir), false, |p| {
                p.extension().is_some_and(|e| e == "js")
            })?
        } else {
            self.config
                .vendor_scripts
                .iter()
                .map(|p| self.config.src(p))
                .collect()
        };

        if sources.is_empty() {
            tracing::debug!("No vendor scripts to bundle");
            return Ok(0);
        }

        let output = self.config.src(&self.config.vendor_output);
        let compiled = scripts::bundle_scripts(&sources, "vendor.js", &file_name(&output))?;
        self.write_script(&output, compiled)
    }

    fn scripts(&self) -> Result<usize, PipelineError> {
        let entry = self.config.src(&self.config.script_entry);
        if !entry.exists() {
            tracing::warn!("No script entry at {}", entry.display());
            return Ok(0);
        }

        let output = self.config.src(&self.config.script_output);
        let compiled = scripts::bundle_scripts(
            std::slice::from_ref(&entry),
            &file_name(&entry),
            &file_name(&output),
        )?;
        self.write_script(&output, compiled)
    }

    fn write_script(
        &self,
        output: &std::path::Path,
        compiled: CompiledScript,
    ) -> Result<usize, PipelineError> {
        write_file(output, compiled.code)?;
        match compiled.map {
            Some(map) => {
                write_file(&with_map_extension(output), map)?;
                Ok(2)
            }
            None => Ok(1),
        }
    }

    fn images(&self) -> Result<usize, PipelineError> {
        let optimized = images::optimize_images(
            &self.config.src(&self.config.images_dir),
            &self.config.dist(&self.config.images_dir),
            self.config.jpeg_quality,
        )?;

        let saved: u64 = optimized
            .iter()
            .map(|i| i.original_bytes.saturating_sub(i.written_bytes))
            .sum();
        tracing::debug!("Images saved {} bytes", saved);

        Ok(optimized.len())
    }

    fn webp(&self, destination: Destination) -> Result<usize, PipelineError> {
        if !self.config.webp {
            return Ok(0);
        }

        let out_dir = self.config.root(destination).join(&self.config.images_dir);
        let written =
            images::convert_to_webp(&self.config.src(&self.config.images_dir), &out_dir)?;
        Ok(written.len())
    }

    fn sprite(&self, destination: Destination) -> Result<usize, PipelineError> {
        let icons_dir = self.config.src(&self.config.icons_dir);
        let (markup, count) = sprite::sprite_from_dir(&icons_dir, &self.config.sprite_name)?;
        if count == 0 {
            tracing::debug!("No icons in {}", icons_dir.display());
            return Ok(0);
        }

        let output = self
            .config
            .root(destination)
            .join(self.config.sprite_path());
        write_file(&output, markup)?;
        Ok(1)
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}
