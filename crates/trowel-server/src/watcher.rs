//! File watching for rebuild-on-change.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use notify::{EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

use trowel_pipeline::images::is_raster;
use trowel_pipeline::{Destination, PipelineConfig, Task};

const DEBOUNCE: Duration = Duration::from_millis(100);

/// Which group of sources changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEvent {
    /// A page template, layout or partial
    Views,
    /// A stylesheet source
    Styles,
    /// The page script entry
    Scripts,
    /// A top-level raster image
    Images,
    /// An SVG icon
    Icons,
}

impl WatchEvent {
    /// Tasks to run, in order, to bring outputs up to date.
    pub fn tasks(self) -> Vec<Task> {
        match self {
            WatchEvent::Views => vec![Task::Views],
            WatchEvent::Styles => vec![Task::Styles],
            WatchEvent::Scripts => vec![Task::Scripts],
            WatchEvent::Images => vec![Task::Webp(Destination::Source)],
            WatchEvent::Icons => vec![Task::CleanSprite, Task::Sprite(Destination::Source)],
        }
    }
}

/// Maps changed paths to the sources they belong to.
#[derive(Debug, Clone)]
pub struct WatchRules {
    src_dir: PathBuf,
    views_dir: PathBuf,
    styles_dir: PathBuf,
    script_entry: PathBuf,
    images_dir: PathBuf,
    icons_dir: PathBuf,
    sprite_name: String,
    generated: Vec<PathBuf>,
}

impl WatchRules {
    pub fn new(config: &PipelineConfig) -> Self {
        // notify reports absolute paths
        let src_dir = config
            .src_dir
            .canonicalize()
            .unwrap_or_else(|_| config.src_dir.clone());

        Self {
            src_dir,
            views_dir: config.views_dir.clone(),
            styles_dir: config
                .style_entry
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            script_entry: config.script_entry.clone(),
            images_dir: config.images_dir.clone(),
            icons_dir: config.icons_dir.clone(),
            sprite_name: config.sprite_name.clone(),
            generated: config.generated_outputs(),
        }
    }

    /// The directory to watch.
    pub fn root(&self) -> &Path {
        &self.src_dir
    }

    /// Classify a changed path. Generated outputs are ignored so a rebuild
    /// never triggers itself.
    pub fn classify(&self, path: &Path) -> Option<WatchEvent> {
        let relative = path
            .strip_prefix(&self.src_dir)
            .ok()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.to_path_buf());

        if self.generated.contains(&relative) {
            return None;
        }

        let ext = relative
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let parent = relative.parent();

        if relative.starts_with(&self.views_dir) {
            Some(WatchEvent::Views)
        } else if relative == self.script_entry {
            Some(WatchEvent::Scripts)
        } else if ext == "css" && relative.starts_with(&self.styles_dir) {
            Some(WatchEvent::Styles)
        } else if parent == Some(self.icons_dir.as_path()) && ext == "svg" {
            let name = relative.file_name().and_then(|n| n.to_str()).unwrap_or("");
            (name != self.sprite_name).then_some(WatchEvent::Icons)
        } else if parent == Some(self.images_dir.as_path()) && is_raster(&relative) {
            Some(WatchEvent::Images)
        } else {
            None
        }
    }
}

/// File watcher for detecting changes.
pub struct FileWatcher {
    _watcher: notify::RecommendedWatcher,
}

impl FileWatcher {
    /// Watch the source tree described by `rules`.
    ///
    /// Returns the watcher and a channel of debounced events. Changes that
    /// arrive together are coalesced so each group is reported once.
    pub fn new(
        rules: WatchRules,
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        if rules.root().exists() {
            watcher
                .watch(rules.root(), RecursiveMode::Recursive)
                .map_err(std::io::Error::other)?;
        } else {
            tracing::warn!("Source directory {} does not exist", rules.root().display());
        }

        std::thread::spawn(move || {
            while let Ok(event) = sync_rx.recv() {
                let mut pending = classify_event(&rules, &event);

                let deadline = Instant::now() + DEBOUNCE;
                loop {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        break;
                    }
                    match sync_rx.recv_timeout(remaining) {
                        Ok(event) => pending.extend(classify_event(&rules, &event)),
                        Err(RecvTimeoutError::Timeout) => break,
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }

                for event in dedupe(pending) {
                    if async_tx.blocking_send(event).is_err() {
                        return;
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Classify a notify event into watch events.
fn classify_event(rules: &WatchRules, event: &notify::Event) -> Vec<WatchEvent> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => event
            .paths
            .iter()
            .filter_map(|p| rules.classify(p))
            .collect(),
        _ => Vec::new(),
    }
}

fn dedupe(events: Vec<WatchEvent>) -> Vec<WatchEvent> {
    let mut unique = Vec::with_capacity(events.len());
    for event in events {
        if !unique.contains(&event) {
            unique.push(event);
        }
    }
    unique
}
