//! Filesystem helpers: listing, cleaning and copying to the distribution.

use std::fs;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::config::{with_map_extension, PipelineConfig};
use crate::error::PipelineError;

/// List files under `dir` accepted by `filter`, sorted by path.
///
/// A missing directory yields an empty list.
pub fn list_files(
    dir: &Path,
    recursive: bool,
    filter: impl Fn(&Path) -> bool,
) -> Result<Vec<PathBuf>, PipelineError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let walker = WalkDir::new(dir).follow_links(true).sort_by_file_name();
    let walker = if recursive { walker } else { walker.max_depth(1) };

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| PipelineError::read(dir, e))?;
        let path = entry.path();
        if entry.file_type().is_file() && filter(path) {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// Write a file, creating parent directories.
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PipelineError::write(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| PipelineError::write(path, e))
}

/// Remove a file if it exists.
pub fn remove_file(path: &Path) -> Result<bool, PipelineError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(PipelineError::write(path, e)),
    }
}

/// Empty the distribution directory.
///
/// With `keep_images`, the top-level `img` directory (or whatever
/// `images_dir` names) survives so a build can skip image processing.
pub fn clean_dist(config: &PipelineConfig, keep_images: bool) -> Result<(), PipelineError> {
    ensure_outside_sources(config)?;

    let dist = &config.dist_dir;
    if !dist.exists() {
        return Ok(());
    }

    if !keep_images {
        fs::remove_dir_all(dist).map_err(|e| PipelineError::write(dist, e))?;
        tracing::debug!("Removed {}", dist.display());
        return Ok(());
    }

    let images = config.dist(&config.images_dir);
    let entries = fs::read_dir(dist).map_err(|e| PipelineError::read(dist, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::read(dist, e))?;
        let path = entry.path();
        if path == images {
            continue;
        }
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|e| PipelineError::write(&path, e))?;
    }

    tracing::debug!("Cleaned {} (kept {})", dist.display(), images.display());
    Ok(())
}

/// Fail when the distribution is the source tree or one of its ancestors.
pub fn ensure_outside_sources(config: &PipelineConfig) -> Result<(), PipelineError> {
    let resolve = |path: &Path| path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let dist = resolve(&config.dist_dir);
    let src = resolve(&config.src_dir);

    if src.starts_with(&dist) {
        return Err(PipelineError::UnsafeOutput {
            dist: config.dist_dir.display().to_string(),
            src: config.src_dir.display().to_string(),
        });
    }
    Ok(())
}

/// Copy the publishable part of the source tree into the distribution.
/// Returns the number of files copied.
pub fn copy_to_dist(config: &PipelineConfig) -> Result<usize, PipelineError> {
    let rules = DistRules::new(config);
    let files = list_files(&config.src_dir, true, |path| {
        path.strip_prefix(&config.src_dir)
            .is_ok_and(|relative| rules.accepts(relative))
    })?;

    for source in &files {
        let relative = source.strip_prefix(&config.src_dir).unwrap_or(source);
        let target = config.dist(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| PipelineError::write(parent, e))?;
        }
        fs::copy(source, &target).map_err(|e| PipelineError::write(&target, e))?;
    }

    tracing::debug!("Copied {} files to {}", files.len(), config.dist_dir.display());
    Ok(files.len())
}

/// Which source files belong in the distribution.
#[derive(Debug)]
pub struct DistRules {
    views_dir: PathBuf,
    exact: Vec<PathBuf>,
    trees: Vec<PathBuf>,
    images_dir: PathBuf,
    icons_dir: PathBuf,
    sprite_name: String,
}

impl DistRules {
    pub fn new(config: &PipelineConfig) -> Self {
        let mut exact = Vec::new();
        for output in [&config.style_output, &config.vendor_output, &config.script_output] {
            exact.push(output.clone());
            exact.push(with_map_extension(output));
        }

        let styles_dir = config
            .style_output
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Self {
            views_dir: config.views_dir.clone(),
            exact,
            trees: vec![
                styles_dir.join("libs"),
                PathBuf::from("fonts"),
                PathBuf::from("video"),
                PathBuf::from("data"),
            ],
            images_dir: config.images_dir.clone(),
            icons_dir: config.icons_dir.clone(),
            sprite_name: config.sprite_name.clone(),
        }
    }

    /// Whether a path relative to the source root is published.
    pub fn accepts(&self, relative: &Path) -> bool {
        if relative.components().any(|c| matches!(c, Component::ParentDir)) {
            return false;
        }

        let ext = relative
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        if ext == "html" {
            return !relative.starts_with(&self.views_dir);
        }

        if self.exact.iter().any(|p| p == relative) {
            return true;
        }

        if self.trees.iter().any(|dir| relative.starts_with(dir)) {
            return true;
        }

        if ext == "ico" && relative.parent() == Some(self.images_dir.as_path()) {
            return true;
        }

        if ext == "svg" && relative.starts_with(&self.icons_dir) {
            let name = relative.file_name().and_then(|n| n.to_str()).unwrap_or("");
            return name != self.sprite_name;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        write_file(path, b"x").unwrap();
    }

    #[test]
    fn accepts_publishable_paths() {
        let rules = DistRules::new(&PipelineConfig::default());

        for path in [
            "index.html",
            "blog/post.html",
            "styles/style.min.css",
            "styles/style.min.css.map",
            "styles/libs/bootstrap.min.css",
            "scripts/vendor.min.js.map",
            "scripts/main.min.js",
            "fonts/inter/Inter.woff2",
            "img/favicon.ico",
            "img/svg/logo.svg",
            "img/svg/social/github.svg",
            "video/intro.mp4",
            "data/prices.json",
        ] {
            assert!(rules.accepts(Path::new(path)), "{path} should be copied");
        }
    }

    #[test]
    fn rejects_sources_and_sprite() {
        let rules = DistRules::new(&PipelineConfig::default());

        for path in [
            "views/pages/index.html",
            "styles/style.css",
            "scripts/main.js",
            "scripts/vendor/lazysizes.js",
            "img/photo.jpg",
            "img/icons/favicon.ico",
            "img/svg/sprite.svg",
            "../secret.html",
        ] {
            assert!(!rules.accepts(Path::new(path)), "{path} should be skipped");
        }
    }

    #[test]
    fn copies_allowed_files() {
        let temp = tempdir().unwrap();
        let config = PipelineConfig {
            src_dir: temp.path().join("src"),
            dist_dir: temp.path().join("dist"),
            ..Default::default()
        };

        touch(&config.src("index.html"));
        touch(&config.src("views/pages/index.html"));
        touch(&config.src("fonts/a.woff2"));
        touch(&config.src("img/svg/sprite.svg"));
        touch(&config.src("img/svg/menu.svg"));

        let copied = copy_to_dist(&config).unwrap();

        assert_eq!(copied, 3);
        assert!(config.dist("index.html").exists());
        assert!(config.dist("fonts/a.woff2").exists());
        assert!(config.dist("img/svg/menu.svg").exists());
        assert!(!config.dist("img/svg/sprite.svg").exists());
        assert!(!config.dist("views").exists());
    }

    #[test]
    fn clean_can_keep_images() {
        let temp = tempdir().unwrap();
        let config = PipelineConfig {
            src_dir: temp.path().join("src"),
            dist_dir: temp.path().join("dist"),
            ..Default::default()
        };

        touch(&config.dist("index.html"));
        touch(&config.dist("styles/style.min.css"));
        touch(&config.dist("img/photo.webp"));

        clean_dist(&config, true).unwrap();

        assert!(!config.dist("index.html").exists());
        assert!(!config.dist("styles").exists());
        assert!(config.dist("img/photo.webp").exists());

        clean_dist(&config, false).unwrap();
        assert!(!config.dist_dir.exists());
    }

    #[test]
    fn clean_refuses_to_delete_sources() {
        let temp = tempdir().unwrap();
        let site = temp.path().join("site");
        touch(&site.join("src/views/pages/index.html"));

        for dist in [site.join("src"), site.clone(), site.join("src/..")] {
            let config = PipelineConfig {
                src_dir: site.join("src"),
                dist_dir: dist,
                ..Default::default()
            };

            let err = clean_dist(&config, false).unwrap_err();
            assert!(matches!(err, PipelineError::UnsafeOutput { .. }));
        }

        assert!(site.join("src/views/pages/index.html").exists());
    }

    #[test]
    fn dist_inside_sources_is_allowed() {
        let temp = tempdir().unwrap();
        let config = PipelineConfig {
            src_dir: temp.path().join("src"),
            dist_dir: temp.path().join("src/public"),
            ..Default::default()
        };
        touch(&config.dist("index.html"));

        clean_dist(&config, false).unwrap();
        assert!(!config.dist_dir.exists());
    }

    #[test]
    fn lists_top_level_only_when_not_recursive() {
        let temp = tempdir().unwrap();
        touch(&temp.path().join("b.png"));
        touch(&temp.path().join("a.png"));
        touch(&temp.path().join("nested/c.png"));

        let flat = list_files(temp.path(), false, |_| true).unwrap();
        let deep = list_files(temp.path(), true, |_| true).unwrap();

        assert_eq!(flat, vec![temp.path().join("a.png"), temp.path().join("b.png")]);
        assert_eq!(deep.len(), 3);
    }

    #[test]
    fn remove_missing_file_is_ok() {
        let temp = tempdir().unwrap();
        assert!(!remove_file(&temp.path().join("nope.svg")).unwrap());
    }
}
