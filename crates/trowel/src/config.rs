//! Project configuration file (trowel.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use trowel_pipeline::{BrowserTargets, PipelineConfig};

/// Configuration file structure.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub views: ViewsConfig,
    #[serde(default)]
    pub styles: StylesConfig,
    #[serde(default)]
    pub scripts: ScriptsConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub src: PathBuf,
    pub dist: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            src: PathBuf::from("src"),
            dist: PathBuf::from("dist"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ViewsConfig {
    /// Template root, relative to `paths.src`
    pub dir: PathBuf,
    /// Page templates, relative to `paths.src`
    pub pages: PathBuf,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("views"),
            pages: PathBuf::from("views/pages"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StylesConfig {
    pub entry: PathBuf,
    pub output: PathBuf,
    /// Minimum browser major versions
    pub targets: TargetsConfig,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            entry: PathBuf::from("styles/style.css"),
            output: PathBuf::from("styles/style.min.css"),
            targets: TargetsConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TargetsConfig {
    pub chrome: Option<u32>,
    pub edge: Option<u32>,
    pub firefox: Option<u32>,
    pub safari: Option<u32>,
    pub ios_saf: Option<u32>,
    pub samsung: Option<u32>,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        let defaults = BrowserTargets::default();
        Self {
            chrome: defaults.chrome,
            edge: defaults.edge,
            firefox: defaults.firefox,
            safari: defaults.safari,
            ios_saf: defaults.ios_saf,
            samsung: defaults.samsung,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    pub entry: PathBuf,
    pub output: PathBuf,
    /// Vendor files in bundle order; empty bundles `vendor_dir/*.js`
    pub vendor: Vec<PathBuf>,
    pub vendor_dir: PathBuf,
    pub vendor_output: PathBuf,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            entry: PathBuf::from("scripts/main.js"),
            output: PathBuf::from("scripts/main.min.js"),
            vendor: Vec::new(),
            vendor_dir: PathBuf::from("scripts/vendor"),
            vendor_output: PathBuf::from("scripts/vendor.min.js"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    pub dir: PathBuf,
    pub icons: PathBuf,
    pub sprite: String,
    pub jpeg_quality: u8,
    pub webp: bool,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("img"),
            icons: PathBuf::from("img/svg"),
            sprite: "sprite.svg".to_string(),
            jpeg_quality: 80,
            webp: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub open: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            open: true,
        }
    }
}

impl ConfigFile {
    /// Pipeline layout with `paths` resolved against `root`.
    pub fn pipeline(&self, root: &Path) -> PipelineConfig {
        PipelineConfig {
            src_dir: root.join(&self.paths.src),
            dist_dir: root.join(&self.paths.dist),
            views_dir: self.views.dir.clone(),
            pages_dir: self.views.pages.clone(),
            style_entry: self.styles.entry.clone(),
            style_output: self.styles.output.clone(),
            browser_targets: BrowserTargets {
                chrome: self.styles.targets.chrome,
                edge: self.styles.targets.edge,
                firefox: self.styles.targets.firefox,
                safari: self.styles.targets.safari,
                ios_saf: self.styles.targets.ios_saf,
                samsung: self.styles.targets.samsung,
            },
            script_entry: self.scripts.entry.clone(),
            script_output: self.scripts.output.clone(),
            vendor_scripts: self.scripts.vendor.clone(),
            vendor_dir: self.scripts.vendor_dir.clone(),
            vendor_output: self.scripts.vendor_output.clone(),
            images_dir: self.images.dir.clone(),
            icons_dir: self.images.icons.clone(),
            sprite_name: self.images.sprite.clone(),
            jpeg_quality: self.images.jpeg_quality,
            webp: self.images.webp,
        }
    }
}

/// A loaded configuration and the directory its paths are relative to.
#[derive(Debug)]
pub struct Project {
    pub root: PathBuf,
    pub file: ConfigFile,
}

impl Project {
    pub fn pipeline(&self) -> PipelineConfig {
        self.file.pipeline(&self.root)
    }
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load(path: &Path) -> Result<Project> {
    let root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    if !path.exists() {
        tracing::debug!("No {} found, using defaults", path.display());
        return Ok(Project {
            root,
            file: ConfigFile::default(),
        });
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::info!("Loaded config from {}", path.display());

    Ok(Project { root, file })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_uses_defaults() {
        let temp = tempdir().unwrap();
        let project = load(&temp.path().join("trowel.toml")).unwrap();
        let pipeline = project.pipeline();

        assert_eq!(pipeline.src_dir, temp.path().join("src"));
        assert_eq!(pipeline.dist_dir, temp.path().join("dist"));
        assert_eq!(pipeline.style_entry, PathBuf::from("styles/style.css"));
        assert_eq!(project.file.server.port, 3000);
    }

    #[test]
    fn reads_sections_and_keeps_other_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("trowel.toml");
        fs::write(
            &path,
            r#"
[paths]
dist = "public"

[scripts]
vendor = ["../node_modules/lazysizes/lazysizes.js", "scripts/vendor/bootstrap.bundle.min.js"]

[styles.targets]
safari = 14

[server]
port = 8080
open = false
"#,
        )
        .unwrap();

        let project = load(&path).unwrap();
        let pipeline = project.pipeline();

        assert_eq!(pipeline.dist_dir, temp.path().join("public"));
        assert_eq!(pipeline.src_dir, temp.path().join("src"));
        assert_eq!(pipeline.vendor_scripts.len(), 2);
        assert_eq!(pipeline.browser_targets.safari, Some(14));
        assert_eq!(pipeline.browser_targets.chrome, Some(100));
        assert_eq!(project.file.server.port, 8080);
        assert!(!project.file.server.open);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("trowel.toml");
        fs::write(&path, "[paths\nsrc = ").unwrap();

        let err = load(&path).unwrap_err();

        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn bare_file_name_resolves_against_current_dir() {
        let project = load(Path::new("definitely-missing-trowel.toml")).unwrap();
        assert_eq!(project.root, PathBuf::from("."));
    }
}
