//! Pipeline layout and options.

use std::path::{Path, PathBuf};

/// Where a task writes its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Next to the sources, for the dev server to pick up
    Source,
    /// Into the distribution directory
    Dist,
}

/// Browser versions stylesheets are lowered and prefixed for.
///
/// Versions are major releases; `None` leaves a browser untargeted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserTargets {
    pub chrome: Option<u32>,
    pub edge: Option<u32>,
    pub firefox: Option<u32>,
    pub safari: Option<u32>,
    pub ios_saf: Option<u32>,
    pub samsung: Option<u32>,
}

impl Default for BrowserTargets {
    fn default() -> Self {
        Self {
            chrome: Some(100),
            edge: Some(100),
            firefox: Some(100),
            safari: Some(15),
            ios_saf: Some(15),
            samsung: Some(18),
        }
    }
}

/// Configuration for the whole pipeline.
///
/// Relative paths in the sub-sections are resolved against `src_dir`.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Source tree, also served in dev mode
    pub src_dir: PathBuf,

    /// Distribution directory
    pub dist_dir: PathBuf,

    /// Template root; pages may extend or include anything below it
    pub views_dir: PathBuf,

    /// Directory of page templates, one output page each
    pub pages_dir: PathBuf,

    /// Stylesheet entry point
    pub style_entry: PathBuf,

    /// Minified stylesheet output
    pub style_output: PathBuf,

    pub browser_targets: BrowserTargets,

    /// Page script entry point
    pub script_entry: PathBuf,

    /// Minified page script output
    pub script_output: PathBuf,

    /// Vendor scripts in bundle order. Empty means every `*.js` in
    /// `vendor_dir`, sorted by name.
    pub vendor_scripts: Vec<PathBuf>,

    pub vendor_dir: PathBuf,

    /// Minified vendor bundle output
    pub vendor_output: PathBuf,

    /// Raster image root
    pub images_dir: PathBuf,

    /// Icon directory bundled into the sprite
    pub icons_dir: PathBuf,

    /// Sprite file name inside `icons_dir`
    pub sprite_name: String,

    /// JPEG re-encode quality (1-100)
    pub jpeg_quality: u8,

    /// Produce `.webp` copies of top-level raster images
    pub webp: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            src_dir: PathBuf::from("src"),
            dist_dir: PathBuf::from("dist"),
            views_dir: PathBuf::from("views"),
            pages_dir: PathBuf::from("views/pages"),
            style_entry: PathBuf::from("styles/style.css"),
            style_output: PathBuf::from("styles/style.min.css"),
            browser_targets: BrowserTargets::default(),
            script_entry: PathBuf::from("scripts/main.js"),
            script_output: PathBuf::from("scripts/main.min.js"),
            vendor_scripts: Vec::new(),
            vendor_dir: PathBuf::from("scripts/vendor"),
            vendor_output: PathBuf::from("scripts/vendor.min.js"),
            images_dir: PathBuf::from("img"),
            icons_dir: PathBuf::from("img/svg"),
            sprite_name: "sprite.svg".to_string(),
            jpeg_quality: 80,
            webp: true,
        }
    }
}

impl PipelineConfig {
    /// Resolve a path relative to the source tree.
    pub fn src(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.src_dir.join(relative)
    }

    /// Resolve a path relative to the distribution directory.
    pub fn dist(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dist_dir.join(relative)
    }

    /// Root directory for a destination.
    pub fn root(&self, destination: Destination) -> &Path {
        match destination {
            Destination::Source => &self.src_dir,
            Destination::Dist => &self.dist_dir,
        }
    }

    /// Relative path of the sprite file.
    pub fn sprite_path(&self) -> PathBuf {
        self.icons_dir.join(&self.sprite_name)
    }

    /// Files the compile tasks generate inside the source tree.
    pub fn generated_outputs(&self) -> Vec<PathBuf> {
        let mut outputs = Vec::new();
        for output in [&self.style_output, &self.script_output, &self.vendor_output] {
            outputs.push(output.clone());
            outputs.push(with_map_extension(output));
        }
        outputs.push(self.sprite_path());
        outputs
    }
}

/// `style.min.css` -> `style.min.css.map`.
pub fn with_map_extension(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".map");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_paths() {
        let config = PipelineConfig::default();

        assert_eq!(config.src("styles/style.css"), PathBuf::from("src/styles/style.css"));
        assert_eq!(config.dist("img"), PathBuf::from("dist/img"));
        assert_eq!(config.root(Destination::Source), Path::new("src"));
        assert_eq!(config.sprite_path(), PathBuf::from("img/svg/sprite.svg"));
    }

    #[test]
    fn lists_generated_outputs_with_maps() {
        let outputs = PipelineConfig::default().generated_outputs();

        assert!(outputs.contains(&PathBuf::from("styles/style.min.css.map")));
        assert!(outputs.contains(&PathBuf::from("scripts/vendor.min.js")));
        assert!(outputs.contains(&PathBuf::from("img/svg/sprite.svg")));
    }
}
