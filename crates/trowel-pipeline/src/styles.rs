//! Stylesheet bundling and minification with lightningcss.

use std::path::Path;

use lightningcss::bundler::{Bundler, FileProvider};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;

use crate::config::BrowserTargets;
use crate::error::PipelineError;

/// A compiled stylesheet and its source map.
#[derive(Debug, Clone)]
pub struct CompiledStyles {
    /// Minified CSS ending with a `sourceMappingURL` comment
    pub css: String,
    /// Source map JSON
    pub map: String,
}

/// Resolve `@import`s from `entry`, lower nesting and prefix for `targets`,
/// and minify. `output_name` is the file name the CSS will be written under.
pub fn compile_stylesheet(
    entry: &Path,
    output_name: &str,
    targets: &BrowserTargets,
) -> Result<CompiledStyles, PipelineError> {
    let fs = FileProvider::new();
    // Sources are recorded relative to the entry's directory, which is also
    // where the output is written.
    let project_root = entry
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut source_map = SourceMap::new(&project_root);
    let targets = to_targets(targets);

    let mut stylesheet = {
        let mut bundler = Bundler::new(&fs, Some(&mut source_map), ParserOptions::default());
        bundler
            .bundle(entry)
            .map_err(|e| style_error(entry, e.to_string()))?
    };

    stylesheet
        .minify(MinifyOptions {
            targets: targets.clone(),
            ..MinifyOptions::default()
        })
        .map_err(|e| style_error(entry, e.to_string()))?;

    let printed = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            source_map: Some(&mut source_map),
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| style_error(entry, e.to_string()))?;

    let map = source_map
        .to_json(None)
        .map_err(|e| style_error(entry, format!("source map: {:?}", e)))?;

    Ok(CompiledStyles {
        css: format!("{}\n/*# sourceMappingURL={}.map */", printed.code, output_name),
        map,
    })
}

fn to_targets(targets: &BrowserTargets) -> Targets {
    // lightningcss packs versions as major << 16 | minor << 8 | patch.
    let version = |major: Option<u32>| major.map(|m| m << 16);

    Targets {
        browsers: Some(Browsers {
            chrome: version(targets.chrome),
            edge: version(targets.edge),
            firefox: version(targets.firefox),
            safari: version(targets.safari),
            ios_saf: version(targets.ios_saf),
            samsung: version(targets.samsung),
            ..Browsers::default()
        }),
        ..Targets::default()
    }
}

fn style_error(path: &Path, message: String) -> PipelineError {
    PipelineError::StylesheetError {
        path: path.display().to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn bundles_imports_and_minifies() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("style.css"),
            "@import \"menu.css\";\n\nbody {\n    margin: 0;\n}\n",
        )
        .unwrap();
        fs::write(
            temp.path().join("menu.css"),
            ".mobile-menu-backdrop {\n    position: fixed;\n    inset: 0;\n}\n",
        )
        .unwrap();

        let out = compile_stylesheet(
            &temp.path().join("style.css"),
            "style.min.css",
            &BrowserTargets::default(),
        )
        .unwrap();

        assert!(out.css.contains(".mobile-menu-backdrop"));
        assert!(out.css.contains("body{margin:0}"));
        assert!(out.css.ends_with("/*# sourceMappingURL=style.min.css.map */"));
        assert!(out.map.contains("\"mappings\""));
    }

    #[test]
    fn map_sources_are_relative_to_the_entry() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("style.css"), "@import \"menu.css\";\nbody { margin: 0; }\n")
            .unwrap();
        fs::write(temp.path().join("menu.css"), "nav { display: none; }\n").unwrap();

        let out = compile_stylesheet(
            &temp.path().join("style.css"),
            "style.min.css",
            &BrowserTargets::default(),
        )
        .unwrap();

        let map: serde_json::Value = serde_json::from_str(&out.map).unwrap();
        let mut sources: Vec<&str> = map["sources"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s.as_str().unwrap())
            .collect();
        sources.sort();

        assert_eq!(sources, vec!["menu.css", "style.css"]);
        let root = map.get("sourceRoot").and_then(|r| r.as_str()).unwrap_or_default();
        assert_eq!(root, "");
        assert!(!out.map.contains(&*temp.path().to_string_lossy()));
    }

    #[test]
    fn lowers_nesting() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("style.css"),
            "#mobile-menu {\n  display: none;\n  &.opened { display: block; }\n}\n",
        )
        .unwrap();

        let out = compile_stylesheet(
            &temp.path().join("style.css"),
            "style.min.css",
            &BrowserTargets {
                chrome: Some(90),
                ..BrowserTargets::default()
            },
        )
        .unwrap();

        assert!(out.css.contains("#mobile-menu.opened"));
        assert!(!out.css.contains('&'));
    }

    #[test]
    fn reports_missing_entry() {
        let temp = tempdir().unwrap();
        let err = compile_stylesheet(
            &temp.path().join("missing.css"),
            "style.min.css",
            &BrowserTargets::default(),
        )
        .unwrap_err();

        assert!(matches!(err, PipelineError::StylesheetError { .. }));
    }
}
