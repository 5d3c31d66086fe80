//! Page templates rendered with minijinja.

use std::path::{Path, PathBuf};

use minijinja::{context, path_loader, Environment};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::files::{list_files, write_file};

/// Renders every page template into a static HTML file.
pub struct ViewRenderer {
    env: Environment<'static>,
    views_dir: PathBuf,
    pages_dir: PathBuf,
    out_dir: PathBuf,
}

impl ViewRenderer {
    /// Create a renderer loading templates from the configured views tree.
    pub fn new(config: &PipelineConfig) -> Self {
        let views_dir = config.src(&config.views_dir);

        let mut env = Environment::new();
        env.set_loader(path_loader(views_dir.clone()));

        Self {
            env,
            pages_dir: config.src(&config.pages_dir),
            out_dir: config.src_dir.clone(),
            views_dir,
        }
    }

    /// Page templates, sorted by name.
    pub fn pages(&self) -> Result<Vec<PathBuf>, PipelineError> {
        list_files(&self.pages_dir, false, |p| has_extension(p, &["html", "jinja", "j2"]))
    }

    /// Render one page to a string.
    pub fn render(&self, page: &Path) -> Result<String, PipelineError> {
        let name = self.template_name(page);
        let stem = page_stem(page);

        let tmpl = self
            .env
            .get_template(&name)
            .map_err(|e| template_error(&name, e))?;

        tmpl.render(context! {
            page => stem,
        })
        .map_err(|e| template_error(&name, e))
    }

    /// Render all pages next to the source tree root. Returns the written paths.
    pub fn render_all(&self) -> Result<Vec<PathBuf>, PipelineError> {
        let mut written = Vec::new();

        for page in self.pages()? {
            let html = self.render(&page)?;
            let output = self.out_dir.join(format!("{}.html", page_stem(&page)));
            write_file(&output, html)?;
            tracing::debug!("Rendered {}", output.display());
            written.push(output);
        }

        Ok(written)
    }

    /// Loader-relative template name with forward slashes.
    fn template_name(&self, page: &Path) -> String {
        let relative = page.strip_prefix(&self.views_dir).unwrap_or(page);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn page_stem(page: &Path) -> String {
    page.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("index")
        .to_string()
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

fn template_error(name: &str, err: minijinja::Error) -> PipelineError {
    PipelineError::TemplateError {
        page: name.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn config_for(root: &Path) -> PipelineConfig {
        PipelineConfig {
            src_dir: root.join("src"),
            dist_dir: root.join("dist"),
            ..Default::default()
        }
    }

    #[test]
    fn renders_pages_with_layouts() {
        let temp = tempdir().unwrap();
        let config = config_for(temp.path());
        let views = config.src("views");
        fs::create_dir_all(views.join("pages")).unwrap();
        fs::create_dir_all(views.join("layouts")).unwrap();

        fs::write(
            views.join("layouts/base.html"),
            "<html><body class=\"page-{{ page }}\">{% block content %}{% endblock %}</body></html>",
        )
        .unwrap();
        fs::write(
            views.join("pages/index.html"),
            "{% extends \"layouts/base.html\" %}{% block content %}<h1>Home</h1>{% endblock %}",
        )
        .unwrap();

        let written = ViewRenderer::new(&config).render_all().unwrap();

        assert_eq!(written, vec![config.src("index.html")]);
        let html = fs::read_to_string(config.src("index.html")).unwrap();
        assert_eq!(html, "<html><body class=\"page-index\"><h1>Home</h1></body></html>");
    }

    #[test]
    fn includes_partials() {
        let temp = tempdir().unwrap();
        let config = config_for(temp.path());
        let views = config.src("views");
        fs::create_dir_all(views.join("pages")).unwrap();
        fs::create_dir_all(views.join("partials")).unwrap();

        fs::write(views.join("partials/menu.html"), "<nav id=\"mobile-menu\"></nav>").unwrap();
        fs::write(
            views.join("pages/about.html"),
            "{% include \"partials/menu.html\" %}<p>About</p>",
        )
        .unwrap();

        ViewRenderer::new(&config).render_all().unwrap();

        let html = fs::read_to_string(config.src("about.html")).unwrap();
        assert!(html.contains("mobile-menu"));
        assert!(html.contains("<p>About</p>"));
    }

    #[test]
    fn reports_template_errors() {
        let temp = tempdir().unwrap();
        let config = config_for(temp.path());
        let pages = config.src("views/pages");
        fs::create_dir_all(&pages).unwrap();
        fs::write(pages.join("broken.html"), "{% block %}").unwrap();

        let err = ViewRenderer::new(&config).render_all().unwrap_err();

        assert!(matches!(err, PipelineError::TemplateError { ref page, .. } if page == "pages/broken.html"));
    }

    #[test]
    fn missing_pages_dir_renders_nothing() {
        let temp = tempdir().unwrap();
        let config = config_for(temp.path());

        let written = ViewRenderer::new(&config).render_all().unwrap();

        assert!(written.is_empty());
    }
}
