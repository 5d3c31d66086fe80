//! SVG icon optimisation and sprite bundling.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::PipelineError;
use crate::files::list_files;

static XML_PROLOG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<\?xml.*?\?>|<!DOCTYPE[^>]*>").expect("Invalid prolog regex")
});
static COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--.*?-->").expect("Invalid comment regex")
});
static METADATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<metadata\b.*?</metadata>").expect("Invalid metadata regex")
});
static BETWEEN_TAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r">\s+<").expect("Invalid whitespace regex")
});
static ROOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<svg\b([^>]*?)(/?)>(.*)").expect("Invalid root regex")
});
static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([\w:-]+)\s*=\s*("[^"]*"|'[^']*')"#).expect("Invalid attribute regex")
});

/// Attributes carried from an icon's root `<svg>` onto its `<symbol>`.
const SYMBOL_ATTRIBUTES: &[&str] = &["viewBox", "preserveAspectRatio"];

/// An icon ready to be placed in a sprite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    /// Symbol id, taken from the file stem
    pub id: String,
    /// Attributes kept from the root element, in `SYMBOL_ATTRIBUTES` order
    pub attributes: Vec<(String, String)>,
    /// Optimised inner markup
    pub body: String,
}

/// Strip prolog, comments and metadata and collapse whitespace between tags.
///
/// `viewBox`, `<defs>` and ids are left untouched so icons keep their
/// geometry and internal references.
pub fn optimize_svg(source: &str) -> String {
    let s = XML_PROLOG.replace_all(source, "");
    let s = COMMENT.replace_all(&s, "");
    let s = METADATA.replace_all(&s, "");
    let s = BETWEEN_TAGS.replace_all(&s, "><");
    s.trim().to_string()
}

/// Parse an icon file's markup.
pub fn parse_icon(id: &str, source: &str) -> Result<Icon, PipelineError> {
    let optimized = optimize_svg(source);

    let caps = ROOT
        .captures(&optimized)
        .ok_or_else(|| PipelineError::SpriteError(format!("{}: no <svg> root element", id)))?;

    let root_attrs = &caps[1];
    let self_closing = !caps[2].is_empty();
    let rest = &caps[3];

    let body = if self_closing {
        String::new()
    } else {
        let end = rest.rfind("</svg>").ok_or_else(|| {
            PipelineError::SpriteError(format!("{}: unclosed <svg> element", id))
        })?;
        rest[..end].to_string()
    };

    let mut attributes = Vec::new();
    for wanted in SYMBOL_ATTRIBUTES {
        if let Some(value) = ATTR
            .captures_iter(root_attrs)
            .find(|c| &c[1] == *wanted)
            .map(|c| c[2].trim_matches(|q: char| q == '"' || q == '\'').to_string())
        {
            attributes.push((wanted.to_string(), value));
        }
    }

    Ok(Icon {
        id: id.to_string(),
        attributes,
        body,
    })
}

/// Combine icons into one inline sprite of `<symbol>` elements.
pub fn build_sprite(icons: &[Icon]) -> Result<String, PipelineError> {
    let mut seen = HashSet::new();
    let mut out = String::from(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">"#,
    );

    for icon in icons {
        if !seen.insert(icon.id.as_str()) {
            return Err(PipelineError::SpriteError(format!(
                "duplicate symbol id \"{}\"",
                icon.id
            )));
        }

        out.push_str(&format!("<symbol id=\"{}\"", escape_attribute(&icon.id)));
        for (name, value) in &icon.attributes {
            // Values were quoted in the source, so only a bare `"` can break out.
            out.push_str(&format!(" {}=\"{}\"", name, value.replace('"', "&quot;")));
        }
        out.push('>');
        out.push_str(&icon.body);
        out.push_str("</symbol>");
    }

    out.push_str("</svg>");
    Ok(out)
}

/// Escape text for a double-quoted XML attribute.
fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Icon sources in `dir`, excluding the sprite itself.
pub fn icon_sources(dir: &Path, sprite_name: &str) -> Result<Vec<PathBuf>, PipelineError> {
    list_files(dir, false, |path| {
        let is_svg = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("svg"));
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        is_svg && name != sprite_name
    })
}

/// Read every icon in `dir` and return the sprite markup with the icon count.
pub fn sprite_from_dir(dir: &Path, sprite_name: &str) -> Result<(String, usize), PipelineError> {
    let mut icons = Vec::new();

    for path in icon_sources(dir, sprite_name)? {
        let source = fs::read_to_string(&path).map_err(|e| PipelineError::read(&path, e))?;
        let id = path.file_stem().and_then(|s| s.to_str()).unwrap_or("icon");
        icons.push(parse_icon(id, &source)?);
    }

    Ok((build_sprite(&icons)?, icons.len()))
}
