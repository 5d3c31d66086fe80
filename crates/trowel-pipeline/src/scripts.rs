//! Script bundling: concatenate, parse with oxc, print minified with a map.
//!
//! A bundle is minified as one program, so its source map has a single
//! source. For one input that is the input's path; for several it is the
//! bundle name, and positions are offsets into the concatenated text.

use std::fs;
use std::path::{Path, PathBuf};

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;

use crate::error::PipelineError;

/// A minified script bundle and its source map.
#[derive(Debug, Clone)]
pub struct CompiledScript {
    /// Minified code ending with a `sourceMappingURL` comment
    pub code: String,
    /// Source map JSON, when the printer produced one
    pub map: Option<String>,
}

/// Concatenate `sources` in order and minify the result.
///
/// `bundle_name` names the bundle inside the source map; `output_name` is the
/// file name the bundle will be written under.
pub fn bundle_scripts(
    sources: &[PathBuf],
    bundle_name: &str,
    output_name: &str,
) -> Result<CompiledScript, PipelineError> {
    let mut combined = String::new();
    for path in sources {
        let source = fs::read_to_string(path).map_err(|e| PipelineError::read(path, e))?;
        combined.push_str(&source);
        // Guard against files that omit their trailing semicolon.
        combined.push_str("\n;\n");
    }

    let label = match sources {
        [single] => single.clone(),
        _ => PathBuf::from(bundle_name),
    };

    minify_script(&combined, &label, output_name)
}

/// Minify one script. `label` is the path reported in errors and in the map.
pub fn minify_script(
    source: &str,
    label: &Path,
    output_name: &str,
) -> Result<CompiledScript, PipelineError> {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, source, SourceType::cjs()).parse();

    if parsed.panicked || !parsed.errors.is_empty() {
        let message = parsed
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(PipelineError::ScriptError {
            path: label.display().to_string(),
            message: if message.is_empty() {
                "parser aborted".to_string()
            } else {
                message
            },
        });
    }

    let options = CodegenOptions {
        source_map_path: Some(label.to_path_buf()),
        ..CodegenOptions::minify()
    };
    let printed = Codegen::new().with_options(options).build(&parsed.program);

    Ok(CompiledScript {
        code: format!("{}\n//# sourceMappingURL={}.map", printed.code.trim_end(), output_name),
        map: printed.map.map(|m| m.to_json_string()),
    })
}
