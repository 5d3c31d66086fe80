//! Raster image optimisation and WebP conversion.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::DynamicImage;
use rayon::prelude::*;

use crate::error::PipelineError;
use crate::files::{list_files, write_file};

const RASTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Outcome of optimising one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizedImage {
    pub output: PathBuf,
    pub original_bytes: u64,
    pub written_bytes: u64,
}

/// Whether a path is a PNG or JPEG.
pub fn is_raster(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| RASTER_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

/// List raster images under `dir`.
pub fn raster_images(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, PipelineError> {
    list_files(dir, recursive, is_raster)
}

/// Re-encode every raster image below `src_root` into `out_root`, keeping
/// relative paths. An image whose re-encoding is not smaller is copied as is.
pub fn optimize_images(
    src_root: &Path,
    out_root: &Path,
    jpeg_quality: u8,
) -> Result<Vec<OptimizedImage>, PipelineError> {
    let images = raster_images(src_root, true)?;

    images
        .par_iter()
        .map(|path| {
            let relative = path.strip_prefix(src_root).unwrap_or(path);
            optimize_image(path, &out_root.join(relative), jpeg_quality)
        })
        .collect()
}

/// Re-encode a single image.
pub fn optimize_image(
    source: &Path,
    output: &Path,
    jpeg_quality: u8,
) -> Result<OptimizedImage, PipelineError> {
    let original = fs::read(source).map_err(|e| PipelineError::read(source, e))?;
    let decoded = image::load_from_memory(&original).map_err(|e| image_error(source, e))?;

    let reencoded = if is_png(source) {
        encode_png(&decoded)
    } else {
        encode_jpeg(&decoded, jpeg_quality)
    }
    .map_err(|e| image_error(source, e))?;

    let bytes = if reencoded.len() < original.len() {
        reencoded
    } else {
        original.clone()
    };

    write_file(output, &bytes)?;

    let result = OptimizedImage {
        output: output.to_path_buf(),
        original_bytes: original.len() as u64,
        written_bytes: bytes.len() as u64,
    };
    tracing::debug!(
        "{}: {} -> {} bytes",
        source.display(),
        result.original_bytes,
        result.written_bytes
    );
    Ok(result)
}

/// Convert the top-level raster images in `src_dir` to lossless WebP files in
/// `out_dir`. Returns the written paths.
pub fn convert_to_webp(src_dir: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let images = raster_images(src_dir, false)?;

    images
        .par_iter()
        .map(|path| {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
            let output = out_dir.join(format!("{}.webp", stem));
            write_webp(path, &output)?;
            Ok(output)
        })
        .collect()
}

fn write_webp(source: &Path, output: &Path) -> Result<(), PipelineError> {
    let decoded = image::open(source).map_err(|e| image_error(source, e))?;
    // The WebP encoder takes 8-bit RGB(A) only.
    let rgba = DynamicImage::ImageRgba8(decoded.to_rgba8());

    let mut buffer = Vec::new();
    rgba.write_with_encoder(WebPEncoder::new_lossless(&mut buffer))
        .map_err(|e| image_error(source, e))?;

    write_file(output, buffer)
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut out = Cursor::new(Vec::new());
    image.write_with_encoder(PngEncoder::new_with_quality(
        &mut out,
        CompressionType::Best,
        FilterType::Adaptive,
    ))?;
    Ok(out.into_inner())
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut out = Cursor::new(Vec::new());
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)))?;
    Ok(out.into_inner())
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

fn image_error(path: &Path, err: image::ImageError) -> PipelineError {
    PipelineError::ImageError {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use tempfile::tempdir;

    fn write_png(path: &Path) {
        let img = RgbImage::from_fn(32, 32, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 128]));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        DynamicImage::ImageRgb8(img)
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn optimizes_nested_images() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("img");
        let out = temp.path().join("dist/img");
        write_png(&src.join("hero.png"));
        write_png(&src.join("team/alice.png"));
        fs::write(src.join("notes.txt"), "not an image").unwrap();

        let results = optimize_images(&src, &out, 80).unwrap();

        assert_eq!(results.len(), 2);
        assert!(out.join("hero.png").exists());
        assert!(out.join("team/alice.png").exists());
        for r in results {
            assert!(r.written_bytes <= r.original_bytes);
        }
    }

    #[test]
    fn converts_top_level_images_to_webp() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("img");
        write_png(&src.join("hero.png"));
        write_png(&src.join("nested/skip.png"));

        let written = convert_to_webp(&src, &src).unwrap();

        assert_eq!(written, vec![src.join("hero.webp")]);
        let bytes = fs::read(src.join("hero.webp")).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
    }

    #[test]
    fn corrupt_image_is_reported() {
        let temp = tempdir().unwrap();
        let bad = temp.path().join("bad.jpg");
        fs::write(&bad, b"definitely not a jpeg").unwrap();

        let err = optimize_image(&bad, &temp.path().join("out.jpg"), 80).unwrap_err();

        assert!(matches!(err, PipelineError::ImageError { .. }));
    }

    #[test]
    fn recognises_raster_extensions() {
        assert!(is_raster(Path::new("a.PNG")));
        assert!(is_raster(Path::new("a.jpeg")));
        assert!(!is_raster(Path::new("a.webp")));
        assert!(!is_raster(Path::new("a.svg")));
    }
}
