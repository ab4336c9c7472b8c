//! Compressed preview generation.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::entities::AssetFormat;
use crate::domain::errors::PreviewError;
use crate::domain::ports::PreviewPort;

/// Codec parameters for previews.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewSettings {
    /// Lowest acceptable palette quality, 0-100.
    #[serde(default = "default_png_quality_min")]
    pub png_quality_min: u8,

    /// Target palette quality, 0-100.
    #[serde(default = "default_png_quality_max")]
    pub png_quality_max: u8,

    /// Quantizer speed, 1 (slowest) to 10.
    #[serde(default = "default_png_speed")]
    pub png_speed: i32,

    /// Dithering level, 0.0 to 1.0.
    #[serde(default = "default_png_dithering")]
    pub png_dithering: f32,

    /// JPEG quality, 1-100.
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

const fn default_png_quality_min() -> u8 {
    56
}

const fn default_png_quality_max() -> u8 {
    72
}

const fn default_png_speed() -> i32 {
    4
}

const fn default_png_dithering() -> f32 {
    1.0
}

const fn default_jpeg_quality() -> u8 {
    70
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            png_quality_min: default_png_quality_min(),
            png_quality_max: default_png_quality_max(),
            png_speed: default_png_speed(),
            png_dithering: default_png_dithering(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

/// Produces previews with a palette-quantized PNG or a re-encoded JPEG,
/// chosen by the source file's extension.
#[derive(Debug, Clone, Default)]
pub struct CodecPreviewGenerator {
    settings: PreviewSettings,
}

impl CodecPreviewGenerator {
    #[must_use]
    pub const fn new(settings: PreviewSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl PreviewPort for CodecPreviewGenerator {
    async fn generate_preview(
        &self,
        source: &Path,
        dest_dir: &Path,
    ) -> Result<PathBuf, PreviewError> {
        let filename = source
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PreviewError::unsupported(source.display().to_string()))?
            .to_string();
        let format =
            AssetFormat::from_filename(&filename).ok_or_else(|| PreviewError::unsupported(&filename))?;

        let dest = dest_dir.join(&filename);
        let settings = self.settings;
        let job_source = source.to_path_buf();
        let job_dest = dest.clone();
        let job_name = filename.clone();

        let bytes = tokio::task::spawn_blocking(move || {
            encode_preview(&job_source, &job_dest, &job_name, format, settings)
        })
        .await
        .map_err(|e| PreviewError::compression(&filename, format!("encoder task failed: {e}")))??;

        info!(
            filename = %filename,
            format = %format,
            bytes,
            "Preview generated"
        );
        Ok(dest)
    }
}

fn encode_preview(
    source: &Path,
    dest: &Path,
    filename: &str,
    format: AssetFormat,
    settings: PreviewSettings,
) -> Result<u64, PreviewError> {
    let image = image::ImageReader::open(source)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| PreviewError::compression(filename, format!("decode failed: {e}")))?;

    let encoded = match format {
        AssetFormat::Png => quantize_png(&image, settings)
            .map_err(|message| PreviewError::compression(filename, message))?,
        AssetFormat::Jpeg => encode_jpeg(&image, settings.jpeg_quality)
            .map_err(|message| PreviewError::compression(filename, message))?,
    };

    let parent = dest
        .parent()
        .ok_or_else(|| std::io::Error::other("preview path has no parent"))?;
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(&encoded)?;
    temp.as_file().sync_all()?;
    temp.persist(dest).map_err(|e| e.error)?;

    debug!(
        source = %source.display(),
        dest = %dest.display(),
        "Preview written"
    );
    Ok(encoded.len() as u64)
}

fn quantize_png(image: &DynamicImage, settings: PreviewSettings) -> Result<Vec<u8>, String> {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixels: Vec<imagequant::RGBA> = rgba
        .pixels()
        .map(|p| imagequant::RGBA::new(p[0], p[1], p[2], p[3]))
        .collect();

    let mut attr = imagequant::new();
    attr.set_quality(settings.png_quality_min, settings.png_quality_max)
        .map_err(|e| format!("invalid quality range: {e}"))?;
    attr.set_speed(settings.png_speed)
        .map_err(|e| format!("invalid speed: {e}"))?;

    let mut liq_image = attr
        .new_image(pixels, width as usize, height as usize, 0.0)
        .map_err(|e| format!("quantizer rejected image: {e}"))?;
    let mut quantized = attr
        .quantize(&mut liq_image)
        .map_err(|e| format!("quantization failed: {e}"))?;
    quantized
        .set_dithering_level(settings.png_dithering)
        .map_err(|e| format!("invalid dithering level: {e}"))?;
    let (palette, indices) = quantized
        .remapped(&mut liq_image)
        .map_err(|e| format!("remapping failed: {e}"))?;

    let rgb_palette: Vec<u8> = palette.iter().flat_map(|c| [c.r, c.g, c.b]).collect();
    let alpha: Vec<u8> = palette.iter().map(|c| c.a).collect();

    let mut out = Vec::new();
    let mut encoder = png::Encoder::new(&mut out, width, height);
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Best);
    encoder.set_palette(rgb_palette);
    if alpha.iter().any(|&a| a != u8::MAX) {
        encoder.set_trns(alpha);
    }

    let mut writer = encoder
        .write_header()
        .map_err(|e| format!("png header: {e}"))?;
    writer
        .write_image_data(&indices)
        .map_err(|e| format!("png data: {e}"))?;
    writer.finish().map_err(|e| format!("png finish: {e}"))?;

    Ok(out)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, String> {
    let rgb = image.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(&rgb)
        .map_err(|e| format!("jpeg encode: {e}"))?;
    Ok(out)
}
