//! QR image rendering for short links.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;

use crate::error::QrError;

/// Where a rendered QR image ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrDelivery {
    /// Base64 PNG stored on the record and shown as a data URI.
    Inline,
    /// PNG written to the QR directory and served as a static file.
    File,
}

impl std::str::FromStr for QrDelivery {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "file" => Ok(Self::File),
            other => anyhow::bail!("unknown QR_DELIVERY '{other}' (expected 'inline' or 'file')"),
        }
    }
}

/// Renders the QR code for `<base_url>/<code>`.
///
/// Stateless: every call encodes a fresh image. Callers check for an existing
/// image before invoking it.
#[derive(Debug, Clone)]
pub struct QrGenerator {
    base_url: String,
    scale: u32,
}

impl QrGenerator {
    pub fn new(base_url: impl Into<String>, scale: u32) -> Self {
        Self {
            base_url: base_url.into(),
            scale,
        }
    }

    /// The text encoded into the QR image for `code`.
    pub fn payload(&self, code: &str) -> String {
        format!("{}/{}", self.base_url, code)
    }

    /// Encode `code`'s short link as a PNG.
    pub fn render_png(&self, code: &str) -> Result<Vec<u8>, QrError> {
        let qr = QrCode::new(self.payload(code).as_bytes())?;
        let img = qr
            .render::<Luma<u8>>()
            .module_dimensions(self.scale, self.scale)
            .build();

        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(img).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    /// Encode `code`'s short link as a base64 PNG for embedding in a record.
    pub fn render_base64(&self, code: &str) -> Result<String, QrError> {
        Ok(STANDARD.encode(self.render_png(code)?))
    }

    /// Write `<dir>/<code>.png` unless it already exists. Returns the path
    /// either way.
    pub async fn write_png_if_missing(&self, dir: &Path, code: &str) -> Result<PathBuf, QrError> {
        let path = png_path(dir, code);
        if tokio::fs::try_exists(&path).await? {
            return Ok(path);
        }

        let bytes = self.render_png(code)?;
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!("Wrote QR image {}", path.display());
        Ok(path)
    }
}

/// On-disk location of the PNG for `code`.
pub fn png_path(dir: &Path, code: &str) -> PathBuf {
    dir.join(format!("{code}.png"))
}

/// `src` value for an inline base64 PNG.
pub fn data_uri(base64_png: &str) -> String {
    format!("data:image/png;base64,{base64_png}")
}
