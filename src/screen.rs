//! Screen capture decoding and normalization.
//!
//! The control script answers `screen` with an encoded still image (PNG from
//! BizHawk). Everything handed to the agent goes through [`normalize`], which
//! pins the frame to the native GBA resolution.

use std::io::Cursor;
use std::ops::Deref;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbImage};

use crate::error::{Error, Result};

/// Native GBA resolution
pub const SCREEN_WIDTH: u32 = 240;
pub const SCREEN_HEIGHT: u32 = 160;
pub const SCREEN_CHANNELS: usize = 3;

/// A frame at exactly `SCREEN_WIDTH` x `SCREEN_HEIGHT`, 8-bit RGB.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation(RgbImage);

impl Observation {
    /// (height, width, channels), row-major.
    pub fn shape(&self) -> (usize, usize, usize) {
        (
            self.0.height() as usize,
            self.0.width() as usize,
            SCREEN_CHANNELS,
        )
    }

    pub fn image(&self) -> &RgbImage {
        &self.0
    }

    pub fn into_image(self) -> RgbImage {
        self.0
    }

    /// Raw pixel bytes, `height * width * 3` long.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_raw()
    }
}

impl Deref for Observation {
    type Target = RgbImage;

    fn deref(&self) -> &RgbImage {
        &self.0
    }
}

pub fn decode(raw: &[u8]) -> Result<RgbImage> {
    let image = image::load_from_memory(raw).map_err(|e| Error::DecodeError(e.to_string()))?;
    Ok(image.to_rgb8())
}

pub fn normalize(grid: RgbImage) -> Observation {
    if grid.dimensions() == (SCREEN_WIDTH, SCREEN_HEIGHT) {
        return Observation(grid);
    }
    tracing::debug!(
        "Resizing frame from {}x{} to {}x{}",
        grid.width(),
        grid.height(),
        SCREEN_WIDTH,
        SCREEN_HEIGHT
    );
    Observation(imageops::resize(
        &grid,
        SCREEN_WIDTH,
        SCREEN_HEIGHT,
        FilterType::Triangle,
    ))
}

/// PNG, then standard padded base64.
pub fn to_base64(grid: &RgbImage) -> Result<String> {
    let mut png = Cursor::new(Vec::new());
    grid.write_to(&mut png, ImageFormat::Png)
        .map_err(|e| Error::EncodeError(e.to_string()))?;
    Ok(STANDARD.encode(png.into_inner()))
}

pub fn from_base64(text: &str) -> Result<RgbImage> {
    let bytes = STANDARD
        .decode(text.trim())
        .map_err(|e| Error::DecodeError(e.to_string()))?;
    decode(&bytes)
}

/// Output format follows the file extension.
pub fn save_screenshot(grid: &RgbImage, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    grid.save(path).map_err(|e| {
        tracing::error!("Failed to save screenshot {}: {}", path.display(), e);
        Error::EncodeError(e.to_string())
    })
}

pub fn pixel_color(grid: &RgbImage, x: u32, y: u32) -> Option<[u8; 3]> {
    grid.get_pixel_checked(x, y).map(|p| p.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn encode_png(grid: &RgbImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        grid.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn test_decode_png_native_size() {
        let grid = gradient(17, 9);
        let decoded = decode(&encode_png(&grid)).unwrap();
        assert_eq!(decoded, grid);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, Error::DecodeError(_)));

        let err = decode(&[]).unwrap_err();
        assert!(matches!(err, Error::DecodeError(_)));
    }

    #[test]
    fn test_normalize_resizes_to_canonical_shape() {
        for (w, h) in [(480, 320), (100, 50), (1, 1), (240, 161)] {
            let obs = normalize(gradient(w, h));
            assert_eq!(obs.shape(), (160, 240, 3));
            assert_eq!(obs.as_bytes().len(), 160 * 240 * 3);
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let grid = gradient(SCREEN_WIDTH, SCREEN_HEIGHT);
        let once = normalize(grid.clone());
        assert_eq!(once.image(), &grid);

        let twice = normalize(once.clone().into_image());
        assert_eq!(twice, once);
    }

    #[test]
    fn test_base64_round_trip() {
        let grid = gradient(SCREEN_WIDTH, SCREEN_HEIGHT);
        let text = to_base64(&grid).unwrap();
        assert!(text.is_ascii());
        assert_eq!(from_base64(&text).unwrap(), grid);
    }

    #[test]
    fn test_from_base64_rejects_bad_text() {
        assert!(matches!(
            from_base64("***").unwrap_err(),
            Error::DecodeError(_)
        ));
        // valid base64, not an image
        assert!(matches!(
            from_base64("aGVsbG8=").unwrap_err(),
            Error::DecodeError(_)
        ));
    }

    #[test]
    fn test_pixel_color() {
        let mut grid = RgbImage::new(4, 3);
        grid.put_pixel(2, 1, Rgb([10, 20, 30]));
        assert_eq!(pixel_color(&grid, 2, 1), Some([10, 20, 30]));
        assert_eq!(pixel_color(&grid, 0, 0), Some([0, 0, 0]));
        assert_eq!(pixel_color(&grid, 4, 0), None);
        assert_eq!(pixel_color(&grid, 0, 3), None);
    }

    #[test]
    fn test_save_screenshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let grid = gradient(8, 8);
        save_screenshot(&grid, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(decode(&bytes).unwrap(), grid);

        let missing = dir.path().join("no-such-dir").join("frame.png");
        assert!(matches!(
            save_screenshot(&grid, missing).unwrap_err(),
            Error::EncodeError(_)
        ));
    }
}
