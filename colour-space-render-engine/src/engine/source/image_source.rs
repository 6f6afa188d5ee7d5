use std::path::{Path, PathBuf};
use thiserror::Error;

/// Bytes per RGBA8 pixel.
const RGBA_STRIDE: usize = 4;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no image was selected")]
    NoSelection,
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image has zero size ({width}x{height})")]
    ZeroSize { width: u32, height: u32 },
    #[error("pixel buffer holds {actual} bytes, a {width}x{height} RGBA8 image needs {expected}")]
    BufferLength {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// A decoded image in row-major RGBA8, guaranteed non-empty with a buffer of exactly
/// `width * height * 4` bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl SourceImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, SourceError> {
        if width == 0 || height == 0 {
            return Err(SourceError::ZeroSize { width, height });
        }

        let expected = width as usize * height as usize * RGBA_STRIDE;
        if pixels.len() != expected {
            return Err(SourceError::BufferLength {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Builds an image from one RGBA colour per pixel.
    pub fn from_rgba(width: u32, height: u32, pixels: &[[u8; 4]]) -> Result<Self, SourceError> {
        Self::new(width, height, pixels.concat())
    }

    /// Decodes any format the `image` crate recognises (png, jpeg, ...).
    pub fn from_encoded(bytes: &[u8]) -> Result<Self, SourceError> {
        let decoded = image::load_from_memory(bytes)?.into_rgba8();
        let (width, height) = decoded.dimensions();
        Self::new(width, height, decoded.into_raw())
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_encoded(&bytes)
    }

    /// Opens the selection of a picker-style collaborator; `None` means the user cancelled.
    pub fn open_selection(path: Option<&Path>) -> Result<Self, SourceError> {
        match path {
            Some(path) if !path.as_os_str().is_empty() => Self::open(path),
            _ => Err(SourceError::NoSelection),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Raw RGBA8 bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// One `[r, g, b, a]` per pixel, row-major.
    pub fn rgba(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.pixels
            .chunks_exact(RGBA_STRIDE)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};
    use std::io::Cursor;

    fn encode_png(image: &RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn rejects_zero_sized_images() {
        assert!(matches!(
            SourceImage::new(0, 4, Vec::new()),
            Err(SourceError::ZeroSize { width: 0, height: 4 })
        ));
    }

    #[test]
    fn rejects_short_buffers() {
        let err = SourceImage::new(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(
            err,
            SourceError::BufferLength {
                expected: 16,
                actual: 15,
                ..
            }
        ));
    }

    #[test]
    fn empty_bytes_fail_to_decode() {
        assert!(matches!(
            SourceImage::from_encoded(&[]),
            Err(SourceError::Decode(_))
        ));
    }

    #[test]
    fn decodes_png_to_rgba8() {
        let mut png = RgbaImage::new(3, 2);
        png.put_pixel(2, 1, image::Rgba([10, 20, 30, 255]));
        let image = SourceImage::from_encoded(&encode_png(&png)).unwrap();

        assert_eq!((image.width(), image.height()), (3, 2));
        assert_eq!(image.pixel_count(), 6);
        assert_eq!(image.rgba().last(), Some([10, 20, 30, 255]));
    }

    #[test]
    fn missing_files_report_the_path() {
        let path = Path::new("definitely/not/here.png");
        match SourceImage::open(path) {
            Err(SourceError::Io { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected an io error, got {other:?}"),
        }
    }

    #[test]
    fn cancelled_selection_is_reported() {
        assert!(matches!(
            SourceImage::open_selection(None),
            Err(SourceError::NoSelection)
        ));
    }
}
