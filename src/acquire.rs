//! Download and decoding of the overlay raster
//!
//! The overlay file is downloaded into a scratch file that is removed when
//! acquisition finishes, whatever the outcome. Decoding tries a prioritized
//! list of decoders and keeps the first success.

use image::{DynamicImage, GenericImageView, ImageBuffer, Luma, Rgb, Rgba};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::ColorType;

use crate::error::AnnotateResult;
use crate::models::FileDescriptor;
use crate::registry::RegistryClient;

/// Error type for decoding failures
#[derive(Debug, Error)]
#[error("cannot decode {} with {decoder} decoder: {message}", .path.display())]
pub struct DecodeError {
    pub decoder: &'static str,
    pub path: PathBuf,
    pub message: String,
}

impl DecodeError {
    fn new(decoder: &'static str, path: &Path, message: impl ToString) -> Self {
        Self { decoder, path: path.to_path_buf(), message: message.to_string() }
    }
}

/// Something that can turn a local file into a raster.
pub trait RasterDecoder {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    fn decode(&self, path: &Path) -> Result<DynamicImage, DecodeError>;
}

/// General decoder backed by the `image` crate; the format is guessed from content.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl RasterDecoder for ImageDecoder {
    fn name(&self) -> &'static str {
        "image"
    }

    fn decode(&self, path: &Path) -> Result<DynamicImage, DecodeError> {
        let err = |e: &dyn std::fmt::Display| DecodeError::new(self.name(), path, e);
        image::io::Reader::open(path)
            .map_err(|e| err(&e))?
            .with_guessed_format()
            .map_err(|e| err(&e))?
            .decode()
            .map_err(|e| err(&e))
    }
}

/// Decoder for large tiled or pyramidal TIFF files.
///
/// Reads the first directory (the full resolution level) without the
/// allocation limits of the general decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiledTiffDecoder;

impl TiledTiffDecoder {
    fn read(path: &Path) -> Result<DynamicImage, String> {
        let file = File::open(path).map_err(|e| e.to_string())?;
        let mut decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| e.to_string())?
            .with_limits(Limits::unlimited());

        let (width, height) = decoder.dimensions().map_err(|e| e.to_string())?;
        let color = decoder.colortype().map_err(|e| e.to_string())?;
        let pixels = decoder.read_image().map_err(|e| e.to_string())?;

        let image = match (color, pixels) {
            (ColorType::Gray(8), DecodingResult::U8(buf)) => {
                ImageBuffer::<Luma<u8>, _>::from_raw(width, height, buf)
                    .map(DynamicImage::ImageLuma8)
            }
            (ColorType::RGB(8), DecodingResult::U8(buf)) => {
                ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buf)
                    .map(DynamicImage::ImageRgb8)
            }
            (ColorType::RGBA(8), DecodingResult::U8(buf)) => {
                ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, buf)
                    .map(DynamicImage::ImageRgba8)
            }
            (ColorType::Gray(16), DecodingResult::U16(buf)) => {
                ImageBuffer::<Luma<u16>, _>::from_raw(width, height, buf)
                    .map(DynamicImage::ImageLuma16)
            }
            (ColorType::RGB(16), DecodingResult::U16(buf)) => {
                ImageBuffer::<Rgb<u16>, _>::from_raw(width, height, buf)
                    .map(DynamicImage::ImageRgb16)
            }
            (ColorType::RGBA(16), DecodingResult::U16(buf)) => {
                ImageBuffer::<Rgba<u16>, _>::from_raw(width, height, buf)
                    .map(DynamicImage::ImageRgba16)
            }
            (other, _) => return Err(format!("unsupported TIFF color type {:?}", other)),
        };

        image.ok_or_else(|| "pixel buffer does not match image dimensions".to_string())
    }
}

impl RasterDecoder for TiledTiffDecoder {
    fn name(&self) -> &'static str {
        "tiled-tiff"
    }

    fn decode(&self, path: &Path) -> Result<DynamicImage, DecodeError> {
        Self::read(path).map_err(|message| DecodeError::new(self.name(), path, message))
    }
}

/// The general decoder followed by the tiled TIFF fallback.
pub fn default_decoders() -> Vec<Box<dyn RasterDecoder>> {
    vec![Box::new(ImageDecoder), Box::new(TiledTiffDecoder)]
}

/// Decode `path` with the first decoder that succeeds.
///
/// When every decoder fails, the error of the first one is returned.
pub fn decode_with(
    decoders: &[Box<dyn RasterDecoder>],
    path: &Path,
) -> Result<DynamicImage, DecodeError> {
    let mut first_error = None;

    for decoder in decoders {
        match decoder.decode(path) {
            Ok(image) => {
                tracing::debug!(
                    decoder = decoder.name(),
                    width = image.width(),
                    height = image.height(),
                    "decoded overlay"
                );
                return Ok(image);
            }
            Err(e) => {
                tracing::warn!("{}", e);
                first_error.get_or_insert(e);
            }
        }
    }

    Err(first_error.unwrap_or_else(|| DecodeError::new("none", path, "no decoders configured")))
}

/// Download `file` into a scratch file named after its extension.
///
/// The returned guard deletes the file when dropped.
pub fn download_to_scratch<C: RegistryClient + ?Sized>(
    client: &C,
    file: &FileDescriptor,
) -> AnnotateResult<NamedTempFile> {
    let suffix = file.extension().unwrap_or_default();
    let scratch = tempfile::Builder::new()
        .prefix("overlay-")
        .suffix(&suffix)
        .tempfile()?;

    tracing::info!(file = %file.name, size = ?file.size, "downloading overlay");
    client.download_file(&file.id, scratch.path())?;
    Ok(scratch)
}

/// Download and decode the overlay raster.
pub fn acquire_overlay<C: RegistryClient + ?Sized>(
    client: &C,
    file: &FileDescriptor,
    decoders: &[Box<dyn RasterDecoder>],
) -> AnnotateResult<DynamicImage> {
    let scratch = download_to_scratch(client, file)?;
    let image = decode_with(decoders, scratch.path())?;
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnnotateError;
    use crate::registry::MemoryRegistry;
    use image::{GrayImage, RgbImage};
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        image.write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Png).unwrap();
        buf
    }

    fn tiff_bytes(width: u32, height: u32, data: &[u8]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        tiff::encoder::TiffEncoder::new(&mut buf)
            .unwrap()
            .write_image::<tiff::encoder::colortype::Gray8>(width, height, data)
            .unwrap();
        buf.into_inner()
    }

    fn file(name: &str) -> FileDescriptor {
        FileDescriptor {
            id: "f1".into(),
            name: name.into(),
            mime_type: Some("image/png".into()),
            size: None,
        }
    }

    /// Fails every time and remembers which path it was given.
    struct Failing(Rc<RefCell<Vec<PathBuf>>>);

    impl RasterDecoder for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn decode(&self, path: &Path) -> Result<DynamicImage, DecodeError> {
            self.0.borrow_mut().push(path.to_path_buf());
            Err(DecodeError::new(self.name(), path, "nope"))
        }
    }

    #[test]
    fn test_image_decoder_reads_png() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 2, Rgb([9, 8, 7])));
        let scratch = NamedTempFile::new().unwrap();
        std::fs::write(scratch.path(), png_bytes(&source)).unwrap();

        let decoded = ImageDecoder.decode(scratch.path()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
        assert_eq!(decoded.to_rgb8().get_pixel(2, 1), &Rgb([9, 8, 7]));
    }

    #[test]
    fn test_tiff_decoder_reads_gray() {
        let scratch = NamedTempFile::new().unwrap();
        std::fs::write(scratch.path(), tiff_bytes(2, 2, &[0, 1, 2, 3])).unwrap();

        let decoded = TiledTiffDecoder.decode(scratch.path()).unwrap();
        let gray = decoded.as_luma8().unwrap();
        assert_eq!(gray.get_pixel(1, 1).0, [3]);
    }

    #[test]
    fn test_tiff_decoder_rejects_png() {
        let source = DynamicImage::ImageLuma8(GrayImage::new(1, 1));
        let scratch = NamedTempFile::new().unwrap();
        std::fs::write(scratch.path(), png_bytes(&source)).unwrap();

        assert!(TiledTiffDecoder.decode(scratch.path()).is_err());
    }

    #[test]
    fn test_fallback_decoder_used_after_failure() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let decoders: Vec<Box<dyn RasterDecoder>> =
            vec![Box::new(Failing(seen.clone())), Box::new(TiledTiffDecoder)];

        let scratch = NamedTempFile::new().unwrap();
        std::fs::write(scratch.path(), tiff_bytes(1, 1, &[5])).unwrap();

        let decoded = decode_with(&decoders, scratch.path()).unwrap();
        assert_eq!(decoded.as_luma8().unwrap().get_pixel(0, 0).0, [5]);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_first_error_wins_when_all_fail() {
        let scratch = NamedTempFile::new().unwrap();
        std::fs::write(scratch.path(), b"not an image").unwrap();

        let err = decode_with(&default_decoders(), scratch.path()).unwrap_err();
        assert_eq!(err.decoder, "image");
    }

    #[test]
    fn test_acquire_downloads_and_cleans_up() {
        let registry = MemoryRegistry::new();
        let source = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        registry.insert_file("f1", png_bytes(&source));

        let image = acquire_overlay(&registry, &file("overlay.png"), &default_decoders()).unwrap();
        assert_eq!(image.width(), 4);
        assert_eq!(registry.calls(), vec!["DOWNLOAD f1".to_string()]);
    }

    #[test]
    fn test_scratch_file_removed_after_decode_failure() {
        let registry = MemoryRegistry::new();
        registry.insert_file("f1", b"garbage".to_vec());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let decoders: Vec<Box<dyn RasterDecoder>> = vec![Box::new(Failing(seen.clone()))];

        let err = acquire_overlay(&registry, &file("overlay.tiff"), &decoders).unwrap_err();
        assert!(matches!(err, AnnotateError::Decode(_)));

        let paths = seen.borrow();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].to_string_lossy().ends_with(".tiff"));
        assert!(!paths[0].exists());
    }

    #[test]
    fn test_scratch_file_removed_on_drop() {
        let registry = MemoryRegistry::new();
        registry.insert_file("f1", vec![1, 2, 3]);

        let scratch = download_to_scratch(&registry, &file("a.png")).unwrap();
        let path = scratch.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);

        drop(scratch);
        assert!(!path.exists());
    }
}
