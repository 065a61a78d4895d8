//! Image validation logic
//!
//! Checks run in order and stop at the first failure:
//! size, magic bytes, header dimensions, full decode, resample probe and
//! pixel content. The cheap byte-level checks reject truncated files before
//! any decode cost is paid.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use std::any::Any;
use std::fmt;
use std::fs;
use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use thiserror::Error;

use super::verdict::Verdict;
use super::worker_pool::FileCheck;
use crate::config::ValidationLimits;

const JPEG_START: [u8; 3] = [0xFF, 0xD8, 0xFF];
const JPEG_END: [u8; 2] = [0xFF, 0xD9];
const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Formats whose magic bytes are checked before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderFormat {
    Jpeg,
    Png,
    WebP,
}

impl HeaderFormat {
    /// Pick the header check for a path by its lowercase extension.
    ///
    /// Other recognised extensions return `None`; the decoder is
    /// authoritative for them.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderFormat::Jpeg => write!(f, "JPEG"),
            HeaderFormat::Png => write!(f, "PNG"),
            HeaderFormat::WebP => write!(f, "WebP"),
        }
    }
}

/// Why a file was judged corrupt. The `Display` text is the verdict message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Empty file")]
    EmptyFile,

    #[error("Too small: {size} bytes")]
    TooSmall { size: u64 },

    #[error("Invalid {format} header")]
    InvalidHeader { format: HeaderFormat },

    /// JPEG without the trailing end-of-image marker
    #[error("Incomplete JPEG ending")]
    IncompleteEnding,

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Image dimensions too large: {width}x{height} exceeds {max}")]
    DimensionsTooLarge { width: u32, height: u32, max: u32 },

    /// Resample probe produced no pixel data
    #[error("Failed to process image data")]
    ProcessingFailed,

    #[error("Image appears completely transparent/black")]
    AllZero,

    /// I/O failure, decoder error or decoder panic
    #[error("Processing error: {0}")]
    ProcessingError(String),
}

fn processing(err: impl fmt::Display) -> ValidationError {
    ValidationError::ProcessingError(err.to_string())
}

/// Check the format-specific magic bytes of a fully read file.
pub fn check_header(format: HeaderFormat, bytes: &[u8]) -> Result<(), ValidationError> {
    let header_ok = match format {
        HeaderFormat::Jpeg => bytes.starts_with(&JPEG_START),
        HeaderFormat::Png => bytes.starts_with(&PNG_SIGNATURE),
        HeaderFormat::WebP => bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP",
    };
    if !header_ok {
        return Err(ValidationError::InvalidHeader { format });
    }

    if format == HeaderFormat::Jpeg && !bytes.ends_with(&JPEG_END) {
        return Err(ValidationError::IncompleteEnding);
    }

    Ok(())
}

/// Reject zero-sized images and images larger than `max` on either axis.
pub fn check_extent(width: u32, height: u32, max: u32) -> Result<(), ValidationError> {
    if width == 0 || height == 0 {
        return Err(ValidationError::InvalidDimensions { width, height });
    }
    if width > max || height > max {
        return Err(ValidationError::DimensionsTooLarge { width, height, max });
    }
    Ok(())
}

/// The resample probe must yield some pixel data.
pub fn check_probe_data(pixels: &[u8]) -> Result<(), ValidationError> {
    if pixels.is_empty() {
        return Err(ValidationError::ProcessingFailed);
    }
    Ok(())
}

/// Fail when every byte of the probe buffer is zero.
pub fn check_content(pixels: &[u8]) -> Result<(), ValidationError> {
    if pixels.iter().all(|&b| b == 0) {
        return Err(ValidationError::AllZero);
    }
    Ok(())
}

/// Multi-stage structural validator for image files.
#[derive(Debug, Clone, Default)]
pub struct ImageValidator {
    limits: ValidationLimits,
}

impl ImageValidator {
    pub fn new(limits: ValidationLimits) -> Self {
        Self { limits }
    }

    /// Validate one file and wrap the outcome as a verdict.
    ///
    /// Never panics and never returns an error: every failure is data.
    /// The verdict carries the file size whenever the file could be stat'ed.
    pub fn validate(&self, path: &Path) -> Verdict {
        let size = match file_size(path) {
            Ok(size) => size,
            Err(e) => return Verdict::fail(path, e),
        };
        let verdict = match self.check_sized(path, size) {
            Ok(()) => Verdict::pass(path),
            Err(e) => Verdict::fail(path, e),
        };
        verdict.with_size(size)
    }

    /// Run every stage, returning the first failure.
    pub fn check(&self, path: &Path) -> Result<(), ValidationError> {
        let size = file_size(path)?;
        self.check_sized(path, size)
    }

    fn check_sized(&self, path: &Path, size: u64) -> Result<(), ValidationError> {
        let bytes = self.quick_validate(path, size)?;

        // Decoders are third-party code running on hostile input
        let probe = panic::catch_unwind(AssertUnwindSafe(|| self.decode_and_probe(&bytes)))
            .map_err(|payload| {
                ValidationError::ProcessingError(format!(
                    "decoder panicked: {}",
                    panic_message(payload.as_ref())
                ))
            })??;

        check_content(&probe)
    }

    /// Size and magic-byte checks. Returns the file contents for decoding.
    fn quick_validate(&self, path: &Path, size: u64) -> Result<Vec<u8>, ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }
        if size < self.limits.min_file_size {
            return Err(ValidationError::TooSmall { size });
        }

        let bytes = fs::read(path).map_err(processing)?;
        if let Some(format) = HeaderFormat::from_path(path) {
            check_header(format, &bytes)?;
        }
        Ok(bytes)
    }

    fn decode_and_probe(&self, bytes: &[u8]) -> Result<Vec<u8>, ValidationError> {
        self.check_dimensions(bytes)?;

        let image = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(processing)?
            .decode()
            .map_err(processing)?;

        let (width, height) = image.dimensions();
        check_extent(width, height, self.limits.max_dimension)?;

        self.resample_probe(&image)
    }

    /// Read dimensions from the header alone, before allocating pixels.
    fn check_dimensions(&self, bytes: &[u8]) -> Result<(), ValidationError> {
        let (width, height) = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(processing)?
            .into_dimensions()
            .map_err(processing)?;

        check_extent(width, height, self.limits.max_dimension)
    }

    /// Downscale to at most `probe_size` per axis and return raw pixels
    /// in the image's native channel layout.
    fn resample_probe(&self, image: &DynamicImage) -> Result<Vec<u8>, ValidationError> {
        let (width, height) = image.dimensions();
        let target = self.limits.probe_size;
        let probe = image.resize_exact(width.min(target), height.min(target), FilterType::Triangle);

        let pixels = probe.into_bytes();
        check_probe_data(&pixels)?;
        Ok(pixels)
    }
}

impl FileCheck for ImageValidator {
    fn check_file(&self, path: &Path) -> Verdict {
        self.validate(path)
    }
}

fn file_size(path: &Path) -> Result<u64, ValidationError> {
    Ok(fs::metadata(path).map_err(processing)?.len())
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
