use crate::error::{Error, Result};
use crate::models::OpArg;
use async_trait::async_trait;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView, ImageFormat};
use std::path::Path;

/// Resampling filter used by every resizing operation
const FILTER: FilterType = FilterType::Triangle;

/// Largest output side accepted by any resizing operation
const MAX_SIDE: u32 = 16_384;

/// Largest output area accepted by any resizing operation
const MAX_PIXELS: u64 = 100_000_000;

/// Decoded image plus the container format it was read from.
#[derive(Debug, Clone)]
pub struct ImageHandle {
    pub image: DynamicImage,
    pub format: ImageFormat,
}

impl ImageHandle {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Image-processing collaborator used by the conversion stage.
#[async_trait]
pub trait ImageProcessor: Send + Sync {
    /// Reads and decodes the file at `path`.
    async fn decode(&self, path: &Path) -> Result<ImageHandle>;

    /// Applies one named operation with positional arguments.
    fn apply(&self, image: &mut ImageHandle, operation: &str, args: &[OpArg]) -> Result<()>;

    /// Encodes `image` in its own format and writes it to `path`.
    async fn encode(&self, image: &ImageHandle, path: &Path) -> Result<()>;
}

/// [`ImageProcessor`] backed by the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterProcessor;

impl RasterProcessor {
    pub fn new() -> Self {
        Self
    }

    fn resize(image: &DynamicImage, operation: &str, args: &[OpArg]) -> Result<DynamicImage> {
        let (width, height) = image.dimensions();
        let target = match (dimension(operation, args, 0)?, dimension(operation, args, 1)?) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, scaled(height, w, width)),
            (None, Some(h)) => (scaled(width, h, height), h),
            (None, None) => {
                return Err(Error::invalid_argument(
                    operation,
                    "width and height cannot both be auto",
                ));
            }
        };
        let (w, h) = bounded(operation, target.0, target.1)?;
        Ok(image.resize_exact(w, h, FILTER))
    }
}

#[async_trait]
impl ImageProcessor for RasterProcessor {
    async fn decode(&self, path: &Path) -> Result<ImageHandle> {
        let data = tokio::fs::read(path).await?;
        let decode_error = |e: image::ImageError| Error::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let format = image::guess_format(&data).map_err(decode_error)?;
        let image = image::load_from_memory_with_format(&data, format).map_err(decode_error)?;

        Ok(ImageHandle { image, format })
    }

    fn apply(&self, handle: &mut ImageHandle, operation: &str, args: &[OpArg]) -> Result<()> {
        let image = &mut handle.image;
        match operation {
            "resize" => {
                *image = Self::resize(image, operation, args)?;
            }
            "scale" => {
                let factor = number(operation, args, 0)?;
                if factor <= 0.0 {
                    return Err(Error::invalid_argument(operation, "factor must be positive"));
                }
                let (width, height) = image.dimensions();
                let w = ((width as f64 * factor).round() as u32).max(1);
                let h = ((height as f64 * factor).round() as u32).max(1);
                let (w, h) = bounded(operation, w, h)?;
                *image = image.resize_exact(w, h, FILTER);
            }
            "cover" => {
                let (w, h) = exact_size(operation, args)?;
                *image = image.resize_to_fill(w, h, FILTER);
            }
            "contain" => {
                let (w, h) = exact_size(operation, args)?;
                *image = image.resize(w, h, FILTER);
            }
            "crop" => {
                let x = pixels(operation, args, 0)?;
                let y = pixels(operation, args, 1)?;
                let w = pixels(operation, args, 2)?;
                let h = pixels(operation, args, 3)?;
                let (width, height) = image.dimensions();
                if w == 0 || h == 0 || x.saturating_add(w) > width || y.saturating_add(h) > height {
                    return Err(Error::invalid_argument(
                        operation,
                        format!("region {}x{}+{}+{} outside {}x{}", w, h, x, y, width, height),
                    ));
                }
                *image = image.crop_imm(x, y, w, h);
            }
            "rotate" => {
                let degrees = number(operation, args, 0)?;
                if degrees.fract() != 0.0 || (degrees as i64) % 90 != 0 {
                    return Err(Error::invalid_argument(
                        operation,
                        "only multiples of 90 degrees are supported",
                    ));
                }
                match (degrees as i64).rem_euclid(360) {
                    90 => *image = image.rotate90(),
                    180 => *image = image.rotate180(),
                    270 => *image = image.rotate270(),
                    _ => {}
                }
            }
            "flip" | "mirror" => {
                if flag(operation, args, 0)? {
                    *image = image.fliph();
                }
                if flag(operation, args, 1)? {
                    *image = image.flipv();
                }
            }
            "greyscale" | "grayscale" => {
                *image = image.grayscale();
            }
            "invert" => {
                image.invert();
            }
            "blur" => {
                let sigma = number(operation, args, 0)?;
                *image = image.blur(sigma as f32);
            }
            "brightness" => {
                let delta = number(operation, args, 0)?;
                *image = image.brighten(delta.round() as i32);
            }
            "contrast" => {
                let value = number(operation, args, 0)?;
                *image = image.adjust_contrast(value as f32);
            }
            other => return Err(Error::UnsupportedOperation(other.to_string())),
        }
        Ok(())
    }

    async fn encode(&self, handle: &ImageHandle, path: &Path) -> Result<()> {
        let image = match handle.format {
            // JPEG carries neither alpha nor 16-bit channels
            ImageFormat::Jpeg if !matches!(handle.image.color(), ColorType::L8 | ColorType::Rgb8) => {
                DynamicImage::ImageRgb8(handle.image.to_rgb8())
            }
            _ => handle.image.clone(),
        };

        let mut data = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut data), handle.format)
            .map_err(|e| Error::Encode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        tokio::fs::write(path, data).await?;
        Ok(())
    }
}

fn scaled(side: u32, target: u32, reference: u32) -> u32 {
    ((side as f64 * target as f64 / reference as f64).round() as u32).max(1)
}

fn arg<'a>(operation: &str, args: &'a [OpArg], index: usize) -> Result<&'a OpArg> {
    args.get(index)
        .ok_or_else(|| Error::invalid_argument(operation, format!("missing argument {}", index + 1)))
}

fn number(operation: &str, args: &[OpArg], index: usize) -> Result<f64> {
    arg(operation, args, index)?
        .as_f64()
        .filter(|n| n.is_finite())
        .ok_or_else(|| {
            Error::invalid_argument(operation, format!("argument {} must be a number", index + 1))
        })
}

fn pixels(operation: &str, args: &[OpArg], index: usize) -> Result<u32> {
    let n = number(operation, args, index)?;
    if n < 0.0 || n > u32::MAX as f64 {
        return Err(Error::invalid_argument(
            operation,
            format!("argument {} out of range", index + 1),
        ));
    }
    Ok(n.round() as u32)
}

/// A positive pixel size, or `None` for [`OpArg::Auto`].
fn dimension(operation: &str, args: &[OpArg], index: usize) -> Result<Option<u32>> {
    if let OpArg::Auto = arg(operation, args, index)? {
        return Ok(None);
    }
    let n = pixels(operation, args, index)?;
    if n == 0 {
        return Err(Error::invalid_argument(operation, "size must be positive"));
    }
    if n > MAX_SIDE {
        return Err(Error::invalid_argument(
            operation,
            format!("size {} exceeds {}", n, MAX_SIDE),
        ));
    }
    Ok(Some(n))
}

/// Rejects output sizes the processor will not allocate.
fn bounded(operation: &str, width: u32, height: u32) -> Result<(u32, u32)> {
    if width > MAX_SIDE || height > MAX_SIDE || width as u64 * height as u64 > MAX_PIXELS {
        return Err(Error::invalid_argument(
            operation,
            format!("output {}x{} is too large", width, height),
        ));
    }
    Ok((width, height))
}

fn exact_size(operation: &str, args: &[OpArg]) -> Result<(u32, u32)> {
    match (dimension(operation, args, 0)?, dimension(operation, args, 1)?) {
        (Some(w), Some(h)) => bounded(operation, w, h),
        _ => Err(Error::invalid_argument(operation, "auto is not supported here")),
    }
}

/// Missing flags read as false.
fn flag(operation: &str, args: &[OpArg], index: usize) -> Result<bool> {
    match args.get(index) {
        None | Some(OpArg::Null) => Ok(false),
        Some(value) => value.as_bool().ok_or_else(|| {
            Error::invalid_argument(operation, format!("argument {} must be a boolean", index + 1))
        }),
    }
}
