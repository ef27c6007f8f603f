use crate::error::Result;
use crate::models::{ConversionSpec, FileDescriptor};
use crate::services::image_processor::{ImageHandle, ImageProcessor};
use crate::utils::mime::is_image;
use futures::future::try_join_all;
use tracing::{debug, info};

/// Applies `spec` in place to every image in `files` and refreshes their sizes.
///
/// Qualifying files are decoded concurrently; any decode failure fails the
/// batch. Operations then run in spec order per image, and all images are
/// written back concurrently. Non-image descriptors are left alone and are not
/// part of the returned list.
pub async fn convert<'a, P>(
    processor: &P,
    files: &'a mut [FileDescriptor],
    spec: &ConversionSpec,
) -> Result<Vec<&'a mut FileDescriptor>>
where
    P: ImageProcessor + ?Sized,
{
    let mut images: Vec<&'a mut FileDescriptor> =
        files.iter_mut().filter(|file| is_image(&file.name)).collect();

    if images.is_empty() {
        debug!("No images in batch, skipping conversion");
        return Ok(images);
    }

    let spec = spec.resolve_auto();

    let mut handles: Vec<ImageHandle> =
        try_join_all(images.iter().map(|file| processor.decode(&file.path))).await?;

    for (file, handle) in images.iter().zip(handles.iter_mut()) {
        for operation in spec.operations() {
            debug!("Applying {} to {}", operation.name, file.name);
            processor.apply(handle, &operation.name, &operation.args)?;
        }
    }

    try_join_all(
        images
            .iter()
            .zip(handles.iter())
            .map(|(file, handle)| processor.encode(handle, &file.path)),
    )
    .await?;

    for file in images.iter_mut() {
        file.size = tokio::fs::metadata(&file.path).await?.len();
    }

    info!(
        "Converted {} image(s) with {} operation(s)",
        images.len(),
        spec.len()
    );
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::OpArg;
    use crate::services::image_processor::RasterProcessor;
    use image::{GenericImageView, Rgb, RgbImage};
    use std::path::Path;

    fn write_png(path: &Path, width: u32, height: u32) {
        RgbImage::from_pixel(width, height, Rgb([200, 40, 90]))
            .save_with_format(path, image::ImageFormat::Png)
            .unwrap();
    }

    #[tokio::test]
    async fn test_resize_and_refresh_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload_ea975ea24a208492f9a325b73fac579d");
        write_png(&path, 300, 200);

        let mut files = vec![FileDescriptor::new(&path, "sirloin-logo.png")];
        let spec = ConversionSpec::new()
            .with("resize", vec![120.into(), 120.into()])
            .with("greyscale", vec![]);

        let converted = convert(&RasterProcessor, &mut files, &spec).await.unwrap();
        assert_eq!(converted.len(), 1);
        let size = converted[0].size;

        assert_eq!(size, std::fs::metadata(&path).unwrap().len());
        assert_eq!(image::open(&path).unwrap().dimensions(), (120, 120));
    }

    #[tokio::test]
    async fn test_no_images_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "plain text").unwrap();

        let mut files = vec![FileDescriptor::new(&path, "notes.txt")];
        let spec = ConversionSpec::new().with("nonexistent", vec![]);

        let converted = convert(&RasterProcessor, &mut files, &spec).await.unwrap();
        assert!(converted.is_empty());
        assert_eq!(files[0].size, 0);
    }

    #[tokio::test]
    async fn test_unknown_operation_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        write_png(&path, 10, 10);

        let mut files = vec![FileDescriptor::new(&path, "a.png")];
        let spec = ConversionSpec::new().with("posterize", vec![OpArg::Number(4.0)]);

        let err = convert(&RasterProcessor, &mut files, &spec).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation(_)));
    }
}
