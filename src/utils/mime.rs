/// Extensions the conversion stage treats as images
const IMAGE_EXTENSIONS: &[&str] = &["gif", "jpg", "jpeg", "tiff", "png", "bmp"];

fn extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// True when the file name carries one of the convertible image extensions.
pub fn is_image(name: &str) -> bool {
    extension(name).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Content type for an object key, by extension. Unknown extensions map to
/// `application/octet-stream`.
pub fn content_type_for(key: &str) -> String {
    let Some(ext) = extension(key) else {
        return mime::APPLICATION_OCTET_STREAM.to_string();
    };

    match ext.as_str() {
        "jpg" | "jpeg" => mime::IMAGE_JPEG.to_string(),
        "png" => mime::IMAGE_PNG.to_string(),
        "gif" => mime::IMAGE_GIF.to_string(),
        "bmp" => mime::IMAGE_BMP.to_string(),
        "svg" => mime::IMAGE_SVG.to_string(),
        "txt" => mime::TEXT_PLAIN.to_string(),
        "html" | "htm" => mime::TEXT_HTML.to_string(),
        "css" => mime::TEXT_CSS.to_string(),
        "csv" => mime::TEXT_CSV.to_string(),
        "xml" => mime::TEXT_XML.to_string(),
        "js" => mime::APPLICATION_JAVASCRIPT.to_string(),
        "json" => mime::APPLICATION_JSON.to_string(),
        "pdf" => mime::APPLICATION_PDF.to_string(),
        "tif" | "tiff" => "image/tiff".to_string(),
        "webp" => "image/webp".to_string(),
        "ico" => "image/x-icon".to_string(),
        "mp4" => "video/mp4".to_string(),
        "webm" => "video/webm".to_string(),
        "mov" => "video/quicktime".to_string(),
        "mp3" => "audio/mpeg".to_string(),
        "wav" => "audio/wav".to_string(),
        "ogg" => "audio/ogg".to_string(),
        "zip" => "application/zip".to_string(),
        "gz" => "application/gzip".to_string(),
        "tar" => "application/x-tar".to_string(),
        "md" => "text/markdown".to_string(),
        _ => mime::APPLICATION_OCTET_STREAM.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image() {
        assert!(is_image("sirloin-logo.png"));
        assert!(is_image("PHOTO.JPEG"));
        assert!(is_image("scan.TiFf"));
        assert!(is_image("a.b.bmp"));
        assert!(!is_image("notes.txt"));
        assert!(!is_image("png"));
        assert!(!is_image("archive.png.zip"));
        assert!(!is_image("trailing."));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("1564560019944sirloin-logo.png"), "image/png");
        assert_eq!(content_type_for("photo.JPG"), "image/jpeg");
        assert_eq!(content_type_for("data.json"), "application/json");
        assert_eq!(content_type_for("scan.tiff"), "image/tiff");
        assert_eq!(content_type_for("blob.xyz"), "application/octet-stream");
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }
}
