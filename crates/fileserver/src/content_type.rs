//! Content type inference from filename suffix

use mime_guess::mime::{self, Mime};

/// Infer the content type of a file from its path
///
/// Purely suffix based: file contents are never inspected. Anything not in
/// the table is served as `application/octet-stream`.
pub fn content_type_for(path: &str) -> Mime {
    let lower = path.to_lowercase();
    let suffix = lower.rsplit_once('.').map(|(_, suffix)| suffix).unwrap_or("");

    match suffix {
        "txt" | "log" => mime::TEXT_PLAIN,
        "json" => mime::APPLICATION_JSON,
        "html" | "htm" => mime::TEXT_HTML,
        "css" => mime::TEXT_CSS,
        "js" => mime::APPLICATION_JAVASCRIPT,
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "pdf" => mime::APPLICATION_PDF,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}
