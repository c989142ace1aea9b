//! Filename classification.
//!
//! `classify` is total: every input maps to exactly one category, with `Document` as the
//! fallback for names without an extension or with an unrecognised one.

use solocloud_core::FileCategory;

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "svg", "tiff", "ico",
];
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mov", "wmv", "flv", "mkv", "webm", "3gp", "ogv", "m4v",
];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "aac", "ogg", "m4a", "wma"];
const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "rtf", "odt", "ods", "odp",
];
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar", "7z", "tar", "gz", "bz2", "xz"];
const CODE_EXTENSIONS: &[&str] = &[
    "py", "js", "html", "css", "java", "cpp", "c", "php", "rb", "go", "rs", "swift",
];

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Lower-cased text after the last dot, if any.
///
/// A trailing dot (`"notes."`) yields `None`.
pub fn extension_of(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Category and storage subfolder for `filename`.
pub fn classify(filename: &str) -> (FileCategory, &'static str) {
    let category = match extension_of(filename) {
        None => FileCategory::Document,
        Some(ext) => {
            let ext = ext.as_str();
            if IMAGE_EXTENSIONS.contains(&ext) {
                FileCategory::Image
            } else if VIDEO_EXTENSIONS.contains(&ext) {
                FileCategory::Video
            } else if AUDIO_EXTENSIONS.contains(&ext) {
                FileCategory::Audio
            } else if DOCUMENT_EXTENSIONS.contains(&ext) {
                FileCategory::Document
            } else if ARCHIVE_EXTENSIONS.contains(&ext) {
                FileCategory::Archive
            } else if CODE_EXTENSIONS.contains(&ext) {
                FileCategory::Code
            } else {
                FileCategory::Document
            }
        }
    };
    (category, category.subfolder())
}

/// MIME type implied by the extension.
pub fn guess_mime(filename: &str) -> Option<&'static str> {
    let mime = match extension_of(filename)?.as_str() {
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "tiff" => "image/tiff",
        "ico" => "image/x-icon",
        // Videos
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "mkv" => "video/x-matroska",
        "3gp" => "video/3gpp",
        "ogv" => "video/ogg",
        "m4v" => "video/x-m4v",
        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        "wma" => "audio/x-ms-wma",
        // Documents
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" => "text/plain",
        "rtf" => "application/rtf",
        "odt" => "application/vnd.oasis.opendocument.text",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "odp" => "application/vnd.oasis.opendocument.presentation",
        "csv" => "text/csv",
        // Archives
        "zip" => "application/zip",
        "rar" => "application/vnd.rar",
        "7z" => "application/x-7z-compressed",
        "tar" => "application/x-tar",
        "gz" => "application/gzip",
        "bz2" => "application/x-bzip2",
        "xz" => "application/x-xz",
        // Code
        "py" => "text/x-python",
        "js" => "text/javascript",
        "html" => "text/html",
        "css" => "text/css",
        "java" => "text/x-java-source",
        "c" | "cpp" => "text/x-c",
        "php" => "application/x-httpd-php",
        "rb" => "text/x-ruby",
        "go" => "text/x-go",
        "rs" => "text/x-rust",
        "swift" => "text/x-swift",
        _ => return None,
    };
    Some(mime)
}

/// Sender-declared MIME if present, else the extension guess, else octet-stream.
pub fn resolve_mime(declared: Option<&str>, filename: &str) -> String {
    declared
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .or_else(|| guess_mime(filename).map(str::to_string))
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
}
