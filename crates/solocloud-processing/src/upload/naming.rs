use crate::classifier::extension_of;
use solocloud_core::AppError;
use uuid::Uuid;

const MAX_FILENAME_LENGTH: usize = 255;

/// Sanitize a client-supplied filename: keep only the final path component and
/// replace anything outside alphanumerics, `.`, `-` and `_` with `_`.
///
/// Over-long names are shortened in the stem so the extension survives.
pub fn sanitize_filename(filename: &str) -> Result<String, AppError> {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Filename is empty".to_string()));
    }

    let filename_only = std::path::Path::new(trimmed)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(trimmed);

    let sanitized: String = filename_only
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches(|c| c == '_' || c == '.').is_empty() {
        return Err(AppError::Validation(format!(
            "Filename '{}' has no usable characters",
            filename
        )));
    }

    Ok(truncate_keeping_extension(sanitized))
}

fn truncate_keeping_extension(name: String) -> String {
    if name.chars().count() <= MAX_FILENAME_LENGTH {
        return name;
    }

    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.chars().count() < MAX_FILENAME_LENGTH / 2 => {
            let keep = MAX_FILENAME_LENGTH - ext.chars().count() - 1;
            let stem: String = stem.chars().take(keep).collect();
            format!("{}.{}", stem, ext)
        }
        _ => name.chars().take(MAX_FILENAME_LENGTH).collect(),
    }
}

/// Collision-free storage name: 128 random bits as hex, plus the lower-cased
/// extension when the original has one.
pub fn unique_storage_name(original: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    match extension_of(original) {
        Some(ext) => format!("{}.{}", id, ext),
        None => id,
    }
}
