//! Filename validation and storage key derivation.

use super::FileError;

/// Longest single path component most filesystems accept (NAME_MAX).
const MAX_KEY_BYTES: usize = 255;

/// Reduce a client-supplied filename to its final path component.
pub fn sanitize_upload_filename(original: &str) -> Result<String, FileError> {
    let name = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(FileError::validation("filename must not be empty"));
    }
    Ok(name.to_string())
}

/// Validate a rename target. Unlike uploads, separators are rejected rather than stripped.
pub fn validate_new_filename(new_filename: &str) -> Result<&str, FileError> {
    if new_filename.trim().is_empty() {
        return Err(FileError::validation("new_filename must not be empty"));
    }
    if new_filename == "." || new_filename == ".." || new_filename.contains(['/', '\\']) {
        return Err(FileError::validation(
            "new_filename must not contain path separators",
        ));
    }
    Ok(new_filename)
}

/// Object store key for a file. The id prefix keeps uploads sharing a name apart.
///
/// The filename part is cut at a char boundary so the key fits in one path
/// component; the display name in the record is never truncated.
pub fn storage_key(id: u64, filename: &str) -> String {
    let prefix = format!("{id}-");
    let mut end = filename.len().min(MAX_KEY_BYTES.saturating_sub(prefix.len()));
    while !filename.is_char_boundary(end) {
        end -= 1;
    }
    format!("{prefix}{}", &filename[..end])
}
