use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;

use crate::error::StorageError;

const RESERVED_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Turns a user-supplied file name into a single path segment that is safe on
/// any common filesystem.
///
/// Accented letters are decomposed to their ASCII base, separators become
/// word breaks, whitespace runs collapse to `_`, anything outside
/// `[A-Za-z0-9_.-]` is dropped and leading or trailing `.`/`_` are
/// stripped, so `../../etc/passwd` becomes `etc_passwd`. Returns
/// `InvalidName` when nothing usable is left.
pub fn sanitize(raw: &str) -> Result<String, StorageError> {
    let decomposed: String = raw.nfkd().collect();
    let spaced = decomposed.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let filtered: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let trimmed = filtered.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        return Err(StorageError::InvalidName(raw.to_string()));
    }

    // Windows reserves the device name whatever follows the first dot.
    let device = trimmed.split('.').next().unwrap_or_default();
    if RESERVED_DEVICE_NAMES.contains(&device.to_ascii_uppercase().as_str()) {
        return Ok(format!("_{}", trimmed));
    }

    Ok(trimmed.to_string())
}

/// Returns `candidate` unchanged when it is free, otherwise the first
/// `{stem}_{N}{ext}` (N starting at 1) that is not in `existing`.
pub fn resolve_collision(candidate: &str, existing: &HashSet<String>) -> String {
    if !existing.contains(candidate) {
        return candidate.to_string();
    }

    let (stem, extension) = split_extension(candidate);
    // At most |existing| names can be taken, so this always returns by N = |existing| + 1.
    (1..=existing.len() + 1)
        .map(|n| format!("{}_{}{}", stem, n, extension))
        .find(|name| !existing.contains(name))
        .unwrap_or_else(|| format!("{}_{}{}", stem, existing.len() + 1, extension))
}

/// Splits `name` into stem and extension, the extension keeping its dot.
/// Leading dots never start an extension, so `.bashrc` has none.
pub fn split_extension(name: &str) -> (&str, &str) {
    let first_real = name.len() - name.trim_start_matches('.').len();
    match name[first_real..].rfind('.') {
        Some(idx) => name.split_at(first_real + idx),
        None => (name, ""),
    }
}

/// Lower-cased extension without its dot, empty when there is none.
pub fn extension_of(name: &str) -> String {
    let (_, extension) = split_extension(name);
    extension.trim_start_matches('.').to_lowercase()
}

/// Rejects anything that is not one plain entry name inside the root.
pub fn ensure_plain_name(name: &str) -> Result<(), StorageError> {
    let plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0']);
    if plain {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}
