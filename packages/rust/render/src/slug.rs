use sha2::{Digest, Sha256};

/// Filesystem-safe file stem for a subject name.
///
/// Every non-alphanumeric character becomes `_` and leading/trailing `_` are
/// trimmed. Names with no alphanumerics get a stable hash-based stem instead.
pub fn slugify(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let trimmed = replaced.trim_matches('_');

    if trimmed.is_empty() {
        let digest = Sha256::digest(name.as_bytes());
        let hex: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
        return format!("subject_{hex}");
    }
    trimmed.to_string()
}
