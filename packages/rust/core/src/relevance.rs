//! Relevance filter for collected feed entries.

/// Whether `text` mentions `subject_name` (case-insensitive substring).
///
/// Common names produce false positives; there is no identity matching.
pub fn is_relevant(subject_name: &str, text: &str) -> bool {
    text.to_lowercase().contains(&subject_name.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_substring() {
        assert!(is_relevant("Jane Doe", "Jane Doe visited Paris"));
        assert!(!is_relevant("Jane Doe", "unrelated text"));
    }

    #[test]
    fn ignores_case() {
        assert!(is_relevant("jane doe", "JANE DOE spoke"));
        assert!(is_relevant("ÉMILE Zola", "émile zola wrote"));
    }

    #[test]
    fn partial_name_is_not_enough() {
        assert!(!is_relevant("Jane Doe", "Jane spoke with Doe"));
    }
}
