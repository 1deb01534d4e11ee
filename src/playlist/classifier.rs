//! Country classification of channel group labels
//!
//! Classification is a pure function of the label and the static token table
//! in [`CountryCode::tokens`]; [`CountryClassifier`] only adds a memo in
//! front of it so that large playlists with a few hundred distinct labels do
//! not rescan the table for every group of every link.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::trace;

use crate::models::CountryCode;

/// Classify a label without memoization
///
/// The label is lowercased, then each code is tried in table order. A token
/// matches when it occurs in the label with no letter or digit directly on
/// either side, which covers the whole label, whole words, and tokens glued
/// to separators such as `TR|`, `DE:` or `[UK]`.
pub fn classify_label(label: &str) -> CountryCode {
    let normalized = label.trim().to_lowercase();
    if normalized.is_empty() {
        return CountryCode::Other;
    }

    for code in CountryCode::ALL {
        if code
            .tokens()
            .iter()
            .any(|token| contains_bounded(&normalized, token))
        {
            return code;
        }
    }

    CountryCode::Other
}

fn contains_bounded(haystack: &str, token: &str) -> bool {
    haystack.match_indices(token).any(|(start, _)| {
        let end = start + token.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

/// Memoizing classifier, safe to share between tasks
#[derive(Debug, Default)]
pub struct CountryClassifier {
    memo: RwLock<HashMap<String, CountryCode>>,
}

impl CountryClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a group label, reusing earlier answers for the same label
    pub fn classify(&self, label: &str) -> CountryCode {
        let key = label.trim().to_lowercase();

        if let Some(code) = self
            .memo
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&key)
        {
            return *code;
        }

        let code = classify_label(&key);
        trace!("Classified group '{}' as {}", label, code);
        self.memo
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key, code);
        code
    }

    /// Classify by group label, falling back to the channel name
    ///
    /// Useful for flat playlists where every entry sits in a generic group
    /// but names carry a prefix such as `DE: Das Erste`.
    pub fn classify_channel(&self, group: &str, channel_name: &str) -> CountryCode {
        match self.classify(group) {
            CountryCode::Other => classify_label(channel_name),
            code => code,
        }
    }

    /// Number of distinct labels memoized so far
    pub fn memo_len(&self) -> usize {
        self.memo
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("TR | HD", CountryCode::Turkey)]
    #[case("DE: Kids", CountryCode::Germany)]
    #[case("Random Mix", CountryCode::Other)]
    #[case("tr", CountryCode::Turkey)]
    #[case("Türkiye Ulusal", CountryCode::Turkey)]
    #[case("|UK| Sports", CountryCode::Uk)]
    #[case("[FR] Cinema", CountryCode::France)]
    #[case("Sport_AT", CountryCode::Austria)]
    #[case("NL-Movies", CountryCode::Netherlands)]
    #[case("United States News", CountryCode::Usa)]
    #[case("عربي", CountryCode::Arabic)]
    #[case("Brazil Futebol", CountryCode::Portugal)]
    #[case("Trending", CountryCode::Other)]
    #[case("DEUTSCHLAND HD", CountryCode::Germany)]
    #[case("", CountryCode::Other)]
    fn test_classify_label(#[case] label: &str, #[case] expected: CountryCode) {
        assert_eq!(classify_label(label), expected);
    }

    #[test]
    fn test_substring_is_not_a_match() {
        // "tr" inside "trending", "de" inside "video" and "it" inside "kitchen"
        assert_eq!(classify_label("Trending Videos Kitchen"), CountryCode::Other);
    }

    #[test]
    fn test_table_order_wins() {
        // Both Turkey and Germany tokens present; Turkey is declared first
        assert_eq!(classify_label("DE TR Mix"), CountryCode::Turkey);
    }

    #[test]
    fn test_classifier_is_idempotent_and_memoized() {
        let classifier = CountryClassifier::new();
        let first = classifier.classify("TR | HD");
        let second = classifier.classify("tr | hd");
        assert_eq!(first, CountryCode::Turkey);
        assert_eq!(first, second);
        assert_eq!(classifier.memo_len(), 1);
    }

    #[test]
    fn test_classify_channel_falls_back_to_name() {
        let classifier = CountryClassifier::new();
        assert_eq!(
            classifier.classify_channel("Entertainment", "DE: Das Erste"),
            CountryCode::Germany
        );
        assert_eq!(
            classifier.classify_channel("TR Ulusal", "BBC One"),
            CountryCode::Turkey
        );
    }
}
