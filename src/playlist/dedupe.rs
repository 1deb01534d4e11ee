//! URL-based duplicate removal

use std::collections::HashSet;
use std::sync::Arc;

use crate::models::Channel;

/// Drop channels whose URL was already seen, keeping the first occurrence
///
/// Survivors keep their relative order. Returns the unique channels and the
/// number removed.
pub fn dedupe(channels: &[Arc<Channel>]) -> (Vec<Arc<Channel>>, usize) {
    let mut seen: HashSet<&str> = HashSet::with_capacity(channels.len());
    let unique: Vec<Arc<Channel>> = channels
        .iter()
        .filter(|c| seen.insert(c.url.as_str()))
        .cloned()
        .collect();
    let removed = channels.len() - unique.len();
    (unique, removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(name: &str, url: &str) -> Arc<Channel> {
        Arc::new(Channel {
            name: name.to_string(),
            group: "G".to_string(),
            logo: None,
            tvg_id: None,
            tvg_name: None,
            url: url.to_string(),
        })
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let input = vec![
            channel("A", "u1"),
            channel("B", "u2"),
            channel("A2", "u1"),
            channel("C", "u3"),
        ];
        let (unique, removed) = dedupe(&input);
        assert_eq!(removed, 1);
        let names: Vec<&str> = unique.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_unique_list_is_unchanged() {
        let input = vec![channel("A", "u1"), channel("B", "u2"), channel("C", "u3")];
        let (unique, removed) = dedupe(&input);
        assert_eq!(removed, 0);
        assert_eq!(unique, input);
    }

    #[test]
    fn test_many_copies_leave_one_survivor() {
        let input: Vec<Arc<Channel>> = (0..5)
            .map(|i| channel(&format!("Copy {i}"), "same"))
            .chain([channel("Other", "other")])
            .collect();
        let (unique, removed) = dedupe(&input);
        assert_eq!(removed, 4);
        let names: Vec<&str> = unique.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Copy 0", "Other"]);
    }

    #[test]
    fn test_dedupe_empty() {
        let (unique, removed) = dedupe(&[]);
        assert!(unique.is_empty());
        assert_eq!(removed, 0);
    }
}
