//! Genre tag list with duplicate suppression

use serde::{Deserialize, Serialize};

/// A locally deduplicated genre label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreTag {
    pub id: u32,
    pub title: String,
}

/// Ordered genre tags
///
/// Invariant: no two tags share a `title` (case-sensitive). Ids come from a
/// counter that only moves forward, so removing a tag and adding another
/// never produces a duplicate id.
#[derive(Debug, Clone, Default)]
pub struct GenreList {
    tags: Vec<GenreTag>,
    last_id: u32,
}

impl GenreList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` (trimmed) as a new tag
    ///
    /// Returns `None` without changing the list when the trimmed text is empty
    /// or already present.
    pub fn add(&mut self, text: &str) -> Option<&GenreTag> {
        let title = text.trim();
        if title.is_empty() || self.contains(title) {
            return None;
        }

        self.last_id += 1;
        self.tags.push(GenreTag {
            id: self.last_id,
            title: title.to_string(),
        });
        self.tags.last()
    }

    /// Remove the tag with `id`; returns whether one was removed
    pub fn remove(&mut self, id: u32) -> bool {
        let before = self.tags.len();
        self.tags.retain(|tag| tag.id != id);
        self.tags.len() != before
    }

    pub fn contains(&self, title: &str) -> bool {
        self.tags.iter().any(|tag| tag.title == title)
    }

    pub fn tags(&self) -> &[GenreTag] {
        &self.tags
    }

    /// Titles in insertion order, as stored remotely
    pub fn titles(&self) -> Vec<String> {
        self.tags.iter().map(|tag| tag.title.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Drop all tags and restart ids at 1
    pub fn clear(&mut self) {
        self.tags.clear();
        self.last_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn list_of(titles: &[&str]) -> GenreList {
        let mut list = GenreList::new();
        for title in titles {
            list.add(title);
        }
        list
    }

    #[test]
    fn test_duplicate_add_is_noop() {
        let mut list = GenreList::new();
        assert!(list.add("lofi").is_some());
        assert!(list.add("lofi").is_none());

        assert_eq!(
            list.tags(),
            &[GenreTag {
                id: 1,
                title: "lofi".to_string()
            }]
        );
    }

    #[test]
    fn test_blank_add_is_noop() {
        let mut list = list_of(&["rock"]);
        assert!(list.add("").is_none());
        assert!(list.add("   ").is_none());
        assert!(list.add("\t\n").is_none());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_add_trims_and_compares_trimmed() {
        let mut list = GenreList::new();
        assert_eq!(list.add("  jazz ").unwrap().title, "jazz");
        assert!(list.add("jazz  ").is_none());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_duplicates_are_case_sensitive() {
        let list = list_of(&["Pop", "pop", "POP"]);
        assert_eq!(list.titles(), vec!["Pop", "pop", "POP"]);
    }

    #[test]
    fn test_remove_present_id() {
        let mut list = list_of(&["a", "b"]);
        assert!(list.remove(1));
        assert_eq!(
            list.tags(),
            &[GenreTag {
                id: 2,
                title: "b".to_string()
            }]
        );
    }

    #[test]
    fn test_remove_absent_id_leaves_list_unchanged() {
        let mut list = list_of(&["a", "b"]);
        let before = list.tags().to_vec();
        assert!(!list.remove(7));
        assert_eq!(list.tags(), before.as_slice());
    }

    #[test]
    fn test_ids_not_reused_after_middle_removal() {
        let mut list = list_of(&["a", "b", "c"]);
        list.remove(2);
        list.add("d");

        let ids: Vec<u32> = list.tags().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[test]
    fn test_removed_title_can_be_added_again() {
        let mut list = list_of(&["a"]);
        list.remove(1);
        let tag = list.add("a").unwrap();
        assert_eq!(tag.id, 2);
    }

    #[test]
    fn test_clear_restarts_ids() {
        let mut list = list_of(&["a", "b"]);
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.add("c").unwrap().id, 1);
    }

    #[test]
    fn test_arbitrary_sequences_keep_titles_and_ids_unique() {
        let inputs = [
            "rock", "rock ", "Rock", "", "jazz", "  ", "rock", "blues", "jazz", "lofi",
        ];
        let mut list = GenreList::new();
        for (i, input) in inputs.iter().enumerate() {
            list.add(input);
            if i % 3 == 2 {
                let first = list.tags().first().map(|t| t.id);
                if let Some(id) = first {
                    list.remove(id);
                }
            }

            let titles: HashSet<&str> = list.tags().iter().map(|t| t.title.as_str()).collect();
            let ids: HashSet<u32> = list.tags().iter().map(|t| t.id).collect();
            assert_eq!(titles.len(), list.len());
            assert_eq!(ids.len(), list.len());
        }
    }
}
