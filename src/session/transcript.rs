//! Transcript entries.

use serde::Serialize;

use crate::backend::Turn;

/// Role of a transcript entry author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt.
    System,
    /// User message.
    User,
    /// Assistant response.
    Assistant,
}

/// One chat turn shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub role: Role,
    pub content: String,
    /// Name of the file sent with this turn, if any.
    pub attached_file_name: Option<String>,
}

impl Entry {
    pub fn user(content: impl Into<String>, attached_file_name: Option<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            attached_file_name,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            attached_file_name: None,
        }
    }
}

/// Ordered, append-only list of entries for one session.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its index.
    pub fn push(&mut self, entry: Entry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Append text to the entry at `index`.
    pub(crate) fn append_to(&mut self, index: usize, text: &str) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.content.push_str(text);
        }
    }

    /// Replace the content of the entry at `index`.
    pub(crate) fn set_content(&mut self, index: usize, text: String) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.content = text;
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&Entry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// Entries as wire turns, for backends that rebuild multi-turn context.
    pub fn turns(&self) -> Vec<Turn> {
        self.entries
            .iter()
            .map(|e| Turn {
                role: e.role,
                content: e.content.clone(),
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_append() {
        let mut transcript = Transcript::new();
        assert!(transcript.is_empty());

        transcript.push(Entry::user("Hello", None));
        let idx = transcript.push(Entry::assistant(""));
        transcript.append_to(idx, "Hi");
        transcript.append_to(idx, " there");

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.last().unwrap().content, "Hi there");
    }

    #[test]
    fn test_turns_mirror_entries_without_file_names() {
        let mut transcript = Transcript::new();
        transcript.push(Entry::user("q1", Some("notes.md".into())));
        transcript.push(Entry::assistant("a1"));
        let turns = transcript.turns();
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].content, "a1");

        let json = serde_json::to_value(&turns[0]).unwrap();
        assert_eq!(json, serde_json::json!({ "role": "user", "content": "q1" }));
    }
}
