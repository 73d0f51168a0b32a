use serde::{Deserialize, Serialize};

/// Append-only history. Entries can be read but never edited or removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct AuditLog<T> {
    entries: Vec<T>,
}

impl<T> AuditLog<T> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Rebuild a log from persisted entries, oldest first
    pub fn from_entries(entries: Vec<T>) -> Self {
        Self { entries }
    }

    pub fn append(&mut self, entry: T) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }
}

impl<T> Default for AuditLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a AuditLog<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_insertion_order() {
        let mut log = AuditLog::new();
        log.append("first");
        log.append("second");
        log.append("third");

        assert_eq!(log.entries(), &["first", "second", "third"]);
        assert_eq!(log.latest(), Some(&"third"));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let log = AuditLog::from_entries(vec![1, 2]);
        assert_eq!(serde_json::to_string(&log).unwrap(), "[1,2]");
    }
}
