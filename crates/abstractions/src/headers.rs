//! Request header collection.

use std::collections::BTreeMap;

/// Case-insensitive header map with last-write-wins semantics.
///
/// Names are stored lowercased; HTTP header names are case-insensitive and the
/// transport layer re-canonicalises them anyway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    entries: BTreeMap<String, String>,
}

impl RequestHeaders {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, replacing any previous value.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        self.entries
            .insert(name.as_ref().to_ascii_lowercase(), value.into())
    }

    /// Returns the value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns `true` if `name` is set.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Removes `name`, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(&name.to_ascii_lowercase())
    }

    /// Copies every header of `other` into `self`; `other` wins on conflicts.
    pub fn extend(&mut self, other: &RequestHeaders) {
        for (name, value) in other.iter() {
            self.insert(name, value);
        }
    }

    /// Iterates `(name, value)` pairs, names lowercased and sorted.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no header is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive_and_last_write_wins() {
        let mut headers = RequestHeaders::new();
        headers.insert("Accept", "text/plain");
        let previous = headers.insert("ACCEPT", "application/json");

        assert_eq!(previous.as_deref(), Some("text/plain"));
        assert_eq!(headers.get("accept"), Some("application/json"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn extend_overrides_existing_values() {
        let mut headers = RequestHeaders::new();
        headers.insert("x-a", "1");
        headers.insert("x-b", "1");
        let mut other = RequestHeaders::new();
        other.insert("X-B", "2");

        headers.extend(&other);

        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec![("x-a", "1"), ("x-b", "2")]
        );
    }
}
